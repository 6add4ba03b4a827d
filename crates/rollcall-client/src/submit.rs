//! Transaction submission.
//!
//! One logical attempt: sign, send, await confirmation. The wait is
//! bounded by a fixed number of polling rounds with fixed spacing;
//! running out of rounds is the [`SubmitOutcome::Unconfirmed`] outcome,
//! not a failure. The operation may still land, and the caller falls
//! back to reconciliation. The only automatic retry is for the
//! duplicate-submission rejection, which is evidence an earlier send
//! already landed; every other rejection surfaces immediately, because a
//! blind retry of a non-idempotent state change risks a duplicate side
//! effect.
//!
//! One operation in flight per caller: the submitter does not pipeline a
//! second operation for the same identity while one is outstanding.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::gateway::{Confirmation, LedgerGateway, RejectReason};
use crate::operation::{Operation, SignedOperation};
use crate::signer::SignerProvider;

/// Submission tuning.
#[derive(Debug, Clone)]
pub struct SubmitConfig {
    /// Confirmation polling rounds before giving up on observing it.
    pub confirm_rounds: u32,

    /// Fixed spacing between confirmation polls.
    pub confirm_interval: Duration,

    /// Bounded resend attempts when the ledger reports a duplicate.
    pub duplicate_retries: u32,

    /// Fixed spacing between duplicate resends.
    pub duplicate_interval: Duration,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            confirm_rounds: 5,
            confirm_interval: Duration::from_millis(400),
            duplicate_retries: 3,
            duplicate_interval: Duration::from_secs(1),
        }
    }
}

impl SubmitConfig {
    /// Create a config with near-zero waits (tests, local ledgers).
    #[must_use]
    pub fn fast() -> Self {
        Self {
            confirm_rounds: 3,
            confirm_interval: Duration::from_millis(1),
            duplicate_retries: 1,
            duplicate_interval: Duration::from_millis(1),
        }
    }

    /// Set the confirmation polling ceiling.
    #[must_use]
    pub fn with_confirm_rounds(mut self, rounds: u32) -> Self {
        self.confirm_rounds = rounds;
        self
    }

    /// Set the spacing between confirmation polls.
    #[must_use]
    pub fn with_confirm_interval(mut self, interval: Duration) -> Self {
        self.confirm_interval = interval;
        self
    }

    /// Set the duplicate-resend budget.
    #[must_use]
    pub fn with_duplicate_retries(mut self, retries: u32) -> Self {
        self.duplicate_retries = retries;
        self
    }
}

/// Outcome of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Executed and confirmed, with the ledger's execution timestamp.
    Confirmed { executed_at: i64 },
    /// Accepted (or reported duplicate) but not observed as confirmed
    /// within the deadline. The operation may still land; re-read state
    /// before drawing conclusions.
    Unconfirmed,
}

/// Signs and submits operations against a shared gateway handle.
pub struct Submitter<G> {
    gateway: Arc<G>,
    config: SubmitConfig,
}

impl<G: LedgerGateway> Submitter<G> {
    /// Create a submitter over a shared gateway handle.
    pub fn new(gateway: Arc<G>, config: SubmitConfig) -> Self {
        Self { gateway, config }
    }

    /// Submit one operation: sign, send, bounded confirmation wait.
    pub async fn submit<S: SignerProvider + ?Sized>(
        &self,
        operation: Operation,
        signer: &S,
    ) -> Result<SubmitOutcome> {
        let signed = SignedOperation::new(operation, signer)?;

        let mut resends = 0;
        let ticket = loop {
            match self.gateway.execute(&signed).await {
                Ok(ticket) => break ticket,
                Err(Error::Rejected(RejectReason::DuplicateSubmission)) => {
                    if resends >= self.config.duplicate_retries {
                        // The ledger has seen this submission before; the
                        // effect most likely landed. Defer to re-reading
                        // state instead of reporting a failure.
                        warn!(resends, "duplicate submission persisted, deferring to reconciliation");
                        return Ok(SubmitOutcome::Unconfirmed);
                    }
                    resends += 1;
                    debug!(resends, "ledger reports duplicate submission, resending");
                    tokio::time::sleep(self.config.duplicate_interval).await;
                }
                Err(other) => return Err(other),
            }
        };

        for round in 0..self.config.confirm_rounds {
            match self.gateway.confirmation(&ticket).await {
                Ok(Confirmation::Confirmed { executed_at }) => {
                    debug!(round, executed_at, "submission confirmed");
                    return Ok(SubmitOutcome::Confirmed { executed_at });
                }
                Ok(Confirmation::Pending) => trace!(round, "confirmation pending"),
                // A failed poll is a missed observation, not a verdict on
                // the operation; the Unconfirmed outcome covers it.
                Err(e) => trace!(round, error = %e, "confirmation poll failed"),
            }
            tokio::time::sleep(self.config.confirm_interval).await;
        }

        debug!(
            rounds = self.config.confirm_rounds,
            "confirmation not observed within deadline"
        );
        Ok(SubmitOutcome::Unconfirmed)
    }
}
