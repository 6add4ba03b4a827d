//! State reconciliation.
//!
//! After a submission, the ledger's view and the client's view converge
//! here: re-fetch the authoritative profile, wait out the
//! read-visibility lag with a bounded retry budget, and fall back to a
//! flagged optimistic increment rather than blocking the caller. The
//! flagged count is corrected silently by a later pass; it is never
//! presented as authoritative.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::gateway::LedgerGateway;
use crate::models::{DailyRecord, Identity, Profile};
use rollcall_addressing::{daily_record_address, day_index, profile_address};

/// Reconciliation tuning.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Re-fetch attempts before falling back to the optimistic path.
    pub fetch_attempts: u32,

    /// Fixed backoff between re-fetches.
    pub backoff: Duration,

    /// Cadence of the background reconciliation pass.
    pub interval: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            fetch_attempts: 3,
            backoff: Duration::from_millis(500),
            interval: Duration::from_secs(30),
        }
    }
}

impl ReconcileConfig {
    /// Create a config with near-zero waits (tests, local ledgers).
    #[must_use]
    pub fn fast() -> Self {
        Self {
            fetch_attempts: 3,
            backoff: Duration::from_millis(1),
            interval: Duration::from_millis(20),
        }
    }

    /// Set the re-fetch budget.
    #[must_use]
    pub fn with_fetch_attempts(mut self, attempts: u32) -> Self {
        self.fetch_attempts = attempts;
        self
    }

    /// Set the backoff between re-fetches.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the background pass cadence.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// The resolved view of a profile after reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedState {
    /// Authoritative advance observed on the ledger.
    Confirmed(Profile),

    /// Retry budget exhausted: the count carries a local optimistic
    /// increment and will be corrected by a later pass.
    Unconfirmed(Profile),

    /// The ledger already holds today's record; a prior attempt,
    /// possibly from another session, succeeded.
    AlreadyCheckedIn(Profile),
}

impl ResolvedState {
    /// The profile to display.
    pub fn profile(&self) -> &Profile {
        match self {
            Self::Confirmed(p) | Self::Unconfirmed(p) | Self::AlreadyCheckedIn(p) => p,
        }
    }

    /// Whether the count came from the ledger rather than a local guess.
    pub fn is_authoritative(&self) -> bool {
        !matches!(self, Self::Unconfirmed(_))
    }
}

/// Converges local state with authoritative ledger state.
pub struct Reconciler<G> {
    gateway: Arc<G>,
    config: ReconcileConfig,
}

impl<G: LedgerGateway> Reconciler<G> {
    /// Create a reconciler over a shared gateway handle.
    pub fn new(gateway: Arc<G>, config: ReconcileConfig) -> Self {
        Self { gateway, config }
    }

    /// The configured background pass cadence.
    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Re-fetch until the profile advances past `prior`, then adopt the
    /// fetched state as truth; otherwise fall back to the flagged
    /// optimistic increment.
    ///
    /// Fetch errors inside the loop count against the budget: confirmation
    /// and read visibility are only eventually consistent, and the caller
    /// must not hang on either.
    pub async fn reconcile(&self, identity: Identity, prior: &Profile) -> ResolvedState {
        let address = profile_address(identity.as_bytes());
        for attempt in 0..self.config.fetch_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.config.backoff).await;
            }
            match self.gateway.fetch_profile(address).await {
                Ok(Some(profile)) if profile.check_in_count > prior.check_in_count => {
                    debug!(attempt, count = profile.check_in_count, "advance observed");
                    return ResolvedState::Confirmed(profile);
                }
                Ok(_) => trace!(attempt, "no advance visible yet"),
                Err(e) => warn!(attempt, error = %e, "profile fetch failed during reconciliation"),
            }
        }

        let mut optimistic = prior.clone();
        optimistic.check_in_count = optimistic.check_in_count.saturating_add(1);
        debug!(
            attempts = self.config.fetch_attempts,
            "retry budget exhausted, adopting optimistic count"
        );
        ResolvedState::Unconfirmed(optimistic)
    }

    /// Authoritative re-fetch after an already-clocked-in rejection.
    ///
    /// The rejection is evidence that a prior attempt succeeded, so the
    /// resolved state is the normal "already done today", never an error.
    pub async fn resolve_already_checked_in(
        &self,
        identity: Identity,
        prior: &Profile,
    ) -> ResolvedState {
        match self
            .gateway
            .fetch_profile(profile_address(identity.as_bytes()))
            .await
        {
            Ok(Some(profile)) => ResolvedState::AlreadyCheckedIn(profile),
            Ok(None) => {
                warn!(%identity, "profile vanished behind an already-clocked-in rejection");
                ResolvedState::AlreadyCheckedIn(prior.clone())
            }
            Err(e) => {
                warn!(error = %e, "re-fetch failed, keeping prior profile");
                ResolvedState::AlreadyCheckedIn(prior.clone())
            }
        }
    }

    /// Fetch the current profile with no expectations (the natural poll).
    pub async fn current(&self, identity: Identity) -> Result<Option<Profile>> {
        self.gateway
            .fetch_profile(profile_address(identity.as_bytes()))
            .await
    }

    /// Whether a record exists for (identity, day).
    pub async fn checked_in_on(&self, identity: Identity, day: u64) -> Result<bool> {
        Ok(self
            .gateway
            .fetch_daily_record(daily_record_address(identity.as_bytes(), day))
            .await?
            .is_some())
    }

    /// Check-in records over the most recent `days` buckets, newest first.
    pub async fn history(
        &self,
        identity: Identity,
        days: u32,
        now: i64,
    ) -> Result<Vec<DailyRecord>> {
        let current = day_index(now);
        let mut records = Vec::new();
        for back in 0..u64::from(days) {
            let Some(day) = current.checked_sub(back) else {
                break;
            };
            let address = daily_record_address(identity.as_bytes(), day);
            if let Some(record) = self.gateway.fetch_daily_record(address).await? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::MemoryLedger;
    use crate::operation::Operation;
    use crate::signer::{LocalSigner, SignerProvider};
    use crate::submit::{SubmitConfig, Submitter};

    const DAY0: i64 = 1_700_006_400; // start of a bucket, clean boundaries

    async fn checked_in_user() -> (Arc<MemoryLedger>, LocalSigner, Profile) {
        let admin = LocalSigner::generate();
        let ledger = Arc::new(MemoryLedger::new(admin.identity().unwrap()));
        ledger.set_clock(DAY0).await;
        let submitter = Submitter::new(Arc::clone(&ledger), SubmitConfig::fast());
        submitter
            .submit(Operation::bootstrap(admin.identity().unwrap()), &admin)
            .await
            .unwrap();

        let user = LocalSigner::generate();
        let identity = user.identity().unwrap();
        submitter
            .submit(Operation::register(identity, "Alice").unwrap(), &user)
            .await
            .unwrap();
        let prior = ledger
            .fetch_profile(profile_address(identity.as_bytes()))
            .await
            .unwrap()
            .unwrap();

        submitter
            .submit(Operation::check_in(identity, DAY0), &user)
            .await
            .unwrap();
        (ledger, user, prior)
    }

    #[tokio::test]
    async fn advance_is_adopted_as_truth() {
        let (ledger, user, prior) = checked_in_user().await;
        let reconciler = Reconciler::new(Arc::clone(&ledger), ReconcileConfig::fast());

        let resolved = reconciler
            .reconcile(user.identity().unwrap(), &prior)
            .await;
        let ResolvedState::Confirmed(profile) = resolved else {
            panic!("expected confirmed, got {resolved:?}");
        };
        assert_eq!(profile.check_in_count, prior.check_in_count + 1);
        assert_eq!(profile.last_check_in, DAY0);
    }

    #[tokio::test]
    async fn visibility_lag_is_waited_out() {
        let (ledger, user, prior) = checked_in_user().await;
        // Two stale reads, budget of three.
        ledger.hold_profile_visibility(2).await;
        let reconciler = Reconciler::new(Arc::clone(&ledger), ReconcileConfig::fast());

        let resolved = reconciler
            .reconcile(user.identity().unwrap(), &prior)
            .await;
        assert!(matches!(resolved, ResolvedState::Confirmed(_)));
    }

    #[tokio::test]
    async fn exhausted_budget_goes_optimistic() {
        let (ledger, user, prior) = checked_in_user().await;
        ledger.hold_profile_visibility(100).await;
        let reconciler = Reconciler::new(Arc::clone(&ledger), ReconcileConfig::fast());

        let resolved = reconciler
            .reconcile(user.identity().unwrap(), &prior)
            .await;
        let ResolvedState::Unconfirmed(profile) = &resolved else {
            panic!("expected optimistic fallback, got {resolved:?}");
        };
        assert_eq!(profile.check_in_count, prior.check_in_count + 1);
        assert!(!resolved.is_authoritative());
    }

    #[tokio::test]
    async fn fetch_failures_count_against_the_budget() {
        let (ledger, user, prior) = checked_in_user().await;
        ledger.fail_next_fetches(100).await;
        let reconciler = Reconciler::new(Arc::clone(&ledger), ReconcileConfig::fast());

        let resolved = reconciler
            .reconcile(user.identity().unwrap(), &prior)
            .await;
        assert!(matches!(resolved, ResolvedState::Unconfirmed(_)));
    }

    #[tokio::test]
    async fn already_checked_in_resolves_to_the_ledger_count() {
        let (ledger, user, prior) = checked_in_user().await;
        let reconciler = Reconciler::new(Arc::clone(&ledger), ReconcileConfig::fast());

        let resolved = reconciler
            .resolve_already_checked_in(user.identity().unwrap(), &prior)
            .await;
        let ResolvedState::AlreadyCheckedIn(profile) = resolved else {
            panic!("expected already-checked-in");
        };
        assert_eq!(profile.check_in_count, 1);
    }

    #[tokio::test]
    async fn history_is_newest_first_with_gaps_skipped() {
        let (ledger, user, _) = checked_in_user().await;
        let identity = user.identity().unwrap();
        let submitter = Submitter::new(Arc::clone(&ledger), SubmitConfig::fast());

        // Skip a day, then check in again.
        ledger.advance_clock(2 * 86_400).await;
        let now = DAY0 + 2 * 86_400;
        submitter
            .submit(Operation::check_in(identity, now), &user)
            .await
            .unwrap();

        let reconciler = Reconciler::new(Arc::clone(&ledger), ReconcileConfig::fast());
        let records = reconciler.history(identity, 7, now).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].day, day_index(now));
        assert_eq!(records[1].day, day_index(DAY0));
    }

    #[tokio::test]
    async fn checked_in_on_probes_the_day_bucket() {
        let (ledger, user, _) = checked_in_user().await;
        let identity = user.identity().unwrap();
        let reconciler = Reconciler::new(ledger, ReconcileConfig::fast());

        assert!(reconciler
            .checked_in_on(identity, day_index(DAY0))
            .await
            .unwrap());
        assert!(!reconciler
            .checked_in_on(identity, day_index(DAY0) + 1)
            .await
            .unwrap());
    }
}
