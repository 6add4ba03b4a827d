//! The ledger seam.
//!
//! [`LedgerGateway`] is everything the client knows about the ledger: it
//! accepts a signed operation, executes it atomically against current
//! ledger state, answers confirmation polls, and serves reads. Consensus,
//! transport and fees live behind this trait. The handle is shared across
//! components and is stateless per call, so no client-side locking is
//! needed around it.

pub mod memory;

use std::future::Future;

use crate::error::Result;
use crate::models::{DailyRecord, Profile, SystemRegistry};
use crate::operation::SignedOperation;
use rollcall_addressing::Address;

/// Why the ledger deterministically refused an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// A profile (or the registry singleton) already exists.
    AlreadyRegistered,
    /// The identity has no profile yet.
    NotRegistered,
    /// A check-in record for (owner, today) already exists.
    AlreadyClockedInToday,
    /// Signature, address derivation or admin check failed.
    Unauthorized,
    /// This exact submission was already processed.
    DuplicateSubmission,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyRegistered => write!(f, "already registered"),
            Self::NotRegistered => write!(f, "not registered"),
            Self::AlreadyClockedInToday => write!(f, "already clocked in today"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::DuplicateSubmission => write!(f, "duplicate submission"),
        }
    }
}

/// Acknowledgment of an accepted submission, used to poll confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(pub u64);

/// Confirmation status of an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Executed and visible; carries the ledger's execution timestamp.
    Confirmed {
        /// Unix timestamp of execution on the ledger clock.
        executed_at: i64,
    },
    /// Accepted but not yet observed as executed.
    Pending,
}

/// The ledger as seen by the client.
///
/// `execute` either applies the whole operation or rejects it; there is
/// no partial effect. Reads may lag execution (confirmation and read
/// visibility are only eventually consistent with each other), which is
/// why the reconciler exists.
pub trait LedgerGateway: Send + Sync {
    /// Execute a signed operation atomically against current ledger state.
    fn execute(&self, op: &SignedOperation) -> impl Future<Output = Result<Ticket>> + Send;

    /// Confirmation status of a previously accepted submission.
    fn confirmation(&self, ticket: &Ticket) -> impl Future<Output = Result<Confirmation>> + Send;

    /// Fetch the profile stored at `address`, if any.
    fn fetch_profile(&self, address: Address)
        -> impl Future<Output = Result<Option<Profile>>> + Send;

    /// Fetch the daily record stored at `address`, if any.
    fn fetch_daily_record(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<Option<DailyRecord>>> + Send;

    /// Fetch the registry singleton, if the system has been bootstrapped.
    fn fetch_registry(&self) -> impl Future<Output = Result<Option<SystemRegistry>>> + Send;

    /// Fetch every profile, in the ledger's arrival order.
    fn fetch_all_profiles(&self) -> impl Future<Output = Result<Vec<Profile>>> + Send;
}
