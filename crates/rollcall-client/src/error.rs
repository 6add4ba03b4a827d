//! Error types for the Rollcall client.

use thiserror::Error;

use crate::gateway::RejectReason;

/// Result type for Rollcall client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in client operations.
///
/// Unknown-outcome situations (confirmation not observed within the
/// deadline, optimistic counts awaiting a later pass) are deliberately
/// NOT errors; they are typed outcomes on [`crate::SubmitOutcome`] and
/// [`crate::ResolvedState`].
#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected locally, before any network interaction.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// No active identity; the signing provider is absent or disconnected.
    #[error("no active identity")]
    NoIdentity,

    /// The ledger deterministically rejected the operation.
    #[error("ledger rejected operation: {0}")]
    Rejected(RejectReason),

    /// Transient transport failure (network, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// A fetched account payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

/// Local input validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Display name is empty.
    #[error("display name must not be empty")]
    EmptyDisplayName,

    /// Display name is longer than the ledger accepts.
    #[error("display name exceeds {max} characters: {len}")]
    DisplayNameTooLong { len: usize, max: usize },
}

/// Versioned-decode failures for ledger account payloads.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload's leading schema version byte is unknown.
    #[error("unsupported schema version {0}")]
    UnsupportedVersion(u8),

    /// The payload is too short to carry a version byte.
    #[error("truncated payload")]
    Truncated,

    /// The payload body did not match the schema for its version.
    #[error("malformed payload: {0}")]
    Malformed(String),
}
