//! Ledger account models.

use serde::{Deserialize, Serialize};

/// Maximum display name length, in characters.
pub const MAX_DISPLAY_NAME: usize = 20;

/// An externally supplied participant identity: a 32-byte ed25519 public
/// key. The client never generates or stores one; it is handed in by the
/// signing provider and treated as an immutable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity([u8; 32]);

impl Identity {
    /// Create an identity from raw public key bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw public key bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..", &self.to_hex()[..12])
    }
}

impl From<&ed25519_dalek::VerifyingKey> for Identity {
    fn from(key: &ed25519_dalek::VerifyingKey) -> Self {
        Self(key.to_bytes())
    }
}

/// A participant's profile account.
///
/// Created exactly once per identity by a successful Register; mutated
/// only by CheckIn (counter up by one, timestamp updated). Never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Identity that owns the profile.
    pub owner: Identity,
    /// Display name, 1..=20 characters.
    pub display_name: String,
    /// Cumulative number of daily check-ins.
    pub check_in_count: u64,
    /// Unix timestamp of the most recent check-in, 0 if none yet.
    pub last_check_in: i64,
}

/// A single day's check-in record.
///
/// At most one exists per (owner, day); its address is fully determined
/// by that pair, which is what makes a second same-day check-in fail
/// rather than overwrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRecord {
    /// Identity that checked in.
    pub owner: Identity,
    /// Day bucket, `floor(epoch_seconds / 86400)` of the ledger's
    /// execution-time clock.
    pub day: u64,
    /// Unix timestamp the record was created at.
    pub created_at: i64,
}

/// The singleton registry account, created once at system bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRegistry {
    /// Identity allowed to administer the system.
    pub administrator: Identity,
    /// Number of profiles ever registered.
    pub total_registered: u64,
}
