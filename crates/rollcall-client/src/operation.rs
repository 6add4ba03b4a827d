//! Operation construction and signing.
//!
//! Builders are pure data construction: derive the storage addresses,
//! validate local input, no I/O. Preconditions that depend on ledger
//! state (profile exists, today's record absent) are enforced by the
//! gateway at execution time, not here.

use ed25519_dalek::Signature;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ValidationError};
use crate::models::{Identity, MAX_DISPLAY_NAME};
use crate::signer::SignerProvider;
use rollcall_addressing::{day_index, daily_record_address, profile_address, registry_address, Address};

/// A state-changing ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Create the caller's profile and count it in the registry.
    Register {
        identity: Identity,
        display_name: String,
        profile: Address,
        registry: Address,
    },
    /// Create today's check-in record and bump the profile counter.
    ///
    /// `day` and `record` are the builder's hint; the ledger decides the
    /// authoritative day from its own clock at execution time.
    CheckIn {
        identity: Identity,
        profile: Address,
        record: Address,
        day: u64,
    },
    /// One-time creation of the system registry (administrator only).
    Bootstrap {
        administrator: Identity,
        registry: Address,
    },
}

impl Operation {
    /// Build a Register operation. Fails locally on a bad display name,
    /// before any network interaction.
    pub fn register(identity: Identity, display_name: &str) -> Result<Self> {
        validate_display_name(display_name)?;
        Ok(Self::Register {
            identity,
            display_name: display_name.to_string(),
            profile: profile_address(identity.as_bytes()),
            registry: registry_address(),
        })
    }

    /// Build a CheckIn operation for the day bucket containing `now`.
    pub fn check_in(identity: Identity, now: i64) -> Self {
        let day = day_index(now);
        Self::CheckIn {
            identity,
            profile: profile_address(identity.as_bytes()),
            record: daily_record_address(identity.as_bytes(), day),
            day,
        }
    }

    /// Build the one-time Bootstrap operation.
    pub fn bootstrap(administrator: Identity) -> Self {
        Self::Bootstrap {
            administrator,
            registry: registry_address(),
        }
    }

    /// The identity expected to sign this operation.
    pub fn identity(&self) -> Identity {
        match self {
            Self::Register { identity, .. } | Self::CheckIn { identity, .. } => *identity,
            Self::Bootstrap { administrator, .. } => *administrator,
        }
    }
}

/// Validate a display name: 1..=20 characters.
pub fn validate_display_name(name: &str) -> std::result::Result<(), ValidationError> {
    let len = name.chars().count();
    if len == 0 {
        return Err(ValidationError::EmptyDisplayName);
    }
    if len > MAX_DISPLAY_NAME {
        return Err(ValidationError::DisplayNameTooLong {
            len,
            max: MAX_DISPLAY_NAME,
        });
    }
    Ok(())
}

/// The exact bytes covered by an operation signature.
pub fn signing_bytes(operation: &Operation, nonce: u64) -> Vec<u8> {
    let mut buf = bincode::serialize(operation).expect("serialize");
    buf.extend_from_slice(&nonce.to_le_bytes());
    buf
}

/// A signed operation ready for submission.
#[derive(Debug, Clone)]
pub struct SignedOperation {
    pub operation: Operation,
    /// Fresh per signing, so two builds of the same logical operation are
    /// distinct on the wire and the ledger's duplicate detection only
    /// fires on an actual replay.
    pub nonce: u64,
    pub public_key: Identity,
    pub signature: Signature,
}

impl SignedOperation {
    /// Sign an operation with the provider's active identity.
    pub fn new<S: SignerProvider + ?Sized>(operation: Operation, signer: &S) -> Result<Self> {
        let public_key = signer.identity().ok_or(Error::NoIdentity)?;
        let nonce = rand::random();
        let signature = signer.sign(&signing_bytes(&operation, nonce));
        Ok(Self {
            operation,
            nonce,
            public_key,
            signature,
        })
    }

    /// The signed payload bytes.
    pub fn payload(&self) -> Vec<u8> {
        signing_bytes(&self.operation, self.nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::LocalSigner;
    use ed25519_dalek::Verifier;

    const IDENTITY: Identity = Identity::from_bytes([5u8; 32]);

    #[test]
    fn register_accepts_one_to_twenty_chars() {
        assert!(Operation::register(IDENTITY, "A").is_ok());
        assert!(Operation::register(IDENTITY, &"x".repeat(20)).is_ok());
        // Characters, not bytes.
        assert!(Operation::register(IDENTITY, &"ü".repeat(20)).is_ok());
    }

    #[test]
    fn register_rejects_empty_name() {
        let err = Operation::register(IDENTITY, "").unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::EmptyDisplayName)
        ));
    }

    #[test]
    fn register_rejects_over_length_name() {
        let err = Operation::register(IDENTITY, &"x".repeat(21)).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::DisplayNameTooLong { len: 21, max: 20 })
        ));
    }

    #[test]
    fn check_in_carries_the_hinted_day() {
        let op = Operation::check_in(IDENTITY, 86_400 * 3 + 17);
        let Operation::CheckIn { day, record, .. } = &op else {
            panic!("expected check-in");
        };
        assert_eq!(*day, 3);
        assert_eq!(*record, daily_record_address(IDENTITY.as_bytes(), 3));
    }

    #[test]
    fn signing_bytes_depend_on_the_nonce() {
        let op = Operation::check_in(IDENTITY, 1_700_000_000);
        assert_ne!(signing_bytes(&op, 1), signing_bytes(&op, 2));
    }

    #[test]
    fn signature_verifies_against_the_payload() {
        let signer = LocalSigner::generate();
        let op = Operation::check_in(signer.identity().unwrap(), 1_700_000_000);
        let signed = SignedOperation::new(op, &signer).unwrap();
        assert!(signer
            .verifying_key()
            .verify(&signed.payload(), &signed.signature)
            .is_ok());
    }

    #[test]
    fn fresh_signings_are_distinct_on_the_wire() {
        let signer = LocalSigner::generate();
        let op = Operation::check_in(signer.identity().unwrap(), 1_700_000_000);
        let a = SignedOperation::new(op.clone(), &signer).unwrap();
        let b = SignedOperation::new(op, &signer).unwrap();
        assert_ne!(a.signature.to_bytes(), b.signature.to_bytes());
    }
}
