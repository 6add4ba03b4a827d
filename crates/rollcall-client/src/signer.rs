//! Identity and signing seam.
//!
//! The client never generates or custodies keys; an external provider (a
//! wallet) supplies the active identity and a signing capability. When no
//! identity is active, every core operation fails fast.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};

use crate::models::Identity;

/// Supplies the active identity and signatures over operation payloads.
pub trait SignerProvider: Send + Sync {
    /// The currently active identity, if any.
    fn identity(&self) -> Option<Identity>;

    /// Sign an operation payload.
    fn sign(&self, payload: &[u8]) -> Signature;
}

/// In-process ed25519 signer for tests and local development.
///
/// Real deployments hand the client a wallet-backed provider instead;
/// key custody is not the client's concern.
pub struct LocalSigner {
    key: SigningKey,
}

impl LocalSigner {
    /// Wrap an existing signing key.
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Generate a fresh keypair.
    pub fn generate() -> Self {
        Self {
            key: SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    /// The public half of the keypair.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }
}

impl SignerProvider for LocalSigner {
    fn identity(&self) -> Option<Identity> {
        Some(Identity::from(&self.key.verifying_key()))
    }

    fn sign(&self, payload: &[u8]) -> Signature {
        self.key.sign(payload)
    }
}
