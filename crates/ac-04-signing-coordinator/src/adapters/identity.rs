//! Local Ed25519 key vault.

use crate::domain::ProtocolError;
use crate::ports::IdentityService;
use parking_lot::RwLock;
use shared_crypto::{verify_signature, Ed25519KeyPair};
use shared_types::{Party, PartyKey, TransactionSignature};
use std::collections::HashMap;

/// Holds the signing keys of the identities this node controls.
///
/// Verification works for any key, held or not.
#[derive(Default)]
pub struct LocalKeyVault {
    keys: RwLock<HashMap<PartyKey, Ed25519KeyPair>>,
}

impl LocalKeyVault {
    /// Empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh identity called `name`.
    pub fn create_identity(&self, name: impl Into<String>) -> Party {
        self.import(name, Ed25519KeyPair::generate())
    }

    /// Take ownership of an existing key pair.
    pub fn import(&self, name: impl Into<String>, keypair: Ed25519KeyPair) -> Party {
        let key = PartyKey(keypair.public_key());
        self.keys.write().insert(key, keypair);
        Party::new(name, key)
    }

    /// Whether this vault can sign for `identity`.
    pub fn holds(&self, identity: &PartyKey) -> bool {
        self.keys.read().contains_key(identity)
    }
}

impl IdentityService for LocalKeyVault {
    fn sign(
        &self,
        payload: &[u8],
        identity: &PartyKey,
    ) -> Result<TransactionSignature, ProtocolError> {
        let keys = self.keys.read();
        let keypair = keys
            .get(identity)
            .ok_or_else(|| ProtocolError::Signing(format!("no signing key for {}", identity)))?;
        Ok(TransactionSignature {
            by: *identity,
            bytes: keypair.sign(payload),
        })
    }

    fn verify(
        &self,
        payload: &[u8],
        signature: &TransactionSignature,
        identity: &PartyKey,
    ) -> bool {
        signature.by == *identity
            && verify_signature(identity.as_bytes(), payload, &signature.bytes).is_ok()
    }
}
