use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CryptoError;
use crate::keys::{KeyPair, PublicKey};
use crate::signing::{sign, Signature};

/// Opaque handle to a private key held by a [`KeyStore`].
///
/// The handle is the hex encoding of the public key, so it is safe to log
/// and to store next to a DID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyRef(String);

impl KeyRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// In-memory key management: holds Ed25519 private keys and signs with them.
///
/// Private keys never leave the store. Nothing is persisted; a process
/// restart loses every key.
pub struct KeyStore {
    keys: DashMap<KeyRef, KeyPair>,
}

impl KeyStore {
    /// Create an empty key store.
    pub fn new() -> Self {
        Self {
            keys: DashMap::new(),
        }
    }

    /// Generate a fresh key and return its handle.
    pub fn generate(&self) -> KeyRef {
        self.import(KeyPair::generate())
    }

    /// Take ownership of an existing key pair.
    pub fn import(&self, keypair: KeyPair) -> KeyRef {
        let key_ref = KeyRef(keypair.public_key().to_hex());
        self.keys.insert(key_ref.clone(), keypair);
        tracing::debug!(key_ref = %key_ref, "key imported");
        key_ref
    }

    /// Public half of a stored key.
    pub fn public_key(&self, key_ref: &KeyRef) -> Result<PublicKey, CryptoError> {
        self.keys
            .get(key_ref)
            .map(|kp| kp.public_key())
            .ok_or_else(|| CryptoError::KeyNotFound(key_ref.to_string()))
    }

    /// Sign a message with a stored key.
    pub fn sign(&self, key_ref: &KeyRef, message: &[u8]) -> Result<Signature, CryptoError> {
        let kp = self
            .keys
            .get(key_ref)
            .ok_or_else(|| CryptoError::KeyNotFound(key_ref.to_string()))?;
        Ok(sign(message, &kp))
    }

    /// Drop a key. Returns whether it existed.
    pub fn delete(&self, key_ref: &KeyRef) -> bool {
        self.keys.remove(key_ref).is_some()
    }

    pub fn contains(&self, key_ref: &KeyRef) -> bool {
        self.keys.contains_key(key_ref)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore")
            .field("keys", &self.keys.len())
            .finish()
    }
}
