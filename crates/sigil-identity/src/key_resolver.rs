use async_trait::async_trait;

use sigil_core::Did;
use sigil_crypto::{CryptoError, PublicKey};

use crate::did_resolver::DidResolver;
use crate::document::DidDocument;
use crate::error::IdentityError;

/// Resolves `did:key` identifiers for Ed25519 keys. Works offline: the
/// document is derived from the identifier itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyDidResolver;

impl KeyDidResolver {
    pub fn new() -> Self {
        Self
    }
}

/// `did:key` identifier for an Ed25519 public key.
pub fn did_key_from_public_key(public_key: &PublicKey) -> Did {
    Did::from_parts("key", None, &public_key.to_multibase())
}

#[async_trait]
impl DidResolver for KeyDidResolver {
    async fn resolve(&self, did: &Did) -> Result<DidDocument, IdentityError> {
        if did.method() != "key" {
            return Err(IdentityError::UnsupportedMethod(did.method().to_string()));
        }
        let multibase = did.method_specific_id();
        if !multibase.starts_with("z6Mk") {
            return Err(IdentityError::InvalidDid(format!(
                "only Ed25519 did:key identifiers are supported: {}",
                did
            )));
        }
        let public_key = PublicKey::from_multibase(multibase).map_err(|e| match e {
            CryptoError::UnsupportedAlgorithm(codec) => IdentityError::InvalidDid(codec),
            other => IdentityError::InvalidDid(other.to_string()),
        })?;
        Ok(DidDocument::with_ed25519_key(did.as_str(), multibase, &public_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigil_crypto::KeyPair;

    #[tokio::test]
    async fn test_resolve_generated_did_key() {
        let pk = KeyPair::from_seed(&[5u8; 32]).public_key();
        let did = did_key_from_public_key(&pk);
        assert!(did.as_str().starts_with("did:key:z6Mk"));

        let doc = KeyDidResolver::new().resolve(&did).await.unwrap();
        assert_eq!(doc.id, did.as_str());
        let keys = doc.assertion_keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].0, format!("{}#{}", did, did.method_specific_id()));
        assert_eq!(keys[0].1, pk);
    }

    #[tokio::test]
    async fn test_rejects_non_ed25519() {
        let did = Did::parse("did:key:zQ3shokFTS3brHcDQrn82RUDfCZESWL1ZdCEJwekUDPQiYBme").unwrap();
        assert!(matches!(
            KeyDidResolver::new().resolve(&did).await,
            Err(IdentityError::InvalidDid(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_garbage() {
        let did = Did::parse("did:key:z6Mk000").unwrap();
        assert!(KeyDidResolver::new().resolve(&did).await.is_err());
    }
}
