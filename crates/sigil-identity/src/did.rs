use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use sigil_core::{Did, Network};
use sigil_crypto::{KeyRef, KeyStore};

use crate::document::DidDocument;
use crate::error::IdentityError;
use crate::ledger::{document_signing_bytes, LedgerClient, SignInfo};

/// Fragment of the key every provider-created document starts with.
pub const PRIMARY_KEY_FRAGMENT: &str = "key-1";

/// A DID this process controls, together with the key that signs for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedIdentifier {
    pub did: Did,
    pub alias: String,
    /// Name of the provider that created the DID.
    pub provider: String,
    pub key_ref: KeyRef,
    /// Verification method id that signatures are made under.
    pub kid: String,
}

/// Creates and tracks DIDs for one DID method.
#[async_trait]
pub trait DidProvider: Send + Sync {
    /// Provider name, e.g. `did:cheqd:testnet`.
    fn name(&self) -> &str;

    /// Create a new DID with fresh key material and record it under `alias`.
    async fn create_identifier(&self, alias: &str) -> Result<ManagedIdentifier, IdentityError>;

    fn get_identifier(&self, did: &str) -> Option<ManagedIdentifier>;

    fn find_by_alias(&self, alias: &str) -> Option<ManagedIdentifier>;

    fn list_identifiers(&self) -> Vec<ManagedIdentifier>;
}

/// Provider for ledger-anchored `did:cheqd:<network>:<uuid>` identifiers.
///
/// Keys are generated inside the shared [`KeyStore`]; the document is
/// self-signed with the new key and published through the ledger client.
pub struct LedgerDidProvider {
    name: String,
    network: Network,
    keystore: Arc<KeyStore>,
    ledger: Arc<dyn LedgerClient>,
    identifiers: DashMap<String, ManagedIdentifier>,
}

impl LedgerDidProvider {
    pub const METHOD: &'static str = "cheqd";

    pub fn new(network: Network, keystore: Arc<KeyStore>, ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            name: format!("did:{}:{}", Self::METHOD, network),
            network,
            keystore,
            ledger,
            identifiers: DashMap::new(),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    async fn publish(&self, did: &Did, key_ref: &KeyRef) -> Result<String, IdentityError> {
        let public_key = self.keystore.public_key(key_ref)?;
        let document = DidDocument::with_ed25519_key(did.as_str(), PRIMARY_KEY_FRAGMENT, &public_key);
        let kid = format!("{}#{}", did, PRIMARY_KEY_FRAGMENT);

        let signature = self
            .keystore
            .sign(key_ref, &document_signing_bytes(&document)?)?;
        let sign_infos = [SignInfo {
            verification_method_id: kid.clone(),
            signature: signature.to_base64url(),
        }];

        self.ledger.create_did_doc(&document, &sign_infos).await?;
        Ok(kid)
    }
}

#[async_trait]
impl DidProvider for LedgerDidProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_identifier(&self, alias: &str) -> Result<ManagedIdentifier, IdentityError> {
        let did = Did::from_parts(
            Self::METHOD,
            Some(self.network.as_str()),
            &uuid::Uuid::new_v4().to_string(),
        );
        let key_ref = self.keystore.generate();

        let kid = match self.publish(&did, &key_ref).await {
            Ok(kid) => kid,
            Err(e) => {
                // the DID never made it to the ledger, so the key is useless
                self.keystore.delete(&key_ref);
                return Err(IdentityError::IdentityCreation(format!(
                    "publishing {} failed: {}",
                    did, e
                )));
            }
        };

        let identifier = ManagedIdentifier {
            did: did.clone(),
            alias: alias.to_string(),
            provider: self.name.clone(),
            key_ref,
            kid,
        };
        self.identifiers
            .insert(did.to_string(), identifier.clone());

        tracing::info!(did = %did, alias = alias, provider = %self.name, "DID created");
        Ok(identifier)
    }

    fn get_identifier(&self, did: &str) -> Option<ManagedIdentifier> {
        self.identifiers.get(did).map(|entry| entry.clone())
    }

    fn find_by_alias(&self, alias: &str) -> Option<ManagedIdentifier> {
        self.identifiers
            .iter()
            .find(|entry| entry.alias == alias)
            .map(|entry| entry.clone())
    }

    fn list_identifiers(&self) -> Vec<ManagedIdentifier> {
        self.identifiers.iter().map(|entry| entry.clone()).collect()
    }
}
