//! Fixtures shared by the cross-crate flows in `tests/`.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sigil_agent::{Agent, AgentConfig};
use sigil_credentials::{
    Credential, CredentialError, CredentialPayload, CredentialSigner, SigningOptions,
};
use sigil_identity::{DidProvider, IdentityError, ManagedIdentifier};
use sigil_messaging::{ConnectParams, CredentialRecord, MessagingError, MessagingGateway};

pub const TESTNET_ISSUER: &str = "did:cheqd:testnet:0c7a6c2e-5d1e-4f57-9b0a-3f1d2e4c5b6a";
pub const KEY_SUBJECT: &str = "did:key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK";
pub const VDA_SUBJECT: &str = "did:vda:testnet:0x6B2a1bE81ee770cbB4648801e343E135e8D2Aa6F";

/// Agent config with an in-memory ledger and no messaging.
pub fn offline_config() -> AgentConfig {
    let mut config = AgentConfig::default();
    config.issuer.identifier = TESTNET_ISSUER.into();
    config.offline();
    config
}

pub async fn offline_agent() -> Agent {
    match Agent::builder(offline_config()).build().await {
        Ok(agent) => agent,
        Err(e) => panic!("offline agent failed to build: {e}"),
    }
}

/// Gateway that serves `did:vda` recipients and fails every delivery.
#[derive(Default)]
pub struct FailingGateway {
    attempts: AtomicUsize,
}

impl FailingGateway {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessagingGateway for FailingGateway {
    async fn connect(&self, _params: ConnectParams) -> Result<(), MessagingError> {
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        true
    }

    fn serves(&self, did: &str) -> bool {
        did.starts_with("did:vda:")
    }

    async fn deliver(
        &self,
        recipient: &str,
        _subject: &str,
        _record: &CredentialRecord,
    ) -> Result<(), MessagingError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(MessagingError::Delivery {
            recipient: recipient.to_string(),
            reason: "inbox unreachable".into(),
        })
    }
}

/// Provider wrapper counting `create_identifier` calls.
pub struct CountingProvider {
    inner: Arc<dyn DidProvider>,
    creations: AtomicUsize,
}

impl CountingProvider {
    pub fn new(inner: Arc<dyn DidProvider>) -> Self {
        Self {
            inner,
            creations: AtomicUsize::new(0),
        }
    }

    pub fn creations(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DidProvider for CountingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn create_identifier(&self, alias: &str) -> Result<ManagedIdentifier, IdentityError> {
        self.creations.fetch_add(1, Ordering::SeqCst);
        // widen the race window
        tokio::task::yield_now().await;
        self.inner.create_identifier(alias).await
    }

    fn get_identifier(&self, did: &str) -> Option<ManagedIdentifier> {
        self.inner.get_identifier(did)
    }

    fn find_by_alias(&self, alias: &str) -> Option<ManagedIdentifier> {
        self.inner.find_by_alias(alias)
    }

    fn list_identifiers(&self) -> Vec<ManagedIdentifier> {
        self.inner.list_identifiers()
    }
}

/// Signer wrapper counting `sign_credential` calls.
pub struct CountingSigner {
    inner: Arc<dyn CredentialSigner>,
    calls: AtomicUsize,
}

impl CountingSigner {
    pub fn new(inner: Arc<dyn CredentialSigner>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialSigner for CountingSigner {
    async fn sign_credential(
        &self,
        payload: &CredentialPayload,
        signer: &ManagedIdentifier,
        options: &SigningOptions,
    ) -> Result<Credential, CredentialError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.sign_credential(payload, signer, options).await
    }
}
