//! Ledger access for chain-anchored DIDs.
//!
//! Anchoring mechanics (transaction building, fees, consensus) belong to the
//! ledger node; this module only speaks its JSON-RPC surface to publish and
//! fetch DID documents.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use sigil_core::Did;
use sigil_crypto::{sign, verify, KeyPair, Signature};

use crate::did_resolver::DidResolver;
use crate::document::DidDocument;
use crate::error::IdentityError;

/// Controller signature authorizing a DID document write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInfo {
    pub verification_method_id: String,
    /// Unpadded base64url Ed25519 signature over [`document_signing_bytes`].
    pub signature: String,
}

/// Canonical bytes a controller signs when publishing a document.
pub fn document_signing_bytes(document: &DidDocument) -> Result<Vec<u8>, IdentityError> {
    serde_json::to_vec(document).map_err(|e| IdentityError::InvalidDocument(e.to_string()))
}

/// Read/write access to DID documents anchored on a ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Publish a new DID document, authorized by its controller signatures.
    async fn create_did_doc(
        &self,
        document: &DidDocument,
        sign_infos: &[SignInfo],
    ) -> Result<(), IdentityError>;

    /// Fetch the current document for a DID, `None` if it was never written.
    async fn resolve_did_doc(&self, did: &str) -> Result<Option<DidDocument>, IdentityError>;
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// JSON-RPC ledger client. Writes are co-signed by the fee payer key.
pub struct HttpLedgerClient {
    http: reqwest::Client,
    rpc_url: Url,
    payer: KeyPair,
    next_id: AtomicU64,
}

impl HttpLedgerClient {
    pub fn new(rpc_url: Url, payer: KeyPair, timeout: Duration) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityError::Ledger(format!("client init: {}", e)))?;
        Ok(Self {
            http,
            rpc_url,
            payer,
            next_id: AtomicU64::new(1),
        })
    }

    /// Multibase public key identifying the fee payer account.
    pub fn payer_address(&self) -> String {
        self.payer.public_key().to_multibase()
    }

    async fn call<T: DeserializeOwned>(
        &self,
        subject: &str,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<T>, IdentityError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .http
            .post(self.rpc_url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| IdentityError::transport(subject, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::ResolutionNetwork {
                did: subject.to_string(),
                reason: format!("ledger RPC returned HTTP {}", status),
            });
        }

        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| IdentityError::Ledger(format!("{} response: {}", method, e)))?;

        if let Some(err) = body.error {
            return Err(IdentityError::Ledger(format!(
                "{} failed ({}): {}",
                method, err.code, err.message
            )));
        }
        Ok(body.result)
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn create_did_doc(
        &self,
        document: &DidDocument,
        sign_infos: &[SignInfo],
    ) -> Result<(), IdentityError> {
        let bytes = document_signing_bytes(document)?;
        let payer_sig = sign(&bytes, &self.payer);
        let params = serde_json::json!({
            "didDocument": document,
            "signInfos": sign_infos,
            "feePayer": {
                "address": self.payer_address(),
                "signature": payer_sig.to_base64url(),
            },
        });

        let _: Option<serde_json::Value> =
            self.call(&document.id, "did_createDidDoc", params).await?;
        tracing::info!(did = %document.id, "DID document published to ledger");
        Ok(())
    }

    async fn resolve_did_doc(&self, did: &str) -> Result<Option<DidDocument>, IdentityError> {
        self.call(did, "did_resolveDidDoc", serde_json::json!({ "did": did }))
            .await
    }
}

/// Ledger kept in process memory. Used for offline runs and tests; it
/// enforces that every write is signed by a key the document declares.
pub struct InMemoryLedger {
    documents: DashMap<String, DidDocument>,
    available: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
            available: AtomicBool::new(true),
            writes: AtomicUsize::new(0),
        }
    }

    /// Simulate the ledger becoming (un)reachable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of successful document writes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn check_available(&self, did: &str) -> Result<(), IdentityError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(IdentityError::ResolutionNetwork {
                did: did.to_string(),
                reason: "ledger unreachable".into(),
            })
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn create_did_doc(
        &self,
        document: &DidDocument,
        sign_infos: &[SignInfo],
    ) -> Result<(), IdentityError> {
        self.check_available(&document.id)?;
        if sign_infos.is_empty() {
            return Err(IdentityError::Ledger("document write without signatures".into()));
        }

        let bytes = document_signing_bytes(document)?;
        for info in sign_infos {
            let vm = document
                .find_verification_method(&info.verification_method_id)
                .ok_or_else(|| {
                    IdentityError::Ledger(format!(
                        "unknown signer {}",
                        info.verification_method_id
                    ))
                })?;
            let key = vm.ed25519_public_key()?.ok_or_else(|| {
                IdentityError::Ledger(format!("signer {} has no Ed25519 key", vm.id))
            })?;
            let signature = Signature::from_base64url(&info.signature)?;
            verify(&bytes, &signature, &key)
                .map_err(|_| IdentityError::Ledger(format!("bad signature from {}", vm.id)))?;
        }

        match self.documents.entry(document.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(IdentityError::Ledger(format!(
                "DID already anchored: {}",
                document.id
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(document.clone());
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    async fn resolve_did_doc(&self, did: &str) -> Result<Option<DidDocument>, IdentityError> {
        self.check_available(did)?;
        Ok(self.documents.get(did).map(|doc| doc.clone()))
    }
}

/// Resolver for chain-anchored DIDs, reading documents through a ledger client.
pub struct LedgerDidResolver {
    ledger: Arc<dyn LedgerClient>,
}

impl LedgerDidResolver {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl DidResolver for LedgerDidResolver {
    async fn resolve(&self, did: &Did) -> Result<DidDocument, IdentityError> {
        self.ledger
            .resolve_did_doc(did.as_str())
            .await?
            .ok_or_else(|| IdentityError::DidNotFound(did.to_string()))
    }
}
