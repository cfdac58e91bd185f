use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use url::Url;
use zeroize::Zeroize;

use sigil_core::Did;
use sigil_crypto::{hash, sign, KeyPair};

use crate::error::MessagingError;
use crate::gateway::{ConnectParams, MessagingGateway};
use crate::record::CredentialRecord;

/// DID method of recipients this gateway can reach.
pub const MESSAGING_DID_METHOD: &str = "vda";
/// Recipient context holding a DID's private inbox.
pub const RECIPIENT_CONTEXT: &str = "Verida: Vault";
/// Message type for data sent into an inbox.
pub const DATA_SEND_MESSAGE_TYPE: &str = "inbox/type/dataSend";

#[derive(Debug, Clone)]
struct Session {
    token: String,
    account_did: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionClaims<'a> {
    context: &'a str,
    did: &'a str,
    chain_address: &'a str,
    environment: &'a str,
    timestamp: i64,
}

#[derive(Serialize)]
struct SessionRequest<'a> {
    #[serde(flatten)]
    claims: SessionClaims<'a>,
    signature: String,
}

#[derive(Deserialize)]
struct SessionResponse {
    token: String,
}

#[derive(Serialize)]
struct MessageData<'a> {
    data: [&'a CredentialRecord; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutboundMessage<'a> {
    recipient_did: &'a str,
    recipient_context_name: &'a str,
    #[serde(rename = "type")]
    message_type: &'a str,
    subject: &'a str,
    data: MessageData<'a>,
}

/// Messaging gateway speaking the node's HTTP API.
///
/// `connect` derives the account from its key, opens a signed session and
/// keeps the bearer token; `deliver` posts inbox messages with it.
pub struct HttpMessagingGateway {
    http: reqwest::Client,
    endpoint: Url,
    session: RwLock<Option<Session>>,
    connect_guard: Mutex<()>,
}

impl HttpMessagingGateway {
    pub fn new(mut endpoint: Url, timeout: Duration) -> Result<Self, MessagingError> {
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MessagingError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self {
            http,
            endpoint,
            session: RwLock::new(None),
            connect_guard: Mutex::new(()),
        })
    }

    /// DID of the connected sender account.
    pub async fn account_did(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.account_did.clone())
    }

    fn url(&self, path: &str) -> Result<Url, MessagingError> {
        self.endpoint
            .join(path)
            .map_err(|e| MessagingError::Session(format!("bad endpoint {}: {}", self.endpoint, e)))
    }
}

/// Chain address for a chain key: `0x` + last 20 bytes of the BLAKE3 hash
/// of its public key.
fn chain_address(chain_key: &KeyPair) -> String {
    let digest = hash(chain_key.public_key().as_bytes());
    format!("0x{}", hex::encode(&digest[12..]))
}

#[async_trait]
impl MessagingGateway for HttpMessagingGateway {
    async fn connect(&self, mut params: ConnectParams) -> Result<(), MessagingError> {
        let _guard = self.connect_guard.lock().await;
        if self.session.read().await.is_some() {
            tracing::debug!("messaging gateway already connected");
            return Ok(());
        }

        let account = KeyPair::from_secret_material(&params.account_key)
            .map_err(|e| MessagingError::InvalidKey(e.to_string()))?;
        let chain = KeyPair::from_secret_material(&params.chain_key)
            .map_err(|e| MessagingError::InvalidKey(format!("chain key: {}", e)))?;
        params.account_key.zeroize();
        params.chain_key.zeroize();

        let account_did = format!(
            "did:{}:{}:{}",
            MESSAGING_DID_METHOD,
            params.environment,
            account.public_key().to_bs58()
        );
        let chain_address = chain_address(&chain);
        let claims = SessionClaims {
            context: &params.app_context,
            did: &account_did,
            chain_address: &chain_address,
            environment: params.environment.as_str(),
            timestamp: chrono::Utc::now().timestamp(),
        };
        let claims_bytes = serde_json::to_vec(&claims)
            .map_err(|e| MessagingError::Session(format!("encoding session claims: {}", e)))?;
        let request = SessionRequest {
            signature: sign(&claims_bytes, &account).to_base64url(),
            claims,
        };

        let url = self.url("auth/session")?;
        let response = self
            .http
            .post(url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| MessagingError::Http {
                endpoint: url.to_string(),
                source: e,
            })?;
        if !response.status().is_success() {
            return Err(MessagingError::Session(format!(
                "{} returned HTTP {}",
                url,
                response.status()
            )));
        }
        let body: SessionResponse = response
            .json()
            .await
            .map_err(|e| MessagingError::Session(format!("session response: {}", e)))?;

        tracing::info!(
            account = %account_did,
            context = %params.app_context,
            environment = %params.environment,
            "messaging session established"
        );
        *self.session.write().await = Some(Session {
            token: body.token,
            account_did,
        });
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.session.read().await.is_some()
    }

    fn serves(&self, did: &str) -> bool {
        Did::parse(did)
            .map(|d| d.method() == MESSAGING_DID_METHOD)
            .unwrap_or(false)
    }

    async fn deliver(
        &self,
        recipient: &str,
        subject: &str,
        record: &CredentialRecord,
    ) -> Result<(), MessagingError> {
        let session = self
            .session
            .read()
            .await
            .clone()
            .ok_or(MessagingError::NotConnected)?;

        let message = OutboundMessage {
            recipient_did: recipient,
            recipient_context_name: RECIPIENT_CONTEXT,
            message_type: DATA_SEND_MESSAGE_TYPE,
            subject,
            data: MessageData { data: [record] },
        };

        let url = self.url("messages")?;
        let response = self
            .http
            .post(url.clone())
            .bearer_auth(&session.token)
            .json(&message)
            .send()
            .await
            .map_err(|e| MessagingError::Http {
                endpoint: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(MessagingError::Delivery {
                recipient: recipient.to_string(),
                reason: format!("HTTP {}: {}", status, detail),
            });
        }

        tracing::info!(
            recipient = recipient,
            sender = %session.account_did,
            record = %record.name,
            "credential delivered to inbox"
        );
        Ok(())
    }
}
