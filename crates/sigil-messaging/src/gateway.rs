use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MessagingError;
use crate::record::CredentialRecord;

/// Messaging network deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Testnet => "testnet",
            Self::Mainnet => "mainnet",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = MessagingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "testnet" => Ok(Self::Testnet),
            "mainnet" => Ok(Self::Mainnet),
            other => Err(MessagingError::UnknownEnvironment(other.to_string())),
        }
    }
}

/// Session parameters for [`MessagingGateway::connect`].
///
/// `Debug` redacts both keys.
#[derive(Clone)]
pub struct ConnectParams {
    pub environment: Environment,
    /// Application context name the sender writes from.
    pub app_context: String,
    /// Secret material of the messaging account (hex seed or passphrase).
    pub account_key: String,
    /// Secret material of the account's chain key.
    pub chain_key: String,
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("environment", &self.environment)
            .field("app_context", &self.app_context)
            .field("account_key", &"[REDACTED]")
            .field("chain_key", &"[REDACTED]")
            .finish()
    }
}

/// Best-effort inbox delivery on a data network separate from the ledger.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Establish an authenticated session. Meant to run once per process.
    async fn connect(&self, params: ConnectParams) -> Result<(), MessagingError>;

    async fn is_connected(&self) -> bool;

    /// Whether recipients identified by `did` live on this network.
    fn serves(&self, did: &str) -> bool;

    /// Send a credential record to the recipient's inbox.
    async fn deliver(
        &self,
        recipient: &str,
        subject: &str,
        record: &CredentialRecord,
    ) -> Result<(), MessagingError>;
}
