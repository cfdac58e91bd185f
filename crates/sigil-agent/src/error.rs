use crate::config::ConfigError;

/// Failures while building the agent from configuration.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("identity setup failed: {0}")]
    Identity(#[from] sigil_identity::IdentityError),

    #[error("messaging setup failed: {0}")]
    Messaging(#[from] sigil_messaging::MessagingError),

    #[error("key error: {0}")]
    Crypto(#[from] sigil_crypto::CryptoError),
}
