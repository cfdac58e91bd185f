/// Identity-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("DID not found: {0}")]
    DidNotFound(String),

    #[error("invalid DID format: {0}")]
    InvalidDid(String),

    #[error("no resolver registered for DID method: {0}")]
    UnsupportedMethod(String),

    #[error("DID resolution timed out: {did}")]
    ResolutionTimeout { did: String },

    #[error("DID resolution failed for {did}: {reason}")]
    ResolutionNetwork { did: String, reason: String },

    #[error("invalid DID document: {0}")]
    InvalidDocument(String),

    #[error("identity creation failed: {0}")]
    IdentityCreation(String),

    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] sigil_crypto::CryptoError),

    #[error("core error: {0}")]
    Core(#[from] sigil_core::CoreError),
}

impl IdentityError {
    /// Map a reqwest transport failure onto the resolution error kinds.
    pub(crate) fn transport(did: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::ResolutionTimeout {
                did: did.to_string(),
            }
        } else {
            Self::ResolutionNetwork {
                did: did.to_string(),
                reason: err.to_string(),
            }
        }
    }
}
