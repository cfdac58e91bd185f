/// Core protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid DID format: {0}")]
    InvalidDid(String),

    #[error("unrecognized network namespace: {0}")]
    InvalidNetwork(String),

    #[error("missing required field: {0}")]
    MissingField(String),
}
