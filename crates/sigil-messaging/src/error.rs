/// Messaging-layer errors. None of these escape the issuance boundary.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("messaging gateway is not connected")]
    NotConnected,

    #[error("session setup failed: {0}")]
    Session(String),

    #[error("delivery to {recipient} failed: {reason}")]
    Delivery { recipient: String, reason: String },

    #[error("HTTP request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid account key: {0}")]
    InvalidKey(String),

    #[error("unknown messaging environment: {0}")]
    UnknownEnvironment(String),
}
