//! Sigil Messaging: delivery of issued credentials to a recipient's
//! private inbox on a separate data network.
//!
//! Delivery is a side channel: callers treat every failure here as
//! non-fatal and never let it change an issued credential.

pub mod error;
pub mod gateway;
pub mod http;
pub mod record;

pub use error::MessagingError;
pub use gateway::{ConnectParams, Environment, MessagingGateway};
pub use http::HttpMessagingGateway;
pub use record::{CredentialRecord, CREDENTIAL_RECORD_SCHEMA};
