//! Sigil Agent: configuration and the composition root that wires key
//! storage, DID providers, resolvers, the issuer, the verifier and the
//! messaging gateway into one [`Agent`].

pub mod agent;
pub mod config;
pub mod error;

pub use agent::{Agent, AgentBuilder};
pub use config::{AgentConfig, ConfigError, LedgerMode};
pub use error::AgentError;
