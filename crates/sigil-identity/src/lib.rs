//! Sigil Identity: DID documents, DID creation and resolution, issuer identities.
//!
//! Provides:
//! - W3C DID Document model with Ed25519 verification methods
//! - `LedgerDidProvider` creating ledger-anchored `did:cheqd` identifiers
//! - `DidResolutionRegistry` dispatching resolution by DID method
//! - `did:key`, `did:web`, universal-resolver and ledger resolvers
//! - `IdentityResolver` for single-flight create-or-get of issuer DIDs

pub mod did;
pub mod did_resolver;
pub mod document;
pub mod error;
pub mod identity;
pub mod key_resolver;
pub mod ledger;
pub mod universal_resolver;
pub mod web_resolver;

pub use did::{DidProvider, LedgerDidProvider, ManagedIdentifier};
pub use did_resolver::{DidResolutionRegistry, DidResolver};
pub use document::{DidDocument, Service, VerificationMethod, VerificationRelationship};
pub use error::IdentityError;
pub use identity::IdentityResolver;
pub use key_resolver::{did_key_from_public_key, KeyDidResolver};
pub use ledger::{HttpLedgerClient, InMemoryLedger, LedgerClient, LedgerDidResolver, SignInfo};
pub use universal_resolver::UniversalResolver;
pub use web_resolver::WebDidResolver;
