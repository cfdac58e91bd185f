//! Sigil Credentials: W3C Verifiable Credential issuance and verification
//! over JWT proofs, bound to DIDs.

pub mod error;
pub mod issuer;
pub mod proof;
pub mod types;
pub mod verifier;

pub use error::CredentialError;
pub use issuer::{CredentialIssuer, IssuerSettings};
pub use proof::{credential_from_jwt, CredentialSigner, JwtCredentialSigner, ProofFormat, SigningOptions};
pub use types::{
    Credential, CredentialPayload, CredentialRequest, CredentialSubject, DeliveryStatus,
    FailureCode, IssuanceOutcome, Issuer, Proof, VerificationFailure, VerificationResult,
    VerifyInput,
};
pub use verifier::CredentialVerifier;
