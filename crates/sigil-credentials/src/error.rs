use sigil_identity::IdentityError;

/// Errors at the credential boundary.
///
/// Verification outcomes such as a signature mismatch are not errors; they
/// come back as data in [`crate::VerificationResult`].
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("invalid credential request: {0}")]
    InvalidRequest(String),

    #[error("invalid network namespace: {0}")]
    InvalidNetwork(String),

    #[error("issuer identity creation failed: {0}")]
    IdentityCreation(String),

    #[error("unsupported DID method: {0}")]
    UnsupportedMethod(String),

    #[error("issuer DID cannot be resolved: {0}")]
    UnresolvableIssuer(String),

    #[error("DID resolution failed for {did}: {reason}")]
    ResolutionNetwork { did: String, reason: String },

    #[error("DID resolution timed out: {did}")]
    ResolutionTimeout { did: String },

    #[error("malformed credential: {0}")]
    MalformedCredential(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

impl CredentialError {
    /// Map a failure to resolve an issuer DID during verification. Anything
    /// other than a transport problem means the issuer is unresolvable.
    pub fn from_resolution(did: &str, err: IdentityError) -> Self {
        match err {
            IdentityError::ResolutionTimeout { did } => Self::ResolutionTimeout { did },
            IdentityError::ResolutionNetwork { did, reason } => {
                Self::ResolutionNetwork { did, reason }
            }
            other => Self::UnresolvableIssuer(format!("{}: {}", did, other)),
        }
    }
}

impl From<IdentityError> for CredentialError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::IdentityCreation(msg) => Self::IdentityCreation(msg),
            IdentityError::UnsupportedMethod(method) => Self::UnsupportedMethod(method),
            IdentityError::ResolutionTimeout { did } => Self::ResolutionTimeout { did },
            IdentityError::ResolutionNetwork { did, reason } => {
                Self::ResolutionNetwork { did, reason }
            }
            IdentityError::DidNotFound(did) => Self::UnresolvableIssuer(did),
            IdentityError::Crypto(e) => Self::Signing(e.to_string()),
            other => Self::IdentityCreation(other.to_string()),
        }
    }
}

impl From<sigil_core::CoreError> for CredentialError {
    fn from(err: sigil_core::CoreError) -> Self {
        match err {
            sigil_core::CoreError::InvalidNetwork(ns) => Self::InvalidNetwork(ns),
            other => Self::InvalidRequest(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_mapping() {
        let err = CredentialError::from_resolution(
            "did:nope:1",
            IdentityError::UnsupportedMethod("nope".into()),
        );
        assert!(matches!(err, CredentialError::UnresolvableIssuer(_)));

        let err = CredentialError::from_resolution(
            "did:web:x",
            IdentityError::ResolutionTimeout { did: "did:web:x".into() },
        );
        assert!(matches!(err, CredentialError::ResolutionTimeout { .. }));
    }

    #[test]
    fn test_identity_mapping() {
        let err: CredentialError = IdentityError::IdentityCreation("ledger down".into()).into();
        assert!(matches!(err, CredentialError::IdentityCreation(m) if m == "ledger down"));

        let err: CredentialError =
            sigil_core::CoreError::InvalidNetwork("bogusnet".into()).into();
        assert!(matches!(err, CredentialError::InvalidNetwork(ns) if ns == "bogusnet"));
    }
}
