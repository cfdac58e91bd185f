use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use sigil_core::Did;
use sigil_crypto::{CryptoError, DecodedJws};
use sigil_identity::DidResolutionRegistry;

use crate::error::CredentialError;
use crate::proof::{claim_timestamp, credential_from_claims};
use crate::types::{
    Credential, FailureCode, VerificationResult, VerifyInput, ENVELOPE_ALIASES, JWT_PROOF_TYPE,
};

/// Tolerated clock difference for `nbf`.
pub const DEFAULT_CLOCK_SKEW_SECS: i64 = 60;

/// Verifies JWT-secured credentials against the issuer's resolved DID
/// document.
pub struct CredentialVerifier {
    registry: Arc<DidResolutionRegistry>,
    clock_skew: Duration,
}

impl CredentialVerifier {
    pub fn new(registry: Arc<DidResolutionRegistry>) -> Self {
        Self {
            registry,
            clock_skew: Duration::seconds(DEFAULT_CLOCK_SKEW_SECS),
        }
    }

    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    pub fn registry(&self) -> &Arc<DidResolutionRegistry> {
        &self.registry
    }

    /// Verify a structured credential or a compact JWT.
    ///
    /// Input that cannot be a credential at all and issuers that cannot be
    /// resolved are errors. A credential that is well formed but does not
    /// check out comes back as `verified: false` with a failure code.
    pub async fn verify(
        &self,
        input: impl Into<VerifyInput>,
    ) -> Result<VerificationResult, CredentialError> {
        self.verify_at(input.into(), Utc::now()).await
    }

    async fn verify_at(
        &self,
        input: VerifyInput,
        now: DateTime<Utc>,
    ) -> Result<VerificationResult, CredentialError> {
        let (jwt, presented) = match input {
            VerifyInput::Jwt(jwt) => (jwt, None),
            VerifyInput::Credential(credential) => {
                if credential.proof.proof_type != JWT_PROOF_TYPE {
                    return Err(CredentialError::MalformedCredential(format!(
                        "unsupported proof type {}",
                        credential.proof.proof_type
                    )));
                }
                (credential.proof.jwt.clone(), Some(credential))
            }
        };
        if jwt.trim().is_empty() {
            return Err(CredentialError::MalformedCredential("empty proof.jwt".into()));
        }

        let decoded = DecodedJws::parse(&jwt)
            .map_err(|e| CredentialError::MalformedCredential(e.to_string()))?;
        let issuer = match decoded.claims.get("iss").and_then(|v| v.as_str()) {
            Some(iss) => iss.to_string(),
            None => {
                return Err(CredentialError::MalformedCredential(
                    "JWT has no iss claim".into(),
                ))
            }
        };
        Did::parse(issuer.as_str())
            .map_err(|e| CredentialError::MalformedCredential(format!("iss: {}", e)))?;
        let not_before = claim_timestamp(&decoded.claims, "nbf")?;
        let expires = claim_timestamp(&decoded.claims, "exp")?;

        let document = self
            .registry
            .resolve(&issuer)
            .await
            .map_err(|e| CredentialError::from_resolution(&issuer, e))?;

        let mut keys = document.assertion_keys();
        if keys.is_empty() {
            return Ok(VerificationResult::failed(
                issuer,
                FailureCode::NoUsableKey,
                "issuer DID document has no usable Ed25519 assertion key",
            ));
        }
        if let Some(kid) = decoded.header.kid.as_deref() {
            // the key the token names goes first
            keys.sort_by_key(|(id, _)| id.as_str() != kid);
        }

        let mut signature_ok = false;
        for (id, key) in &keys {
            match decoded.verify(key) {
                Ok(()) => {
                    tracing::debug!(issuer = %issuer, key = %id, "credential signature verified");
                    signature_ok = true;
                    break;
                }
                Err(CryptoError::UnsupportedAlgorithm(alg)) => {
                    return Ok(VerificationResult::failed(
                        issuer,
                        FailureCode::SignatureMismatch,
                        format!("unsupported JWS algorithm {}", alg),
                    ));
                }
                Err(_) => continue,
            }
        }
        if !signature_ok {
            return Ok(VerificationResult::failed(
                issuer,
                FailureCode::SignatureMismatch,
                "signature does not match any assertion key of the issuer",
            ));
        }

        if let Some(exp) = expires {
            if exp < now {
                return Ok(VerificationResult::failed(
                    issuer,
                    FailureCode::Expired,
                    format!("credential expired at {}", exp),
                ));
            }
        }
        if let Some(nbf) = not_before {
            if nbf > now + self.clock_skew {
                return Ok(VerificationResult::failed(
                    issuer,
                    FailureCode::NotYetValid,
                    format!("credential not valid before {}", nbf),
                ));
            }
        }

        if let Some(presented) = presented {
            if let Some(reason) = payload_mismatch(&presented, &decoded, &jwt) {
                return Ok(VerificationResult::failed(
                    issuer,
                    FailureCode::PayloadMismatch,
                    reason,
                ));
            }
        }

        tracing::debug!(issuer = %issuer, "credential verified");
        Ok(VerificationResult::verified(issuer))
    }
}

/// Compare a presented credential with what its JWT actually signs.
///
/// Every member except `proof` must match the credential rebuilt from the
/// verified claims. Envelope aliases a holder kept next to the credential
/// must equal the claims they copy. Returns the first member that differs.
fn payload_mismatch(presented: &Credential, decoded: &DecodedJws, jwt: &str) -> Option<String> {
    let signed = match credential_from_claims(&decoded.claims, jwt, true) {
        Ok(signed) => signed,
        Err(e) => return Some(format!("signed payload unreadable: {}", e)),
    };

    let differing = if presented.context != signed.context {
        Some("@context")
    } else if presented.types != signed.types {
        Some("type")
    } else if presented.issuer != signed.issuer {
        Some("issuer")
    } else if presented.issuance_date != signed.issuance_date {
        Some("issuanceDate")
    } else if presented.expiration_date != signed.expiration_date {
        Some("expirationDate")
    } else if presented.credential_subject != signed.credential_subject {
        Some("credentialSubject")
    } else if presented.credential_schema != signed.credential_schema {
        Some("credentialSchema")
    } else if presented.id != signed.id {
        Some("id")
    } else {
        None
    };
    if let Some(member) = differing {
        return Some(format!("{} differs from the signed credential", member));
    }

    for alias in ENVELOPE_ALIASES {
        if let Some(value) = presented.extensions.get(alias) {
            if decoded.claims.get(alias) != Some(value) {
                return Some(format!("{} differs from the signed claim", alias));
            }
        }
    }
    let extra = presented
        .extensions
        .iter()
        .filter(|(name, _)| !ENVELOPE_ALIASES.contains(&name.as_str()))
        .find(|(name, value)| signed.extensions.get(name.as_str()) != Some(*value));
    if let Some((name, _)) = extra {
        return Some(format!("{} is not part of the signed credential", name));
    }
    let dropped = signed
        .extensions
        .keys()
        .find(|name| !presented.extensions.contains_key(name.as_str()));
    if let Some(name) = dropped {
        return Some(format!("{} is missing from the presented credential", name));
    }
    None
}
