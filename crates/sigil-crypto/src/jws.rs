//! Compact JWS (`header.payload.signature`) encoding for EdDSA tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;
use crate::keys::PublicKey;
use crate::signing::{verify, Signature};

/// JOSE algorithm name for Ed25519 signatures.
pub const ALG_EDDSA: &str = "EdDSA";

/// Protected JWS header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsHeader {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl JwsHeader {
    /// EdDSA JWT header naming the verification method that signed it.
    pub fn eddsa_jwt(kid: Option<String>) -> Self {
        Self {
            alg: ALG_EDDSA.to_string(),
            typ: Some("JWT".to_string()),
            kid,
        }
    }
}

/// Build the `base64url(header).base64url(claims)` signing input.
pub fn signing_input(
    header: &JwsHeader,
    claims: &serde_json::Value,
) -> Result<String, CryptoError> {
    let header_json = serde_json::to_vec(header)
        .map_err(|e| CryptoError::InvalidInput(format!("header encoding: {}", e)))?;
    let claims_json = serde_json::to_vec(claims)
        .map_err(|e| CryptoError::InvalidInput(format!("claims encoding: {}", e)))?;
    Ok(format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(claims_json)
    ))
}

/// Append a signature to a signing input, producing the compact token.
pub fn attach_signature(signing_input: &str, signature: &Signature) -> String {
    format!("{}.{}", signing_input, signature.to_base64url())
}

/// A parsed, not yet verified, compact JWS.
#[derive(Debug, Clone)]
pub struct DecodedJws {
    pub header: JwsHeader,
    pub claims: serde_json::Map<String, serde_json::Value>,
    signing_input: String,
    signature: Signature,
}

impl DecodedJws {
    /// Parse a compact token. Fails on anything that is not three
    /// base64url segments holding a JSON header and a JSON object payload.
    pub fn parse(token: &str) -> Result<Self, CryptoError> {
        let token = token.trim();
        let mut segments = token.split('.');
        let (header_b64, claims_b64, sig_b64) =
            match (segments.next(), segments.next(), segments.next(), segments.next()) {
                (Some(h), Some(c), Some(s), None) if !h.is_empty() && !c.is_empty() => (h, c, s),
                _ => {
                    return Err(CryptoError::MalformedToken(
                        "expected three dot-separated segments".into(),
                    ))
                }
            };

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|e| CryptoError::MalformedToken(format!("header: {}", e)))?;
        let header: JwsHeader = serde_json::from_slice(&header_bytes)
            .map_err(|e| CryptoError::MalformedToken(format!("header: {}", e)))?;

        let claims_bytes = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|e| CryptoError::MalformedToken(format!("payload: {}", e)))?;
        let claims: serde_json::Map<String, serde_json::Value> =
            serde_json::from_slice(&claims_bytes)
                .map_err(|e| CryptoError::MalformedToken(format!("payload: {}", e)))?;

        let signature = Signature::from_base64url(sig_b64)
            .map_err(|e| CryptoError::MalformedToken(format!("signature: {}", e)))?;

        Ok(Self {
            header,
            claims,
            signing_input: format!("{}.{}", header_b64, claims_b64),
            signature,
        })
    }

    /// Verify the signature against a candidate public key.
    pub fn verify(&self, public_key: &PublicKey) -> Result<(), CryptoError> {
        if self.header.alg != ALG_EDDSA {
            return Err(CryptoError::UnsupportedAlgorithm(self.header.alg.clone()));
        }
        verify(self.signing_input.as_bytes(), &self.signature, public_key)
    }
}
