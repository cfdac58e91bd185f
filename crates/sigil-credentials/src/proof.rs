//! JWT proofs for credentials.
//!
//! The signed token carries the credential in its `vc` claim with the
//! envelope members moved to registered claims: `iss` (issuer), `sub`
//! (subject id), `nbf` (issuance date), `exp` (expiration date) and `jti`
//! (credential id).

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;

use sigil_crypto::jws::{attach_signature, signing_input};
use sigil_crypto::{DecodedJws, JwsHeader, KeyStore};
use sigil_identity::ManagedIdentifier;

use crate::error::CredentialError;
use crate::types::{Credential, CredentialPayload, CredentialSubject, Issuer, Proof};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofFormat {
    Jwt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningOptions {
    pub proof_format: ProofFormat,
    /// Leave members that are carried as registered claims out of the `vc`
    /// claim, and out of the normalized credential.
    pub remove_original_fields: bool,
}

impl Default for SigningOptions {
    fn default() -> Self {
        Self {
            proof_format: ProofFormat::Jwt,
            remove_original_fields: true,
        }
    }
}

/// Signing capability of the agent: turns an unsigned payload into a
/// credential under the key of `signer`.
#[async_trait]
pub trait CredentialSigner: Send + Sync {
    async fn sign_credential(
        &self,
        payload: &CredentialPayload,
        signer: &ManagedIdentifier,
        options: &SigningOptions,
    ) -> Result<Credential, CredentialError>;
}

/// Signs credentials as EdDSA JWTs with keys held in a [`KeyStore`].
pub struct JwtCredentialSigner {
    keystore: Arc<KeyStore>,
}

impl JwtCredentialSigner {
    pub fn new(keystore: Arc<KeyStore>) -> Self {
        Self { keystore }
    }
}

fn to_object<T: serde::Serialize>(value: &T, what: &str) -> Result<Map<String, Value>, CredentialError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CredentialError::Signing(format!("{} is not a JSON object", what))),
        Err(e) => Err(CredentialError::Signing(format!("encoding {}: {}", what, e))),
    }
}

/// Claim set for a payload.
fn jwt_claims(
    payload: &CredentialPayload,
    remove_original_fields: bool,
) -> Result<Value, CredentialError> {
    let mut vc = to_object(payload, "credential payload")?;
    if remove_original_fields {
        for member in ["issuer", "issuanceDate", "expirationDate", "id"] {
            vc.remove(member);
        }
        if let Some(Value::Object(subject)) = vc.get_mut("credentialSubject") {
            subject.remove("id");
        }
    }

    let mut claims = Map::new();
    claims.insert("vc".into(), Value::Object(vc));
    if let Some(sub) = &payload.credential_subject.id {
        claims.insert("sub".into(), Value::String(sub.clone()));
    }
    claims.insert("iss".into(), Value::String(payload.issuer.id.clone()));
    claims.insert("nbf".into(), Value::from(payload.issuance_date.timestamp()));
    if let Some(exp) = payload.expiration_date {
        claims.insert("exp".into(), Value::from(exp.timestamp()));
    }
    if let Some(id) = &payload.id {
        claims.insert("jti".into(), Value::String(id.clone()));
    }
    Ok(Value::Object(claims))
}

#[async_trait]
impl CredentialSigner for JwtCredentialSigner {
    async fn sign_credential(
        &self,
        payload: &CredentialPayload,
        signer: &ManagedIdentifier,
        options: &SigningOptions,
    ) -> Result<Credential, CredentialError> {
        if payload.issuer.id != signer.did.as_str() {
            return Err(CredentialError::Signing(format!(
                "payload issuer {} is not the signing identity {}",
                payload.issuer.id, signer.did
            )));
        }

        let claims = match options.proof_format {
            ProofFormat::Jwt => jwt_claims(payload, options.remove_original_fields)?,
        };
        let header = JwsHeader::eddsa_jwt(Some(signer.kid.clone()));
        let input = signing_input(&header, &claims)
            .map_err(|e| CredentialError::Signing(e.to_string()))?;
        let signature = self
            .keystore
            .sign(&signer.key_ref, input.as_bytes())
            .map_err(|e| CredentialError::Signing(e.to_string()))?;
        let jwt = attach_signature(&input, &signature);

        tracing::debug!(issuer = %signer.did, kid = %signer.kid, "credential JWT signed");
        credential_from_jwt(&jwt, options.remove_original_fields)
    }
}

fn claim_str<'a>(claims: &'a Map<String, Value>, name: &str) -> Result<Option<&'a str>, CredentialError> {
    match claims.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(CredentialError::MalformedCredential(format!(
            "claim {} must be a string, got {}",
            name, other
        ))),
    }
}

pub(crate) fn claim_timestamp(
    claims: &Map<String, Value>,
    name: &str,
) -> Result<Option<DateTime<Utc>>, CredentialError> {
    match claims.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .map(Some)
            .ok_or_else(|| {
                CredentialError::MalformedCredential(format!(
                    "claim {} must be a NumericDate, got {}",
                    name, value
                ))
            }),
    }
}

fn take_string_list(vc: &mut Map<String, Value>, member: &str) -> Result<Vec<String>, CredentialError> {
    match vc.remove(member) {
        None => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s]),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(CredentialError::MalformedCredential(format!(
                    "{} entries must be strings, got {}",
                    member, other
                ))),
            })
            .collect(),
        Some(other) => Err(CredentialError::MalformedCredential(format!(
            "{} must be a string or a list, got {}",
            member, other
        ))),
    }
}

/// Rebuild the W3C credential carried by a compact JWT.
///
/// With `remove_original_fields == false` the JWT envelope members (`vc`,
/// `sub`, `iss`, `nbf`, `exp`) are kept next to the credential members.
pub fn credential_from_jwt(
    jwt: &str,
    remove_original_fields: bool,
) -> Result<Credential, CredentialError> {
    let decoded =
        DecodedJws::parse(jwt).map_err(|e| CredentialError::MalformedCredential(e.to_string()))?;
    credential_from_claims(&decoded.claims, jwt, remove_original_fields)
}

pub(crate) fn credential_from_claims(
    claims: &Map<String, Value>,
    jwt: &str,
    remove_original_fields: bool,
) -> Result<Credential, CredentialError> {
    let mut vc = match claims.get("vc") {
        Some(Value::Object(vc)) => vc.clone(),
        _ => {
            return Err(CredentialError::MalformedCredential(
                "JWT has no vc claim".into(),
            ))
        }
    };

    let iss = claim_str(claims, "iss")?
        .ok_or_else(|| CredentialError::MalformedCredential("JWT has no iss claim".into()))?;
    let issuance_date = match claim_timestamp(claims, "nbf")? {
        Some(nbf) => nbf,
        None => vc
            .get("issuanceDate")
            .and_then(Value::as_str)
            .and_then(|s| crate::types::iso8601::parse(s).ok())
            .ok_or_else(|| {
                CredentialError::MalformedCredential("no nbf claim or issuanceDate".into())
            })?,
    };
    let expiration_date = match claim_timestamp(claims, "exp")? {
        Some(exp) => Some(exp),
        None => vc
            .get("expirationDate")
            .and_then(Value::as_str)
            .and_then(|s| crate::types::iso8601::parse(s).ok()),
    };

    let context = take_string_list(&mut vc, "@context")?;
    let types = take_string_list(&mut vc, "type")?;
    let mut credential_subject: CredentialSubject = match vc.remove("credentialSubject") {
        Some(subject) => serde_json::from_value(subject)
            .map_err(|e| CredentialError::MalformedCredential(format!("credentialSubject: {}", e)))?,
        None => CredentialSubject::default(),
    };
    if let Some(sub) = claim_str(claims, "sub")? {
        credential_subject.id = Some(sub.to_string());
    }
    let credential_schema = vc.remove("credentialSchema");
    let id = claim_str(claims, "jti")?
        .map(str::to_string)
        .or_else(|| vc.get("id").and_then(Value::as_str).map(str::to_string));

    // issuer metadata beyond the id survives only when it was left in vc
    let issuer = match vc.remove("issuer") {
        Some(Value::Object(mut obj)) => {
            obj.remove("id");
            Issuer {
                id: iss.to_string(),
                extra: obj,
            }
        }
        _ => Issuer::new(iss),
    };
    for member in ["issuanceDate", "expirationDate", "id", "proof"] {
        vc.remove(member);
    }

    let mut extensions = vc;
    if !remove_original_fields {
        for alias in crate::types::ENVELOPE_ALIASES {
            if let Some(value) = claims.get(alias) {
                extensions.insert(alias.to_string(), value.clone());
            }
        }
    }

    Ok(Credential {
        context,
        types,
        issuer,
        issuance_date,
        expiration_date,
        credential_subject,
        credential_schema,
        id,
        proof: Proof::jwt(jwt),
        extensions,
    })
}
