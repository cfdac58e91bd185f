use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::CredentialError;

/// Context every credential carries, always last in `@context`.
pub const BASE_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";
/// Type every credential carries, always last in `type`.
pub const BASE_TYPE: &str = "VerifiableCredential";
/// Proof type of a credential secured by a compact JWT.
pub const JWT_PROOF_TYPE: &str = "JwtProof2020";
/// JWT registered claims that must never appear on a returned credential.
pub const ENVELOPE_ALIASES: [&str; 5] = ["vc", "sub", "iss", "nbf", "exp"];

/// ISO-8601 timestamps with second precision in UTC (`2024-05-01T12:00:00Z`).
pub(crate) mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn parse(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(value).map(|ts| ts.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            ts: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => s.serialize_str(&format(ts)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<String>::deserialize(d)?
                .map(|raw| parse(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

/// Accept either a single string or a list of strings.
fn one_or_many<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(match OneOrMany::deserialize(d)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

/// Untrusted request to issue a credential.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequest {
    #[serde(default)]
    pub subject_did: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(rename = "@context", default, deserialize_with = "one_or_many")]
    pub context: Vec<String>,
    #[serde(rename = "type", default, deserialize_with = "one_or_many")]
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_schema: Option<String>,
    /// RFC 3339 timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    /// Record name used for inbox delivery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_summary: Option<String>,
}

impl CredentialRequest {
    pub fn new(subject_did: impl Into<String>) -> Self {
        Self {
            subject_did: subject_did.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn with_type(mut self, credential_type: impl Into<String>) -> Self {
        self.types.push(credential_type.into());
        self
    }
}

/// Credential issuer. Serialized as an object; a bare DID string is
/// accepted on input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issuer {
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Issuer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            extra: Map::new(),
        }
    }
}

impl<'de> Deserialize<'de> for Issuer {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Object {
            id: String,
            #[serde(flatten)]
            extra: Map<String, Value>,
        }
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Id(String),
            Object(Object),
        }
        Ok(match Repr::deserialize(d)? {
            Repr::Id(id) => Issuer::new(id),
            Repr::Object(o) => Issuer {
                id: o.id,
                extra: o.extra,
            },
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialSubject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    #[serde(rename = "type")]
    pub proof_type: String,
    pub jwt: String,
}

impl Proof {
    pub fn jwt(jwt: impl Into<String>) -> Self {
        Self {
            proof_type: JWT_PROOF_TYPE.to_string(),
            jwt: jwt.into(),
        }
    }
}

/// Unsigned credential handed to a [`crate::CredentialSigner`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPayload {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    #[serde(rename = "type")]
    pub types: Vec<String>,
    pub issuer: Issuer,
    #[serde(with = "iso8601")]
    pub issuance_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "iso8601::option")]
    pub expiration_date: Option<DateTime<Utc>>,
    pub credential_subject: CredentialSubject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Signed W3C Verifiable Credential.
///
/// The core envelope is typed; every other member lives in `extensions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(rename = "@context", deserialize_with = "one_or_many")]
    pub context: Vec<String>,
    #[serde(rename = "type", deserialize_with = "one_or_many")]
    pub types: Vec<String>,
    pub issuer: Issuer,
    #[serde(with = "iso8601")]
    pub issuance_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "iso8601::option")]
    pub expiration_date: Option<DateTime<Utc>>,
    pub credential_subject: CredentialSubject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub proof: Proof,
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl Credential {
    /// Remove the JWT envelope aliases from `extensions`. Returns how many
    /// were present.
    pub fn strip_envelope_aliases(&mut self) -> usize {
        ENVELOPE_ALIASES
            .iter()
            .filter(|alias| self.extensions.remove(**alias).is_some())
            .count()
    }

    pub fn jwt(&self) -> &str {
        &self.proof.jwt
    }
}

/// What to verify: a structured credential or its bare compact JWT.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyInput {
    Credential(Box<Credential>),
    Jwt(String),
}

impl VerifyInput {
    /// Interpret user-supplied text: a JSON credential, a JSON string
    /// holding a JWT, or a bare JWT.
    pub fn parse(text: &str) -> Result<Self, CredentialError> {
        let trimmed = text.trim();
        if trimmed.starts_with('{') {
            let credential: Credential = serde_json::from_str(trimmed)
                .map_err(|e| CredentialError::MalformedCredential(e.to_string()))?;
            Ok(Self::Credential(Box::new(credential)))
        } else if trimmed.starts_with('"') {
            let jwt: String = serde_json::from_str(trimmed)
                .map_err(|e| CredentialError::MalformedCredential(e.to_string()))?;
            Ok(Self::Jwt(jwt))
        } else {
            Ok(Self::Jwt(trimmed.to_string()))
        }
    }

    /// Interpret an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, CredentialError> {
        match value {
            Value::String(jwt) => Ok(Self::Jwt(jwt)),
            obj @ Value::Object(_) => serde_json::from_value::<Credential>(obj)
                .map(|c| Self::Credential(Box::new(c)))
                .map_err(|e| CredentialError::MalformedCredential(e.to_string())),
            other => Err(CredentialError::MalformedCredential(format!(
                "expected a credential object or a JWT string, got {}",
                other
            ))),
        }
    }
}

impl From<Credential> for VerifyInput {
    fn from(credential: Credential) -> Self {
        Self::Credential(Box::new(credential))
    }
}

impl From<String> for VerifyInput {
    fn from(jwt: String) -> Self {
        Self::Jwt(jwt)
    }
}

impl From<&str> for VerifyInput {
    fn from(jwt: &str) -> Self {
        Self::Jwt(jwt.to_string())
    }
}

/// Why a well-formed credential did not verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCode {
    SignatureMismatch,
    NoUsableKey,
    Expired,
    NotYetValid,
    PayloadMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationFailure {
    pub code: FailureCode,
    pub message: String,
}

/// Outcome of verifying a credential. Carries no key material and none of
/// the decoded claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub verified: bool,
    pub issuer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<VerificationFailure>,
}

impl VerificationResult {
    pub fn verified(issuer: impl Into<String>) -> Self {
        Self {
            verified: true,
            issuer: issuer.into(),
            error: None,
        }
    }

    pub fn failed(issuer: impl Into<String>, code: FailureCode, message: impl Into<String>) -> Self {
        Self {
            verified: false,
            issuer: issuer.into(),
            error: Some(VerificationFailure {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Result of the inbox delivery side channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum DeliveryStatus {
    Delivered,
    Skipped(String),
    Failed(String),
}

/// Issued credential plus what happened to its delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuanceOutcome {
    pub credential: Credential,
    pub delivery: DeliveryStatus,
}
