use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

use sigil_core::{Did, Network};
use sigil_identity::IdentityResolver;
use sigil_messaging::{CredentialRecord, MessagingGateway};

use crate::error::CredentialError;
use crate::proof::{CredentialSigner, SigningOptions};
use crate::types::{
    iso8601, Credential, CredentialPayload, CredentialRequest, CredentialSubject, DeliveryStatus,
    IssuanceOutcome, Issuer, BASE_CONTEXT, BASE_TYPE,
};

pub const DEFAULT_ISSUER_ALIAS: &str = "demo";
pub const DEFAULT_DELIVERY_SUBJECT: &str = "You have received a new credential";

/// Issuer behaviour that comes from configuration.
#[derive(Debug, Clone)]
pub struct IssuerSettings {
    /// Configured issuer identifier (`did:cheqd:<network>:<id>`). Only its
    /// network segment is used; the signing DID comes from the alias.
    pub issuer_identifier: String,
    /// Alias of the issuer DID under the default provider.
    pub alias: String,
    /// Message subject used for inbox delivery.
    pub delivery_subject: String,
    pub signing: SigningOptions,
}

impl IssuerSettings {
    pub fn new(issuer_identifier: impl Into<String>) -> Self {
        Self {
            issuer_identifier: issuer_identifier.into(),
            alias: DEFAULT_ISSUER_ALIAS.to_string(),
            delivery_subject: DEFAULT_DELIVERY_SUBJECT.to_string(),
            signing: SigningOptions::default(),
        }
    }

    /// Network namespace of the configured issuer identifier.
    pub fn network(&self) -> Result<Network, CredentialError> {
        Ok(Network::from_identifier(&self.issuer_identifier)?)
    }
}

/// Request values first in their order, then `base` exactly once, last.
fn extend_with_base(requested: &[String], base: &str) -> Vec<String> {
    let mut merged: Vec<String> = requested
        .iter()
        .filter(|value| value.as_str() != base)
        .cloned()
        .collect();
    merged.push(base.to_string());
    merged
}

/// Subject DID and expiration date of a request, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub subject: Did,
    pub expiration_date: Option<DateTime<Utc>>,
}

/// Check the parts of a request that must hold before any identity work.
///
/// `expirationDate` must be whole seconds: the JWT `exp` claim cannot carry
/// a fraction, so the signed credential would expire earlier than asked.
pub fn validate_request(request: &CredentialRequest) -> Result<ValidatedRequest, CredentialError> {
    let subject_did = request.subject_did.trim();
    if subject_did.is_empty() {
        return Err(CredentialError::InvalidRequest("subjectDid is required".into()));
    }
    let subject = Did::parse(subject_did)
        .map_err(|e| CredentialError::InvalidRequest(format!("subjectDid: {}", e)))?;

    let expiration_date = request
        .expiration_date
        .as_deref()
        .map(|raw| {
            let ts = iso8601::parse(raw).map_err(|e| {
                CredentialError::InvalidRequest(format!("expirationDate {:?}: {}", raw, e))
            })?;
            if ts.timestamp_subsec_nanos() != 0 {
                return Err(CredentialError::InvalidRequest(format!(
                    "expirationDate {:?}: fractional seconds are not supported",
                    raw
                )));
            }
            Ok(ts)
        })
        .transpose()?;
    Ok(ValidatedRequest {
        subject,
        expiration_date,
    })
}

/// Turn a validated request into an unsigned payload for `issuer_did`.
pub fn build_payload(
    request: &CredentialRequest,
    validated: ValidatedRequest,
    issuer_did: &Did,
    issued_at: DateTime<Utc>,
) -> CredentialPayload {
    let ValidatedRequest {
        subject,
        expiration_date,
    } = validated;

    let mut claims = request.attributes.clone();
    if claims.remove("id").is_some() {
        tracing::warn!(subject = %subject, "attribute 'id' dropped in favour of subjectDid");
    }

    CredentialPayload {
        context: extend_with_base(&request.context, BASE_CONTEXT),
        types: extend_with_base(&request.types, BASE_TYPE),
        issuer: Issuer::new(issuer_did.as_str()),
        issuance_date: issued_at,
        expiration_date,
        credential_subject: CredentialSubject {
            id: Some(subject.to_string()),
            claims,
        },
        credential_schema: request.credential_schema.clone().map(Value::String),
        id: None,
    }
}

/// Issues credentials under the configured issuer identity and hands them
/// to the messaging side channel when the subject can receive them.
pub struct CredentialIssuer {
    settings: IssuerSettings,
    identities: Arc<IdentityResolver>,
    signer: Arc<dyn CredentialSigner>,
    gateway: Option<Arc<dyn MessagingGateway>>,
}

impl CredentialIssuer {
    pub fn new(
        settings: IssuerSettings,
        identities: Arc<IdentityResolver>,
        signer: Arc<dyn CredentialSigner>,
    ) -> Self {
        Self {
            settings,
            identities,
            signer,
            gateway: None,
        }
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn MessagingGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn settings(&self) -> &IssuerSettings {
        &self.settings
    }

    /// Issue a credential for `request`.
    ///
    /// Delivery problems never fail issuance; they are reported in
    /// [`IssuanceOutcome::delivery`].
    pub async fn issue(&self, request: CredentialRequest) -> Result<IssuanceOutcome, CredentialError> {
        let validated = validate_request(&request)?;
        let network = self.settings.network()?;

        let identity = self
            .identities
            .ensure_issuer_did(&self.settings.alias)
            .await?;
        let payload = build_payload(&request, validated, &identity.did, now_seconds());

        let mut credential = self
            .signer
            .sign_credential(&payload, &identity, &self.settings.signing)
            .await?;
        credential.strip_envelope_aliases();

        let delivery = self.deliver(&request, &credential).await;

        tracing::info!(
            issuer = %identity.did,
            subject = %request.subject_did,
            network = %network,
            types = ?credential.types,
            delivery = ?delivery,
            "credential issued"
        );
        Ok(IssuanceOutcome {
            credential,
            delivery,
        })
    }

    async fn deliver(&self, request: &CredentialRequest, credential: &Credential) -> DeliveryStatus {
        let Some(gateway) = &self.gateway else {
            return DeliveryStatus::Skipped("messaging disabled".into());
        };
        let recipient = request.subject_did.trim();
        if !gateway.serves(recipient) {
            return DeliveryStatus::Skipped("recipient is not on the messaging network".into());
        }

        let credential_data = match serde_json::to_value(credential) {
            Ok(value) => value,
            Err(e) => return DeliveryStatus::Failed(format!("encoding credential: {}", e)),
        };
        let name = request.credential_name.clone().unwrap_or_else(|| {
            credential
                .types
                .iter()
                .find(|t| t.as_str() != BASE_TYPE)
                .cloned()
                .unwrap_or_else(|| BASE_TYPE.to_string())
        });
        let record = CredentialRecord::new(
            name,
            request.credential_summary.clone(),
            credential.jwt(),
            request.credential_schema.clone(),
            credential_data,
        );

        match gateway
            .deliver(recipient, &self.settings.delivery_subject, &record)
            .await
        {
            Ok(()) => DeliveryStatus::Delivered,
            Err(e) => {
                tracing::warn!(recipient = recipient, error = %e, "credential delivery failed");
                DeliveryStatus::Failed(e.to_string())
            }
        }
    }
}

/// Current time truncated to whole seconds, matching the JWT `nbf` claim.
fn now_seconds() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now)
}
