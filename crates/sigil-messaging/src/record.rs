use serde::{Deserialize, Serialize};

/// Schema identifying a credential record in the recipient's vault.
pub const CREDENTIAL_RECORD_SCHEMA: &str =
    "https://common.schemas.verida.io/credential/base/v0.2.0/schema.json";

/// Record wrapping an issued credential for inbox delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    /// Title shown when browsing the vault.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub schema: String,
    /// Compact JWT of the credential.
    pub did_jwt_vc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_schema: Option<String>,
    pub credential_data: serde_json::Value,
}

impl CredentialRecord {
    pub fn new(
        name: impl Into<String>,
        summary: Option<String>,
        did_jwt_vc: impl Into<String>,
        credential_schema: Option<String>,
        credential_data: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            summary,
            schema: CREDENTIAL_RECORD_SCHEMA.to_string(),
            did_jwt_vc: did_jwt_vc.into(),
            credential_schema,
            credential_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_wire_shape() {
        let record = CredentialRecord::new(
            "Membership",
            None,
            "a.b.c",
            Some("https://example.org/schema.json".into()),
            serde_json::json!({"issuer": {"id": "did:cheqd:testnet:x"}}),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["schema"], CREDENTIAL_RECORD_SCHEMA);
        assert_eq!(json["didJwtVc"], "a.b.c");
        assert_eq!(json["credentialSchema"], "https://example.org/schema.json");
        assert_eq!(json["credentialData"]["issuer"]["id"], "did:cheqd:testnet:x");
        assert!(json.get("summary").is_none());
    }
}
