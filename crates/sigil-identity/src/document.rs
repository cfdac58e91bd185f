use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sigil_crypto::{CryptoError, PublicKey};

pub const DID_CONTEXT_V1: &str = "https://www.w3.org/ns/did/v1";
pub const ED25519_2020_CONTEXT: &str = "https://w3id.org/security/suites/ed25519-2020/v1";
pub const ED25519_2020: &str = "Ed25519VerificationKey2020";

/// Public key in JWK form (only the members needed for OKP keys).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyJwk {
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
}

/// A verification method within a DID Document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// Verification method identifier (e.g., "did:cheqd:testnet:abc#key-1").
    pub id: String,
    /// Type of the verification method (e.g., "Ed25519VerificationKey2020").
    #[serde(rename = "type")]
    pub method_type: String,
    /// The DID that controls this verification method.
    pub controller: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_multibase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_base58: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_jwk: Option<PublicKeyJwk>,
}

impl VerificationMethod {
    /// Ed25519VerificationKey2020 method with multibase key material.
    pub fn ed25519(id: String, controller: String, public_key: &PublicKey) -> Self {
        Self {
            id,
            method_type: ED25519_2020.to_string(),
            controller,
            public_key_multibase: Some(public_key.to_multibase()),
            public_key_base58: None,
            public_key_jwk: None,
        }
    }

    /// Extract the Ed25519 key this method carries.
    ///
    /// `Ok(None)` means the method holds some other key type and should be
    /// skipped; `Err` means it claims Ed25519 but the material is broken.
    pub fn ed25519_public_key(&self) -> Result<Option<PublicKey>, CryptoError> {
        if let Some(jwk) = &self.public_key_jwk {
            if jwk.kty != "OKP" || jwk.crv.as_deref() != Some("Ed25519") {
                return Ok(None);
            }
            let x = jwk
                .x
                .as_deref()
                .ok_or_else(|| CryptoError::InvalidInput("JWK without x".into()))?;
            let bytes = URL_SAFE_NO_PAD
                .decode(x)
                .map_err(|e| CryptoError::InvalidInput(format!("JWK x: {}", e)))?;
            return PublicKey::from_bytes(&bytes).map(Some);
        }
        if let Some(multibase) = &self.public_key_multibase {
            return match PublicKey::from_multibase(multibase) {
                Ok(pk) => Ok(Some(pk)),
                Err(CryptoError::UnsupportedAlgorithm(_)) => Ok(None),
                Err(e) => Err(e),
            };
        }
        if let Some(b58) = &self.public_key_base58 {
            if self.method_type.starts_with("Ed25519") {
                return PublicKey::from_bs58(b58).map(Some);
            }
        }
        Ok(None)
    }
}

/// Entry of `authentication` / `assertionMethod`: a reference to a method
/// in `verificationMethod`, or an embedded method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VerificationRelationship {
    Reference(String),
    Embedded(VerificationMethod),
}

/// A service endpoint in a DID Document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    #[serde(rename = "type")]
    pub service_type: String,
    /// A URL, a map or a list, depending on the service type.
    pub service_endpoint: serde_json::Value,
}

/// W3C DID Document, as produced by a resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<serde_json::Value>,
    #[serde(default)]
    pub verification_method: Vec<VerificationMethod>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authentication: Vec<VerificationRelationship>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertion_method: Vec<VerificationRelationship>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<Service>,
}

impl DidDocument {
    /// Document with a single Ed25519 key usable for authentication and
    /// assertion, identified as `<did>#<fragment>`.
    pub fn with_ed25519_key(did: &str, fragment: &str, public_key: &PublicKey) -> Self {
        let vm_id = format!("{}#{}", did, fragment);
        Self {
            context: Some(serde_json::json!([DID_CONTEXT_V1, ED25519_2020_CONTEXT])),
            id: did.to_string(),
            controller: Some(serde_json::Value::String(did.to_string())),
            verification_method: vec![VerificationMethod::ed25519(
                vm_id.clone(),
                did.to_string(),
                public_key,
            )],
            authentication: vec![VerificationRelationship::Reference(vm_id.clone())],
            assertion_method: vec![VerificationRelationship::Reference(vm_id)],
            service: Vec::new(),
        }
    }

    /// Add a service endpoint.
    pub fn add_service(&mut self, service_type: &str, endpoint: &str) {
        let idx = self.service.len() + 1;
        self.service.push(Service {
            id: format!("{}#service-{}", self.id, idx),
            service_type: service_type.to_string(),
            service_endpoint: serde_json::Value::String(endpoint.to_string()),
        });
    }

    /// Expand a relative (`#key-1`) method id against the document id.
    fn absolute_id(&self, id: &str) -> String {
        if id.starts_with('#') {
            format!("{}{}", self.id, id)
        } else {
            id.to_string()
        }
    }

    /// Look up a verification method by id, including methods embedded in
    /// verification relationships.
    pub fn find_verification_method(&self, id: &str) -> Option<&VerificationMethod> {
        let wanted = self.absolute_id(id);
        let embedded = self
            .authentication
            .iter()
            .chain(self.assertion_method.iter())
            .filter_map(|rel| match rel {
                VerificationRelationship::Embedded(vm) => Some(vm),
                VerificationRelationship::Reference(_) => None,
            });
        self.verification_method
            .iter()
            .chain(embedded)
            .find(|vm| self.absolute_id(&vm.id) == wanted)
    }

    /// Ed25519 keys allowed to sign assertions (credentials), by method id.
    ///
    /// Methods listed under `assertionMethod` come first. When a document
    /// has no `assertionMethod` at all, every Ed25519 verification method is
    /// accepted. Methods with unusable key material are skipped.
    pub fn assertion_keys(&self) -> Vec<(String, PublicKey)> {
        let candidates: Vec<&VerificationMethod> = if self.assertion_method.is_empty() {
            self.verification_method.iter().collect()
        } else {
            self.assertion_method
                .iter()
                .filter_map(|rel| match rel {
                    VerificationRelationship::Reference(id) => self.find_verification_method(id),
                    VerificationRelationship::Embedded(vm) => Some(vm),
                })
                .collect()
        };

        let mut keys: Vec<(String, PublicKey)> = Vec::new();
        for vm in candidates {
            let id = self.absolute_id(&vm.id);
            if keys.iter().any(|(existing, _)| *existing == id) {
                continue;
            }
            match vm.ed25519_public_key() {
                Ok(Some(pk)) => keys.push((id, pk)),
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(method = %vm.id, error = %e, "skipping unusable verification method");
                }
            }
        }
        keys
    }
}
