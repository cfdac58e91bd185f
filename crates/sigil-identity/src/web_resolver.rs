use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

use sigil_core::Did;

use crate::did_resolver::DidResolver;
use crate::document::DidDocument;
use crate::error::IdentityError;

/// Resolves `did:web` identifiers by fetching `did.json` over HTTPS.
pub struct WebDidResolver {
    http: reqwest::Client,
    scheme: &'static str,
}

impl WebDidResolver {
    pub fn new(timeout: Duration) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityError::ResolutionNetwork {
                did: "did:web".into(),
                reason: format!("client init: {}", e),
            })?;
        Ok(Self {
            http,
            scheme: "https",
        })
    }

    /// Fetch over plain HTTP. Only meant for local test servers.
    pub fn insecure(mut self) -> Self {
        self.scheme = "http";
        self
    }

    /// Document URL for a `did:web` identifier.
    ///
    /// `did:web:example.com` maps to `https://example.com/.well-known/did.json`,
    /// `did:web:example.com:users:alice` to `https://example.com/users/alice/did.json`.
    /// A percent-encoded colon in the host segment is a port separator.
    pub fn document_url(&self, did: &Did) -> Result<String, IdentityError> {
        if did.method() != "web" {
            return Err(IdentityError::UnsupportedMethod(did.method().to_string()));
        }
        let mut segments = did.method_specific_id().split(':');
        let host = segments
            .next()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| IdentityError::InvalidDid(did.to_string()))?
            .replace("%3A", ":")
            .replace("%3a", ":");
        let path: Vec<&str> = segments.collect();
        if path.iter().any(|s| s.is_empty()) {
            return Err(IdentityError::InvalidDid(did.to_string()));
        }

        if path.is_empty() {
            Ok(format!("{}://{}/.well-known/did.json", self.scheme, host))
        } else {
            Ok(format!("{}://{}/{}/did.json", self.scheme, host, path.join("/")))
        }
    }
}

#[async_trait]
impl DidResolver for WebDidResolver {
    async fn resolve(&self, did: &Did) -> Result<DidDocument, IdentityError> {
        let url = self.document_url(did)?;
        tracing::debug!(did = %did, url = %url, "fetching did:web document");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| IdentityError::transport(did.as_str(), e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(IdentityError::DidNotFound(did.to_string()));
        }
        if !status.is_success() {
            return Err(IdentityError::ResolutionNetwork {
                did: did.to_string(),
                reason: format!("{} returned HTTP {}", url, status),
            });
        }

        response
            .json::<DidDocument>()
            .await
            .map_err(|e| IdentityError::InvalidDocument(format!("{}: {}", did, e)))
    }
}
