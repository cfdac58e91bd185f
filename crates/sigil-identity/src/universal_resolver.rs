use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

use sigil_core::Did;
use url::Url;

use crate::did_resolver::{DidResolutionRegistry, DidResolver};
use crate::document::DidDocument;
use crate::error::IdentityError;

const DID_RESOLUTION_ACCEPT: &str =
    "application/did+ld+json, application/ld+json;profile=\"https://w3id.org/did-resolution\", application/json";

/// Delegates resolution to a Universal Resolver deployment
/// (`GET <base>/<did>`).
pub struct UniversalResolver {
    http: reqwest::Client,
    base_url: Url,
}

impl UniversalResolver {
    /// `base_url` is the identifiers endpoint, e.g.
    /// `https://dev.uniresolver.io/1.0/identifiers/`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityError::ResolutionNetwork {
                did: base_url.to_string(),
                reason: format!("client init: {}", e),
            })?;
        let base_url = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| IdentityError::ResolutionNetwork {
                did: base_url.to_string(),
                reason: "resolver base URL is not a valid http(s) base".into(),
            })?;
        Ok(Self { http, base_url })
    }

    /// Register one shared instance under each of `methods`.
    pub fn for_methods<I, S>(
        registry: &mut DidResolutionRegistry,
        methods: I,
        base_url: &str,
        timeout: Duration,
    ) -> Result<(), IdentityError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let resolver: Arc<dyn DidResolver> = Arc::new(Self::new(base_url, timeout)?);
        registry.register_many(methods, resolver);
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// `<base>/<did>` with the DID as one percent-encoded path segment.
    fn identifier_url(&self, did: &Did) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(did.as_str());
        }
        url
    }
}

#[async_trait]
impl DidResolver for UniversalResolver {
    async fn resolve(&self, did: &Did) -> Result<DidDocument, IdentityError> {
        let url = self.identifier_url(did);
        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, DID_RESOLUTION_ACCEPT)
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
                reason: format!("universal resolver returned HTTP {}", status),
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| IdentityError::InvalidDocument(format!("{}: {}", did, e)))?;

        // Either a DID resolution result or a bare document.
        let doc_value = match body.get("didDocument") {
            Some(serde_json::Value::Null) => {
                return Err(IdentityError::DidNotFound(did.to_string()))
            }
            Some(doc) => doc.clone(),
            None => body,
        };
        serde_json::from_value(doc_value)
            .map_err(|e| IdentityError::InvalidDocument(format!("{}: {}", did, e)))
    }
}
