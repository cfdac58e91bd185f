use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sigil_core::Did;

use crate::document::DidDocument;
use crate::error::IdentityError;

/// Default upper bound for a single resolution.
pub const DEFAULT_RESOLUTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Trait for resolving DIDs to their documents.
#[async_trait]
pub trait DidResolver: Send + Sync {
    /// Resolve a DID to its DID Document.
    async fn resolve(&self, did: &Did) -> Result<DidDocument, IdentityError>;
}

struct DocumentCache {
    ttl: Duration,
    capacity: usize,
    entries: DashMap<String, (Instant, DidDocument)>,
}

impl DocumentCache {
    fn get(&self, did: &str) -> Option<DidDocument> {
        let entry = self.entries.get(did)?;
        let (stored_at, doc) = entry.value();
        if stored_at.elapsed() < self.ttl {
            Some(doc.clone())
        } else {
            drop(entry);
            self.entries.remove(did);
            None
        }
    }

    fn insert(&self, did: String, doc: DidDocument) {
        if self.entries.len() >= self.capacity {
            let ttl = self.ttl;
            self.entries.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
        }
        if self.entries.len() >= self.capacity {
            // still full of live entries: drop the oldest one
            let oldest = self
                .entries
                .iter()
                .min_by_key(|e| e.value().0)
                .map(|e| e.key().clone());
            if let Some(key) = oldest {
                self.entries.remove(&key);
            }
        }
        self.entries.insert(did, (Instant::now(), doc));
    }
}

/// Dispatch table from DID method name to resolver.
///
/// Each method has at most one resolver; registering a method again
/// replaces the previous entry. The same resolver instance may serve many
/// methods.
pub struct DidResolutionRegistry {
    resolvers: HashMap<String, Arc<dyn DidResolver>>,
    timeout: Duration,
    cache: Option<DocumentCache>,
}

impl DidResolutionRegistry {
    pub fn new() -> Self {
        Self {
            resolvers: HashMap::new(),
            timeout: DEFAULT_RESOLUTION_TIMEOUT,
            cache: None,
        }
    }

    /// Bound every resolution by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Cache resolved documents for `ttl`, keeping at most `capacity` of them.
    pub fn with_cache(mut self, ttl: Duration, capacity: usize) -> Self {
        self.cache = Some(DocumentCache {
            ttl,
            capacity: capacity.max(1),
            entries: DashMap::new(),
        });
        self
    }

    /// Register a resolver for a DID method.
    pub fn register(&mut self, method: &str, resolver: Arc<dyn DidResolver>) {
        tracing::debug!(method = method, "DID resolver registered");
        self.resolvers.insert(method.to_string(), resolver);
    }

    /// Register one resolver for several methods.
    pub fn register_many<I, S>(&mut self, methods: I, resolver: Arc<dyn DidResolver>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for method in methods {
            self.register(method.as_ref(), resolver.clone());
        }
    }

    pub fn supports(&self, method: &str) -> bool {
        self.resolvers.contains_key(method)
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.resolvers.keys().cloned().collect();
        methods.sort();
        methods
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve a DID through the resolver registered for its method.
    pub async fn resolve(&self, did: &str) -> Result<DidDocument, IdentityError> {
        let parsed = Did::parse(did).map_err(|e| IdentityError::InvalidDid(e.to_string()))?;
        let method = parsed.method();
        let resolver = self
            .resolvers
            .get(method)
            .ok_or_else(|| IdentityError::UnsupportedMethod(method.to_string()))?;

        if let Some(cache) = &self.cache {
            if let Some(doc) = cache.get(parsed.as_str()) {
                tracing::debug!(did = %parsed, "DID document served from cache");
                return Ok(doc);
            }
        }

        let doc = tokio::time::timeout(self.timeout, resolver.resolve(&parsed))
            .await
            .map_err(|_| IdentityError::ResolutionTimeout {
                did: parsed.to_string(),
            })??;

        if doc.id != parsed.as_str() {
            return Err(IdentityError::InvalidDocument(format!(
                "resolved document id {} does not match {}",
                doc.id, parsed
            )));
        }

        tracing::debug!(did = %parsed, method = method, "DID resolved");
        if let Some(cache) = &self.cache {
            cache.insert(parsed.to_string(), doc.clone());
        }
        Ok(doc)
    }
}

impl Default for DidResolutionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
