use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::did::{DidProvider, ManagedIdentifier};
use crate::error::IdentityError;

/// Create-or-get of issuer identities by alias.
///
/// Each alias owns a once-cell: concurrent callers for the same alias wait
/// on one provider call and all observe its DID. A failed creation leaves
/// the cell empty so the next caller retries.
pub struct IdentityResolver {
    provider: Arc<dyn DidProvider>,
    aliases: DashMap<String, Arc<OnceCell<ManagedIdentifier>>>,
}

impl IdentityResolver {
    pub fn new(provider: Arc<dyn DidProvider>) -> Self {
        Self {
            provider,
            aliases: DashMap::new(),
        }
    }

    pub fn provider(&self) -> &Arc<dyn DidProvider> {
        &self.provider
    }

    /// Return the identifier for `alias`, creating it on first use.
    pub async fn ensure_issuer_did(&self, alias: &str) -> Result<ManagedIdentifier, IdentityError> {
        // Clone the cell out so no map guard is held across the await.
        let cell = self
            .aliases
            .entry(alias.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let identifier = cell
            .get_or_try_init(|| async {
                if let Some(existing) = self.provider.find_by_alias(alias) {
                    tracing::debug!(alias = alias, did = %existing.did, "issuer DID reused");
                    return Ok(existing);
                }
                self.provider
                    .create_identifier(alias)
                    .await
                    .map_err(|e| match e {
                        IdentityError::IdentityCreation(_) => e,
                        other => IdentityError::IdentityCreation(other.to_string()),
                    })
            })
            .await?;

        Ok(identifier.clone())
    }

    /// Identifier for `alias` if it was already created.
    pub fn get(&self, alias: &str) -> Option<ManagedIdentifier> {
        self.aliases
            .get(alias)
            .and_then(|cell| cell.get().cloned())
            .or_else(|| self.provider.find_by_alias(alias))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sigil_core::Did;
    use sigil_crypto::KeyStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Provider that counts creations and can be told to fail.
    struct StubProvider {
        keystore: KeyStore,
        created: Mutex<Vec<ManagedIdentifier>>,
        calls: AtomicUsize,
        failures_left: AtomicUsize,
    }

    impl StubProvider {
        fn new(failures: usize) -> Self {
            Self {
                keystore: KeyStore::new(),
                created: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                failures_left: AtomicUsize::new(failures),
            }
        }
    }

    #[async_trait]
    impl DidProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn create_identifier(
            &self,
            alias: &str,
        ) -> Result<ManagedIdentifier, IdentityError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(IdentityError::Ledger("ledger unreachable".into()));
            }
            let did = Did::parse(format!("did:cheqd:testnet:stub-{}", n)).unwrap();
            let id = ManagedIdentifier {
                kid: format!("{}#key-1", did),
                did,
                alias: alias.to_string(),
                provider: "stub".into(),
                key_ref: self.keystore.generate(),
            };
            self.created.lock().unwrap().push(id.clone());
            Ok(id)
        }

        fn get_identifier(&self, did: &str) -> Option<ManagedIdentifier> {
            self.created
                .lock()
                .unwrap()
                .iter()
                .find(|id| id.did.as_str() == did)
                .cloned()
        }

        fn find_by_alias(&self, alias: &str) -> Option<ManagedIdentifier> {
            self.created
                .lock()
                .unwrap()
                .iter()
                .find(|id| id.alias == alias)
                .cloned()
        }

        fn list_identifiers(&self) -> Vec<ManagedIdentifier> {
            self.created.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn test_same_alias_same_did() {
        let provider = Arc::new(StubProvider::new(0));
        let resolver = IdentityResolver::new(provider.clone());

        let first = resolver.ensure_issuer_did("demo").await.unwrap();
        let second = resolver.ensure_issuer_did("demo").await.unwrap();
        assert_eq!(first.did, second.did);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.get("demo"), Some(first));
    }

    #[tokio::test]
    async fn test_distinct_aliases() {
        let provider = Arc::new(StubProvider::new(0));
        let resolver = IdentityResolver::new(provider.clone());

        let a = resolver.ensure_issuer_did("a").await.unwrap();
        let b = resolver.ensure_issuer_did("b").await.unwrap();
        assert_ne!(a.did, b.did);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_single_flight() {
        let provider = Arc::new(StubProvider::new(0));
        let resolver = Arc::new(IdentityResolver::new(provider.clone()));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let resolver = resolver.clone();
                tokio::spawn(async move { resolver.ensure_issuer_did("demo").await })
            })
            .collect();
        let results = futures::future::join_all(tasks).await;

        let dids: Vec<Did> = results
            .into_iter()
            .map(|r| r.unwrap().unwrap().did)
            .collect();
        assert!(dids.iter().all(|d| d == &dids[0]));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_retried() {
        let provider = Arc::new(StubProvider::new(1));
        let resolver = IdentityResolver::new(provider.clone());

        let err = resolver.ensure_issuer_did("demo").await.unwrap_err();
        assert!(matches!(err, IdentityError::IdentityCreation(_)));
        assert!(resolver.get("demo").is_none());

        let id = resolver.ensure_issuer_did("demo").await.unwrap();
        assert_eq!(id.alias, "demo");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_existing_identifier_reused() {
        let provider = Arc::new(StubProvider::new(0));
        let existing = provider.create_identifier("demo").await.unwrap();

        let resolver = IdentityResolver::new(provider.clone());
        let id = resolver.ensure_issuer_did("demo").await.unwrap();
        assert_eq!(id, existing);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
