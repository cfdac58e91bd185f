//! The agent: one explicitly wired set of services, built once at startup.

use std::sync::Arc;
use std::time::Duration;

use sigil_crypto::{KeyPair, KeyStore};
use sigil_credentials::{
    CredentialError, CredentialIssuer, CredentialRequest, CredentialVerifier, IssuanceOutcome,
    IssuerSettings, JwtCredentialSigner, SigningOptions, VerificationResult, VerifyInput,
};
use sigil_identity::{
    DidDocument, DidResolutionRegistry, HttpLedgerClient, IdentityError, IdentityResolver,
    InMemoryLedger, KeyDidResolver, LedgerClient, LedgerDidProvider, LedgerDidResolver,
    ManagedIdentifier, UniversalResolver, WebDidResolver,
};
use sigil_messaging::{ConnectParams, HttpMessagingGateway, MessagingGateway};

use crate::config::{AgentConfig, ConfigError, LedgerMode};
use crate::error::AgentError;

/// DID method of ledger-anchored issuer identifiers.
const LEDGER_DID_METHOD: &str = "cheqd";

/// Issues, verifies and resolves on behalf of one configured issuer.
pub struct Agent {
    config: AgentConfig,
    keystore: Arc<KeyStore>,
    identities: Arc<IdentityResolver>,
    registry: Arc<DidResolutionRegistry>,
    issuer: CredentialIssuer,
    verifier: CredentialVerifier,
    gateway: Option<Arc<dyn MessagingGateway>>,
}

impl Agent {
    pub fn builder(config: AgentConfig) -> AgentBuilder {
        AgentBuilder::new(config)
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn keystore(&self) -> &Arc<KeyStore> {
        &self.keystore
    }

    pub fn identities(&self) -> &Arc<IdentityResolver> {
        &self.identities
    }

    pub fn registry(&self) -> &Arc<DidResolutionRegistry> {
        &self.registry
    }

    pub fn gateway(&self) -> Option<&Arc<dyn MessagingGateway>> {
        self.gateway.as_ref()
    }

    /// The configured issuer DID, created on first use.
    pub async fn issuer_identifier(&self) -> Result<ManagedIdentifier, IdentityError> {
        self.identities
            .ensure_issuer_did(&self.config.issuer.alias)
            .await
    }

    pub async fn issue_credential(
        &self,
        request: CredentialRequest,
    ) -> Result<IssuanceOutcome, CredentialError> {
        self.issuer.issue(request).await
    }

    pub async fn verify_credential(
        &self,
        input: impl Into<VerifyInput>,
    ) -> Result<VerificationResult, CredentialError> {
        self.verifier.verify(input).await
    }

    pub async fn resolve_did(&self, did: &str) -> Result<DidDocument, IdentityError> {
        self.registry.resolve(did).await
    }
}

/// Builds an [`Agent`] from configuration. Ledger and gateway can be
/// injected in place of the configured ones.
pub struct AgentBuilder {
    config: AgentConfig,
    keystore: Option<Arc<KeyStore>>,
    ledger: Option<Arc<dyn LedgerClient>>,
    gateway: Option<Arc<dyn MessagingGateway>>,
}

impl AgentBuilder {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            keystore: None,
            ledger: None,
            gateway: None,
        }
    }

    pub fn with_keystore(mut self, keystore: Arc<KeyStore>) -> Self {
        self.keystore = Some(keystore);
        self
    }

    pub fn with_ledger(mut self, ledger: Arc<dyn LedgerClient>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Use `gateway` as is. The caller owns its session.
    pub fn with_gateway(mut self, gateway: Arc<dyn MessagingGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Validate the configuration and wire every service. With messaging
    /// enabled the gateway session is opened here, before the agent is
    /// handed out.
    pub async fn build(self) -> Result<Agent, AgentError> {
        let config = self.config;
        config.validate()?;
        let network = config.network()?;

        let keystore = self.keystore.unwrap_or_else(|| Arc::new(KeyStore::new()));
        let ledger = match self.ledger {
            Some(ledger) => ledger,
            None => ledger_from_config(&config)?,
        };

        let provider = LedgerDidProvider::new(network, keystore.clone(), ledger.clone());
        let identities = Arc::new(IdentityResolver::new(Arc::new(provider)));
        let registry = Arc::new(registry_from_config(&config, ledger)?);

        let gateway = match self.gateway {
            Some(gateway) => Some(gateway),
            None if config.messaging.enabled => Some(connect_gateway(&config).await?),
            None => None,
        };

        let settings = IssuerSettings {
            issuer_identifier: config.issuer.identifier.clone(),
            alias: config.issuer.alias.clone(),
            delivery_subject: config.issuer.delivery_subject.clone(),
            signing: SigningOptions {
                remove_original_fields: config.issuer.remove_original_fields,
                ..SigningOptions::default()
            },
        };
        let signer = Arc::new(JwtCredentialSigner::new(keystore.clone()));
        let mut issuer = CredentialIssuer::new(settings, identities.clone(), signer);
        if let Some(gateway) = &gateway {
            issuer = issuer.with_gateway(gateway.clone());
        }
        let verifier =
            CredentialVerifier::new(registry.clone()).with_clock_skew(config.resolver.clock_skew());

        tracing::info!(
            issuer = %config.issuer.identifier,
            network = %network,
            ledger = ?config.ledger.mode,
            methods = ?registry.methods(),
            messaging = gateway.is_some(),
            "agent ready"
        );

        Ok(Agent {
            config,
            keystore,
            identities,
            registry,
            issuer,
            verifier,
            gateway,
        })
    }
}

fn ledger_from_config(config: &AgentConfig) -> Result<Arc<dyn LedgerClient>, AgentError> {
    match config.ledger.mode {
        LedgerMode::Memory => {
            tracing::warn!("using in-memory ledger; issuer DIDs are not anchored");
            Ok(Arc::new(InMemoryLedger::new()))
        }
        LedgerMode::Rpc => {
            let url = url::Url::parse(&config.ledger.rpc_url).map_err(|e| ConfigError::Invalid {
                field: "ledger.rpc_url",
                reason: e.to_string(),
            })?;
            let payer = KeyPair::from_secret_material(&config.ledger.payer_key)?;
            let client = HttpLedgerClient::new(url, payer, config.ledger.timeout())?;
            tracing::info!(
                rpc = %config.ledger.rpc_url,
                payer = %client.payer_address(),
                "ledger client configured"
            );
            Ok(Arc::new(client))
        }
    }
}

fn registry_from_config(
    config: &AgentConfig,
    ledger: Arc<dyn LedgerClient>,
) -> Result<DidResolutionRegistry, AgentError> {
    let resolver = &config.resolver;
    let mut registry = DidResolutionRegistry::new().with_timeout(resolver.timeout());
    if resolver.cache_ttl_secs > 0 && resolver.cache_capacity > 0 {
        registry = registry.with_cache(
            Duration::from_secs(resolver.cache_ttl_secs),
            resolver.cache_capacity,
        );
    }

    if let Some(url) = &resolver.universal_resolver_url {
        UniversalResolver::for_methods(
            &mut registry,
            &resolver.universal_methods,
            url,
            resolver.timeout(),
        )?;
    }

    // built-in resolvers take precedence over the universal one
    registry.register("key", Arc::new(KeyDidResolver::new()));
    let mut web = WebDidResolver::new(resolver.timeout())?;
    if resolver.insecure_web {
        web = web.insecure();
    }
    registry.register("web", Arc::new(web));
    registry.register(LEDGER_DID_METHOD, Arc::new(LedgerDidResolver::new(ledger)));
    Ok(registry)
}

async fn connect_gateway(config: &AgentConfig) -> Result<Arc<dyn MessagingGateway>, AgentError> {
    let messaging = &config.messaging;
    let endpoint = url::Url::parse(&messaging.endpoint).map_err(|e| ConfigError::Invalid {
        field: "messaging.endpoint",
        reason: e.to_string(),
    })?;
    let gateway = HttpMessagingGateway::new(endpoint, messaging.timeout())?;
    gateway
        .connect(ConnectParams {
            environment: messaging.environment()?,
            app_context: messaging.app_name.clone(),
            account_key: messaging.account_key.clone(),
            chain_key: messaging.chain_key.clone(),
        })
        .await?;
    Ok(Arc::new(gateway))
}
