//! Agent configuration loading and management.
//!
//! Values come from a TOML file (every field has a default), then from
//! `SIGIL_*` environment variables, and are checked by [`AgentConfig::validate`]
//! before anything is built.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sigil_core::{Did, Network};
use sigil_messaging::Environment;

pub const ENV_ISSUER_ID: &str = "SIGIL_ISSUER_ID";
pub const ENV_LEDGER_RPC_URL: &str = "SIGIL_LEDGER_RPC_URL";
pub const ENV_LEDGER_PAYER_KEY: &str = "SIGIL_LEDGER_PAYER_KEY";
pub const ENV_MESSAGING_APP_NAME: &str = "SIGIL_MESSAGING_APP_NAME";
pub const ENV_MESSAGING_ACCOUNT_KEY: &str = "SIGIL_MESSAGING_ACCOUNT_KEY";
pub const ENV_MESSAGING_CHAIN_KEY: &str = "SIGIL_MESSAGING_CHAIN_KEY";
pub const ENV_RESOLVER_URL: &str = "SIGIL_RESOLVER_URL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("encoding config: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("issuer identifier {identifier} has no supported network: {reason}")]
    InvalidNetwork { identifier: String, reason: String },

    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Full configuration for the Sigil agent.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentConfig {
    #[serde(default)]
    pub issuer: IssuerConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub messaging: MessagingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerConfig {
    /// Issuer identifier, `did:cheqd:<network>:<id>`. The network segment
    /// selects where issuer DIDs are created.
    #[serde(default)]
    pub identifier: String,
    /// Alias of the issuer DID.
    #[serde(default = "default_alias")]
    pub alias: String,
    /// Subject line of inbox deliveries.
    #[serde(default = "default_delivery_subject")]
    pub delivery_subject: String,
    /// Drop the W3C members the JWT claims already carry from `vc`.
    #[serde(default = "default_true")]
    pub remove_original_fields: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerMode {
    /// Ledger JSON-RPC endpoint.
    Rpc,
    /// Process-local ledger; nothing is anchored.
    Memory,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_mode")]
    pub mode: LedgerMode,
    #[serde(default)]
    pub rpc_url: String,
    /// Fee payer key: hex seed or passphrase.
    #[serde(default)]
    pub payer_key: String,
    #[serde(default = "default_ledger_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Upper bound on one DID resolution.
    #[serde(default = "default_resolver_timeout_secs")]
    pub timeout_secs: u64,
    /// Universal resolver base URL; unset disables it.
    #[serde(default)]
    pub universal_resolver_url: Option<String>,
    /// Methods routed to the universal resolver.
    #[serde(default)]
    pub universal_methods: Vec<String>,
    /// 0 disables the document cache.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Resolve did:web over plain http.
    #[serde(default)]
    pub insecure_web: bool,
    /// How far a credential's `nbf` may lie ahead of the local clock.
    #[serde(default = "default_clock_skew_secs")]
    pub clock_skew_secs: u64,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_messaging_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Application context name the session is opened under.
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub account_key: String,
    #[serde(default)]
    pub chain_key: String,
    #[serde(default = "default_messaging_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_alias() -> String {
    sigil_credentials::issuer::DEFAULT_ISSUER_ALIAS.into()
}
fn default_delivery_subject() -> String {
    sigil_credentials::issuer::DEFAULT_DELIVERY_SUBJECT.into()
}
fn default_true() -> bool {
    true
}
fn default_ledger_mode() -> LedgerMode {
    LedgerMode::Rpc
}
fn default_ledger_timeout_secs() -> u64 {
    30
}
fn default_resolver_timeout_secs() -> u64 {
    10
}
fn default_clock_skew_secs() -> u64 {
    sigil_credentials::verifier::DEFAULT_CLOCK_SKEW_SECS.unsigned_abs()
}
fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_cache_capacity() -> usize {
    1024
}
fn default_messaging_endpoint() -> String {
    "http://127.0.0.1:5010/".into()
}
fn default_environment() -> String {
    "testnet".into()
}
fn default_messaging_timeout_secs() -> u64 {
    15
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            identifier: String::new(),
            alias: default_alias(),
            delivery_subject: default_delivery_subject(),
            remove_original_fields: true,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            mode: default_ledger_mode(),
            rpc_url: String::new(),
            payer_key: String::new(),
            timeout_secs: default_ledger_timeout_secs(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_resolver_timeout_secs(),
            universal_resolver_url: None,
            universal_methods: Vec::new(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
            insecure_web: false,
            clock_skew_secs: default_clock_skew_secs(),
        }
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_messaging_endpoint(),
            environment: default_environment(),
            app_name: String::new(),
            account_key: String::new(),
            chain_key: String::new(),
            timeout_secs: default_messaging_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "[UNSET]"
    } else {
        "[REDACTED]"
    }
}

impl fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("mode", &self.mode)
            .field("rpc_url", &self.rpc_url)
            .field("payer_key", &redact(&self.payer_key))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl fmt::Debug for MessagingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagingConfig")
            .field("enabled", &self.enabled)
            .field("endpoint", &self.endpoint)
            .field("environment", &self.environment)
            .field("app_name", &self.app_name)
            .field("account_key", &redact(&self.account_key))
            .field("chain_key", &redact(&self.chain_key))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl LedgerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Upper bound on `resolver.clock_skew_secs`.
pub const MAX_CLOCK_SKEW_SECS: u64 = 86_400;

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn clock_skew(&self) -> chrono::Duration {
        let secs = self.clock_skew_secs.min(MAX_CLOCK_SKEW_SECS);
        chrono::Duration::seconds(i64::try_from(secs).unwrap_or(0))
    }
}

impl MessagingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn environment(&self) -> Result<Environment, ConfigError> {
        self.environment
            .parse()
            .map_err(|e: sigil_messaging::MessagingError| ConfigError::Invalid {
                field: "messaging.environment",
                reason: e.to_string(),
            })
    }
}

impl AgentConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(toml::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        let io = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io)?;
            }
        }
        std::fs::write(path, contents).map_err(io)
    }

    /// Apply `SIGIL_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_ISSUER_ID) {
            self.issuer.identifier = v;
        }
        if let Some(v) = get(ENV_LEDGER_RPC_URL) {
            self.ledger.rpc_url = v;
        }
        if let Some(v) = get(ENV_LEDGER_PAYER_KEY) {
            self.ledger.payer_key = v;
        }
        if let Some(v) = get(ENV_MESSAGING_APP_NAME) {
            self.messaging.app_name = v;
        }
        if let Some(v) = get(ENV_MESSAGING_ACCOUNT_KEY) {
            self.messaging.account_key = v;
        }
        if let Some(v) = get(ENV_MESSAGING_CHAIN_KEY) {
            self.messaging.chain_key = v;
        }
        if let Some(v) = get(ENV_RESOLVER_URL) {
            self.resolver.universal_resolver_url = Some(v);
        }
    }

    /// Switch to a process-local ledger with messaging off.
    pub fn offline(&mut self) {
        self.ledger.mode = LedgerMode::Memory;
        self.messaging.enabled = false;
    }

    /// Network of the configured issuer identifier.
    pub fn network(&self) -> Result<Network, ConfigError> {
        Network::from_identifier(&self.issuer.identifier).map_err(|e| {
            ConfigError::InvalidNetwork {
                identifier: self.issuer.identifier.clone(),
                reason: e.to_string(),
            }
        })
    }

    /// Check that every setting the agent needs at startup is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.identifier.trim().is_empty() {
            return Err(ConfigError::Missing("issuer.identifier"));
        }
        Did::parse(self.issuer.identifier.as_str()).map_err(|e| ConfigError::Invalid {
            field: "issuer.identifier",
            reason: e.to_string(),
        })?;
        self.network()?;
        if self.issuer.alias.trim().is_empty() {
            return Err(ConfigError::Missing("issuer.alias"));
        }

        if self.ledger.mode == LedgerMode::Rpc {
            if self.ledger.rpc_url.trim().is_empty() {
                return Err(ConfigError::Missing("ledger.rpc_url"));
            }
            check_url("ledger.rpc_url", &self.ledger.rpc_url)?;
            if self.ledger.payer_key.trim().is_empty() {
                return Err(ConfigError::Missing("ledger.payer_key"));
            }
            check_positive("ledger.timeout_secs", self.ledger.timeout_secs)?;
        }

        check_positive("resolver.timeout_secs", self.resolver.timeout_secs)?;
        if self.resolver.clock_skew_secs > MAX_CLOCK_SKEW_SECS {
            return Err(ConfigError::Invalid {
                field: "resolver.clock_skew_secs",
                reason: format!("must be at most {}", MAX_CLOCK_SKEW_SECS),
            });
        }
        if let Some(url) = &self.resolver.universal_resolver_url {
            check_url("resolver.universal_resolver_url", url)?;
        }

        if self.messaging.enabled {
            if self.messaging.app_name.trim().is_empty() {
                return Err(ConfigError::Missing("messaging.app_name"));
            }
            if self.messaging.account_key.trim().is_empty() {
                return Err(ConfigError::Missing("messaging.account_key"));
            }
            if self.messaging.chain_key.trim().is_empty() {
                return Err(ConfigError::Missing("messaging.chain_key"));
            }
            check_url("messaging.endpoint", &self.messaging.endpoint)?;
            check_positive("messaging.timeout_secs", self.messaging.timeout_secs)?;
            self.messaging.environment()?;
        }

        match self.logging.format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(ConfigError::Invalid {
                field: "logging.format",
                reason: format!("expected text or json, got {}", other),
            }),
        }
    }
}

fn check_positive(field: &'static str, secs: u64) -> Result<(), ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be positive".into(),
        });
    }
    Ok(())
}

fn check_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigError::Invalid {
            field,
            reason: e.to_string(),
        })
}
