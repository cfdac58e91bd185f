//! Integration test: configuration file to a working agent.

use std::sync::atomic::{AtomicUsize, Ordering};

use sigil_agent::{Agent, AgentConfig, AgentError, ConfigError, LedgerMode};
use sigil_credentials::CredentialRequest;
use sigil_integration_tests::KEY_SUBJECT;

const CONFIG: &str = r#"
[issuer]
identifier = "did:cheqd:mainnet:7e1b2c3d-4e5f-4a6b-8c7d-9e0f1a2b3c4d"
alias = "registrar"

[ledger]
mode = "memory"

[resolver]
timeout_secs = 5
cache_ttl_secs = 0

[logging]
format = "json"
"#;

#[tokio::test]
async fn test_toml_config_builds_agent() {
    let config: AgentConfig = toml_from_str(CONFIG);
    assert_eq!(config.ledger.mode, LedgerMode::Memory);

    let agent = Agent::builder(config).build().await.expect("agent");
    let issuer = agent.issuer_identifier().await.unwrap();
    assert_eq!(issuer.alias, "registrar");
    assert!(issuer.did.as_str().starts_with("did:cheqd:mainnet:"));

    let outcome = agent
        .issue_credential(CredentialRequest::new(KEY_SUBJECT))
        .await
        .unwrap();
    assert_eq!(outcome.credential.issuer.id, issuer.did.as_str());
}

#[tokio::test]
async fn test_missing_ledger_settings_fail_fast() {
    let mut config: AgentConfig = toml_from_str(CONFIG);
    config.ledger.mode = LedgerMode::Rpc;
    assert!(matches!(
        Agent::builder(config).build().await,
        Err(AgentError::Config(ConfigError::Missing("ledger.rpc_url")))
    ));
}

#[tokio::test]
async fn test_env_style_overrides_fill_required_settings() {
    let mut config = AgentConfig::default();
    config.apply_overrides(|key| match key {
        "SIGIL_ISSUER_ID" => Some("did:cheqd:testnet:from-env".to_string()),
        "SIGIL_LEDGER_RPC_URL" => Some("http://127.0.0.1:26657".to_string()),
        "SIGIL_LEDGER_PAYER_KEY" => Some("payer".to_string()),
        _ => None,
    });
    assert!(config.validate().is_ok());
}

fn toml_from_str(text: &str) -> AgentConfig {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    let path = std::env::temp_dir().join(format!(
        "sigil-it-{}-{}.toml",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::write(&path, text).unwrap();
    let config = AgentConfig::load(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    config
}
