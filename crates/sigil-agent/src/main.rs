//! `sigil`: issue, verify and resolve from the command line.
//!
//! Every command except `init` builds one [`sigil_agent::Agent`] from the
//! configuration file plus `SIGIL_*` environment overrides. `init` never
//! reads the file it is about to write.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use sigil_agent::AgentConfig;

/// Sigil: DID-bound verifiable credentials.
#[derive(Parser, Debug)]
#[command(name = "sigil", version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, global = true, default_value = "sigil.toml")]
    config: PathBuf,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Use an in-memory ledger and disable messaging.
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration file.
    Init(commands::init::InitArgs),
    /// Issue a verifiable credential.
    Issue(commands::issue::IssueArgs),
    /// Verify a credential or a compact JWT.
    Verify(commands::verify::VerifyArgs),
    /// Resolve a DID to its document.
    Resolve(commands::resolve::ResolveArgs),
}

fn init_tracing(config: &AgentConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    // a subscriber may already be installed when run more than once
    let _ = if config.logging.format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run(Cli::parse()).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.command {
        Commands::Init(_) => AgentConfig::default(),
        _ => AgentConfig::load(&cli.config)?,
    };
    config.apply_env();
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.offline {
        config.offline();
    }
    init_tracing(&config);

    match &cli.command {
        Commands::Init(args) => commands::init::run(args, &cli.config),
        Commands::Issue(args) => commands::issue::run(args, config).await,
        Commands::Verify(args) => commands::verify::run(args, config).await,
        Commands::Resolve(args) => commands::resolve::run(args, config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn scratch_config() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sigil-cli-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sigil.toml");
        std::fs::write(&path, "[issuer\nidentifier = ").unwrap();
        path
    }

    fn cli(path: &Path, args: &[&str]) -> Cli {
        let mut argv = vec!["sigil", "--config", path.to_str().unwrap()];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn test_init_force_replaces_unparseable_config() {
        let path = scratch_config();
        let issuer = "did:cheqd:testnet:0c7d5e4f-2222-4333-8444-555566667777";

        run(cli(&path, &["init", "--force", "--issuer", issuer]))
            .await
            .unwrap();

        let written = AgentConfig::load(&path).unwrap();
        assert_eq!(written.issuer.identifier, issuer);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_init_without_force_keeps_existing_file() {
        let path = scratch_config();
        assert!(run(cli(&path, &["init"])).await.is_err());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[issuer\nidentifier = "
        );
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_other_commands_report_unparseable_config() {
        let path = scratch_config();
        let err = run(cli(&path, &["--offline", "resolve", "did:key:z6Mkabc"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("parsing config"), "{err}");
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
