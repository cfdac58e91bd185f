//! `sigil init`: write a default configuration file.

use clap::Args;
use std::path::Path;

use sigil_agent::AgentConfig;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Issuer identifier to put in the file, `did:cheqd:<network>:<id>`.
    #[arg(long)]
    pub issuer: Option<String>,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: &InitArgs, path: &Path) -> anyhow::Result<()> {
    if path.exists() && !args.force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let mut config = AgentConfig::default();
    if let Some(issuer) = &args.issuer {
        config.issuer.identifier = issuer.clone();
    }
    config.save(path)?;
    tracing::info!(path = %path.display(), "wrote default config");
    println!("Wrote {}", path.display());
    Ok(())
}
