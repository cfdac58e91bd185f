//! `sigil resolve`: resolve a DID to its document.

use clap::Args;

use sigil_agent::{Agent, AgentConfig};

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// The DID to resolve.
    pub did: String,
}

pub async fn run(args: &ResolveArgs, config: AgentConfig) -> anyhow::Result<()> {
    let agent = Agent::builder(config).build().await?;
    let document = agent.resolve_did(&args.did).await?;
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}
