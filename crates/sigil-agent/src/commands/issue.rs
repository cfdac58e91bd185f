//! `sigil issue`: issue a verifiable credential.

use anyhow::Context;
use clap::Args;

use sigil_agent::{Agent, AgentConfig};
use sigil_credentials::CredentialRequest;

#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Credential request as JSON, a file holding it, or `-` for stdin.
    #[arg(short, long)]
    pub request: String,

    /// Print only the compact JWT.
    #[arg(long)]
    pub jwt: bool,
}

pub async fn run(args: &IssueArgs, config: AgentConfig) -> anyhow::Result<()> {
    let text = super::read_input(&args.request)?;
    let request: CredentialRequest =
        serde_json::from_str(&text).context("invalid credential request JSON")?;

    let agent = Agent::builder(config).build().await?;
    let outcome = agent.issue_credential(request).await?;

    if args.jwt {
        println!("{}", outcome.credential.jwt());
    } else {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }
    Ok(())
}
