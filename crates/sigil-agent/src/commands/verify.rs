//! `sigil verify`: verify a credential or a compact JWT.

use clap::Args;

use sigil_agent::{Agent, AgentConfig};
use sigil_credentials::VerifyInput;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Credential JSON, compact JWT, a file holding either, or `-` for stdin.
    #[arg(short, long)]
    pub credential: String,
}

pub async fn run(args: &VerifyArgs, config: AgentConfig) -> anyhow::Result<()> {
    let text = super::read_input(&args.credential)?;
    let input = VerifyInput::parse(&text)?;

    let agent = Agent::builder(config).build().await?;
    let result = agent.verify_credential(input).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.verified {
        anyhow::bail!("credential from {} did not verify", result.issuer);
    }
    Ok(())
}
