use anyhow::Result;
use clap::Parser;
use codesmith::agent::{Agent, AgentConfig};
use codesmith::providers::openai::OpenAiProvider;

mod cli;
mod commands;
mod logging;
mod render;

use cli::Cli;
use commands::run::handle_run;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let provider = OpenAiProvider::from_env()?;
    let agent = Agent::new(
        Box::new(provider),
        AgentConfig {
            model: cli.model.clone(),
            verbose: cli.verbose,
            ..AgentConfig::default()
        },
    );

    let output = handle_run(&agent, &cli.command).await?;

    if cli.verbose {
        render::render_trace(&output.steps);
    }
    render::render_output(&cli.command, &output.text, cli.pretty);
    Ok(())
}
