use anyhow::Result;
use codesmith::agent::{Agent, AgentOutput, Request};
use codesmith::tools::{ExplainCodeRequest, GenerateCodeRequest};

use crate::cli::Command;

/// The subcommand already names the tool, so no instruction string is parsed
pub fn request(command: &Command) -> Request {
    match command {
        Command::Write { language, task } => {
            Request::GenerateCode(GenerateCodeRequest::new(language.trim(), task.trim()))
        }
        Command::Explain { language, code } => {
            Request::ExplainCode(ExplainCodeRequest::new(language.trim(), code.as_str()))
        }
    }
}

pub async fn handle_run(agent: &Agent, command: &Command) -> Result<AgentOutput> {
    let request = request(command);
    tracing::debug!(?request, "running command");
    agent.run(request).await
}
