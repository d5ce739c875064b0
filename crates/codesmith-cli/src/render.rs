use anyhow::{anyhow, Result};
use bat::PrettyPrinter;
use codesmith::agent::AgentStep;
use console::style;

use crate::cli::Command;

/// Print the final answer. Raw output goes to stdout untouched.
pub fn render_output(command: &Command, text: &str, pretty: bool) {
    if pretty {
        let language = match command {
            Command::Write { .. } => command.language(),
            Command::Explain { .. } => "markdown",
        };
        match highlight(text, language) {
            Ok(()) => return,
            Err(e) => tracing::debug!("falling back to plain output: {}", e),
        }
    }
    println!("{}", text);
}

fn highlight(text: &str, language: &str) -> Result<()> {
    PrettyPrinter::new()
        .input_from_bytes(text.as_bytes())
        .language(language)
        .print()
        .map_err(|e| anyhow!("{}", e))?;
    println!();
    Ok(())
}

/// Print the agent's steps to stderr
pub fn render_trace(steps: &[AgentStep]) {
    for step in steps {
        let line = match step {
            AgentStep::Thought(_) => style(step.to_string()).dim(),
            AgentStep::Action { .. } => style(step.to_string()).cyan(),
            AgentStep::Observation(_) => style(step.to_string()).green(),
            AgentStep::ParseError(_) => style(step.to_string()).yellow(),
        };
        eprintln!("{}", line);
    }
    eprintln!();
}
