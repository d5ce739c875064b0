//! The two prompt tools: write code for a task, and explain a snippet.
//!
//! Each tool builds a system instruction, sends it with one user message to the
//! model and hands back the model's text untouched.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::prompt_template::load_prompt;
use crate::providers::base::Provider;
use crate::providers::configs::ModelSettings;

pub const GENERATE_CODE: &str = "generate_code";
pub const EXPLAIN_CODE: &str = "explain_code";

pub const GENERATE_CODE_TEMPERATURE: f32 = 0.0;
pub const EXPLAIN_CODE_TEMPERATURE: f32 = 0.2;

const GENERATE_CODE_PROMPT: &str = include_str!("prompts/generate_code.md");
const EXPLAIN_CODE_PROMPT: &str = include_str!("prompts/explain_code.md");

/// Split `"<language>,<body>"` on the first comma
fn split_bundled<'a>(query: &'a str, body_name: &str) -> AgentResult<(&'a str, &'a str)> {
    let (language, body) = query.split_once(',').ok_or_else(|| {
        AgentError::InvalidInstruction(format!(
            "expected \"<language>,<{}>\" but found no comma in {:?}",
            body_name, query
        ))
    })?;
    Ok((language.trim(), body))
}

fn require_non_empty(value: &str, field: &str) -> AgentResult<()> {
    if value.trim().is_empty() {
        return Err(AgentError::InvalidParameters(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateCodeRequest {
    pub language: String,
    pub task: String,
}

impl GenerateCodeRequest {
    pub fn new<L: Into<String>, T: Into<String>>(language: L, task: T) -> Self {
        Self {
            language: language.into(),
            task: task.into(),
        }
    }

    /// Parse the bundled `"python,compute a factorial"` form
    pub fn from_bundled(query: &str) -> AgentResult<Self> {
        let (language, task) = split_bundled(query, "task")?;
        let request = Self::new(language, task.trim());
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> AgentResult<()> {
        require_non_empty(&self.language, "language")?;
        require_non_empty(&self.task, "task")
    }

    pub fn system_prompt(&self) -> AgentResult<String> {
        let mut context = HashMap::new();
        context.insert("language", &self.language);
        load_prompt(GENERATE_CODE_PROMPT, &context).map_err(|e| AgentError::Internal(e.to_string()))
    }

    pub fn messages(&self) -> Vec<Message> {
        vec![Message::user().with_text(&self.task)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainCodeRequest {
    pub language: String,
    pub code: String,
}

impl ExplainCodeRequest {
    pub fn new<L: Into<String>, C: Into<String>>(language: L, code: C) -> Self {
        Self {
            language: language.into(),
            code: code.into(),
        }
    }

    /// Parse the bundled `"javascript,<code>"` form, the code is kept as is
    pub fn from_bundled(query: &str) -> AgentResult<Self> {
        let (language, code) = split_bundled(query, "code")?;
        let request = Self::new(language, code);
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> AgentResult<()> {
        require_non_empty(&self.language, "language")?;
        require_non_empty(&self.code, "code")
    }

    pub fn system_prompt(&self) -> AgentResult<String> {
        let mut context = HashMap::new();
        context.insert("language", &self.language);
        load_prompt(EXPLAIN_CODE_PROMPT, &context).map_err(|e| AgentError::Internal(e.to_string()))
    }

    pub fn messages(&self) -> Vec<Message> {
        vec![Message::user().with_text(format!("Here is the code:\n{}", self.code))]
    }
}

/// Descriptors of the tools the model may pick from
pub fn tools() -> Vec<Tool> {
    vec![
        Tool::new(
            GENERATE_CODE,
            "Generate source code for a task in a given programming language. \
             Returns only the requested code, without explanation.",
            json!({
                "type": "object",
                "required": ["language", "task"],
                "properties": {
                    "language": {
                        "type": "string",
                        "description": "The programming language to write in, e.g. python"
                    },
                    "task": {
                        "type": "string",
                        "description": "A description of what the code should do"
                    }
                }
            }),
        ),
        Tool::new(
            EXPLAIN_CODE,
            "Explain what a piece of source code does, in terms a beginner can follow.",
            json!({
                "type": "object",
                "required": ["language", "code"],
                "properties": {
                    "language": {
                        "type": "string",
                        "description": "The programming language of the snippet"
                    },
                    "code": {
                        "type": "string",
                        "description": "The code snippet to explain"
                    }
                }
            }),
        ),
    ]
}

/// Ask the model for code only. The response text is returned verbatim.
pub async fn generate_code(
    provider: &dyn Provider,
    request: &GenerateCodeRequest,
    model: &str,
) -> Result<String> {
    request.validate()?;
    let settings = ModelSettings::new(model).with_temperature(GENERATE_CODE_TEMPERATURE);
    let completion = provider
        .complete(&settings, &request.system_prompt()?, &request.messages(), &[])
        .await?;
    Ok(completion.text())
}

/// Ask the model for a beginner friendly explanation of a snippet
pub async fn explain_code(
    provider: &dyn Provider,
    request: &ExplainCodeRequest,
    model: &str,
) -> Result<String> {
    request.validate()?;
    let settings = ModelSettings::new(model).with_temperature(EXPLAIN_CODE_TEMPERATURE);
    let completion = provider
        .complete(&settings, &request.system_prompt()?, &request.messages(), &[])
        .await?;
    Ok(completion.text())
}
