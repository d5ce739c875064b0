use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};

use crate::errors::AgentError;
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};

lazy_static! {
    static ref VALID_NAME: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Convert internal Message format to OpenAI's API message specification.
///
/// Only text is sent, the agent never replays the model's own tool calls.
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .filter_map(|message| {
            let text = message.text();
            if text.is_empty() {
                return None;
            }
            Some(json!({
                "role": message.role,
                "content": text,
            }))
        })
        .collect()
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            }
        }));
    }

    Ok(result)
}

/// Read the generated text out of a choice.
///
/// OpenAI compatible backends disagree on where the text lives: a plain string in
/// `message.content`, an array of `{ "text": .. }` parts, or the legacy `text` field.
fn choice_text(choice: &Value) -> Option<String> {
    match choice.get("message").and_then(|m| m.get("content")) {
        Some(Value::String(text)) => return Some(text.clone()),
        Some(Value::Array(parts)) => {
            return Some(
                parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect(),
            )
        }
        _ => {}
    }
    choice.get("text").and_then(Value::as_str).map(String::from)
}

/// Convert OpenAI's API response to internal Message format
pub fn openai_response_to_message(response: &Value) -> Result<Message> {
    let choice = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .ok_or_else(|| anyhow!("Response did not contain any choices: {}", response))?;
    let mut content = Vec::new();

    if let Some(text) = choice_text(choice) {
        content.push(MessageContent::text(text));
    }

    let tool_calls = choice
        .get("message")
        .and_then(|m| m.get("tool_calls"))
        .and_then(Value::as_array);
    for tool_call in tool_calls.into_iter().flatten() {
        let id = tool_call["id"].as_str().unwrap_or_default().to_string();
        let function_name = tool_call["function"]["name"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let arguments = tool_call["function"]["arguments"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        if !is_valid_function_name(&function_name) {
            let error = AgentError::ToolNotFound(format!(
                "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
                function_name
            ));
            content.push(MessageContent::tool_request(id, Err(error)));
            continue;
        }

        match serde_json::from_str::<Value>(&arguments) {
            Ok(params) => {
                content.push(MessageContent::tool_request(
                    id,
                    Ok(ToolCall::new(&function_name, params)),
                ));
            }
            Err(e) => {
                let error = AgentError::InvalidParameters(format!(
                    "Could not interpret tool use parameters for id {}: {}",
                    id, e
                ));
                content.push(MessageContent::tool_request(id, Err(error)));
            }
        }
    }

    Ok(Message {
        role: Role::Assistant,
        created: chrono::Utc::now().timestamp(),
        content,
    })
}

fn is_valid_function_name(name: &str) -> bool {
    VALID_NAME.is_match(name)
}

#[derive(Debug, thiserror::Error)]
#[error("Context length exceeded. Message: {0}")]
pub struct ContextLengthExceededError(String);

pub fn check_openai_context_length_error(error: &Value) -> Option<ContextLengthExceededError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ContextLengthExceededError(message))
    } else {
        None
    }
}
