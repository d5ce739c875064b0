use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::configs::ModelSettings;
use crate::models::message::Message;
use crate::models::tool::Tool;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// The reply of a model to one completion request
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub message: Message,
    pub usage: Usage,
}

impl Completion {
    pub fn new(message: Message, usage: Usage) -> Self {
        Self { message, usage }
    }

    /// The generated text, exactly as the model returned it
    pub fn text(&self) -> String {
        self.message.text()
    }
}

/// Base trait for chat completion backends
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next message for a system prompt and a conversation
    async fn complete(
        &self,
        settings: &ModelSettings,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<Completion>;
}
