use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::base::{Completion, Provider, Usage};
use super::configs::{ModelSettings, OpenAiProviderConfig};
use super::utils::{
    check_openai_context_length_error, messages_to_openai_spec, openai_response_to_message,
    tools_to_openai_spec,
};
use crate::models::message::Message;
use crate::models::tool::Tool;

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    /// Build a provider from `OPENAI_API_KEY` and `OPENAI_HOST`
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiProviderConfig::from_env()?)
    }

    fn get_usage(data: &Value) -> Usage {
        let Some(usage) = data.get("usage") else {
            return Usage::default();
        };

        let input_tokens = usage
            .get("prompt_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let output_tokens = usage
            .get("completion_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let total_tokens = usage
            .get("total_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32)
            .or_else(|| match (input_tokens, output_tokens) {
                (Some(input), Some(output)) => Some(input + output),
                _ => None,
            });

        Usage::new(input_tokens, output_tokens, total_tokens)
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::OK => Ok(response.json().await?),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(anyhow!(
                "Authentication failed ({}), check the OpenAI API key",
                status
            )),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            _ => {
                // openai puts the reason in the body, surface it instead of the payload
                let body: Value = response.json().await.unwrap_or(Value::Null);
                if let Some(err) = body.get("error").and_then(check_openai_context_length_error) {
                    return Err(err.into());
                }
                Err(anyhow!("Request failed: {}\nResponse: {}", status, body))
            }
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        settings: &ModelSettings,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<Completion> {
        let system_message = json!({
            "role": "system",
            "content": system
        });

        let mut messages_array = vec![system_message];
        messages_array.extend(messages_to_openai_spec(messages));

        let mut payload = Map::new();
        payload.insert("model".to_string(), json!(settings.model));
        payload.insert("messages".to_string(), json!(messages_array));

        if !tools.is_empty() {
            payload.insert("tools".to_string(), json!(tools_to_openai_spec(tools)?));
        }
        if let Some(temp) = settings.temperature {
            payload.insert("temperature".to_string(), json!(temp));
        }

        tracing::debug!(model = %settings.model, tools = tools.len(), "requesting completion");
        let response = self.post(Value::Object(payload)).await?;

        if let Some(error) = response.get("error") {
            if let Some(err) = check_openai_context_length_error(error) {
                return Err(err.into());
            }
            return Err(anyhow!("OpenAI API error: {}", error));
        }

        let message = openai_response_to_message(&response)?;
        let usage = Self::get_usage(&response);
        tracing::debug!(?usage, "completion received");

        Ok(Completion::new(message, usage))
    }
}
