use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;

use super::base::{Completion, Provider, Usage};
use super::configs::ModelSettings;
use crate::models::message::Message;
use crate::models::tool::Tool;

/// One call the mock received
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub settings: ModelSettings,
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<Tool>,
}

/// A mock provider that returns pre-configured responses and records every call
#[derive(Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<Message>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<Message>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        settings: &ModelSettings,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<Completion> {
        self.calls.lock().unwrap().push(RecordedCall {
            settings: settings.clone(),
            system: system.to_string(),
            messages: messages.to_vec(),
            tools: tools.to_vec(),
        });

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Err(anyhow!("MockProvider has no responses left"))
        } else {
            Ok(Completion::new(responses.remove(0), Usage::default()))
        }
    }
}
