use anyhow::Result;
use codesmith::agent::{Agent, AgentConfig};
use codesmith::providers::configs::OpenAiProviderConfig;
use codesmith::providers::openai::OpenAiProvider;
use std::sync::Arc;
use tera::Tera;

use crate::configuration::ProviderSettings;

const FORM_TEMPLATE: &str = include_str!("templates/form.html");

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub host: String,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub templates: Arc<Tera>,
}

impl AppState {
    pub fn new(provider: ProviderSettings) -> Result<Self> {
        let mut templates = Tera::default();
        templates.add_raw_template("form.html", FORM_TEMPLATE)?;

        Ok(Self {
            host: provider.host,
            model: provider.model,
            api_key: provider.api_key,
            templates: Arc::new(templates),
        })
    }

    /// Build an agent whose provider authenticates with the given key.
    ///
    /// The key stays scoped to this agent, the process environment is never touched.
    pub fn agent(&self, api_key: &str) -> Result<Agent> {
        let config = OpenAiProviderConfig::new(api_key).with_host(&self.host);
        let provider = OpenAiProvider::new(config)?;
        Ok(Agent::new(
            Box::new(provider),
            AgentConfig {
                model: self.model.clone(),
                verbose: true,
                ..AgentConfig::default()
            },
        ))
    }
}
