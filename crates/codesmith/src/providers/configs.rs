use anyhow::{Context, Result};
use std::env;
use std::fmt;

pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const DEFAULT_MODEL_NAME: &str = "gpt-3.5-turbo-0125";

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const MODEL_NAME_ENV: &str = "OPENAI_MODEL_NAME";
pub const HOST_ENV: &str = "OPENAI_HOST";

/// The model used when nothing overrides it, `OPENAI_MODEL_NAME` if set
pub fn default_model_name() -> String {
    env::var(MODEL_NAME_ENV)
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string())
}

#[derive(Clone)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
}

impl OpenAiProviderConfig {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            host: OPENAI_HOST.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    /// Read the credential and optional host from the process environment
    pub fn from_env() -> Result<Self> {
        let api_key = env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .with_context(|| format!("{} must be set to call the model", API_KEY_ENV))?;
        let host = env::var(HOST_ENV).unwrap_or_else(|_| OPENAI_HOST.to_string());
        Ok(Self::new(api_key).with_host(host))
    }
}

impl fmt::Debug for OpenAiProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProviderConfig")
            .field("host", &self.host)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Per call sampling settings
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: Option<f32>,
}

impl ModelSettings {
    pub fn new<S: Into<String>>(model: S) -> Self {
        Self {
            model: model.into(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}
