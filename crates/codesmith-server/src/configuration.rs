use crate::error::ConfigError;
use codesmith::providers::configs::{API_KEY_ENV, HOST_ENV, OPENAI_HOST};
use config::{Config, Environment};
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(format!("{}:{}", self.host, self.port)))
    }
}

#[derive(Debug, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_openai_host")]
    pub host: String,
    /// Overrides the process wide default model
    #[serde(default)]
    pub model: Option<String>,
    /// Used by the JSON endpoint when a request carries no key of its own
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            host: default_openai_host(),
            model: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub provider: ProviderSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load()
    }

    fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("provider.host", default_openai_host())?;

        // the standard openai variable is the fallback credential
        if let Ok(api_key) = std::env::var(API_KEY_ENV) {
            builder = builder.set_default("provider.api_key", api_key)?;
        }

        let config = builder
            .add_source(
                Environment::with_prefix("CODESMITH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        // every field has a default, so only malformed values can fail here
        config.try_deserialize().map_err(|err| {
            tracing::debug!("Configuration error: {:?}", &err);
            ConfigError::Other(err)
        })
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_openai_host() -> String {
    std::env::var(HOST_ENV).unwrap_or_else(|_| OPENAI_HOST.to_string())
}
