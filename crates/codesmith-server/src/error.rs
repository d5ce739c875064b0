use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid server address: {0}")]
    InvalidAddress(String),

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}
