mod types;

pub use types::*;

use crate::{Error, Result};
use std::env;
use tracing::debug;

pub async fn load() -> Result<Config> {
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

    debug!("Loading configuration from: {}", config_path);

    let config_str = tokio::fs::read_to_string(&config_path).await?;
    let config = from_yaml(&config_str)?;

    Ok(apply_env_overrides(config))
}

/// Parses a YAML configuration document.
pub fn from_yaml(config_str: &str) -> Result<Config> {
    let config: Config = serde_yaml::from_str(config_str)?;
    Ok(config)
}

/// Environment variables take precedence over the file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(token) = env::var("REPLICATE_API_TOKEN") {
        config.replicate.api_token = token;
    }
    if let Ok(path) = env::var("HISTORY_DB_PATH") {
        config.history.database_path = path;
    }
    config
}

/// Checks the settings needed to talk to the prediction API.
pub fn validate(config: &Config) -> Result<()> {
    if config.replicate.api_token.trim().is_empty() {
        return Err(Error::config(
            "replicate.api_token is empty; set it in the config file or REPLICATE_API_TOKEN",
        ));
    }
    url::Url::parse(&config.replicate.base_url)?;
    if !(0.0..=1.0).contains(&config.audio.volume) {
        return Err(Error::config(format!(
            "audio.volume must be between 0.0 and 1.0, got {}",
            config.audio.volume
        )));
    }
    Ok(())
}
