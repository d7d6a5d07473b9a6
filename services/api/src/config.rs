use crate::vendor::DEFAULT_TTS_MODEL;
use secrecy::SecretString;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub api_key: SecretString,
    pub default_voice_id: Option<String>,
    pub base_url: String,
    pub tts_model: String,
    pub upstream_timeout: Duration,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// This function will look for a `.env` file in the current directory
    /// and load the following variables:
    ///
    /// *   `BIND_ADDRESS`: The address and port to bind the server to. Defaults to "0.0.0.0:3000".
    /// *   `ELEVENLABS_API_KEY`: Secret key for the speech vendor. Required.
    /// *   `ELEVENLABS_VOICE_ID`: (Optional) Voice used when a request names none.
    /// *   `ELEVENLABS_BASE_URL`: (Optional) Vendor API root. Defaults to the public endpoint.
    /// *   `ELEVENLABS_TTS_MODEL`: (Optional) Text-to-speech model. Defaults to "eleven_multilingual_v2".
    /// *   `UPSTREAM_TIMEOUT_MS`: (Optional) Upper bound for each vendor call. Defaults to 20000.
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let api_key = var("ELEVENLABS_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingVar("ELEVENLABS_API_KEY".to_string()))?;

        let default_voice_id = var("ELEVENLABS_VOICE_ID").filter(|v| !v.trim().is_empty());
        let base_url = var("ELEVENLABS_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let tts_model = var("ELEVENLABS_TTS_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TTS_MODEL.to_string());

        let upstream_timeout = match var("UPSTREAM_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(raw.trim().parse::<u64>().map_err(|e| {
                ConfigError::InvalidValue("UPSTREAM_TIMEOUT_MS".to_string(), e.to_string())
            })?),
            None => Duration::from_secs(20),
        };

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            api_key,
            default_voice_id,
            base_url,
            tts_model,
            upstream_timeout,
            log_level,
        })
    }
}
