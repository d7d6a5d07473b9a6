//! Application Configuration Module
//!
//! Loads the interview service settings from environment variables into a single
//! struct that is handed to the runtime at startup.

use interview_core::decision::DecisionConfig;
use interview_core::session::SessionConfig;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

// --- Application Constants ---

/// Capacity of the session → runtime command channel.
pub const COMMAND_CHANNEL_SIZE: usize = 32;
/// Capacity of the runtime → presentation event channel.
pub const PRESENTATION_CHANNEL_SIZE: usize = 256;

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub gateway_url: Option<String>,
    pub voice_id: Option<String>,
    pub bank_dir: Option<PathBuf>,
    pub speech_timeout: Duration,
    pub transcribe_timeout: Duration,
    pub session: SessionConfig,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// *   `SPEECH_GATEWAY_URL`: (Optional) Base URL of the speech gateway. Without it the service runs offline.
    /// *   `SPEECH_VOICE_ID`: (Optional) Voice to request from the gateway.
    /// *   `INTERVIEW_BANK_DIR`: (Optional) Directory of `<profile>.json` question files.
    /// *   `SPEECH_TIMEOUT_MS`: (Optional) Upper bound for speech synthesis. Defaults to 10000.
    /// *   `TRANSCRIBE_TIMEOUT_MS`: (Optional) Upper bound for transcription. Defaults to 15000.
    /// *   `DECISION_SEED`: (Optional) Seed for the decision's random component.
    /// *   `DECISION_JITTER_MAX`: (Optional) Maximum random bonus added to the final score. Defaults to 0.
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let gateway_url = var("SPEECH_GATEWAY_URL").filter(|v| !v.trim().is_empty());
        let voice_id = var("SPEECH_VOICE_ID").filter(|v| !v.trim().is_empty());
        let bank_dir = var("INTERVIEW_BANK_DIR").map(PathBuf::from);

        let speech_timeout = Duration::from_millis(parse_or(&var, "SPEECH_TIMEOUT_MS", 10_000)?);
        let transcribe_timeout =
            Duration::from_millis(parse_or(&var, "TRANSCRIBE_TIMEOUT_MS", 15_000)?);

        let seed = match var("DECISION_SEED") {
            Some(raw) => Some(
                raw.parse::<u64>()
                    .map_err(|e| ConfigError::InvalidValue("DECISION_SEED".to_string(), e.to_string()))?,
            ),
            None => None,
        };
        let jitter_max: f64 = parse_or(&var, "DECISION_JITTER_MAX", 0.0)?;
        let session = SessionConfig {
            decision: DecisionConfig {
                jitter_max,
                ..DecisionConfig::default()
            },
            seed,
            ..SessionConfig::default()
        };
        session
            .validate()
            .map_err(|e| ConfigError::InvalidValue("DECISION_JITTER_MAX".to_string(), e.to_string()))?;

        // Configure logging level from RUST_LOG, with a sensible default.
        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            gateway_url,
            voice_id,
            bank_dir,
            speech_timeout,
            transcribe_timeout,
            session,
            log_level,
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
