use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OverseerConfig {
    pub orchestrator: OrchestratorConfig,
    pub polling: PollingConfig,
    pub events: EventsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,
}

/// Which event stream backs granular sub-step telemetry.
///
/// Consumers never branch on this; the selection happens once when the
/// stream is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    #[default]
    Simulated,
    Live,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    #[serde(default)]
    pub source: EventSource,

    /// Delay between simulator emissions. Tests set this to zero.
    #[serde(default = "default_sim_step_delay")]
    pub sim_step_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json_format: bool,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_sim_step_delay() -> u64 {
    400
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            source: EventSource::default(),
            sim_step_delay_ms: default_sim_step_delay(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

/// Returns the Overseer configuration directory (`~/.config/overseer`).
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("overseer"))
}

impl OverseerConfig {
    /// Load configuration by layering, in order of increasing precedence:
    /// built-in defaults, an optional `config.toml` in the config directory,
    /// and `OVERSEER_*` environment variables (e.g.
    /// `OVERSEER_ORCHESTRATOR__BASE_URL`).
    pub fn load() -> Result<Self, ConfigLoadError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(dir) = get_config_dir() {
            let file = dir.join("config");
            builder = builder.add_source(File::from(file).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix("OVERSEER")
                .separator("__")
                .try_parsing(true),
        );

        let config: OverseerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.polling.interval_ms == 0 {
            return Err(ConfigLoadError::InvalidValue {
                key: "polling.interval_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.orchestrator.base_url.is_empty() {
            return Err(ConfigLoadError::InvalidValue {
                key: "orchestrator.base_url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
