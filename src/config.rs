use serde::Deserialize;

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub prediction: PredictionConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub clarify: ClarifyConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Deserialize, Clone)]
pub struct EngineConfig {
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_engine_timeout_secs")]
    pub timeout_secs: u64,
}

// Manual Debug impl to avoid leaking the API key
impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Deserialize, Clone)]
pub struct PredictionConfig {
    pub base_url: String,
    pub api_token: String,
}

// Manual Debug impl to avoid leaking the API token
impl std::fmt::Debug for PredictionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

/// Polling is deliberately fixed-interval: the remote prediction API is cheap
/// to query and the demo workloads finish within a minute. Tune the interval
/// here rather than expecting exponential backoff.
#[derive(Debug, Deserialize, Clone)]
pub struct PollConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: f64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_seconds: default_delay_seconds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClarifyConfig {
    /// Safety bound on clarification cycles before the loop gives up.
    #[serde(default = "default_max_cycles")]
    pub max_cycles: u32,
}

impl Default for ClarifyConfig {
    fn default() -> Self {
        Self {
            max_cycles: default_max_cycles(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent blocking engine calls.
    #[serde(default = "default_max_blocking")]
    pub max_blocking: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_blocking: default_max_blocking(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_engine_timeout_secs() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    30
}

fn default_delay_seconds() -> f64 {
    2.0
}

fn default_max_cycles() -> u32 {
    10
}

fn default_max_blocking() -> usize {
    4
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Load from file if specified
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            // Try default paths
            builder = builder.add_source(
                config::File::with_name("tendril")
                    .required(false),
            );
        }

        // Environment variable overrides with TENDRIL_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("TENDRIL")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    pub fn poll_delay(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.poll.delay_seconds)
    }
}
