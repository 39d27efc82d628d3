use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ai: AiSettings,
    #[serde(default)]
    pub typing: TypingConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub gemini_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiSettings {
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    pub timeout_ms: u64,
}

impl Default for AiSettings {
    fn default() -> Self {
        let defaults = parley_types::AiConfig::default();
        Self {
            model: defaults.model,
            temperature: defaults.temperature,
            max_output_tokens: defaults.max_output_tokens,
            timeout_ms: defaults.request_timeout.as_millis() as u64,
        }
    }
}

impl From<AiSettings> for parley_types::AiConfig {
    fn from(settings: AiSettings) -> Self {
        Self {
            model: settings.model,
            temperature: settings.temperature,
            max_output_tokens: settings.max_output_tokens,
            request_timeout: Duration::from_millis(settings.timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypingConfig {
    /// Inactivity after which "is typing" is cleared
    pub idle_timeout_ms: u64,
}

impl TypingConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self { idle_timeout_ms: 1500 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".parley/session.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables prefixed `PARLEY_`, sections split by `__`
    ///    (e.g. `PARLEY_TYPING__IDLE_TIMEOUT_MS=2000`)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("PARLEY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;

        let mut cfg: Config = config.try_deserialize()?;

        // The API key never lives in TOML; without it AI features are disabled
        cfg.gemini_api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty());

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }
}
