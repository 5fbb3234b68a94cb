use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILE: &str = ".repo-review.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .repo-review.toml.
/// All fields are optional — the tool works with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Hosted model settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Repository flattening tool settings
    #[serde(default)]
    pub flatten: FlattenConfig,

    /// Where and how the spreadsheet is written
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Gemini model name (e.g., "gemini-2.5-pro")
    pub name: String,
    /// Base URL of the Generative Language API
    pub base_url: String,
    /// API key. If None, falls back to the env var named by `api_key_env`.
    pub api_key: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// HTTP timeout for the review call, in seconds
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gemini-2.5-pro".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: None,
            api_key_env: "GOOGLE_API_KEY".to_string(),
            timeout_secs: 600,
        }
    }
}

impl ModelConfig {
    /// Resolve the API key: config file value takes precedence,
    /// falls back to the configured env var. Blank values count as unset.
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                std::env::var(&self.api_key_env)
                    .ok()
                    .filter(|key| !key.trim().is_empty())
            })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FlattenConfig {
    /// Executable used to serialize the repository into XML
    pub program: String,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            program: "repomix".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for the spreadsheet. None means the current directory.
    pub dir: Option<PathBuf>,
    /// File name prefix; the timestamp and extension are appended
    pub file_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            file_prefix: "code_review".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Config {
    /// Load configuration from .repo-review.toml in the current directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(CONFIG_FILE);
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }
}
