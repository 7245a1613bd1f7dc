use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transcription: TranscriptionConfig,
    pub summary: SummaryConfig,
    pub detector: DetectorConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Streaming speech-to-text provider. Only "deepgram" is supported.
    pub provider: String,
    /// API key for the provider. Recording is unavailable until this is set.
    pub api_key: Option<String>,
    /// Override the provider's websocket endpoint.
    pub endpoint: Option<String>,
    pub model: String,
    pub language: String,
    /// Sample rate of the PCM audio the host shell captures.
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// API key for the summarization backend. Summaries are skipped without one.
    pub api_key: Option<String>,
    /// Override the backend endpoint.
    pub endpoint: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Poll for meeting windows and auto-stop recording when they vanish.
    pub enabled: bool,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub port: u16,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            provider: "deepgram".to_string(),
            api_key: None,
            endpoint: None,
            model: "nova-2".to_string(),
            language: "en".to_string(),
            sample_rate: 16000,
        }
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: None,
            model: "claude-sonnet-4-20250514".to_string(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 3000,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 7878 }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
