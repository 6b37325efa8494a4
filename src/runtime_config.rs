// =============================================================================
// Runtime configuration - static startup settings
// =============================================================================
//
// All settings are fixed at startup: an optional JSON file is loaded first
// and environment variables are layered on top in main. Every field carries
// a serde default so an older or partial config file still deserialises.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbols() -> Vec<String> {
    vec![
        "AAPL".to_string(),
        "MSFT".to_string(),
        "GOOGL".to_string(),
        "AMZN".to_string(),
        "META".to_string(),
    ]
}

fn default_fetch_interval_secs() -> u64 {
    30
}

fn default_history_capacity() -> usize {
    100
}

fn default_forward_threshold() -> usize {
    5
}

fn default_listen_port() -> u16 {
    8080
}

fn default_predictor_host() -> String {
    "localhost".to_string()
}

fn default_predictor_port() -> u16 {
    5001
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration for the QuotePulse collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Symbols the collector tracks. Fixed for the process lifetime.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Seconds between fetch attempts per symbol.
    #[serde(default = "default_fetch_interval_secs")]
    pub fetch_interval_secs: u64,

    /// Maximum readings retained per symbol.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Minimum history length before batches are forwarded for prediction.
    #[serde(default = "default_forward_threshold")]
    pub forward_threshold: usize,

    /// HTTP listen port for the read API.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Host of the prediction service.
    #[serde(default = "default_predictor_host")]
    pub predictor_host: String,

    /// Port of the prediction service.
    #[serde(default = "default_predictor_port")]
    pub predictor_port: u16,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            fetch_interval_secs: default_fetch_interval_secs(),
            history_capacity: default_history_capacity(),
            forward_threshold: default_forward_threshold(),
            listen_port: default_listen_port(),
            predictor_host: default_predictor_host(),
            predictor_port: default_predictor_port(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = ?config.symbols,
            "config loaded"
        );

        Ok(config)
    }
}

// =============================================================================
// Tests
// =============================================================================
