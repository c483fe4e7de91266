//! Panel tuning loaded from TOML.
//!
//! Falls back to sensible defaults if the file is missing or incomplete.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Fixed per-item cell geometry used by the grid virtualizer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CellConfig {
    pub width: f32,
    pub height: f32,
    pub gap: f32,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            width: 96.0,
            height: 96.0,
            gap: 8.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub cell: CellConfig,
    /// How long a confirmation popup stays on screen.
    pub popup_duration_secs: f64,
    /// Optional watchdog: a busy panel past this deadline clears its gate
    /// and refetches authoritative state. `None` disables the watchdog.
    pub response_timeout_secs: Option<f64>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            cell: CellConfig::default(),
            popup_duration_secs: 4.0,
            response_timeout_secs: None,
        }
    }
}

impl PanelConfig {
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load from `path`, falling back to defaults when the file is missing
    /// or malformed.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("Invalid panel config at {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}
