//! TOML-based configuration system for Slate.

use crate::error::{Result, SlateError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level Slate configuration, deserialized from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlateConfig {
    pub slate: SlateSection,
    #[serde(default)]
    pub sis: SisConfig,
}

/// Core Slate instance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlateSection {
    pub instance_name: String,
    pub data_dir: String,
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Database backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: Some("/var/lib/slate/slate.db".into()),
        }
    }
}

/// SIS (Student Information System) integration configuration.
///
/// These values seed the durable credential row on first use; the access
/// token itself is owned by the token manager and never lives in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SisConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the SIS server (e.g. `https://district.powerschool.com`).
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Page size for named-query pagination windows.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Optional wall-clock deadline for a single entity sync step.
    #[serde(default)]
    pub step_deadline_secs: Option<u64>,
}

impl Default for SisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout(),
            step_deadline_secs: None,
        }
    }
}

fn default_page_size() -> u64 {
    500
}

fn default_request_timeout() -> u64 {
    30
}

impl SlateConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| SlateError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Serialize the configuration back to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SlateError::Config(format!("failed to serialize config: {e}")))
    }

    /// Validate cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.slate.instance_name.trim().is_empty() {
            return Err(SlateError::Config("instance_name must not be empty".into()));
        }
        if self.slate.database.path.as_deref().unwrap_or("").is_empty() {
            return Err(SlateError::Config("database path not configured".into()));
        }
        if self.sis.enabled {
            if self.sis.base_url.trim().is_empty() {
                return Err(SlateError::Config(
                    "sis.base_url is required when SIS integration is enabled".into(),
                ));
            }
            if self.sis.page_size == 0 {
                return Err(SlateError::Config("sis.page_size must be at least 1".into()));
            }
        }
        Ok(())
    }
}
