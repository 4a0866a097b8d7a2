//! `uptimed.toml` configuration.
//!
//! ```toml
//! [settings]            # same keys as the settings JSON, camelCase
//! checkInterval = 5
//! autoRestart = true
//!
//! [inventory]
//! url = "http://127.0.0.1:3001/api/services"
//! include_system = false
//!
//! [diagnostics]
//! endpoint = "https://generativelanguage.googleapis.com"
//! model = "gemini-2.5-flash"
//! api_key_env = "GEMINI_API_KEY"
//! ```
//!
//! Keys present under `[settings]` override the persisted settings,
//! which in turn override the defaults.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use uptime_adapters::diagnostics::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use uptime_state::Settings;

pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Partial settings overlay.
    pub settings: toml::Table,
    pub inventory: InventoryConfig,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub url: Option<String>,
    pub include_system: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key_env: String,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay the `[settings]` table on `base` and validate the result.
    pub fn resolve_settings(&self, base: Option<Settings>) -> anyhow::Result<Settings> {
        let mut merged = serde_json::to_value(base.unwrap_or_default())?;
        let overlay = serde_json::to_value(&self.settings)?;
        if let (Some(target), Some(source)) = (merged.as_object_mut(), overlay.as_object()) {
            for (key, value) in source {
                target.insert(key.clone(), value.clone());
            }
        }
        let settings: Settings =
            serde_json::from_value(merged).context("invalid [settings] value")?;
        settings.validate()?;
        Ok(settings)
    }

    /// The diagnostics API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.diagnostics.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}
