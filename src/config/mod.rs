//! Configuration management
//!
//! Handles loading, parsing, and validation of the YAML configuration file.
//! Configuration documents uploaded by the editor are JSON; they are merged
//! over the file configuration at the next start.

use crate::midi_control::{MidiControl, MidiControlBinding};
use crate::router::{Interface, RouterConfig, MAX_PORT};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    /// System MIDI ports backing each interface port
    #[serde(default)]
    pub ports: Vec<PortMapping>,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Navigation bindings on the control port
    #[serde(default)]
    pub midi_control: Vec<MidiControlBinding>,
    /// Flush period of the processing loop
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

/// One interface port bound to system MIDI ports by name substring
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PortMapping {
    pub interface: Interface,
    pub port: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Overrides the platform data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ports: Vec::new(),
            router: RouterConfig::default(),
            storage: StorageConfig::default(),
            midi_control: Vec::new(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load the file if present, defaults otherwise
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !fs::try_exists(path).await.unwrap_or(false) {
            return Ok(Self::default());
        }
        Self::load(path).await
    }

    /// Save configuration to file
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Merge an uploaded JSON document over this configuration. Top-level
    /// sections present in the document replace the current ones.
    pub fn merge_json(&self, document: &[u8]) -> Result<Self> {
        let overlay: serde_json::Value =
            serde_json::from_slice(document).context("Configuration document is not JSON")?;
        let serde_json::Value::Object(overlay) = overlay else {
            anyhow::bail!("Configuration document must be a JSON object");
        };

        let mut merged = serde_json::to_value(self).context("Failed to serialize config")?;
        if let serde_json::Value::Object(base) = &mut merged {
            base.extend(overlay);
        }

        let config: AppConfig =
            serde_json::from_value(merged).context("Invalid configuration document")?;
        config.validate()?;
        Ok(config)
    }

    /// JSON form returned to configuration requests
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize config to JSON")
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 || self.tick_ms > 1000 {
            anyhow::bail!("tick_ms {} is invalid (must be 1-1000)", self.tick_ms);
        }

        self.router.validate().context("Invalid router section")?;

        let mut seen = HashSet::new();
        for mapping in &self.ports {
            if mapping.port > MAX_PORT {
                anyhow::bail!(
                    "Port mapping {}:{} is invalid (port must be 0-{})",
                    mapping.interface,
                    mapping.port,
                    MAX_PORT
                );
            }
            let named = |name: &Option<String>| name.as_deref().is_some_and(|n| !n.is_empty());
            if !named(&mapping.input) && !named(&mapping.output) {
                anyhow::bail!(
                    "Port mapping {}:{} names neither input nor output",
                    mapping.interface,
                    mapping.port
                );
            }
            if !seen.insert((mapping.interface, mapping.port)) {
                anyhow::bail!("Port {}:{} is mapped twice", mapping.interface, mapping.port);
            }
        }

        MidiControl::new(self.midi_control.clone())
            .validate()
            .context("Invalid midi_control section")?;

        Ok(())
    }
}

fn default_tick_ms() -> u64 {
    10
}
