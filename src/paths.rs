//! Application path management for portable and installed modes.
//!
//! - **Portable mode**: a `.portable` marker file next to the executable
//!   keeps config, presets, snapshots and logs in that directory.
//! - **Installed mode** (default): data lives in the platform data
//!   directory (`%APPDATA%\Electra Core`, `~/.local/share/Electra Core`).

use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application name used for directories in installed mode
const APP_NAME: &str = "Electra Core";

/// Application paths for config, data, and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Path to the configuration file
    pub config: PathBuf,
    /// Presets, scripts, pending configuration and snapshots
    pub data_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub is_portable: bool,
}

impl AppPaths {
    /// Detect the appropriate paths based on environment.
    ///
    /// In debug builds a `config.yaml` in the working directory selects that
    /// directory, so `cargo run` uses the project's files.
    ///
    /// Called before logging is initialized, hence `eprintln!`.
    pub fn detect() -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));

        #[cfg(debug_assertions)]
        {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            if cwd.join("config.yaml").exists() {
                eprintln!("[paths] DEV mode (config.yaml found in {})", cwd.display());
                return Self::portable(&cwd);
            }
        }

        if exe_dir.join(".portable").exists() {
            #[cfg(debug_assertions)]
            eprintln!("[paths] PORTABLE mode (.portable marker found)");
            return Self::portable(&exe_dir);
        }

        let base = dirs::data_dir().unwrap_or_else(|| {
            eprintln!("[paths] WARNING: no platform data directory, using {}", exe_dir.display());
            exe_dir.clone()
        });
        Self::installed(&base.join(APP_NAME))
    }

    /// Everything below `dir`
    pub fn portable(dir: &Path) -> Self {
        Self {
            config: dir.join("config.yaml"),
            data_dir: dir.join("data"),
            logs_dir: dir.join("logs"),
            is_portable: true,
        }
    }

    pub fn installed(app_dir: &Path) -> Self {
        Self {
            config: app_dir.join("config.yaml"),
            data_dir: app_dir.join("data"),
            logs_dir: app_dir.join("logs"),
            is_portable: false,
        }
    }

    /// Replace the data directory, e.g. from `--data-dir` or the config file
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Base directory, for display in logs
    pub fn base_dir(&self) -> PathBuf {
        self.config
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        for dir in [&self.data_dir, &self.logs_dir] {
            if !dir.exists() {
                debug!("Creating directory: {}", dir.display());
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
        }

        if let Some(config_parent) = self.config.parent() {
            if !config_parent.as_os_str().is_empty() && !config_parent.exists() {
                debug!("Creating config directory: {}", config_parent.display());
                std::fs::create_dir_all(config_parent).with_context(|| {
                    format!("Failed to create {}", config_parent.display())
                })?;
            }
        }

        Ok(())
    }
}
