// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::CameraBackendType;
use crate::constants::{
    DEFAULT_EDGE_HIGH_THRESHOLD, DEFAULT_EDGE_LOW_THRESHOLD, DEFAULT_POLL_TIMEOUT,
    DEFAULT_STOP_TIMEOUT,
};
use crate::errors::AppResult;
use crate::processing::ProcessorKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Directory name under the user config dir
pub const CONFIG_DIR_NAME: &str = "edge-camera";
/// Config file name inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera backend to capture from
    pub backend: CameraBackendType,
    /// Processor applied to every frame
    pub processor: ProcessorKind,
    /// Lower hysteresis threshold of the edge detector
    pub edge_low_threshold: u16,
    /// Upper hysteresis threshold of the edge detector
    pub edge_high_threshold: u16,
    /// Longest wait for the capture thread when stopping, in milliseconds
    pub stop_timeout_ms: u64,
    /// Longest single wait for a camera frame, in milliseconds
    pub poll_timeout_ms: u64,
    /// Default tracing filter, used when RUST_LOG is not set
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: CameraBackendType::default(),
            processor: ProcessorKind::default(),
            edge_low_threshold: DEFAULT_EDGE_LOW_THRESHOLD,
            edge_high_threshold: DEFAULT_EDGE_HIGH_THRESHOLD,
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT.as_millis() as u64,
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT.as_millis() as u64,
            log_filter: "warn".to_string(),
        }
    }
}

impl Config {
    /// `<config_dir>/edge-camera/config.json`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from the default location; never fails
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config directory, using defaults");
                Self::default()
            }
        }
    }

    /// Load from `path`
    ///
    /// A missing file yields the defaults silently; an unreadable or malformed
    /// one yields the defaults with a warning.
    pub fn load_from(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(config) => {
                debug!(path = %path.display(), "Loaded config");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed config, using defaults");
                Self::default()
            }
        }
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms.max(1))
    }
}
