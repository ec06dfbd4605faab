//! Configuration types for the webterm client.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ReconnectPolicy;

/// Client configuration loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server settings
    pub server: ServerSettings,
    /// Reconnection policy
    pub reconnect: ReconnectPolicy,
    /// Resize timing
    pub resize: ResizeSettings,
    /// Download settings
    pub download: DownloadSettings,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            reconnect: ReconnectPolicy::default(),
            resize: ResizeSettings::default(),
            download: DownloadSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        let config: ClientConfig =
            serde_yaml::from_str(yaml).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> crate::Result<()> {
        if self.server.base_url.trim().is_empty() {
            return Err(crate::Error::Config(
                "server.base_url cannot be empty".to_string(),
            ));
        }

        self.reconnect.validate()?;

        if self.resize.debounce_ms == 0 {
            return Err(crate::Error::Config(
                "resize.debounce_ms must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Base URL of the terminal server (http, https, ws or wss)
    pub base_url: String,
    /// Origin for `/download` requests; derived from the socket URL when unset
    pub download_origin: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            download_origin: None,
        }
    }
}

/// Resize timing settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeSettings {
    /// Quiet period before a surface change is applied, in milliseconds
    pub debounce_ms: u64,
    /// Delay between the narrowed and the restored redraw-kick frames
    pub redraw_delay_ms: u64,
}

impl Default for ResizeSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            redraw_delay_ms: 75,
        }
    }
}

impl ResizeSettings {
    /// Debounce quiet period.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Redraw-kick restore delay.
    pub fn redraw_delay(&self) -> Duration {
        Duration::from_millis(self.redraw_delay_ms)
    }
}

/// Download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// Directory downloaded files are written to
    pub directory: PathBuf,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
        }
    }
}
