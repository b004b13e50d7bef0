//! Command-line tool configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use ytcast_core::CoreConfig;

/// Tool configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SSDP search window in seconds (clamped to 1..=5).
    /// Override: `YTCAST_SEARCH_TIMEOUT`
    pub search_timeout: u64,

    /// Timeout in seconds of every HTTP request.
    /// Override: `YTCAST_HTTP_TIMEOUT`
    pub http_timeout: u64,

    /// Maximum time in seconds to wait for the YouTube app to expose a screen id.
    /// Override: `YTCAST_LAUNCH_TIMEOUT`
    pub launch_timeout: u64,

    /// Delay in milliseconds between two app state checks while launching.
    pub launch_check_interval_ms: u64,

    /// Name displayed on the TV. Defaults to `ytcast@<hostname>`.
    /// Override: `YTCAST_DISPLAY_NAME`
    pub display_name: Option<String>,

    /// Local address of the SSDP search socket.
    pub ssdp_bind_addr: Option<SocketAddr>,

    /// Destination of Wake-on-LAN magic packets.
    /// Override: `YTCAST_WOL_BROADCAST_ADDR`
    pub wol_broadcast_addr: Option<SocketAddr>,

    /// Base URL of the Lounge API.
    /// Override: `YTCAST_LOUNGE_API_BASE`
    pub lounge_api_base: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            search_timeout: 3,
            http_timeout: 30,
            launch_timeout: 60,
            launch_check_interval_ms: 2000,
            display_name: None,
            ssdp_bind_addr: None,
            wol_broadcast_addr: None,
            lounge_api_base: None,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(secs) = var("YTCAST_SEARCH_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.search_timeout = secs;
        }
        if let Some(secs) = var("YTCAST_HTTP_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.http_timeout = secs;
        }
        if let Some(secs) = var("YTCAST_LAUNCH_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.launch_timeout = secs;
        }
        if let Some(name) = var("YTCAST_DISPLAY_NAME").filter(|v| !v.trim().is_empty()) {
            self.display_name = Some(name);
        }
        if let Some(addr) = var("YTCAST_WOL_BROADCAST_ADDR").and_then(|v| v.parse().ok()) {
            self.wol_broadcast_addr = Some(addr);
        }
        if let Some(base) = var("YTCAST_LOUNGE_API_BASE").filter(|v| !v.trim().is_empty()) {
            self.lounge_api_base = Some(base);
        }
    }

    /// SSDP search window.
    pub fn search_window(&self) -> Duration {
        Duration::from_secs(self.search_timeout)
    }

    /// Converts to ytcast-core's configuration.
    pub fn to_core_config(&self) -> CoreConfig {
        let mut core = CoreConfig {
            http_timeout: Duration::from_secs(self.http_timeout),
            ..Default::default()
        };
        if let Some(addr) = self.ssdp_bind_addr {
            core.ssdp.bind_addr = addr;
        }
        if let Some(addr) = self.wol_broadcast_addr {
            core.wakeup.broadcast_addr = addr;
        }
        if let Some(base) = &self.lounge_api_base {
            core.lounge.api_base = base.clone();
        }
        core
    }
}
