// src/config.rs

//! Manages client configuration: loading, defaults, and validation.

use crate::connection::ConnectionManager;
use crate::core::EmulatorClient;
use crate::core::protocol::DEFAULT_PORT;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use tracing::warn;

/// The client configuration, usually read from a TOML file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    /// The host running the emulator.
    #[serde(default = "default_host")]
    pub host: String,
    /// The emulator's network command port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// How long each receive waits for a reply.
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
    /// The longest the watcher sleeps between ticks.
    #[serde(with = "humantime_serde", default = "default_watcher_interval")]
    pub watcher_interval: Duration,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// If set, a different emulator version is reported once per connection.
    #[serde(default)]
    pub expected_version: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_request_timeout() -> Duration {
    Duration::from_secs(1)
}
fn default_watcher_interval() -> Duration {
    Duration::from_millis(500)
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            watcher_interval: default_watcher_interval(),
            log_level: default_log_level(),
            expected_version: None,
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid config in '{path}'"))
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration to ensure logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.request_timeout.is_zero() {
            return Err(anyhow!("request_timeout cannot be 0"));
        }
        if self.watcher_interval.is_zero() {
            return Err(anyhow!("watcher_interval cannot be 0"));
        }
        if self.request_timeout > self.watcher_interval * 10 {
            warn!(
                "request_timeout ({:?}) is much longer than watcher_interval ({:?}); a paused emulator will stall each tick for the full timeout.",
                self.request_timeout, self.watcher_interval
            );
        }
        Ok(())
    }

    /// Builds a client for the configured emulator. No socket is opened yet.
    pub fn client(&self) -> EmulatorClient {
        EmulatorClient::new(ConnectionManager::new(
            self.host.clone(),
            self.port,
            self.request_timeout,
        ))
    }
}
