// ABOUTME: Configuration types and parsing for refit.yml.
// ABOUTME: Handles YAML parsing, discovery from the working directory, and pass defaults.

mod init;

pub use init::init_config;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
use crate::runtime::{ContainerFilters, DEFAULT_SOCKET};
use crate::update::UpdateParams;

pub const CONFIG_FILENAME: &str = "refit.yml";
pub const CONFIG_FILENAME_ALT: &str = "refit.yaml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Daemon socket the runtime client connects to.
    #[serde(default = "default_socket")]
    pub socket: String,

    /// Graceful-stop bound before the runtime escalates to kill.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Remove replaced image IDs after the restart phase.
    #[serde(default)]
    pub cleanup: bool,

    /// Use the rolling strategy instead of the two-phase one.
    #[serde(default)]
    pub rolling_restart: bool,

    /// Observe the whole population without restarting anything.
    #[serde(default)]
    pub monitor_only: bool,

    /// Classify only; skip all stop/start side effects.
    #[serde(default)]
    pub no_restart: bool,

    /// Run hook scripts around the pass and around each restart.
    #[serde(default)]
    pub lifecycle_hooks: bool,

    /// Address the trigger endpoint binds to.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Restrict the pass to containers matching these filters.
    #[serde(default)]
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub labels: HashMap<String, String>,
}

fn default_socket() -> String {
    DEFAULT_SOCKET.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_listen() -> SocketAddr {
    "127.0.0.1:8080".parse().expect("default listen address parses")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket: default_socket(),
            timeout: default_timeout(),
            cleanup: false,
            rolling_restart: false,
            monitor_only: false,
            no_restart: false,
            lifecycle_hooks: false,
            listen: default_listen(),
            filter: FilterConfig::default(),
        }
    }
}

impl Config {
    /// Find and parse the config file in the given directory.
    /// Falls back to defaults when no file exists.
    pub fn discover(dir: &Path) -> Result<Self> {
        for filename in [CONFIG_FILENAME, CONFIG_FILENAME_ALT] {
            let path = dir.join(filename);
            if path.is_file() {
                let raw = std::fs::read_to_string(&path)?;
                return Ok(serde_yaml::from_str(&raw)?);
            }
        }
        Ok(Self::default())
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Pass parameters derived from this config.
    pub fn to_params(&self) -> UpdateParams {
        UpdateParams {
            filter: ContainerFilters {
                name: self.filter.name.clone(),
                labels: self.filter.labels.clone(),
            },
            no_restart: self.no_restart,
            monitor_only: self.monitor_only,
            rolling_restart: self.rolling_restart,
            cleanup: self.cleanup,
            timeout: self.timeout,
            lifecycle_hooks: self.lifecycle_hooks,
        }
    }
}
