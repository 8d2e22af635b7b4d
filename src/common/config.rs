//! Configuration file handling

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Install prefix shared by every runner family, overriding the per-family default
    #[serde(default)]
    pub tools_dir: Option<PathBuf>,

    /// Directory holding the reporter plugins
    #[serde(default)]
    pub resources_dir: Option<PathBuf>,

    /// Directory where report files and variable dumps are written
    #[serde(default)]
    pub artifacts_dir: Option<PathBuf>,

    /// Per-runner settings keyed by family name ("mocha", "newman")
    #[serde(default)]
    pub runners: HashMap<String, RunnerSettings>,

    /// Explicit locations of host executables
    #[serde(default)]
    pub host: HostTools,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,
}

/// Host executables to use instead of searching PATH
#[derive(Debug, Deserialize, Clone, Default)]
pub struct HostTools {
    #[serde(default)]
    pub node: Option<PathBuf>,
    #[serde(default)]
    pub npm: Option<PathBuf>,
}

impl HostTools {
    /// Configured path for a host tool by name
    pub fn path_for(&self, name: &str) -> Option<&Path> {
        match name {
            "node" => self.node.as_deref(),
            "npm" => self.npm.as_deref(),
            _ => None,
        }
    }
}

/// Settings for a single runner family
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RunnerSettings {
    /// Install prefix for this family's packages
    #[serde(default)]
    pub tools_dir: Option<PathBuf>,
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// Timeout for a single presence probe
    #[serde(default = "default_probe")]
    pub probe_secs: u64,

    /// Timeout for a package manager install
    #[serde(default = "default_install")]
    pub install_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            probe_secs: default_probe(),
            install_secs: default_install(),
        }
    }
}

fn default_probe() -> u64 {
    60
}
fn default_install() -> u64 {
    600
}

impl Timeouts {
    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }

    pub fn install(&self) -> Duration {
        Duration::from_secs(self.install_secs)
    }
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = paths::config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }

    /// Install prefix for a runner family
    ///
    /// Per-runner setting wins over the global one; the default is a
    /// family-named directory under the data dir.
    pub fn tools_dir_for(&self, family: &str) -> PathBuf {
        self.runners
            .get(family)
            .and_then(|r| r.tools_dir.clone())
            .or_else(|| self.tools_dir.clone())
            .unwrap_or_else(|| paths::tools_root().join(family))
    }

    pub fn resources_dir(&self) -> PathBuf {
        self.resources_dir.clone().unwrap_or_else(paths::resources_dir)
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.artifacts_dir.clone().unwrap_or_else(paths::artifacts_dir)
    }
}
