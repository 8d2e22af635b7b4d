//! Scenario configuration types
//!
//! Defines the data structures for deserializing YAML scenario files.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::common::{Error, HumanDuration, Result};
use crate::launch::{RunnerFamily, VariableSet};
use crate::setup::ToolDeclaration;

/// A test scenario loaded from a YAML file
#[derive(Deserialize, Debug, Clone)]
pub struct ScenarioConfig {
    /// Name shown in the run summary
    #[serde(default)]
    pub name: Option<String>,
    /// Runner family that executes the script
    pub executor: RunnerFamily,
    /// Test suite (mocha) or collection (newman)
    #[serde(default)]
    pub script: Option<PathBuf>,
    /// Report location; a fresh artifact is used when absent
    #[serde(default)]
    pub report_file: Option<PathBuf>,
    #[serde(default)]
    pub load: LoadProfile,
    /// Per-request timeout
    #[serde(default)]
    pub timeout: Option<HumanDuration>,
    /// Delay between requests
    #[serde(default)]
    pub think_time: Option<HumanDuration>,
    #[serde(default)]
    pub globals: Option<VariableSet>,
    #[serde(default)]
    pub environment: Option<VariableSet>,
    /// Extra packages the script needs
    #[serde(default)]
    pub tools: Vec<ToolDeclaration>,
    /// Install prefix override for this scenario
    #[serde(default)]
    pub tools_dir: Option<PathBuf>,
}

/// How much load to generate
#[derive(Deserialize, Debug, Clone, Default)]
pub struct LoadProfile {
    #[serde(default)]
    pub iterations: Option<u64>,
    /// How long to keep iterating
    #[serde(default)]
    pub hold_for: Option<HumanDuration>,
}

impl ScenarioConfig {
    /// Load a scenario file; relative script and report paths are taken
    /// relative to the file's directory
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read scenario '{}': {}", path.display(), e))
        })?;

        let mut scenario: ScenarioConfig = serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse scenario: {}", e)))?;

        let scenario_dir = path.parent().unwrap_or(Path::new("."));
        scenario.script = scenario.script.map(|p| relative_to(scenario_dir, p));
        scenario.report_file = scenario.report_file.map(|p| relative_to(scenario_dir, p));
        for tool in &mut scenario.tools {
            tool.local_path = tool.local_path.take().map(|p| relative_to(scenario_dir, p));
        }
        Ok(scenario)
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.script
                .as_ref()
                .map(|s| s.display().to_string())
                .unwrap_or_else(|| self.executor.to_string())
        })
    }
}

fn relative_to(dir: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        dir.join(path)
    } else {
        path
    }
}
