//! Scenario runner - resolves and launches external test runners
//!
//! This library finds or installs the command-line tools a test scenario
//! depends on, builds the runner's command line and environment, and starts
//! the runner process.

pub mod cli;
pub mod commands;
pub mod common;
pub mod launch;
pub mod setup;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use launch::{CommandSpec, EnvironmentOverlay, ProcessHandle, RunnerFamily};
pub use setup::{ResolvedTool, ToolResolver, ToolSpec};
pub use testing::{ScenarioConfig, ScenarioExecutor};
