//! Scenario execution
//!
//! Reads YAML scenarios and drives them through tool resolution,
//! command construction and launch.

mod config;
mod executor;
mod runner;

pub use config::*;
pub use executor::{ExecutorSettings, ExecutorState, Outcome, Prepared, ScenarioExecutor};
pub use runner::{run_scenario, RunOptions, RunResult};
