//! Scenario runs from the command line
//!
//! Loads a scenario file, prepares and launches it, and waits for the
//! runner to exit. The report itself is left for whoever consumes it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;

use crate::common::config::Config;
use crate::common::Result;
use crate::setup::SystemRunner;

use super::config::ScenarioConfig;
use super::executor::{ExecutorSettings, Outcome, ScenarioExecutor};

/// Overrides given on the command line
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub tools_dir: Option<PathBuf>,
    pub artifacts_dir: Option<PathBuf>,
    /// Only resolve tools, do not launch
    pub prepare_only: bool,
}

/// Result of a scenario run
#[derive(Debug)]
pub struct RunResult {
    pub name: String,
    pub outcome: Outcome,
    pub report_file: PathBuf,
    pub exit_code: Option<i32>,
}

/// Run a scenario file to completion
pub async fn run_scenario(path: &Path, config: &Config, opts: &RunOptions) -> Result<RunResult> {
    let mut scenario = ScenarioConfig::load(path)?;
    if let Some(dir) = &opts.tools_dir {
        scenario.tools_dir = Some(dir.clone());
    }

    let cwd = std::env::current_dir()?;
    let mut settings = ExecutorSettings::from_config(config, &scenario, &cwd);
    if let Some(dir) = &opts.artifacts_dir {
        settings.artifacts_dir = dir.clone();
    }

    let name = scenario.display_name();
    println!(
        "\n{} {} ({})",
        "Running Scenario:".blue().bold(),
        name.white().bold(),
        scenario.executor
    );

    let mut executor = ScenarioExecutor::new(scenario, settings.clone(), Arc::new(SystemRunner));

    println!("\n{}", "Resolving tools:".cyan());
    let prepared = executor.prepare().await?;
    for tool in prepared.tools().iter() {
        let version = tool.version.as_deref().unwrap_or("-");
        println!(
            "  {} {:24} {:12} {}",
            "✓".green(),
            tool.name,
            version,
            tool.invocation_path.display().to_string().dimmed()
        );
    }

    if opts.prepare_only {
        return Ok(RunResult {
            name,
            outcome: Outcome::Success,
            report_file: prepared.report_file().to_path_buf(),
            exit_code: None,
        });
    }

    let mut handle = executor.startup(prepared)?;
    println!("\n{} {}", "Started:".cyan(), handle.command_line().join(" ").dimmed());

    let status = handle.wait().await?;
    let outcome = executor.finish(status)?;

    match outcome {
        Outcome::Success => println!("  {} {}", "✓".green(), "runner exited cleanly".green()),
        Outcome::Failure => println!(
            "  {} runner exited with {}",
            "✗".red(),
            status.code().map(|c| c.to_string()).unwrap_or_else(|| "a signal".to_string()).red()
        ),
    }
    println!("  Report: {}", handle.report_file().display());
    println!("  Logs:   {}", settings.artifacts_dir.display());

    Ok(RunResult {
        name,
        outcome,
        report_file: handle.report_file().to_path_buf(),
        exit_code: status.code(),
    })
}
