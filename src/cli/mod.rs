//! CLI command handling
//!
//! Dispatches CLI commands and formats output.

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{paths, Result};
use crate::launch::{EnvironmentBuilder, EnvironmentOverlay};
use crate::setup::{self, registry, ResolveEnv, ResolvedTools, SystemRunner, ToolResolver, ToolSpec};
use crate::testing::{self, Outcome, RunOptions};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run {
            scenario,
            tools_dir,
            artifacts_dir,
            prepare_only,
        } => {
            let opts = RunOptions {
                tools_dir,
                artifacts_dir,
                prepare_only,
            };
            let result = testing::run_scenario(&scenario, config, &opts).await?;
            if result.outcome == Outcome::Failure {
                std::process::exit(result.exit_code.unwrap_or(1));
            }
            Ok(())
        }

        Commands::Resolve {
            package,
            module_kind,
            local_path,
            tools_dir,
        } => {
            let mut spec = match local_path {
                Some(path) => ToolSpec::local_module(&package, path)?,
                None => match registry::known_package(&package) {
                    Some(known) => known,
                    None => ToolSpec::registry(&package)?,
                },
            };
            if let Some(kind) = module_kind {
                spec = spec.with_module_kind(kind.into());
            }

            let cwd = std::env::current_dir()?;
            resolve_one(&spec, &paths::full_path(&tools_dir, &cwd), &cwd, config).await
        }
    }
}

async fn resolve_one(spec: &ToolSpec, tools_dir: &Path, cwd: &Path, config: &Config) -> Result<()> {
    let resolver = ToolResolver::new(Arc::new(SystemRunner), tools_dir)
        .with_timeouts(config.timeouts.clone());
    let overlay = EnvironmentOverlay::new().prepend(
        "NODE_PATH",
        resolver.modules_dir().display().to_string(),
    );
    let environment = EnvironmentBuilder::from_process().merge(&[overlay]);

    let mut host = ResolvedTools::default();
    for host_spec in [registry::node(), registry::npm()] {
        let host_spec = match config.host.path_for(&host_spec.name) {
            Some(path) => host_spec.located_at(path),
            None => host_spec,
        };
        let env = ResolveEnv {
            toolchain: None,
            environment: &environment,
            cwd,
        };
        host.insert(resolver.resolve(&host_spec, env).await?);
    }
    let toolchain = setup::toolchain(&host)?;

    let env = ResolveEnv {
        toolchain: Some(&toolchain),
        environment: &environment,
        cwd,
    };
    let tool = resolver.resolve(spec, env).await?;

    println!(
        "{} {} {}",
        "✓".green(),
        tool.name.white().bold(),
        tool.version.as_deref().unwrap_or("")
    );
    println!("  Path: {}", tool.invocation_path.display());
    Ok(())
}
