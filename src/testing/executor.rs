//! Scenario executor
//!
//! `prepare()` resolves every tool and computes the environment, returning
//! a `Prepared` value; `startup()` consumes it to build and launch the
//! runner. Nothing is carried between the two phases on the executor.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;

use crate::common::config::{Config, HostTools, Timeouts};
use crate::common::{paths, Error, Result};
use crate::launch::{
    ArtifactStore, BuildContext, CommandBuilder, EnvironmentBuilder, EnvironmentOverlay,
    ProcessHandle, ProcessLauncher, RunnerFamily,
};
use crate::setup::{self, ProcessRunner, ResolveEnv, ResolvedTools, ToolResolver, ToolSpec};

use super::config::ScenarioConfig;

/// How a finished scenario ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Lifecycle of one executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Created,
    Preparing,
    Ready,
    Running,
    Terminal(Outcome),
}

impl fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorState::Created => write!(f, "created"),
            ExecutorState::Preparing => write!(f, "preparing"),
            ExecutorState::Ready => write!(f, "ready"),
            ExecutorState::Running => write!(f, "running"),
            ExecutorState::Terminal(Outcome::Success) => write!(f, "finished"),
            ExecutorState::Terminal(Outcome::Failure) => write!(f, "failed"),
        }
    }
}

/// Directories and limits for one executor
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// Private install prefix
    pub tools_dir: PathBuf,
    /// Where the reporter plugins live
    pub resources_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    /// Directory the scenario runs from
    pub cwd: PathBuf,
    pub host: HostTools,
    pub timeouts: Timeouts,
}

impl ExecutorSettings {
    /// Settings from the config file, with the scenario's tools dir taking precedence
    pub fn from_config(config: &Config, scenario: &ScenarioConfig, cwd: &Path) -> Self {
        let tools_dir = scenario
            .tools_dir
            .clone()
            .unwrap_or_else(|| config.tools_dir_for(scenario.executor.name()));

        Self {
            tools_dir: paths::full_path(&tools_dir, cwd),
            resources_dir: paths::full_path(&config.resources_dir(), cwd),
            artifacts_dir: paths::full_path(&config.artifacts_dir(), cwd),
            cwd: cwd.to_path_buf(),
            host: config.host.clone(),
            timeouts: config.timeouts.clone(),
        }
    }
}

/// Result of a successful `prepare()`
#[derive(Debug, Clone)]
pub struct Prepared {
    family: RunnerFamily,
    script: PathBuf,
    report_file: PathBuf,
    tools: ResolvedTools,
    environment: BTreeMap<String, String>,
    artifacts: ArtifactStore,
}

impl Prepared {
    pub fn family(&self) -> RunnerFamily {
        self.family
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    pub fn report_file(&self) -> &Path {
        &self.report_file
    }

    pub fn tools(&self) -> &ResolvedTools {
        &self.tools
    }

    /// Variables the runner is launched with, on top of the inherited ones
    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }
}

/// Resolves, builds and launches one scenario
pub struct ScenarioExecutor {
    scenario: ScenarioConfig,
    settings: ExecutorSettings,
    runner: Arc<dyn ProcessRunner>,
    builder: CommandBuilder,
    env_builder: EnvironmentBuilder,
    state: ExecutorState,
}

impl ScenarioExecutor {
    pub fn new(scenario: ScenarioConfig, settings: ExecutorSettings, runner: Arc<dyn ProcessRunner>) -> Self {
        let builder = CommandBuilder::for_family(scenario.executor);
        Self {
            scenario,
            settings,
            runner,
            builder,
            env_builder: EnvironmentBuilder::from_process(),
            state: ExecutorState::Created,
        }
    }

    /// Merge overlays onto this base instead of the process environment
    pub fn with_base_environment(mut self, base: BTreeMap<String, String>) -> Self {
        self.env_builder = EnvironmentBuilder::new(base);
        self
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    pub fn scenario(&self) -> &ScenarioConfig {
        &self.scenario
    }

    fn expect_state(&self, expected: ExecutorState, action: &str) -> Result<()> {
        if self.state != expected {
            return Err(Error::invalid_state(action, &self.state.to_string()));
        }
        Ok(())
    }

    fn fail<T>(&mut self, err: Error) -> Result<T> {
        self.state = ExecutorState::Terminal(Outcome::Failure);
        Err(err)
    }

    /// Resolve all tools and compute the environment
    pub async fn prepare(&mut self) -> Result<Prepared> {
        self.expect_state(ExecutorState::Created, "prepare")?;
        self.state = ExecutorState::Preparing;

        match self.prepare_inner().await {
            Ok(prepared) => {
                self.state = ExecutorState::Ready;
                Ok(prepared)
            }
            Err(e) => self.fail(e),
        }
    }

    async fn prepare_inner(&self) -> Result<Prepared> {
        let family = self.scenario.executor;
        let script = match &self.scenario.script {
            Some(script) => paths::full_path(script, &self.settings.cwd),
            None => {
                return Err(Error::Config(format!("Script not passed to runner {}", family)));
            }
        };

        let artifacts = ArtifactStore::new(&self.settings.artifacts_dir)?;
        let grammar = self.builder.grammar();

        let global = EnvironmentOverlay::new()
            .prepend(
                "NODE_PATH",
                self.settings.tools_dir.join("node_modules").display().to_string(),
            )
            .replace_if_unset("TAURUS_ARTIFACTS_DIR", artifacts.dir().display().to_string());
        let local = grammar.overlay(&self.settings.cwd, &self.settings.resources_dir);
        let environment = self.env_builder.merge(&[global, local]);

        let mut specs: Vec<ToolSpec> = grammar
            .required_tools(&self.settings.resources_dir)
            .into_iter()
            .map(|spec| match self.settings.host.path_for(&spec.name) {
                Some(path) => spec.located_at(path),
                None => spec,
            })
            .collect();
        for declaration in &self.scenario.tools {
            specs.push(declaration.to_spec()?);
        }

        let tools = self.resolve_all(&specs, &environment).await?;

        let report_file = match &self.scenario.report_file {
            Some(path) => paths::full_path(path, &self.settings.cwd),
            None => artifacts.create_artifact(family.name(), ".ldjson")?,
        };

        Ok(Prepared {
            family,
            script,
            report_file,
            tools,
            environment,
            artifacts,
        })
    }

    async fn resolve_all(
        &self,
        specs: &[ToolSpec],
        environment: &BTreeMap<String, String>,
    ) -> Result<ResolvedTools> {
        let resolver = ToolResolver::new(self.runner.clone(), &self.settings.tools_dir)
            .with_timeouts(self.settings.timeouts.clone());
        let mut tools = ResolvedTools::default();

        for spec in specs {
            let toolchain = setup::toolchain(&tools).ok();
            let env = ResolveEnv {
                toolchain: toolchain.as_ref(),
                environment,
                cwd: &self.settings.cwd,
            };

            match resolver.resolve(spec, env).await {
                Ok(tool) => {
                    tracing::debug!(
                        "Resolved {} -> {} (verified: {})",
                        tool.name,
                        tool.invocation_path.display(),
                        tool.verified
                    );
                    tools.insert(tool);
                }
                Err(e) if spec.mandatory => return Err(e),
                Err(e) => tracing::warn!("Skipping optional tool {}: {}", spec.name, e),
            }
        }

        Ok(tools)
    }

    /// Build the command and start the runner
    pub fn startup(&mut self, prepared: Prepared) -> Result<ProcessHandle> {
        self.expect_state(ExecutorState::Ready, "start")?;

        match self.startup_inner(&prepared) {
            Ok(handle) => {
                self.state = ExecutorState::Running;
                Ok(handle)
            }
            Err(e) => self.fail(e),
        }
    }

    fn startup_inner(&self, prepared: &Prepared) -> Result<ProcessHandle> {
        let ctx = BuildContext {
            script: &prepared.script,
            report_file: &prepared.report_file,
            cwd: &self.settings.cwd,
            environment: &prepared.environment,
            artifacts: &prepared.artifacts,
        };
        let mut command = self.builder.build(&prepared.tools, &self.scenario, &ctx)?;

        let name = prepared.family.name();
        command.stdout = Some(prepared.artifacts.create_artifact(name, ".out")?);
        command.stderr = Some(prepared.artifacts.create_artifact(name, ".err")?);

        ProcessLauncher::launch(&command)
    }

    /// Record the exit of the launched process
    pub fn finish(&mut self, status: ExitStatus) -> Result<Outcome> {
        self.expect_state(ExecutorState::Running, "finish")?;
        let outcome = if status.success() {
            Outcome::Success
        } else {
            Outcome::Failure
        };
        self.state = ExecutorState::Terminal(outcome);
        Ok(outcome)
    }
}
