//! Tool resolution
//!
//! Check → install → re-check → resolve path. A failed install is only a
//! warning: another executor may be installing the same package into the
//! same prefix, and the second probe decides.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::common::config::Timeouts;
use crate::common::{Error, Result};

use super::probe::{self, ProbeContext};
use super::runner::{Invocation, ProcessRunner};
use super::spec::{ToolSource, ToolSpec};

/// Runtime and package manager used for package tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// Evaluates probe scripts (node)
    pub runtime: PathBuf,
    /// Installs packages (npm)
    pub manager: PathBuf,
}

/// What the resolver sees of the surrounding environment
#[derive(Debug, Clone, Copy)]
pub struct ResolveEnv<'a> {
    /// Required for registry and local module tools
    pub toolchain: Option<&'a Toolchain>,
    /// Merged environment probes and installs run with
    pub environment: &'a BTreeMap<String, String>,
    /// Directory the scenario will run from
    pub cwd: &'a Path,
}

/// A tool ready to be invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTool {
    pub name: String,
    pub invocation_path: PathBuf,
    pub version: Option<String>,
    /// True only when a probe or version check succeeded
    pub verified: bool,
}

/// Resolved tools of one scenario, in resolution order
#[derive(Debug, Clone, Default)]
pub struct ResolvedTools {
    tools: Vec<ResolvedTool>,
}

impl ResolvedTools {
    pub fn insert(&mut self, tool: ResolvedTool) {
        self.tools.retain(|t| t.name != tool.name);
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedTool> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Look up a tool the caller cannot do without
    pub fn require(&self, name: &str) -> Result<&ResolvedTool> {
        self.get(name)
            .ok_or_else(|| Error::tool_unavailable(name, "it was not resolved for this scenario"))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedTool> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Performs the check/install/verify cycle against one install prefix
pub struct ToolResolver {
    runner: Arc<dyn ProcessRunner>,
    tools_dir: PathBuf,
    timeouts: Timeouts,
}

impl ToolResolver {
    pub fn new(runner: Arc<dyn ProcessRunner>, tools_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            tools_dir: tools_dir.into(),
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Install prefix passed to the package manager
    pub fn tools_dir(&self) -> &Path {
        &self.tools_dir
    }

    /// Module cache inside the prefix
    pub fn modules_dir(&self) -> PathBuf {
        self.tools_dir.join("node_modules")
    }

    /// Resolve a tool, installing it if the source allows
    pub async fn resolve(&self, spec: &ToolSpec, env: ResolveEnv<'_>) -> Result<ResolvedTool> {
        match &spec.source {
            ToolSource::Binary { path } => {
                tracing::debug!("Using {} at {}", spec.name, path.display());
                Ok(ResolvedTool {
                    name: spec.name.clone(),
                    invocation_path: path.clone(),
                    version: None,
                    verified: false,
                })
            }
            ToolSource::Host { candidates } => self.resolve_host(spec, candidates, env).await,
            ToolSource::Registry | ToolSource::LocalModule { .. } => {
                let toolchain = env.toolchain.ok_or_else(|| {
                    Error::tool_unavailable(&spec.name, "no runtime and package manager resolved")
                })?;
                self.resolve_package(spec, toolchain, env).await
            }
        }
    }

    async fn resolve_host(
        &self,
        spec: &ToolSpec,
        candidates: &[String],
        env: ResolveEnv<'_>,
    ) -> Result<ResolvedTool> {
        for candidate in candidates {
            tracing::debug!("Trying '{}' as {}", candidate, spec.name);
            let path = match which::which(candidate) {
                Ok(path) => path,
                Err(e) => {
                    tracing::debug!("{} is not installed: {}", candidate, e);
                    continue;
                }
            };

            let check = Invocation::new(&path)
                .arg("--version")
                .cwd(env.cwd)
                .envs(env.environment);
            match self.runner.output(&check, self.timeouts.probe()).await {
                Ok(out) if out.success => {
                    let version = out.stdout.trim().to_string();
                    tracing::debug!("{} output: {}", candidate, version);
                    return Ok(ResolvedTool {
                        name: spec.name.clone(),
                        invocation_path: path,
                        version: (!version.is_empty()).then_some(version),
                        verified: true,
                    });
                }
                Ok(out) => {
                    tracing::debug!("{} --version exited with {:?}", candidate, out.code);
                }
                Err(e) => {
                    tracing::debug!("{} --version failed: {}", candidate, e);
                }
            }
        }

        Err(Error::tool_unavailable(
            &spec.name,
            format!("none of {} found on PATH", candidates.join(", ")),
        ))
    }

    async fn resolve_package(
        &self,
        spec: &ToolSpec,
        toolchain: &Toolchain,
        env: ResolveEnv<'_>,
    ) -> Result<ResolvedTool> {
        if self.is_present(spec, toolchain, env).await {
            tracing::debug!("{} is already installed", spec.name);
            return Ok(self.resolved(spec));
        }

        tracing::info!("Installing {}...", spec.package);
        self.install(spec, toolchain, env).await;

        if self.is_present(spec, toolchain, env).await {
            tracing::info!("{} installed", spec.package);
            return Ok(self.resolved(spec));
        }

        Err(Error::tool_unavailable(
            &spec.name,
            format!(
                "'{}' could not be loaded after installing into {}",
                spec.package.name,
                self.tools_dir.display()
            ),
        ))
    }

    /// Run the presence probe; any failure to run it counts as absent
    pub async fn is_present(&self, spec: &ToolSpec, toolchain: &Toolchain, env: ResolveEnv<'_>) -> bool {
        let tools_dir = self.tools_dir.as_path();
        let ctx = ProbeContext {
            runtime: &toolchain.runtime,
            tools_dir,
            cwd: env.cwd,
            env: env.environment,
        };
        let invocation = spec.module_kind.probe(&spec.package.name, &ctx);
        tracing::debug!("{} check cmdline: {}", spec.name, invocation.display());

        match self.runner.output(&invocation, self.timeouts.probe()).await {
            Ok(out) => out.success && probe::confirms(&spec.package.name, &out.stdout),
            Err(e) => {
                tracing::debug!("{} check failed: {}", spec.name, e);
                false
            }
        }
    }

    /// Install into the prefix; problems are logged, never returned
    async fn install(&self, spec: &ToolSpec, toolchain: &Toolchain, env: ResolveEnv<'_>) {
        let invocation = match &spec.source {
            ToolSource::LocalModule { path } => Invocation::new(&toolchain.manager)
                .args(["install", ".", "--install-links", "--prefix"])
                .arg(self.tools_dir.display().to_string())
                .cwd(path),
            _ => Invocation::new(&toolchain.manager)
                .arg("install")
                .arg(spec.package.install_arg())
                .arg("--prefix")
                .arg(self.tools_dir.display().to_string())
                .cwd(env.cwd),
        }
        .envs(env.environment);

        if let Err(e) = std::fs::create_dir_all(&self.tools_dir) {
            tracing::warn!("Cannot create {}: {}", self.tools_dir.display(), e);
        }

        match self.runner.output(&invocation, self.timeouts.install()).await {
            Ok(out) => {
                tracing::debug!("{} install stdout: {}", spec.name, out.stdout);
                if !out.success {
                    tracing::warn!("{} install exited with {:?}", spec.name, out.code);
                }
                if !out.stderr.trim().is_empty() {
                    tracing::warn!("{} install stderr: {}", spec.name, out.stderr.trim());
                }
            }
            Err(e) => {
                tracing::warn!("{} install failed: {}", spec.name, e);
            }
        }
    }

    fn resolved(&self, spec: &ToolSpec) -> ResolvedTool {
        let root = self.package_root(&spec.package.name);
        let version = spec
            .package
            .version
            .as_ref()
            .map(|v| v.to_string())
            .or_else(|| read_package_version(&root));
        let invocation_path = match &spec.entry {
            Some(entry) => root.join(entry),
            None => root,
        };

        ResolvedTool {
            name: spec.name.clone(),
            invocation_path,
            version,
            verified: true,
        }
    }

    /// Directory an installed package lives in
    pub fn package_root(&self, package: &str) -> PathBuf {
        self.modules_dir().join(package)
    }
}

fn read_package_version(package_root: &Path) -> Option<String> {
    let content = std::fs::read_to_string(package_root.join("package.json")).ok()?;
    let parsed: serde_json::Value = serde_json::from_str(&content).ok()?;
    parsed
        .get("version")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}
