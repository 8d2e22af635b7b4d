//! Command construction
//!
//! Each runner family has its own flag grammar. Grammars are selected by
//! `RunnerFamily` and used through the `CommandGrammar` trait.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::artifacts::ArtifactStore;
use super::env::EnvironmentOverlay;
use super::vars::dump_vars;
use crate::common::{Error, Result};
use crate::setup::registry;
use crate::setup::{ResolvedTools, ToolSpec};
use crate::testing::ScenarioConfig;

/// Supported test-runner command grammars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerFamily {
    /// Mocha through the reporting plugin (`--report-file`/`--test-suite`)
    Mocha,
    /// Newman with the reporter (`run <collection> --reporters ...`)
    Newman,
}

impl RunnerFamily {
    pub fn name(&self) -> &'static str {
        match self {
            RunnerFamily::Mocha => "mocha",
            RunnerFamily::Newman => "newman",
        }
    }

    pub fn grammar(&self) -> Box<dyn CommandGrammar> {
        match self {
            RunnerFamily::Mocha => Box::new(MochaGrammar),
            RunnerFamily::Newman => Box::new(NewmanGrammar),
        }
    }
}

impl fmt::Display for RunnerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything needed to start the runner process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Variables set on top of the inherited environment
    pub env: BTreeMap<String, String>,
    /// Where the runner is told to write its report
    pub report_file: PathBuf,
    pub stdout: Option<PathBuf>,
    pub stderr: Option<PathBuf>,
}

impl CommandSpec {
    /// Program followed by its arguments
    pub fn command_line(&self) -> Vec<String> {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// Inputs to a build besides the scenario itself
pub struct BuildContext<'a> {
    /// Absolute script path
    pub script: &'a Path,
    pub report_file: &'a Path,
    /// Directory the scenario runs from
    pub cwd: &'a Path,
    pub environment: &'a BTreeMap<String, String>,
    pub artifacts: &'a ArtifactStore,
}

/// The flag grammar and dependencies of one runner family
pub trait CommandGrammar: Send + Sync {
    fn family(&self) -> RunnerFamily;

    /// Tools to resolve, host tools first
    fn required_tools(&self, resources_dir: &Path) -> Vec<ToolSpec>;

    /// Scenario-specific search paths, merged after the global ones
    fn overlay(&self, cwd: &Path, resources_dir: &Path) -> EnvironmentOverlay;

    fn build(
        &self,
        tools: &ResolvedTools,
        scenario: &ScenarioConfig,
        ctx: &BuildContext<'_>,
    ) -> Result<CommandSpec>;
}

/// `node <plugin-or-runner>` followed by the family's arguments
fn launch_prefix(tools: &ResolvedTools, script_tool: &str) -> Result<(PathBuf, Vec<String>)> {
    let node = tools.require(registry::NODE)?;
    let script = tools.require(script_tool)?;
    Ok((
        node.invocation_path.clone(),
        vec![script.invocation_path.display().to_string()],
    ))
}

pub struct MochaGrammar;

impl CommandGrammar for MochaGrammar {
    fn family(&self) -> RunnerFamily {
        RunnerFamily::Mocha
    }

    fn required_tools(&self, resources_dir: &Path) -> Vec<ToolSpec> {
        vec![
            registry::node(),
            registry::npm(),
            registry::mocha(),
            registry::mocha_plugin(resources_dir),
            registry::selenium_webdriver(),
        ]
    }

    fn overlay(&self, cwd: &Path, _resources_dir: &Path) -> EnvironmentOverlay {
        EnvironmentOverlay::new().prepend("NODE_PATH", cwd.join("node_modules").display().to_string())
    }

    fn build(
        &self,
        tools: &ResolvedTools,
        scenario: &ScenarioConfig,
        ctx: &BuildContext<'_>,
    ) -> Result<CommandSpec> {
        let (program, mut args) = launch_prefix(tools, registry::MOCHA_PLUGIN)?;
        args.extend([
            "--report-file".to_string(),
            ctx.report_file.display().to_string(),
            "--test-suite".to_string(),
            ctx.script.display().to_string(),
        ]);

        if let Some(iterations) = scenario.load.iterations.filter(|&n| n > 0) {
            args.extend(["--iterations".to_string(), iterations.to_string()]);
        }
        if let Some(hold) = scenario.load.hold_for.filter(|h| h.whole_secs() > 0) {
            args.extend(["--hold-for".to_string(), hold.whole_secs().to_string()]);
        }

        Ok(CommandSpec {
            program,
            args,
            cwd: ctx.cwd.to_path_buf(),
            env: ctx.environment.clone(),
            report_file: ctx.report_file.to_path_buf(),
            stdout: None,
            stderr: None,
        })
    }
}

pub struct NewmanGrammar;

impl CommandGrammar for NewmanGrammar {
    fn family(&self) -> RunnerFamily {
        RunnerFamily::Newman
    }

    fn required_tools(&self, resources_dir: &Path) -> Vec<ToolSpec> {
        vec![
            registry::node(),
            registry::npm(),
            registry::newman(),
            registry::newman_reporter(resources_dir),
        ]
    }

    // The reporter is looked up by newman from NODE_PATH
    fn overlay(&self, _cwd: &Path, resources_dir: &Path) -> EnvironmentOverlay {
        EnvironmentOverlay::new().prepend("NODE_PATH", resources_dir.display().to_string())
    }

    fn build(
        &self,
        tools: &ResolvedTools,
        scenario: &ScenarioConfig,
        ctx: &BuildContext<'_>,
    ) -> Result<CommandSpec> {
        let script_dir = ctx
            .script
            .parent()
            .ok_or_else(|| Error::Config(format!("Script has no parent directory: {}", ctx.script.display())))?;
        let script_file = ctx
            .script
            .file_name()
            .ok_or_else(|| Error::Config(format!("Script has no file name: {}", ctx.script.display())))?;

        let (program, mut args) = launch_prefix(tools, registry::NEWMAN)?;
        args.extend([
            "run".to_string(),
            script_file.to_string_lossy().into_owned(),
            "--reporters".to_string(),
            "taurus".to_string(),
            "--reporter-taurus-filename".to_string(),
            ctx.report_file.display().to_string(),
            "--suppress-exit-code".to_string(),
            "--insecure".to_string(),
        ]);

        if let Some(timeout) = scenario.timeout {
            args.extend(["--timeout-request".to_string(), timeout.as_millis().to_string()]);
        }
        if let Some(think) = scenario.think_time {
            args.extend(["--delay-request".to_string(), think.as_millis().to_string()]);
        }

        args.extend(dump_vars("globals", scenario.globals.as_ref(), ctx.artifacts)?);
        args.extend(dump_vars("environment", scenario.environment.as_ref(), ctx.artifacts)?);

        if let Some(iterations) = scenario.load.iterations.filter(|&n| n > 0) {
            args.extend(["--iteration-count".to_string(), iterations.to_string()]);
        }

        Ok(CommandSpec {
            program,
            args,
            cwd: script_dir.to_path_buf(),
            env: ctx.environment.clone(),
            report_file: ctx.report_file.to_path_buf(),
            stdout: None,
            stderr: None,
        })
    }
}

/// Builds the command for one family
pub struct CommandBuilder {
    grammar: Box<dyn CommandGrammar>,
}

impl CommandBuilder {
    pub fn for_family(family: RunnerFamily) -> Self {
        Self {
            grammar: family.grammar(),
        }
    }

    pub fn grammar(&self) -> &dyn CommandGrammar {
        self.grammar.as_ref()
    }

    pub fn build(
        &self,
        tools: &ResolvedTools,
        scenario: &ScenarioConfig,
        ctx: &BuildContext<'_>,
    ) -> Result<CommandSpec> {
        let spec = self.grammar.build(tools, scenario, ctx)?;
        tracing::debug!("{} cmdline: {}", self.grammar.family(), spec.command_line().join(" "));
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::ResolvedTool;

    fn tool(name: &str, path: &str) -> ResolvedTool {
        ResolvedTool {
            name: name.to_string(),
            invocation_path: PathBuf::from(path),
            version: None,
            verified: true,
        }
    }

    fn tools() -> ResolvedTools {
        let mut tools = ResolvedTools::default();
        tools.insert(tool("node", "/usr/bin/node"));
        tools.insert(tool("npm", "/usr/bin/npm"));
        tools.insert(tool("mocha-taurus-plugin", "/res/mocha-taurus-plugin.js"));
        tools.insert(tool("newman", "/tools/node_modules/newman/bin/newman.js"));
        tools
    }

    fn scenario(yaml: &str) -> ScenarioConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn position(args: &[String], flag: &str) -> usize {
        args.iter().position(|a| a == flag).unwrap()
    }

    #[test]
    fn test_mocha_load_flags_follow_mandatory_pair() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactStore::new(dir.path()).unwrap();
        let env = BTreeMap::new();
        let ctx = BuildContext {
            script: Path::new("/work/test.js"),
            report_file: Path::new("/out/report.ldjson"),
            cwd: Path::new("/work"),
            environment: &env,
            artifacts: &artifacts,
        };
        let scenario = scenario("executor: mocha\nscript: test.js\nload:\n  iterations: 5\n  hold_for: 10s\n");

        let spec = CommandBuilder::for_family(RunnerFamily::Mocha)
            .build(&tools(), &scenario, &ctx)
            .unwrap();

        assert_eq!(spec.program, PathBuf::from("/usr/bin/node"));
        assert_eq!(
            spec.args,
            vec![
                "/res/mocha-taurus-plugin.js",
                "--report-file",
                "/out/report.ldjson",
                "--test-suite",
                "/work/test.js",
                "--iterations",
                "5",
                "--hold-for",
                "10",
            ]
        );
        assert_eq!(spec.cwd, PathBuf::from("/work"));
    }

    #[test]
    fn test_mocha_without_load_has_no_load_flags() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactStore::new(dir.path()).unwrap();
        let env = BTreeMap::new();
        let ctx = BuildContext {
            script: Path::new("/work/test.js"),
            report_file: Path::new("/out/r.ldjson"),
            cwd: Path::new("/work"),
            environment: &env,
            artifacts: &artifacts,
        };
        let spec = MochaGrammar
            .build(&tools(), &scenario("executor: mocha\nscript: test.js\n"), &ctx)
            .unwrap();
        assert!(!spec.args.contains(&"--iterations".to_string()));
        assert!(!spec.args.contains(&"--hold-for".to_string()));
    }

    #[test]
    fn test_mocha_sub_second_hold_rounds_up() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactStore::new(dir.path()).unwrap();
        let env = BTreeMap::new();
        let ctx = BuildContext {
            script: Path::new("/work/test.js"),
            report_file: Path::new("/out/r.ldjson"),
            cwd: Path::new("/work"),
            environment: &env,
            artifacts: &artifacts,
        };
        let spec = MochaGrammar
            .build(
                &tools(),
                &scenario("executor: mocha\nscript: test.js\nload:\n  hold_for: 500ms\n"),
                &ctx,
            )
            .unwrap();
        assert_eq!(spec.args[position(&spec.args, "--hold-for") + 1], "1");
    }

    #[test]
    fn test_newman_grammar() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactStore::new(dir.path()).unwrap();
        let env = BTreeMap::from([("NODE_PATH".to_string(), "/res".to_string())]);
        let ctx = BuildContext {
            script: Path::new("/collections/api.json"),
            report_file: Path::new("/out/newman.ldjson"),
            cwd: Path::new("/work"),
            environment: &env,
            artifacts: &artifacts,
        };
        let scenario = scenario(
            "executor: newman\nscript: api.json\ntimeout: 2s\nthink_time: 500ms\nglobals: foo=bar\nload:\n  iterations: 3\n",
        );

        let spec = NewmanGrammar.build(&tools(), &scenario, &ctx).unwrap();
        let args = &spec.args;

        assert_eq!(
            args[..9],
            [
                "/tools/node_modules/newman/bin/newman.js",
                "run",
                "api.json",
                "--reporters",
                "taurus",
                "--reporter-taurus-filename",
                "/out/newman.ldjson",
                "--suppress-exit-code",
                "--insecure",
            ]
        );
        assert_eq!(args[position(args, "--timeout-request") + 1], "2000");
        assert_eq!(args[position(args, "--delay-request") + 1], "500");
        assert_eq!(args[position(args, "--globals") + 1], "foo=bar");
        assert!(position(args, "--delay-request") < position(args, "--globals"));
        assert!(position(args, "--globals") < position(args, "--environment"));
        assert_eq!(args[args.len() - 2..], ["--iteration-count", "3"]);
        assert_eq!(spec.cwd, PathBuf::from("/collections"));
        assert_eq!(spec.env.get("NODE_PATH").map(String::as_str), Some("/res"));
    }

    #[test]
    fn test_newman_mapping_globals_go_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactStore::new(dir.path()).unwrap();
        let env = BTreeMap::new();
        let ctx = BuildContext {
            script: Path::new("/collections/api.json"),
            report_file: Path::new("/out/newman.ldjson"),
            cwd: Path::new("/work"),
            environment: &env,
            artifacts: &artifacts,
        };
        let scenario = scenario("executor: newman\nscript: api.json\nglobals:\n  a: 1\n");

        let spec = NewmanGrammar.build(&tools(), &scenario, &ctx).unwrap();
        let path = PathBuf::from(&spec.args[position(&spec.args, "--globals") + 1]);
        assert!(path.starts_with(dir.path()));
        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(doc["values"][0]["key"], "a");
        assert!(!spec.args.contains(&"--timeout-request".to_string()));
    }

    #[test]
    fn test_missing_tool_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactStore::new(dir.path()).unwrap();
        let env = BTreeMap::new();
        let ctx = BuildContext {
            script: Path::new("/work/test.js"),
            report_file: Path::new("/out/r.ldjson"),
            cwd: Path::new("/work"),
            environment: &env,
            artifacts: &artifacts,
        };
        let mut partial = ResolvedTools::default();
        partial.insert(tool("node", "/usr/bin/node"));
        let err = MochaGrammar
            .build(&partial, &scenario("executor: mocha\nscript: test.js\n"), &ctx)
            .unwrap_err();
        assert!(err.to_string().contains("mocha-taurus-plugin"));
    }

    #[test]
    fn test_required_tools_start_with_host_tools() {
        for family in [RunnerFamily::Mocha, RunnerFamily::Newman] {
            let tools = family.grammar().required_tools(Path::new("/res"));
            assert_eq!(tools[0].name, "node");
            assert_eq!(tools[1].name, "npm");
        }
    }
}
