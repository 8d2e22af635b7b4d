//! Scenario lifecycle: prepare, launch and finish
//!
//! Host tools point at `/bin/sh`, so the launched "runtime" interprets the
//! plugin and runner entry points as shell scripts.

#![cfg(unix)]

mod common;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::ScriptedNpm;
use scenario_runner::common::config::{HostTools, Timeouts};
use scenario_runner::launch::env::PATH_LIST_SEPARATOR;
use scenario_runner::testing::{ExecutorSettings, ExecutorState, Outcome};
use scenario_runner::{Error, ScenarioConfig, ScenarioExecutor};

fn settings(work: &Path) -> ExecutorSettings {
    ExecutorSettings {
        tools_dir: work.join("tools"),
        resources_dir: work.join("resources"),
        artifacts_dir: work.join("artifacts"),
        cwd: work.to_path_buf(),
        host: HostTools {
            node: Some(PathBuf::from("/bin/sh")),
            npm: Some(PathBuf::from("/bin/sh")),
        },
        timeouts: Timeouts::default(),
    }
}

fn scenario(work: &Path, yaml: &str) -> ScenarioConfig {
    let path = work.join("scenario.yml");
    std::fs::write(&path, yaml).unwrap();
    ScenarioConfig::load(&path).unwrap()
}

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn join(parts: &[PathBuf]) -> String {
    parts
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(&PATH_LIST_SEPARATOR.to_string())
}

const MOCHA_PLUGIN: &str = r#"
report=""
while [ $# -gt 0 ]; do
  case "$1" in
    --report-file) report="$2"; shift ;;
  esac
  shift
done
echo "NODE_PATH=$NODE_PATH"
echo "ARTIFACTS=$TAURUS_ARTIFACTS_DIR"
echo '{"test_case":"passes","status":"PASSED"}' > "$report"
"#;

#[tokio::test]
async fn test_mocha_scenario_runs_to_success() {
    let work = tempfile::tempdir().unwrap();
    let work = work.path();
    write(&work.join("resources/mocha-taurus-plugin.js"), MOCHA_PLUGIN);
    write(&work.join("test.js"), "describe('x', () => {});\n");

    let npm = Arc::new(ScriptedNpm::new(true));
    let scenario = scenario(work, "executor: mocha\nscript: test.js\nload:\n  iterations: 2\n");
    let base = BTreeMap::from([("NODE_PATH".to_string(), "/base/node_modules".to_string())]);
    let mut executor =
        ScenarioExecutor::new(scenario, settings(work), npm.clone()).with_base_environment(base);

    let prepared = executor.prepare().await.unwrap();
    assert_eq!(executor.state(), ExecutorState::Ready);

    // mocha and selenium-webdriver were missing; the plugin is never installed
    assert_eq!(npm.installs().len(), 2);
    assert!(prepared.tools().get("node").unwrap().verified);
    assert_eq!(
        prepared.tools().get("mocha-taurus-plugin").unwrap().invocation_path,
        work.join("resources/mocha-taurus-plugin.js")
    );

    let node_path = join(&[
        work.join("node_modules"),
        work.join("tools/node_modules"),
        PathBuf::from("/base/node_modules"),
    ]);
    assert_eq!(prepared.environment()["NODE_PATH"], node_path);
    let artifacts_dir = work.join("artifacts");
    assert_eq!(
        prepared.environment()["TAURUS_ARTIFACTS_DIR"],
        artifacts_dir.display().to_string()
    );

    let report = prepared.report_file().to_path_buf();
    assert_eq!(report, artifacts_dir.join("mocha.ldjson"));

    let mut handle = executor.startup(prepared).unwrap();
    assert_eq!(executor.state(), ExecutorState::Running);
    assert_eq!(handle.command_line()[0], "/bin/sh");

    let status = handle.wait().await.unwrap();
    assert_eq!(executor.finish(status).unwrap(), Outcome::Success);
    assert_eq!(executor.state(), ExecutorState::Terminal(Outcome::Success));

    assert!(std::fs::read_to_string(&report).unwrap().contains("PASSED"));
    let stdout = std::fs::read_to_string(artifacts_dir.join("mocha.out")).unwrap();
    assert!(stdout.contains(&format!("NODE_PATH={}", node_path)));
    assert!(stdout.contains(&format!("ARTIFACTS={}", artifacts_dir.display())));
}

#[tokio::test]
async fn test_newman_runs_from_the_collection_directory() {
    let work = tempfile::tempdir().unwrap();
    let work = work.path();
    write(
        &work.join("tools/node_modules/newman/bin/newman.js"),
        "echo \"$@\"\npwd\nexit 3\n",
    );
    write(&work.join("api/collection.json"), "{}");

    let npm = Arc::new(ScriptedNpm::new(true).with_installed(&["newman"]));
    let scenario = scenario(
        work,
        "executor: newman\nscript: api/collection.json\ntimeout: 2s\nload:\n  iterations: 3\nglobals:\n  host: example.com\n",
    );
    let mut executor = ScenarioExecutor::new(scenario, settings(work), npm.clone())
        .with_base_environment(BTreeMap::new());

    let prepared = executor.prepare().await.unwrap();
    assert!(npm.installs().is_empty());

    let mut handle = executor.startup(prepared).unwrap();
    let status = handle.wait().await.unwrap();
    assert_eq!(executor.finish(status).unwrap(), Outcome::Failure);

    let stdout = std::fs::read_to_string(work.join("artifacts/newman.out")).unwrap();
    let mut lines = stdout.lines();
    let args = lines.next().unwrap();
    assert!(args.starts_with("run collection.json --reporters taurus --reporter-taurus-filename "));
    assert!(args.contains("--suppress-exit-code --insecure --timeout-request 2000"));
    assert!(args.contains(&format!("--globals {}", work.join("artifacts/globals.json").display())));
    assert!(args.contains(&format!("--environment {}", work.join("artifacts/environment.json").display())));
    assert!(args.ends_with("--iteration-count 3"));

    let cwd = PathBuf::from(lines.next().unwrap());
    assert_eq!(
        cwd.canonicalize().unwrap(),
        work.join("api").canonicalize().unwrap()
    );

    let globals: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(work.join("artifacts/globals.json")).unwrap())
            .unwrap();
    assert_eq!(globals["values"][0]["key"], "host");
    assert_eq!(globals["values"][0]["value"], "example.com");
    let environment = std::fs::read_to_string(work.join("artifacts/environment.json")).unwrap();
    assert_eq!(environment, r#"{"values":[]}"#);
}

#[tokio::test]
async fn test_mandatory_tool_failure_stops_preparation() {
    let work = tempfile::tempdir().unwrap();
    let work = work.path();
    write(&work.join("test.js"), "");

    let npm = Arc::new(ScriptedNpm::new(false));
    let scenario = scenario(work, "executor: mocha\nscript: test.js\n");
    let mut executor = ScenarioExecutor::new(scenario, settings(work), npm.clone())
        .with_base_environment(BTreeMap::new());

    let err = executor.prepare().await.unwrap_err();
    match err {
        Error::ToolUnavailable { name, .. } => assert_eq!(name, "mocha"),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(executor.state(), ExecutorState::Terminal(Outcome::Failure));
    // Resolution stops at the first mandatory failure
    assert_eq!(npm.installs().len(), 1);
}

#[tokio::test]
async fn test_optional_tool_failure_is_skipped() {
    let work = tempfile::tempdir().unwrap();
    let work = work.path();
    write(&work.join("test.js"), "");

    let npm = Arc::new(ScriptedNpm::new(false).with_installed(&["mocha", "selenium-webdriver"]));
    let scenario = scenario(
        work,
        "executor: mocha\nscript: test.js\ntools:\n  - package: chai@5.1.1\n    mandatory: false\n",
    );
    let mut executor = ScenarioExecutor::new(scenario, settings(work), npm.clone())
        .with_base_environment(BTreeMap::new());

    let prepared = executor.prepare().await.unwrap();
    assert!(prepared.tools().get("chai").is_none());
    assert!(prepared.tools().get("mocha").is_some());
    assert_eq!(executor.state(), ExecutorState::Ready);
}
