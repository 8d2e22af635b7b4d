//! Subprocess execution for probes and installs
//!
//! The resolver never spawns processes itself; it goes through a
//! `ProcessRunner` so the probe/install protocol can run against fakes.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use crate::common::{Error, Result};

/// A fully described short-lived command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Working directory; inherited when `None`
    pub cwd: Option<PathBuf>,
    /// Variables set on top of the inherited environment
    pub env: BTreeMap<String, String>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn envs(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Command line as a single string for logs and errors
    pub fn display(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished invocation
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs invocations to completion
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run and capture output, failing if the process cannot be spawned
    /// or does not finish within `limit`
    async fn output(&self, invocation: &Invocation, limit: Duration) -> Result<CommandOutput>;
}

/// Runner backed by real OS processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn output(&self, invocation: &Invocation, limit: Duration) -> Result<CommandOutput> {
        let mut cmd = tokio::process::Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &invocation.cwd {
            cmd.current_dir(cwd);
        }

        let child = cmd.spawn().map_err(|e| {
            Error::Internal(format!("Failed to run {}: {}", invocation.display(), e))
        })?;

        // Dropping the future on timeout drops the child, which kills it
        let output = tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| Error::Timeout(limit.as_secs()))??;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_system_runner_captures_output() {
        let inv = Invocation::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]);
        let out = SystemRunner.output(&inv, Duration::from_secs(10)).await.unwrap();
        assert!(!out.success);
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn test_system_runner_applies_env_and_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = BTreeMap::new();
        env.insert("PROBE_VAR".to_string(), "set".to_string());
        let inv = Invocation::new("sh")
            .args(["-c", "echo $PROBE_VAR; pwd"])
            .cwd(dir.path())
            .envs(&env);
        let out = SystemRunner.output(&inv, Duration::from_secs(10)).await.unwrap();
        let mut lines = out.stdout.lines();
        assert_eq!(lines.next(), Some("set"));
        let cwd = std::path::PathBuf::from(lines.next().unwrap());
        assert_eq!(
            cwd.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn test_system_runner_times_out() {
        let inv = Invocation::new("sh").args(["-c", "sleep 5"]);
        let result = SystemRunner.output(&inv, Duration::from_millis(100)).await;
        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn test_system_runner_missing_program() {
        let inv = Invocation::new("/definitely/not/a/program");
        assert!(SystemRunner.output(&inv, Duration::from_secs(1)).await.is_err());
    }
}
