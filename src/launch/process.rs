//! Process launching
//!
//! Starts the runner and hands back a handle immediately; waiting and
//! killing belong to the caller.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};

use super::command::CommandSpec;
use crate::common::{Error, Result};

/// A started runner process
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    report_file: PathBuf,
    command_line: Vec<String>,
}

impl ProcessHandle {
    /// OS process id, `None` once the process has been reaped
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Report file the runner was told to write
    pub fn report_file(&self) -> &Path {
        &self.report_file
    }

    pub fn command_line(&self) -> &[String] {
        &self.command_line
    }

    /// Poll for completion without blocking
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        Ok(self.child.try_wait()?)
    }

    /// Wait for the process to exit
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        Ok(self.child.wait().await?)
    }

    /// Give up the handle and take the OS child
    pub fn into_child(self) -> Child {
        self.child
    }
}

pub struct ProcessLauncher;

impl ProcessLauncher {
    /// Start the process described by `spec`
    pub fn launch(spec: &CommandSpec) -> Result<ProcessHandle> {
        let command_line = spec.command_line();
        let program = locate_program(&spec.program).map_err(|reason| Error::launch(&command_line, reason))?;

        let mut cmd = Command::new(&program);
        cmd.args(&spec.args)
            .current_dir(&spec.cwd)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(redirect(spec.stdout.as_deref()).map_err(|e| Error::launch(&command_line, e))?)
            .stderr(redirect(spec.stderr.as_deref()).map_err(|e| Error::launch(&command_line, e))?);

        tracing::info!("Starting: {}", command_line.join(" "));
        let child = cmd
            .spawn()
            .map_err(|e| Error::launch(&command_line, e.to_string()))?;
        tracing::debug!("Started process {:?} in {}", child.id(), spec.cwd.display());

        Ok(ProcessHandle {
            child,
            report_file: spec.report_file.clone(),
            command_line,
        })
    }
}

/// Check the program exists and is executable; bare names are looked up on PATH
fn locate_program(program: &Path) -> std::result::Result<PathBuf, String> {
    if program.components().count() == 1 && !program.is_absolute() {
        return which::which(program).map_err(|e| format!("{} not found on PATH: {}", program.display(), e));
    }

    let metadata = std::fs::metadata(program)
        .map_err(|e| format!("{} does not exist: {}", program.display(), e))?;
    if !metadata.is_file() {
        return Err(format!("{} is not a file", program.display()));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(format!("{} is not executable", program.display()));
        }
    }

    Ok(program.to_path_buf())
}

fn redirect(path: Option<&Path>) -> std::result::Result<Stdio, String> {
    match path {
        Some(path) => std::fs::File::create(path)
            .map(Stdio::from)
            .map_err(|e| format!("cannot open {}: {}", path.display(), e)),
        None => Ok(Stdio::inherit()),
    }
}
