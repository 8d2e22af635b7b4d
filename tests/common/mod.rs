//! Shared fakes for the integration tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use scenario_runner::setup::{CommandOutput, Invocation, PackageRef, ProcessRunner};
use scenario_runner::Result;

/// Stands in for node and npm
///
/// `--version` always succeeds, probes succeed for installed packages and
/// installs mark a package installed when `install_works` is set.
pub struct ScriptedNpm {
    installed: Mutex<HashSet<String>>,
    install_works: bool,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedNpm {
    pub fn new(install_works: bool) -> Self {
        Self {
            installed: Mutex::new(HashSet::new()),
            install_works,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_installed(self, packages: &[&str]) -> Self {
        self.installed
            .lock()
            .unwrap()
            .extend(packages.iter().map(|p| p.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn installs(&self) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|c| c.args.first().map(String::as_str) == Some("install"))
            .collect()
    }

    pub fn probes(&self) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|c| c.args.iter().any(|a| a == "-e"))
            .collect()
    }

    fn installed_name(inv: &Invocation) -> Option<String> {
        let target = inv.args.get(1)?;
        if target == "." {
            let dir = inv.cwd.as_deref()?;
            return package_name_in(dir);
        }
        PackageRef::parse(target).ok().map(|p| p.name)
    }
}

fn package_name_in(dir: &Path) -> Option<String> {
    let content = std::fs::read_to_string(dir.join("package.json")).ok()?;
    let parsed: serde_json::Value = serde_json::from_str(&content).ok()?;
    parsed.get("name")?.as_str().map(str::to_string)
}

/// Package named inside `require('...')` or `import('...')`
fn probed_package(script: &str) -> Option<&str> {
    let start = script.find("('")? + 2;
    let len = script[start..].find("')")?;
    Some(&script[start..start + len])
}

fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        success: true,
        code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

fn failed(stderr: &str) -> CommandOutput {
    CommandOutput {
        success: false,
        code: Some(1),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

#[async_trait]
impl ProcessRunner for ScriptedNpm {
    async fn output(&self, inv: &Invocation, _limit: Duration) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(inv.clone());

        match inv.args.first().map(String::as_str) {
            Some("--version") => Ok(ok("v20.11.0\n")),
            Some("install") => {
                if !self.install_works {
                    return Ok(failed("npm ERR! 404 Not Found"));
                }
                if let Some(name) = Self::installed_name(inv) {
                    self.installed.lock().unwrap().insert(name);
                }
                Ok(ok("added 1 package"))
            }
            _ => {
                let script = inv.args.last().map(String::as_str).unwrap_or_default();
                match probed_package(script) {
                    Some(pkg) if self.installed.lock().unwrap().contains(pkg) => {
                        Ok(ok(&format!("{} is installed\n", pkg)))
                    }
                    Some(pkg) => Ok(failed(&format!("Cannot find module '{}'", pkg))),
                    None => Ok(failed("unexpected invocation")),
                }
            }
        }
    }
}
