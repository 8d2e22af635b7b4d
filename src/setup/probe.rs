//! Presence probes
//!
//! A probe asks the runtime to load a package and print a sentinel. Classic
//! packages are found through `NODE_PATH`; ES module imports ignore it, so
//! those probes run from inside the prefix's `node_modules` instead.

use std::collections::BTreeMap;
use std::path::Path;

use super::runner::Invocation;
use super::spec::ModuleKind;

/// Line printed by a probe that managed to load the package
pub fn sentinel(package: &str) -> String {
    format!("{} is installed", package)
}

/// Does this probe output prove the package loaded?
pub fn confirms(package: &str, stdout: &str) -> bool {
    stdout.contains(&sentinel(package))
}

/// Everything a probe needs besides the package name
pub struct ProbeContext<'a> {
    /// Runtime used to evaluate the probe script
    pub runtime: &'a Path,
    /// Install prefix of the resolver
    pub tools_dir: &'a Path,
    /// Directory the scenario runs from
    pub cwd: &'a Path,
    pub env: &'a BTreeMap<String, String>,
}

impl ModuleKind {
    /// Build the probe invocation for `package`
    pub fn probe(&self, package: &str, ctx: &ProbeContext<'_>) -> Invocation {
        let ok_msg = sentinel(package);
        match self {
            ModuleKind::Classic => {
                tracing::debug!("NODE_PATH for check: {:?}", ctx.env.get("NODE_PATH"));
                Invocation::new(ctx.runtime)
                    .arg("-e")
                    .arg(format!("require('{}'); console.log('{}');", package, ok_msg))
                    .cwd(ctx.cwd)
                    .envs(ctx.env)
            }
            ModuleKind::EsModule => {
                let cwd = if ctx.cwd.join("node_modules").exists() {
                    ctx.cwd.to_path_buf()
                } else {
                    ctx.tools_dir.join("node_modules")
                };
                tracing::debug!("cwd for check: {}", cwd.display());
                Invocation::new(ctx.runtime)
                    .arg("--input-type=module")
                    .arg("-e")
                    .arg(format!(
                        "import('{}').then(() => {{ console.log('{}'); process.exit(0); }}).catch(() => process.exit(1));",
                        package, ok_msg
                    ))
                    .cwd(cwd)
                    .envs(ctx.env)
            }
        }
    }
}
