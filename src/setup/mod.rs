//! Tool resolution and installation
//!
//! Finds the runtime and package manager on the host, probes packages in a
//! private install prefix and installs the ones that are missing.

pub mod probe;
pub mod registry;
pub mod resolver;
pub mod runner;
pub mod spec;

pub use resolver::{ResolveEnv, ResolvedTool, ResolvedTools, Toolchain, ToolResolver};
pub use runner::{CommandOutput, Invocation, ProcessRunner, SystemRunner};
pub use spec::{ModuleKind, PackageRef, ToolDeclaration, ToolSource, ToolSpec};

use crate::common::Result;

/// Build the toolchain from already resolved host tools
pub fn toolchain(tools: &ResolvedTools) -> Result<Toolchain> {
    Ok(Toolchain {
        runtime: tools.require(registry::NODE)?.invocation_path.clone(),
        manager: tools.require(registry::NPM)?.invocation_path.clone(),
    })
}
