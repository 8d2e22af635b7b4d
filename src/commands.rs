//! CLI command definitions
//!
//! Defines the clap commands for the scenario runner CLI.

use clap::{Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::setup::ModuleKind;

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the runner's tools and run a scenario file
    Run {
        /// Path to the YAML scenario
        scenario: PathBuf,

        /// Install prefix for the runner's packages
        #[arg(long)]
        tools_dir: Option<PathBuf>,

        /// Directory for the report file, variable dumps and runner logs
        #[arg(long)]
        artifacts_dir: Option<PathBuf>,

        /// Resolve and install tools, then stop without launching
        #[arg(long)]
        prepare_only: bool,
    },

    /// Check a single package, installing it if missing
    Resolve {
        /// Package reference: name, name@1.2.3 or @scope/name@1.2.3
        package: String,

        /// How the package is loaded (default: classic, or what is known for the package)
        #[arg(long, value_enum)]
        module_kind: Option<ModuleKindArg>,

        /// Install from a local package directory instead of the registry
        #[arg(long)]
        local_path: Option<PathBuf>,

        /// Install prefix
        #[arg(long)]
        tools_dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModuleKindArg {
    Classic,
    EsModule,
}

impl From<ModuleKindArg> for ModuleKind {
    fn from(arg: ModuleKindArg) -> Self {
        match arg {
            ModuleKindArg::Classic => ModuleKind::Classic,
            ModuleKindArg::EsModule => ModuleKind::EsModule,
        }
    }
}
