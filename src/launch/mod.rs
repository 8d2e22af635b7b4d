//! Command and environment construction, and process launch

pub mod artifacts;
pub mod command;
pub mod env;
pub mod process;
pub mod vars;

pub use artifacts::ArtifactStore;
pub use command::{BuildContext, CommandBuilder, CommandGrammar, CommandSpec, RunnerFamily};
pub use env::{EnvironmentBuilder, EnvironmentOverlay, MergeMode};
pub use process::{ProcessHandle, ProcessLauncher};
pub use vars::VariableSet;
