//! Error types for the scenario runner
//!
//! Messages name the tool, command or file involved so a failed run can be
//! diagnosed from the error line alone.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the scenario runner
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid duration '{0}'. Use a number of seconds or values like 500ms, 10s, 1m30s, 2h")]
    InvalidDuration(String),

    #[error("Invalid package reference '{reference}': {reason}")]
    InvalidPackage { reference: String, reason: String },

    // === Resolution Errors ===
    #[error("Required tool '{name}' is not available: {reason}")]
    ToolUnavailable { name: String, reason: String },

    // === Launch Errors ===
    #[error("Failed to launch '{command}': {reason}")]
    Launch { command: String, reason: String },

    #[error("Cannot {action} while executor is {state}")]
    InvalidState { action: String, state: String },

    // === Timeout Errors ===
    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a tool unavailable error
    pub fn tool_unavailable(name: &str, reason: impl Into<String>) -> Self {
        Self::ToolUnavailable {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a launch error for the given command line
    pub fn launch<S: AsRef<str>>(command: &[S], reason: impl Into<String>) -> Self {
        Self::Launch {
            command: command.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(" "),
            reason: reason.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(action: &str, state: &str) -> Self {
        Self::InvalidState {
            action: action.to_string(),
            state: state.to_string(),
        }
    }

    /// Create an invalid package error
    pub fn invalid_package(reference: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPackage {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_unavailable_names_tool() {
        let err = Error::tool_unavailable("newman", "probe failed after install");
        assert!(err.to_string().contains("'newman'"));
    }

    #[test]
    fn test_launch_joins_command() {
        let err = Error::launch(&["node", "plugin.js", "--report-file"], "not found");
        assert_eq!(
            err.to_string(),
            "Failed to launch 'node plugin.js --report-file': not found"
        );
    }
}
