//! Variable group dumps
//!
//! A group given as a string is passed straight through as the flag value.
//! Anything else is written as a `{"values": [...]}` document and the flag
//! points at the file.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::artifacts::ArtifactStore;
use crate::common::Result;

/// A named variable group as written in the scenario
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum VariableSet {
    /// Passed through verbatim, e.g. a path to an existing export
    Inline(String),
    /// Ready-made entries copied into `values`
    Entries(Vec<Value>),
    /// `name: value` pairs, each turned into an enabled entry
    Mapping(Map<String, Value>),
}

impl VariableSet {
    /// The document written for non-inline groups
    pub fn document(&self) -> Option<Value> {
        match self {
            VariableSet::Inline(_) => None,
            VariableSet::Entries(entries) => Some(json!({ "values": entries })),
            VariableSet::Mapping(map) => {
                let values: Vec<Value> = map
                    .iter()
                    .map(|(key, value)| {
                        json!({
                            "key": key,
                            "value": value,
                            "type": "any",
                            "enabled": true,
                        })
                    })
                    .collect();
                Some(json!({ "values": values }))
            }
        }
    }
}

/// Flags for one group: `--<group> <value-or-path>`
///
/// A missing group still gets an empty document.
pub fn dump_vars(group: &str, vars: Option<&VariableSet>, artifacts: &ArtifactStore) -> Result<Vec<String>> {
    let flag = format!("--{}", group);

    if let Some(VariableSet::Inline(value)) = vars {
        return Ok(vec![flag, value.clone()]);
    }

    let document = vars
        .and_then(VariableSet::document)
        .unwrap_or_else(|| json!({ "values": [] }));
    let path = artifacts.write_artifact(group, ".json", serde_json::to_string(&document)?.as_bytes())?;
    tracing::debug!("Dumped {} to {}", group, path.display());

    Ok(vec![flag, path.display().to_string()])
}
