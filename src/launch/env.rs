//! Environment overlays
//!
//! Search-path variables are built as values and merged in a fixed order,
//! so nothing touches the process environment before launch.

use std::collections::BTreeMap;

/// Separator for path-list variables on this platform
pub const PATH_LIST_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };

/// How a contribution combines with what is already set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Put segments in front of any existing ones
    Prepend,
    /// Set only if the variable has no value yet
    ReplaceIfUnset,
}

/// One variable's share of an overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contribution {
    pub variable: String,
    pub segments: Vec<String>,
    pub mode: MergeMode,
}

/// Ordered contributions from one source (global install, runner, scenario)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentOverlay {
    contributions: Vec<Contribution>,
}

impl EnvironmentOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepend(mut self, variable: &str, segment: impl Into<String>) -> Self {
        self.contributions.push(Contribution {
            variable: variable.to_string(),
            segments: vec![segment.into()],
            mode: MergeMode::Prepend,
        });
        self
    }

    pub fn replace_if_unset(mut self, variable: &str, value: impl Into<String>) -> Self {
        self.contributions.push(Contribution {
            variable: variable.to_string(),
            segments: vec![value.into()],
            mode: MergeMode::ReplaceIfUnset,
        });
        self
    }

    pub fn contributions(&self) -> &[Contribution] {
        &self.contributions
    }
}

/// Merges overlays on top of a captured base environment
#[derive(Debug, Clone, Default)]
pub struct EnvironmentBuilder {
    base: BTreeMap<String, String>,
}

impl EnvironmentBuilder {
    /// Start from an explicit base, e.g. a snapshot of `std::env::vars()`
    pub fn new(base: BTreeMap<String, String>) -> Self {
        Self { base }
    }

    /// Start from the current process environment
    pub fn from_process() -> Self {
        Self::new(std::env::vars().collect())
    }

    /// Merge overlays in order, general first, most specific last
    ///
    /// Returns the final values of every variable an overlay touched.
    /// A variable set to the empty string counts as set.
    pub fn merge(&self, overlays: &[EnvironmentOverlay]) -> BTreeMap<String, String> {
        // None: unset so far
        let mut lists: BTreeMap<String, Option<Vec<String>>> = BTreeMap::new();

        for contribution in overlays.iter().flat_map(|o| o.contributions()) {
            let current = lists
                .entry(contribution.variable.clone())
                .or_insert_with(|| self.base.get(&contribution.variable).map(|v| split_segments(v)));

            match contribution.mode {
                MergeMode::Prepend => {
                    let mut merged = contribution.segments.clone();
                    if let Some(existing) = current.take() {
                        merged.extend(
                            existing
                                .into_iter()
                                .filter(|s| !contribution.segments.contains(s)),
                        );
                    }
                    *current = Some(merged);
                }
                MergeMode::ReplaceIfUnset => {
                    if current.is_none() {
                        *current = Some(contribution.segments.clone());
                    }
                }
            }
        }

        lists
            .into_iter()
            .filter_map(|(k, segments)| {
                segments.map(|s| (k, s.join(&PATH_LIST_SEPARATOR.to_string())))
            })
            .collect()
    }
}

/// Split a path list, keeping empty segments except for an empty value
fn split_segments(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    value.split(PATH_LIST_SEPARATOR).map(str::to_string).collect()
}
