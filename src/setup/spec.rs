//! Tool descriptions
//!
//! A `ToolSpec` says what a scenario needs; the resolver decides how to get it.

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

use crate::common::{Error, Result};

/// Where a tool comes from and whether it can be installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolSource {
    /// Package fetched from the registry by the package manager
    Registry,
    /// Package directory on disk, installed by linking it into the prefix
    LocalModule { path: PathBuf },
    /// Fixed path shipped with the runner; never installed or probed
    Binary { path: PathBuf },
    /// Executable found on PATH under one of several names; never installed
    Host { candidates: Vec<String> },
}

impl ToolSource {
    pub fn is_installable(&self) -> bool {
        matches!(self, ToolSource::Registry | ToolSource::LocalModule { .. })
    }
}

/// How a package is loaded, which decides the probe syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    /// CommonJS, loaded with `require`
    #[default]
    Classic,
    /// ES module, loaded with dynamic `import`
    EsModule,
}

/// A package name with an optional exact version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    pub name: String,
    pub version: Option<semver::Version>,
}

impl PackageRef {
    /// Parse `name`, `name@1.2.3`, `@scope/name` or `@scope/name@1.2.3`
    ///
    /// A leading `@` opens a scope and stays part of the name.
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        let (scope, rest) = match reference.strip_prefix('@') {
            Some(rest) => ("@", rest),
            None => ("", reference),
        };

        let (bare, version) = match rest.split_once('@') {
            Some((bare, version)) => (bare, Some(version)),
            None => (rest, None),
        };

        if bare.is_empty() {
            return Err(Error::invalid_package(reference, "missing package name"));
        }
        if !scope.is_empty() && !bare.contains('/') {
            return Err(Error::invalid_package(reference, "scoped names look like @scope/name"));
        }

        let version = match version {
            Some(v) if !v.is_empty() => Some(semver::Version::parse(v).map_err(|e| {
                Error::invalid_package(reference, format!("'{}' is not an exact version: {}", v, e))
            })?),
            _ => None,
        };

        Ok(Self {
            name: format!("{}{}", scope, bare),
            version,
        })
    }

    /// Argument passed to `npm install`
    pub fn install_arg(&self) -> String {
        match &self.version {
            Some(v) => format!("{}@{}", self.name, v),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.install_arg())
    }
}

/// Declarative description of one external dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    /// Identifier, unique within a resolution session
    pub name: String,
    pub package: PackageRef,
    pub source: ToolSource,
    pub module_kind: ModuleKind,
    /// Path inside the installed package to invoke, if not the package root
    pub entry: Option<PathBuf>,
    pub mandatory: bool,
}

impl ToolSpec {
    /// Registry package, e.g. `mocha@10.6.0`
    pub fn registry(reference: &str) -> Result<Self> {
        let package = PackageRef::parse(reference)?;
        Ok(Self {
            name: package.name.clone(),
            package,
            source: ToolSource::Registry,
            module_kind: ModuleKind::Classic,
            entry: None,
            mandatory: true,
        })
    }

    /// Package installed from a directory on disk
    pub fn local_module(reference: &str, path: impl Into<PathBuf>) -> Result<Self> {
        let mut spec = Self::registry(reference)?;
        spec.source = ToolSource::LocalModule { path: path.into() };
        spec.module_kind = ModuleKind::EsModule;
        Ok(spec)
    }

    /// Fixed file that is used as-is
    pub fn binary(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            package: PackageRef {
                name: name.to_string(),
                version: None,
            },
            source: ToolSource::Binary { path: path.into() },
            module_kind: ModuleKind::Classic,
            entry: None,
            mandatory: true,
        }
    }

    /// Executable looked up on PATH
    pub fn host(name: &str, candidates: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            package: PackageRef {
                name: name.to_string(),
                version: None,
            },
            source: ToolSource::Host {
                candidates: candidates.iter().map(|c| c.to_string()).collect(),
            },
            module_kind: ModuleKind::Classic,
            entry: None,
            mandatory: true,
        }
    }

    /// Use an explicit executable instead of searching PATH for the candidates
    pub fn located_at(mut self, path: &std::path::Path) -> Self {
        if let ToolSource::Host { candidates } = &mut self.source {
            *candidates = vec![path.display().to_string()];
        }
        self
    }

    pub fn with_module_kind(mut self, kind: ModuleKind) -> Self {
        self.module_kind = kind;
        self
    }

    pub fn with_entry(mut self, entry: impl Into<PathBuf>) -> Self {
        self.entry = Some(entry.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.mandatory = false;
        self
    }
}

/// Extra tool declared by a scenario file
#[derive(Debug, Clone, Deserialize)]
pub struct ToolDeclaration {
    /// Package reference, `name[@version]`
    pub package: String,
    #[serde(default)]
    pub module_kind: ModuleKind,
    /// Install from this directory instead of the registry
    #[serde(default)]
    pub local_path: Option<PathBuf>,
    #[serde(default)]
    pub entry: Option<PathBuf>,
    #[serde(default = "default_mandatory")]
    pub mandatory: bool,
}

fn default_mandatory() -> bool {
    true
}

impl ToolDeclaration {
    pub fn to_spec(&self) -> Result<ToolSpec> {
        let mut spec = match &self.local_path {
            Some(path) => ToolSpec::local_module(&self.package, path)?,
            None => ToolSpec::registry(&self.package)?,
        };
        spec.module_kind = self.module_kind;
        spec.entry = self.entry.clone();
        spec.mandatory = self.mandatory;
        Ok(spec)
    }
}
