//! Known tools
//!
//! Names, pinned versions and entry points of the tools the runner families
//! depend on.

use std::path::Path;

use super::spec::{ModuleKind, PackageRef, ToolSource, ToolSpec};

pub const NODE: &str = "node";
pub const NPM: &str = "npm";
pub const MOCHA: &str = "mocha";
pub const SELENIUM_WEBDRIVER: &str = "selenium-webdriver";
pub const NEWMAN: &str = "newman";
pub const TSX: &str = "tsx";
pub const MOCHA_PLUGIN: &str = "mocha-taurus-plugin";
pub const NEWMAN_REPORTER: &str = "newman-reporter-taurus";

/// Node.js runtime
pub fn node() -> ToolSpec {
    ToolSpec::host(NODE, &["node", "nodejs"])
}

/// npm package manager
pub fn npm() -> ToolSpec {
    if cfg!(windows) {
        ToolSpec::host(NPM, &["npm", "npm.cmd"])
    } else {
        ToolSpec::host(NPM, &["npm"])
    }
}

fn pinned(name: &str, version: Option<(u64, u64, u64)>) -> ToolSpec {
    ToolSpec {
        name: name.to_string(),
        package: PackageRef {
            name: name.to_string(),
            version: version.map(|(major, minor, patch)| semver::Version::new(major, minor, patch)),
        },
        source: ToolSource::Registry,
        module_kind: ModuleKind::Classic,
        entry: None,
        mandatory: true,
    }
}

pub fn mocha() -> ToolSpec {
    pinned(MOCHA, Some((10, 6, 0)))
}

pub fn selenium_webdriver() -> ToolSpec {
    pinned(SELENIUM_WEBDRIVER, Some((4, 23, 0)))
}

pub fn newman() -> ToolSpec {
    pinned(NEWMAN, None).with_entry("bin/newman.js")
}

/// TypeScript executor, shipped as an ES module
pub fn tsx() -> ToolSpec {
    pinned(TSX, Some((4, 19, 2))).with_module_kind(ModuleKind::EsModule)
}

/// Mocha wrapper that writes the report file
pub fn mocha_plugin(resources_dir: &Path) -> ToolSpec {
    ToolSpec::binary(MOCHA_PLUGIN, resources_dir.join("mocha-taurus-plugin.js"))
}

/// Newman reporter that writes the report file
pub fn newman_reporter(resources_dir: &Path) -> ToolSpec {
    ToolSpec::binary(NEWMAN_REPORTER, resources_dir.join("newman-reporter-taurus.js"))
}

/// Look up a known package tool by name
pub fn known_package(name: &str) -> Option<ToolSpec> {
    match name {
        MOCHA => Some(mocha()),
        SELENIUM_WEBDRIVER => Some(selenium_webdriver()),
        NEWMAN => Some(newman()),
        TSX => Some(tsx()),
        _ => None,
    }
}
