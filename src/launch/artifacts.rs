//! Run artifacts
//!
//! Report files, variable dumps and process logs share one directory.
//! Names are claimed with `create_new`, so two writers never get the same file.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::common::Result;

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Use `dir` for artifacts, creating it if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Claim a fresh file named `<prefix><suffix>`, `<prefix>-1<suffix>`, ...
    pub fn create_artifact(&self, prefix: &str, suffix: &str) -> Result<PathBuf> {
        let (path, _) = self.open_artifact(prefix, suffix)?;
        Ok(path)
    }

    /// Claim a fresh file and write `contents` to it
    pub fn write_artifact(&self, prefix: &str, suffix: &str, contents: &[u8]) -> Result<PathBuf> {
        let (path, mut file) = self.open_artifact(prefix, suffix)?;
        io::Write::write_all(&mut file, contents)?;
        Ok(path)
    }

    fn open_artifact(&self, prefix: &str, suffix: &str) -> Result<(PathBuf, File)> {
        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{}{}", prefix, suffix)
            } else {
                format!("{}-{}{}", prefix, attempt, suffix)
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    tracing::debug!("Created artifact {}", path.display());
                    return Ok((path, file));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
