//! Local-filesystem transport adapter
//!
//! Roots the remote surface at a directory on this machine, which covers
//! same-host repositories and remotes reachable through a mount. This is
//! the adapter the binary ships with; a network transport plugs in behind
//! the same trait.

use crate::remote::{RemoteEntry, RemoteError, RemoteFs, RemoteResult};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct LocalRemote {
    root: PathBuf,
}

impl LocalRemote {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalRemote { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|s| !s.is_empty())
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }
}

impl RemoteFs for LocalRemote {
    fn mkdir_all(&self, path: &str) -> RemoteResult<()> {
        std::fs::create_dir_all(self.resolve(path)).map_err(RemoteError::Io)
    }

    fn stat(&self, path: &str) -> RemoteResult<RemoteEntry> {
        let resolved = self.resolve(path);
        let metadata =
            std::fs::metadata(&resolved).map_err(|err| RemoteError::from_io(path, err))?;

        let name = resolved
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(RemoteEntry::new(name, metadata.is_dir()))
    }

    fn open(&self, path: &str) -> RemoteResult<Box<dyn Read>> {
        let file =
            File::open(self.resolve(path)).map_err(|err| RemoteError::from_io(path, err))?;
        Ok(Box::new(file))
    }

    fn create(&self, path: &str) -> RemoteResult<Box<dyn Write>> {
        let file =
            File::create(self.resolve(path)).map_err(|err| RemoteError::from_io(path, err))?;
        Ok(Box::new(file))
    }

    fn list_dir(&self, path: &str) -> RemoteResult<Vec<RemoteEntry>> {
        let entries = std::fs::read_dir(self.resolve(path))
            .map_err(|err| RemoteError::from_io(path, err))?;

        let mut listed = Vec::new();
        for entry in entries {
            let entry = entry.map_err(RemoteError::Io)?;
            let is_dir = entry.file_type().map_err(RemoteError::Io)?.is_dir();
            listed.push(RemoteEntry::new(
                entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            ));
        }
        Ok(listed)
    }
}
