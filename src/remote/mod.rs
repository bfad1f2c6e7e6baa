//! The remote object surface
//!
//! The core only requires this narrow, synchronous capability from a
//! transport adapter: make directories, stat, open, create, and list by
//! path, with a distinguishable "not found" outcome. Paths are POSIX
//! strings relative to the repository's remote root; the adapter decides
//! what they resolve to. Opening the secure session itself is the
//! adapter's business.

pub mod local;
pub mod memory;

use derive_new::new;
use std::io::{Read, Write};

pub type RemoteResult<T> = Result<T, RemoteError>;

/// "Not found" is frequently a valid branch (the object dedup probe); any
/// other remote failure propagates as an error.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("remote path not found: {0}")]
    NotFound(String),
    #[error("remote I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("remote failure: {0}")]
    Other(String),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
    }

    /// Map an io::Error for `path`, keeping NotFound distinguishable.
    pub(crate) fn from_io(path: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            RemoteError::NotFound(path.to_string())
        } else {
            RemoteError::Io(err)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct RemoteEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Capability surface a transport adapter supplies to the core.
///
/// All operations block until the transport completes or errors; the core
/// adds no timeouts or retries of its own.
pub trait RemoteFs {
    /// Create `path` and any missing parents; existing directories are fine.
    fn mkdir_all(&self, path: &str) -> RemoteResult<()>;

    fn stat(&self, path: &str) -> RemoteResult<RemoteEntry>;

    fn open(&self, path: &str) -> RemoteResult<Box<dyn Read>>;

    /// Create (or truncate) a file for writing. Parents must already exist.
    fn create(&self, path: &str) -> RemoteResult<Box<dyn Write>>;

    fn list_dir(&self, path: &str) -> RemoteResult<Vec<RemoteEntry>>;
}

/// Join repo-relative POSIX path pieces, skipping empties.
pub(crate) fn join(base: &str, rest: &str) -> String {
    match (base.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{}/{}", base.trim_end_matches('/'), rest.trim_start_matches('/')),
    }
}
