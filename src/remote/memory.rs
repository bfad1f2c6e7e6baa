//! In-memory transport adapter
//!
//! Backs the remote surface with maps so the content-addressing and
//! conflict logic can be exercised without a network endpoint. Counts
//! every operation, which lets tests assert things like "the second put of
//! identical content never happened" or "a no-op checkout made no remote
//! calls".

use crate::remote::{RemoteEntry, RemoteError, RemoteFs, RemoteResult, join};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
    counts: OpCounts,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OpCounts {
    pub mkdirs: usize,
    pub stats: usize,
    pub opens: usize,
    pub creates: usize,
    pub lists: usize,
}

impl OpCounts {
    /// Operations that move file content, as opposed to existence probes.
    pub fn transfers(&self) -> usize {
        self.opens + self.creates
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> OpCounts {
        self.lock().counts
    }

    pub fn reset_counts(&self) {
        self.lock().counts = OpCounts::default();
    }

    pub fn file_count(&self) -> usize {
        self.lock().files.len()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lock().files.contains_key(path)
    }

    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(path).cloned()
    }

    /// Paths of every stored file, in lexical order.
    pub fn paths(&self) -> Vec<String> {
        self.lock().files.keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Inner {
    fn dir_exists(&self, path: &str) -> bool {
        path.is_empty()
            || self.dirs.contains(path)
            || self
                .files
                .keys()
                .any(|file| file.starts_with(&format!("{path}/")))
    }

    fn register_dir(&mut self, path: &str) {
        let mut prefix = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            prefix = join(&prefix, segment);
            self.dirs.insert(prefix.clone());
        }
    }

    fn register_parents_of(&mut self, file_path: &str) {
        if let Some((parent, _)) = file_path.rsplit_once('/') {
            self.register_dir(parent);
        }
    }
}

/// Buffers writes and commits them to the shared map when dropped,
/// matching the "write the whole file, then it exists" shape of a real
/// file-transfer channel.
struct MemoryWriter {
    path: String,
    buffer: Vec<u8>,
    inner: Arc<Mutex<Inner>>,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.register_parents_of(&self.path);
        inner.files.insert(self.path.clone(), std::mem::take(&mut self.buffer));
    }
}

impl RemoteFs for MemoryRemote {
    fn mkdir_all(&self, path: &str) -> RemoteResult<()> {
        let mut inner = self.lock();
        inner.counts.mkdirs += 1;
        inner.register_dir(path);
        Ok(())
    }

    fn stat(&self, path: &str) -> RemoteResult<RemoteEntry> {
        let mut inner = self.lock();
        inner.counts.stats += 1;

        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        if inner.files.contains_key(path) {
            Ok(RemoteEntry::new(name, false))
        } else if inner.dir_exists(path) {
            Ok(RemoteEntry::new(name, true))
        } else {
            Err(RemoteError::NotFound(path.to_string()))
        }
    }

    fn open(&self, path: &str) -> RemoteResult<Box<dyn Read>> {
        let mut inner = self.lock();
        inner.counts.opens += 1;

        match inner.files.get(path) {
            Some(content) => Ok(Box::new(Cursor::new(content.clone()))),
            None => Err(RemoteError::NotFound(path.to_string())),
        }
    }

    fn create(&self, path: &str) -> RemoteResult<Box<dyn Write>> {
        let mut inner = self.lock();
        inner.counts.creates += 1;

        Ok(Box::new(MemoryWriter {
            path: path.to_string(),
            buffer: Vec::new(),
            inner: Arc::clone(&self.inner),
        }))
    }

    fn list_dir(&self, path: &str) -> RemoteResult<Vec<RemoteEntry>> {
        let mut inner = self.lock();
        inner.counts.lists += 1;

        if !inner.dir_exists(path) {
            return Err(RemoteError::NotFound(path.to_string()));
        }

        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };

        let mut children = BTreeMap::new();
        for file in inner.files.keys() {
            if let Some(rest) = file.strip_prefix(&prefix) {
                match rest.split_once('/') {
                    Some((dir, _)) => children.insert(dir.to_string(), true),
                    None => children.insert(rest.to_string(), false),
                };
            }
        }
        for dir in &inner.dirs {
            if let Some(rest) = dir.strip_prefix(&prefix) {
                let child = rest.split('/').next().unwrap_or(rest);
                if !child.is_empty() {
                    children.entry(child.to_string()).or_insert(true);
                }
            }
        }

        Ok(children
            .into_iter()
            .map(|(name, is_dir)| RemoteEntry::new(name, is_dir))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_appear_after_the_writer_is_dropped() {
        let remote = MemoryRemote::new();

        let mut writer = remote.create("objects/a/b/hash").unwrap();
        writer.write_all(b"blob").unwrap();
        assert!(!remote.contains("objects/a/b/hash"));
        drop(writer);

        assert!(remote.contains("objects/a/b/hash"));
        assert!(remote.stat("objects/a").unwrap().is_dir);
    }

    #[test]
    fn list_dir_reports_immediate_children_only() {
        let remote = MemoryRemote::new();
        drop(remote.create("commits/1.json").unwrap());
        drop(remote.create("commits/2.json").unwrap());
        drop(remote.create("objects/a/deep").unwrap());

        let commits = remote.list_dir("commits").unwrap();
        assert_eq!(commits.len(), 2);
        assert!(commits.iter().all(|e| !e.is_dir));

        let root = remote.list_dir("").unwrap();
        let names = root.iter().map(|e| e.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["commits", "objects"]);
    }

    #[test]
    fn operation_counts_accumulate() {
        let remote = MemoryRemote::new();
        drop(remote.create("f").unwrap());
        let _ = remote.stat("f");
        let _ = remote.stat("missing");

        let counts = remote.counts();
        assert_eq!(counts.creates, 1);
        assert_eq!(counts.stats, 2);
        assert_eq!(counts.transfers(), 1);
    }
}
