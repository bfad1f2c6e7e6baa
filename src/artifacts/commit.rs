//! The commit record: an immutable snapshot of the working tree
//!
//! A commit is identified by `created`, wall-clock seconds at save time,
//! which doubles as the sort/recency key. It carries the full file list
//! (repo-relative POSIX path, content hash), the message, and a snapshot of
//! the ignore patterns that produced it so later diffs against this commit
//! apply the same rules.

use derive_new::new;
use serde::{Deserialize, Serialize};

pub const MANIFEST_EXT: &str = "json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Seconds-derived identifier; zero until the history store assigns one.
    #[serde(rename = "created_at")]
    pub created: i64,
    pub files: Vec<CommitFile>,
    pub message: String,
    pub ignore: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct CommitFile {
    pub path: String,
    pub hash: String,
}

impl Commit {
    pub fn new(message: impl Into<String>, ignore: Vec<String>) -> Self {
        Commit {
            created: 0,
            files: Vec::new(),
            message: message.into(),
            ignore,
        }
    }

    /// Deterministic manifest name, identical locally and remotely so
    /// pull and mirror never need translation.
    pub fn file_name(&self) -> String {
        manifest_name(self.created)
    }

    /// Exact-path lookup within this commit's file list.
    pub fn lookup(&self, path: &str) -> Option<&CommitFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Record a (path, hash) pair; paths are unique within a commit.
    pub fn record(&mut self, file: CommitFile) {
        debug_assert!(
            self.lookup(&file.path).is_none(),
            "duplicate path in commit: {}",
            file.path
        );
        self.files.push(file);
    }
}

pub fn manifest_name(id: i64) -> String {
    format!("{id:x}.{MANIFEST_EXT}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_name_is_hex_with_fixed_extension() {
        let commit = Commit {
            created: 0x68b0_0000,
            ..Commit::default()
        };

        assert_eq!(commit.file_name(), "68b00000.json");
    }

    #[test]
    fn lookup_is_exact() {
        let mut commit = Commit::new("msg", vec![]);
        commit.record(CommitFile::new("a/b.txt".into(), "h1".into()));

        assert_eq!(commit.lookup("a/b.txt").map(|f| f.hash.as_str()), Some("h1"));
        assert!(commit.lookup("a/b").is_none());
        assert!(commit.lookup("b.txt").is_none());
    }
}
