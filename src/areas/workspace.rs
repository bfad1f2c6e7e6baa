//! Working-tree file system operations
//!
//! A workspace is rooted at the repository root (the directory holding the
//! config file). Walks are ignore-aware: a directory match prunes the whole
//! subtree, a file match excludes that file. Paths handed to callers are
//! repo-relative POSIX strings, whatever the platform separator is.

use crate::artifacts::ignore::IgnoreMatcher;
use anyhow::Context;
use derive_new::new;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug)]
pub struct Workspace {
    root: Box<Path>,
}

/// A file discovered by a walk: its repo-relative POSIX path and its
/// absolute location on disk.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct TrackedFile {
    pub path: String,
    pub absolute: PathBuf,
}

impl Workspace {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Workspace {
            root: root.as_ref().into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every non-ignored file under the root, in stable name order.
    pub fn walk(&self, matcher: &IgnoreMatcher) -> anyhow::Result<Vec<TrackedFile>> {
        let root = self.root.to_path_buf();

        let walker = WalkDir::new(&root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let Some(segments) = relative_segments(&root, entry.path()) else {
                    return false;
                };
                let segments = segments.iter().map(String::as_str).collect::<Vec<_>>();
                !matcher.matches(&segments, entry.file_type().is_dir())
            });

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry
                .with_context(|| format!("Unable to walk working tree {}", root.display()))?;
            if entry.file_type().is_dir() {
                continue;
            }

            let segments = relative_segments(&root, entry.path()).with_context(|| {
                format!("Walked outside the working tree: {}", entry.path().display())
            })?;
            files.push(TrackedFile::new(
                segments.join("/"),
                entry.path().to_path_buf(),
            ));
        }

        Ok(files)
    }

    /// Absolute location for a repo-relative POSIX path.
    pub fn absolute(&self, repo_path: &str) -> PathBuf {
        repo_path
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(self.root.to_path_buf(), |acc, segment| acc.join(segment))
    }

    pub fn remove_file(&self, repo_path: &str) -> anyhow::Result<()> {
        let absolute = self.absolute(repo_path);
        std::fs::remove_file(&absolute)
            .with_context(|| format!("Unable to delete file {}", absolute.display()))
    }
}

fn relative_segments(root: &Path, path: &Path) -> Option<Vec<String>> {
    let relative = path.strip_prefix(root).ok()?;
    Some(
        relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = rel.split('/').fold(root.to_path_buf(), |p, s| p.join(s));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn walk_yields_posix_paths_and_skips_ignored_subtrees() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", "a");
        write(dir.path(), "src/lib.rs", "lib");
        write(dir.path(), "target/out.bin", "bin");

        let workspace = Workspace::new(dir.path());
        let matcher = IgnoreMatcher::new(&["target/"]);
        let files = workspace.walk(&matcher).unwrap();

        let paths = files.iter().map(|f| f.path.as_str()).collect::<Vec<_>>();
        assert_eq!(paths, ["a.txt", "src/lib.rs"]);
    }

    #[test]
    fn walk_applies_ignore_precedence() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.tmp", "x");
        write(dir.path(), "keep.tmp", "x");
        write(dir.path(), "b.txt", "x");

        let workspace = Workspace::new(dir.path());
        let matcher = IgnoreMatcher::new(&["*.tmp", "!keep.tmp"]);
        let files = workspace.walk(&matcher).unwrap();

        let paths = files.iter().map(|f| f.path.as_str()).collect::<Vec<_>>();
        assert_eq!(paths, ["b.txt", "keep.tmp"]);
    }

    #[test]
    fn metadata_dir_and_config_never_show_up_in_walks() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ".quill/1a.json", "{}");
        write(dir.path(), ".quill.toml", "version = 1");
        write(dir.path(), "tracked.txt", "x");

        let workspace = Workspace::new(dir.path());
        let files = workspace.walk(&IgnoreMatcher::new::<&str>(&[])).unwrap();

        let paths = files.iter().map(|f| f.path.as_str()).collect::<Vec<_>>();
        assert_eq!(paths, ["tracked.txt"]);
    }

    #[test]
    fn absolute_splits_posix_separators() {
        let workspace = Workspace::new("/repo");
        assert_eq!(
            workspace.absolute("a/b/c.txt"),
            PathBuf::from("/repo").join("a").join("b").join("c.txt")
        );
    }
}
