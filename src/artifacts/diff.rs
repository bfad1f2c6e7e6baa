//! Working-tree diff engine
//!
//! Classifies every path as created, modified, or deleted relative to a
//! reference commit, in two passes: first the commit's file list is checked
//! against the filesystem (missing or now-a-directory means deleted, a
//! differing hash means modified), then an ignore-aware walk reports any
//! file the commit does not know about as created. Unchanged files are
//! omitted. The walk uses the ignore snapshot of the reference commit, not
//! the live config, so historical diffs stay reproducible.

use crate::areas::workspace::Workspace;
use crate::artifacts::codec;
use crate::artifacts::commit::Commit;
use crate::artifacts::ignore::IgnoreMatcher;
use anyhow::Context;
use colored::Colorize;
use derive_new::new;
use std::fmt;
use std::fs::File;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Create,
    Modify,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct DiffEntry {
    pub path: String,
    pub kind: DiffKind,
}

/// The local changes against one reference commit. A path appears at most
/// once; callers only query membership per path and kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffList(Vec<DiffEntry>);

impl DiffList {
    pub fn local_from_commit(workspace: &Workspace, commit: &Commit) -> anyhow::Result<Self> {
        let mut entries = Vec::new();

        // pass 1: deleted and modified files from the commit's point of view
        for commit_file in &commit.files {
            let absolute = workspace.absolute(&commit_file.path);

            let metadata = match std::fs::metadata(&absolute) {
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    entries.push(DiffEntry::new(commit_file.path.clone(), DiffKind::Delete));
                    continue;
                }
                Err(err) => {
                    return Err(err).context(format!(
                        "Unable to stat working-tree file {}",
                        absolute.display()
                    ));
                }
                Ok(metadata) => metadata,
            };
            if metadata.is_dir() {
                entries.push(DiffEntry::new(commit_file.path.clone(), DiffKind::Delete));
                continue;
            }

            let mut file = File::open(&absolute).with_context(|| {
                format!("Unable to open working-tree file {}", absolute.display())
            })?;
            let hash = codec::digest(&mut file)
                .with_context(|| format!("Unable to hash file {}", absolute.display()))?;
            if hash != commit_file.hash {
                entries.push(DiffEntry::new(commit_file.path.clone(), DiffKind::Modify));
            }
        }

        // pass 2: new files, walking with the commit's own ignore snapshot
        let matcher = IgnoreMatcher::new(&commit.ignore);
        for tracked in workspace.walk(&matcher)? {
            if commit.lookup(&tracked.path).is_none() {
                entries.push(DiffEntry::new(tracked.path, DiffKind::Create));
            }
        }

        Ok(DiffList(entries))
    }

    pub fn has_create(&self, path: &str) -> bool {
        self.has(path, DiffKind::Create)
    }

    pub fn has_modify(&self, path: &str) -> bool {
        self.has(path, DiffKind::Modify)
    }

    pub fn has_delete(&self, path: &str) -> bool {
        self.has(path, DiffKind::Delete)
    }

    pub fn has_modify_or_delete(&self, path: &str) -> bool {
        self.has_modify(path) || self.has_delete(path)
    }

    fn has(&self, path: &str, kind: DiffKind) -> bool {
        self.0.iter().any(|e| e.kind == kind && e.path == path)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiffEntry> {
        self.0.iter()
    }
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let glyph = match self.kind {
            DiffKind::Create => "+".green(),
            DiffKind::Modify => "~".yellow(),
            DiffKind::Delete => "-".red(),
        };
        write!(f, "{} {}", glyph, self.path)
    }
}
