//! Local commit-manifest store
//!
//! One file per commit under `.quill/`, named by the hex-encoded commit
//! identifier. Manifests accumulate and are never deleted; the remote
//! `commits/` directory mirrors them byte for byte, so the local store acts
//! as the cache that head resolution reads from.

use crate::artifacts::commit::{Commit, MANIFEST_EXT, manifest_name};
use anyhow::Context;
use std::fs::File;
use std::path::{Path, PathBuf};

pub const HISTORY_DIR: &str = ".quill";

#[derive(Debug)]
pub struct History {
    path: Box<Path>,
}

impl History {
    /// Create the history directory under `root` if it is missing.
    pub fn init(root: &Path) -> anyhow::Result<Self> {
        let path = root.join(HISTORY_DIR);
        if !path.exists() {
            std::fs::create_dir(&path).with_context(|| {
                format!("Unable to create history directory {}", path.display())
            })?;
        }
        Ok(History { path: path.into() })
    }

    /// Open the history store of an existing repository rooted at `root`.
    pub fn open_at(root: &Path) -> anyhow::Result<Self> {
        let path = root.join(HISTORY_DIR);
        anyhow::ensure!(
            path.is_dir(),
            "no {HISTORY_DIR}/ directory found under {}",
            root.display()
        );
        Ok(History { path: path.into() })
    }

    pub fn dir(&self) -> &Path {
        &self.path
    }

    pub fn manifest_path(&self, id: i64) -> PathBuf {
        self.path.join(manifest_name(id))
    }

    pub fn contains_manifest(&self, file_name: &str) -> bool {
        self.path.join(file_name).is_file()
    }

    /// Serialize the commit into the store, assigning its identifier first
    /// if it has none. Identifiers start at the current wall-clock second
    /// and are bumped past any manifest that already exists, so two saves
    /// within one second still get distinct, monotonic ids.
    pub fn save(&self, commit: &mut Commit) -> anyhow::Result<()> {
        if commit.created == 0 {
            commit.created = self.allocate_id();
        }

        let path = self.manifest_path(commit.created);
        let file = File::create(&path)
            .with_context(|| format!("Unable to create manifest file {}", path.display()))?;
        serde_json::to_writer_pretty(file, commit)
            .with_context(|| format!("Unable to serialize commit manifest {}", path.display()))
    }

    fn allocate_id(&self) -> i64 {
        let mut id = chrono::Utc::now().timestamp();
        while self.manifest_path(id).exists() {
            id += 1;
        }
        id
    }

    /// Re-open the persisted manifest, so the exact same bytes can be
    /// mirrored to the remote.
    pub fn open(&self, commit: &Commit) -> anyhow::Result<File> {
        anyhow::ensure!(commit.created != 0, "commit has not been saved yet");
        let path = self.manifest_path(commit.created);
        File::open(&path)
            .with_context(|| format!("Unable to open manifest file {}", path.display()))
    }

    pub fn load(&self, id: i64) -> anyhow::Result<Commit> {
        let path = self.manifest_path(id);
        let file = File::open(&path).with_context(|| {
            format!("Unable to open manifest for commit {id:x} at {}", path.display())
        })?;
        serde_json::from_reader(file)
            .with_context(|| format!("Unable to parse commit manifest {}", path.display()))
    }

    /// Identifiers of every locally cached manifest, oldest first.
    pub fn list(&self) -> anyhow::Result<Vec<i64>> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.path)
            .with_context(|| format!("Unable to read history directory {}", self.path.display()))?
        {
            let entry = entry?;
            let name = entry.file_name();
            let Some(stem) = name
                .to_string_lossy()
                .strip_suffix(&format!(".{MANIFEST_EXT}"))
                .map(str::to_string)
            else {
                continue;
            };
            if let Ok(id) = i64::from_str_radix(&stem, 16) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::commit::CommitFile;
    use pretty_assertions::assert_eq;

    #[test]
    fn saved_commit_reloads_field_by_field() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::init(dir.path()).unwrap();

        let mut commit = Commit::new("first\n\nsecond paragraph", vec!["*.log".into()]);
        commit.record(CommitFile::new("a.txt".into(), "hash-a".into()));
        commit.record(CommitFile::new("dir/b.txt".into(), "hash-b".into()));
        history.save(&mut commit).unwrap();

        assert_ne!(commit.created, 0);
        let reloaded = history.load(commit.created).unwrap();
        assert_eq!(reloaded, commit);
    }

    #[test]
    fn identifier_allocation_skips_existing_manifests() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::init(dir.path()).unwrap();

        let mut first = Commit::new("one", vec![]);
        let mut second = Commit::new("two", vec![]);
        history.save(&mut first).unwrap();
        history.save(&mut second).unwrap();

        assert!(second.created > first.created);
    }

    #[test]
    fn open_mirrors_the_exact_persisted_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::init(dir.path()).unwrap();

        let mut commit = Commit::new("msg", vec![]);
        history.save(&mut commit).unwrap();

        let mut reopened = String::new();
        use std::io::Read;
        history
            .open(&commit)
            .unwrap()
            .read_to_string(&mut reopened)
            .unwrap();
        let on_disk =
            std::fs::read_to_string(history.manifest_path(commit.created)).unwrap();
        assert_eq!(reopened, on_disk);
    }

    #[test]
    fn list_orders_identifiers() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::init(dir.path()).unwrap();

        for id in [0x30, 0x10, 0x20] {
            let mut commit = Commit::new("m", vec![]);
            commit.created = id;
            history.save(&mut commit).unwrap();
        }
        std::fs::write(dir.path().join(HISTORY_DIR).join("junk.txt"), "x").unwrap();

        assert_eq!(history.list().unwrap(), [0x10, 0x20, 0x30]);
    }
}
