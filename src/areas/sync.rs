//! Sync/checkout engine
//!
//! Orchestrates everything that touches the remote repository: the initial
//! and incremental commit flows, manifest pulls, head-pointer reads and
//! writes, and the conflict-checked checkout that reconciles the working
//! tree. One engine is built per command invocation, over one transport
//! session.
//!
//! Committing never diffs against the previous commit: it re-hashes every
//! currently tracked file and relies on content addressing to skip the
//! network for unchanged content. Checkout is two-phase: the conflict scan
//! over the whole target file list completes before any download or delete
//! is issued.

use crate::areas::config::Config;
use crate::areas::history::History;
use crate::areas::object_store::{ObjectStore, download, upload};
use crate::areas::workspace::Workspace;
use crate::artifacts::commit::{Commit, MANIFEST_EXT};
use crate::artifacts::diff::DiffList;
use crate::artifacts::ignore::IgnoreMatcher;
use crate::remote::{RemoteFs, join};
use anyhow::Context;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};

pub const DIR_COMMITS: &str = "commits";
pub const FILE_HEAD: &str = "HEAD";

/// A path changed or created both locally and in the target commit, which
/// the engine cannot auto-resolve. Fatal to the whole checkout; nothing is
/// downloaded or deleted once one is detected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("checkout conflict on {path}: {kind}")]
pub struct CheckoutConflict {
    pub path: String,
    pub kind: ConflictKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Changed upstream while locally modified or deleted.
    BothChanged,
    /// Introduced upstream while also newly created locally.
    BothCreated,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::BothChanged => write!(f, "modified or deleted locally and changed in the target commit"),
            ConflictKind::BothCreated => write!(f, "created locally and in the target commit"),
        }
    }
}

/// Whether the remote root is absent or an empty directory. A remote path
/// that exists as a plain file is an error, not "empty". `remote_path` is
/// only used for error reporting.
pub fn remote_is_empty(remote: &dyn RemoteFs, remote_path: &str) -> anyhow::Result<bool> {
    let entry = match remote.stat("") {
        Err(err) if err.is_not_found() => return Ok(true),
        Err(err) => return Err(err).context("Unable to stat remote repository root"),
        Ok(entry) => entry,
    };
    anyhow::ensure!(
        entry.is_dir,
        "remote path exists but is not a directory: {remote_path}"
    );

    let entries = remote
        .list_dir("")
        .context("Unable to list remote repository root")?;
    Ok(entries.is_empty())
}

pub struct SyncEngine<'r> {
    remote: &'r dyn RemoteFs,
    config: Config,
    history: History,
    workspace: Workspace,
}

impl<'r> SyncEngine<'r> {
    /// Build an engine over an already-initialized repository and ensure
    /// the remote root exists.
    pub fn new(remote: &'r dyn RemoteFs, config: Config) -> anyhow::Result<Self> {
        let history = History::open_at(config.root())?;
        let workspace = Workspace::new(config.root());

        remote
            .mkdir_all("")
            .context("Unable to ensure remote repository root exists")?;

        Ok(SyncEngine {
            remote,
            config,
            history,
            workspace,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// The commit currently checked out according to the config.
    pub fn current_commit(&self) -> anyhow::Result<Commit> {
        let id = self
            .config
            .commit
            .context("no commit checked out")?;
        self.history
            .load(id)
            .with_context(|| format!("Unable to load current commit {id:x}"))
    }

    /// Walk the tree, build a commit through the object-store choke point,
    /// persist it locally and remotely, advance the head pointer, and
    /// record it as checked out. Both the initial and the incremental flow.
    pub fn commit(&mut self, message: &str) -> anyhow::Result<i64> {
        let matcher = IgnoreMatcher::new(&self.config.ignore);
        let store = ObjectStore::new(self.remote);
        let mut commit = Commit::new(message, self.config.ignore.clone());

        tracing::info!(root = %self.workspace.root().display(), "walking working tree");
        for tracked in self.workspace.walk(&matcher)? {
            let mut file = File::open(&tracked.absolute).with_context(|| {
                format!("Unable to open file {}", tracked.absolute.display())
            })?;
            store
                .commit_file(&mut file, &tracked.path, &mut commit)
                .with_context(|| format!("Unable to commit file {}", tracked.path))?;
        }

        self.history
            .save(&mut commit)
            .context("Unable to save commit")?;
        self.mirror_commit(&commit)
            .context("Unable to write commit to remote")?;
        self.set_head(&commit)
            .context("Unable to set commit as head")?;

        self.config.commit = Some(commit.created);
        self.config.save().context("Unable to save config")?;

        tracing::info!("created commit {:x}", commit.created);
        Ok(commit.created)
    }

    /// Mirror the just-saved manifest to `commits/`, identical bytes to the
    /// local history copy.
    fn mirror_commit(&self, commit: &Commit) -> anyhow::Result<()> {
        let mut manifest = self.history.open(commit)?;
        upload(
            self.remote,
            &join(DIR_COMMITS, &commit.file_name()),
            &mut manifest,
        )
    }

    /// Rewrite the remote head pointer: the decimal identifier, plain text.
    fn set_head(&self, commit: &Commit) -> anyhow::Result<()> {
        let mut writer = self
            .remote
            .create(FILE_HEAD)
            .context("Unable to create head file on remote")?;
        write!(writer, "{}", commit.created)
            .context("Unable to write head file on remote")
    }

    /// Download every remote manifest not already cached locally. Never
    /// deletes local manifests; the local store ends up a superset.
    pub fn pull(&self) -> anyhow::Result<usize> {
        let entries = self
            .remote
            .list_dir(DIR_COMMITS)
            .context("Unable to list commits directory on remote")?;

        let suffix = format!(".{MANIFEST_EXT}");
        let mut pulled = 0;
        for entry in entries {
            if entry.is_dir || !entry.name.ends_with(&suffix) {
                continue;
            }
            if self.history.contains_manifest(&entry.name) {
                continue;
            }

            download(
                self.remote,
                &join(DIR_COMMITS, &entry.name),
                &self.history.dir().join(&entry.name),
            )
            .with_context(|| format!("Unable to pull remote manifest {}", entry.name))?;
            pulled += 1;
        }

        tracing::info!(pulled, "pulled commit manifests");
        Ok(pulled)
    }

    /// Read the remote head pointer and resolve it against the local
    /// manifest cache. Callers are expected to pull first.
    pub fn head(&self) -> anyhow::Result<Commit> {
        let mut reader = self
            .remote
            .open(FILE_HEAD)
            .context("Unable to open head file on remote")?;
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .context("Unable to read head file from remote")?;

        let id = text
            .trim()
            .parse::<i64>()
            .context("Unable to parse head commit identifier")?;
        self.history
            .load(id)
            .with_context(|| format!("head commit {id:x} is not in the local cache; pull first"))
    }

    /// Reconcile the working tree with `target`. No-op when the target is
    /// already checked out. Conflicts abort before any file mutation.
    pub fn checkout(&mut self, target: &Commit) -> anyhow::Result<()> {
        if self.config.commit == Some(target.created) {
            tracing::info!("target commit already checked out");
            return Ok(());
        }

        let current = self
            .current_commit()
            .context("Unable to load the currently checked-out commit")?;
        let local_changes = DiffList::local_from_commit(&self.workspace, &current)
            .context("Unable to diff local changes against the current commit")?;

        // phase 1: full conflict scan, planning the downloads as we go
        let mut downloads = Vec::new();
        for file in &target.files {
            match current.lookup(&file.path) {
                Some(existing) if existing.hash == file.hash => continue,
                Some(_) => {
                    if local_changes.has_modify_or_delete(&file.path) {
                        return Err(CheckoutConflict {
                            path: file.path.clone(),
                            kind: ConflictKind::BothChanged,
                        }
                        .into());
                    }
                    downloads.push(file);
                }
                None => {
                    if local_changes.has_create(&file.path) {
                        return Err(CheckoutConflict {
                            path: file.path.clone(),
                            kind: ConflictKind::BothCreated,
                        }
                        .into());
                    }
                    downloads.push(file);
                }
            }
        }

        // phase 2: fetch changed and new content
        let store = ObjectStore::new(self.remote);
        for file in downloads {
            tracing::info!(path = %file.path, "fetch");
            store
                .get(&file.hash, &self.workspace.absolute(&file.path))
                .with_context(|| format!("Unable to fetch {}", file.path))?;
        }

        // phase 3: delete tracked-looking files the target does not have,
        // sparing genuinely new local files
        let matcher = IgnoreMatcher::new(&target.ignore);
        for tracked in self.workspace.walk(&matcher)? {
            if local_changes.has_create(&tracked.path) {
                continue;
            }
            if target.lookup(&tracked.path).is_some() {
                continue;
            }
            tracing::info!(path = %tracked.path, "delete");
            self.workspace.remove_file(&tracked.path)?;
        }

        self.config.commit = Some(target.created);
        self.config.ignore = target.ignore.clone();
        self.config.save().context("Unable to save config")
    }

    /// Checkout onto an empty destination: no current commit, no diff,
    /// every file downloaded unconditionally.
    pub fn clone_commit(&mut self, target: &Commit) -> anyhow::Result<()> {
        let store = ObjectStore::new(self.remote);
        for file in &target.files {
            tracing::info!(path = %file.path, "fetch");
            store
                .get(&file.hash, &self.workspace.absolute(&file.path))
                .with_context(|| format!("Unable to fetch {}", file.path))?;
        }

        self.config.commit = Some(target.created);
        self.config.ignore = target.ignore.clone();
        self.config.save().context("Unable to save config")
    }

    /// Local changes relative to the currently checked-out commit.
    pub fn status(&self) -> anyhow::Result<DiffList> {
        let current = self.current_commit()?;
        DiffList::local_from_commit(&self.workspace, &current)
            .context("Unable to diff local changes against the current commit")
    }
}
