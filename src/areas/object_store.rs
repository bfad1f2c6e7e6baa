//! Content-addressed object store on the remote surface
//!
//! Objects are keyed by the digest of their uncompressed bytes and stored
//! compressed under a sharded path that bounds directory fan-out. An object
//! is write-once: if the digest already exists remotely it is never
//! rewritten, which is what makes re-committing an unchanged tree cheap.

use crate::artifacts::codec;
use crate::artifacts::commit::{Commit, CommitFile};
use crate::remote::RemoteFs;
use anyhow::Context;
use derive_new::new;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

pub const DIR_OBJECTS: &str = "objects";

/// Sharded remote path for a digest: first character, second character,
/// next six, remainder. Digests are always at least 8 characters; the
/// codec's hash choice guarantees it, so the slices below may panic on a
/// shorter string rather than validate at runtime.
pub fn object_path(hash: &str) -> String {
    format!(
        "{}/{}/{}/{}/{}",
        DIR_OBJECTS,
        &hash[..1],
        &hash[1..2],
        &hash[2..8],
        &hash[8..]
    )
}

#[derive(new)]
pub struct ObjectStore<'r> {
    remote: &'r dyn RemoteFs,
}

impl ObjectStore<'_> {
    /// Existence probe. "Not found" is a normal outcome; any other remote
    /// failure propagates.
    pub fn has(&self, hash: &str) -> anyhow::Result<bool> {
        match self.remote.stat(&object_path(hash)) {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err).context("Unable to stat remote object"),
        }
    }

    /// Compress and upload. Callers probe with [`has`](Self::has) first;
    /// the write-once invariant is enforced at the call site.
    pub fn put(&self, hash: &str, file: &mut File) -> anyhow::Result<()> {
        upload(self.remote, &object_path(hash), file)
            .with_context(|| format!("Unable to write object {hash}"))
    }

    /// Download and decompress into `destination`, creating parents.
    pub fn get(&self, hash: &str, destination: &Path) -> anyhow::Result<()> {
        download(self.remote, &object_path(hash), destination)
            .with_context(|| format!("Unable to read object {hash}"))
    }

    /// The single choke point both commit flows use while walking the tree:
    /// hash the open file, upload it unless the store already has that
    /// content, and record the (path, hash) pair in the in-progress commit.
    pub fn commit_file(
        &self,
        file: &mut File,
        repo_path: &str,
        commit: &mut Commit,
    ) -> anyhow::Result<()> {
        let hash = codec::digest(file)
            .with_context(|| format!("Unable to hash file {repo_path}"))?;

        if !self
            .has(&hash)
            .with_context(|| format!("Unable to check object existence for {repo_path}"))?
        {
            file.seek(SeekFrom::Start(0))
                .with_context(|| format!("Unable to rewind file {repo_path}"))?;
            self.put(&hash, file)?;
            tracing::debug!(path = repo_path, %hash, "uploaded object");
        } else {
            tracing::trace!(path = repo_path, %hash, "object already stored");
        }

        commit.record(CommitFile::new(repo_path.to_string(), hash));
        Ok(())
    }
}

/// Compress `src` into a freshly created remote file, creating parent
/// directories first.
pub(crate) fn upload(
    remote: &dyn RemoteFs,
    remote_path: &str,
    src: &mut impl Read,
) -> anyhow::Result<()> {
    if let Some((parent, _)) = remote_path.rsplit_once('/') {
        remote
            .mkdir_all(parent)
            .context("Unable to create remote parent directories")?;
    }

    let writer = remote
        .create(remote_path)
        .context("Unable to create remote file")?;
    codec::compress(src, writer).context("Unable to write compressed data")?;
    Ok(())
}

/// Download a compressed remote file and decompress it into `destination`.
pub(crate) fn download(
    remote: &dyn RemoteFs,
    remote_path: &str,
    destination: &Path,
) -> anyhow::Result<()> {
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Unable to create parent directories for {}", destination.display())
        })?;
    }

    let reader = remote
        .open(remote_path)
        .context("Unable to open remote file")?;
    let mut file = File::create(destination)
        .with_context(|| format!("Unable to create file {}", destination.display()))?;
    codec::decompress(reader, &mut file).context("Unable to read compressed data")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::MemoryRemote;
    use pretty_assertions::assert_eq;
    use std::io::Write as _;

    fn temp_file(content: &[u8]) -> File {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(content).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        file
    }

    #[test]
    fn sharded_path_slices_the_digest() {
        assert_eq!(
            object_path("abcdefghijkl"),
            "objects/a/b/cdefgh/ijkl"
        );
    }

    #[test]
    fn put_then_get_round_trips_content() {
        let remote = MemoryRemote::new();
        let store = ObjectStore::new(&remote);
        let dir = tempfile::tempdir().unwrap();

        let mut src = temp_file(b"hello object");
        let hash = codec::digest(&mut src).unwrap();
        src.seek(SeekFrom::Start(0)).unwrap();

        assert!(!store.has(&hash).unwrap());
        store.put(&hash, &mut src).unwrap();
        assert!(store.has(&hash).unwrap());

        let destination = dir.path().join("nested").join("out.txt");
        store.get(&hash, &destination).unwrap();
        assert_eq!(std::fs::read(destination).unwrap(), b"hello object");
    }

    #[test]
    fn commit_file_dedupes_identical_content() {
        let remote = MemoryRemote::new();
        let store = ObjectStore::new(&remote);
        let mut commit = Commit::new("msg", vec![]);

        let mut first = temp_file(b"same bytes");
        store.commit_file(&mut first, "a.txt", &mut commit).unwrap();
        let creates_after_first = remote.counts().creates;

        let mut second = temp_file(b"same bytes");
        store.commit_file(&mut second, "b.txt", &mut commit).unwrap();

        // the second put was skipped, only the probe ran
        assert_eq!(remote.counts().creates, creates_after_first);
        assert_eq!(remote.file_count(), 1);
        assert_eq!(commit.files.len(), 2);
        assert_eq!(commit.files[0].hash, commit.files[1].hash);
    }
}
