//! Per-repository configuration
//!
//! One `.quill.toml` per working copy, discovered by walking ancestor
//! directories from the current working directory. The remote credential is
//! never written into the file; it lives in an injected [`SecretStore`]
//! keyed by `user@host:port`.

use crate::artifacts::share::ShareDescriptor;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = ".quill.toml";
pub const CONFIG_VERSION: u8 = 1;

/// Patterns seeded into a fresh repository's ignore list.
pub const DEFAULT_IGNORE: [&str; 7] = [
    ".DS_Store",
    ".vs/",
    ".idea/",
    ".vscode/",
    ".git/",
    ".gitattributes",
    ".gitignore",
];

/// Credential storage is an external collaborator; the core only ever
/// talks to it through this seam.
pub trait SecretStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, secret: &str) -> anyhow::Result<()>;
}

/// Reads the credential from the `QUILL_SECRET` environment variable.
/// `set` is accepted and dropped; the variable is the operator's to manage.
#[derive(Debug, Default)]
pub struct EnvSecretStore;

pub const SECRET_ENV_VAR: &str = "QUILL_SECRET";

impl SecretStore for EnvSecretStore {
    fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
        Ok(std::env::var(SECRET_ENV_VAR).ok())
    }

    fn set(&self, key: &str, _secret: &str) -> anyhow::Result<()> {
        tracing::debug!(key, "environment secret store does not persist credentials");
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: u8,
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Remote repository root path.
    pub path: String,
    /// Currently checked-out commit identifier, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<i64>,
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Remote credential, resolved through the secret store.
    #[serde(skip)]
    pub secret: String,
    /// Absolute location of the config file on disk.
    #[serde(skip)]
    pub location: PathBuf,
}

impl Config {
    /// A fresh config for a new working copy, with the default ignore list.
    pub fn fresh(host: String, port: u16, user: String, path: String) -> Self {
        Config {
            version: CONFIG_VERSION,
            host,
            port,
            user,
            path,
            commit: None,
            ignore: DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect(),
            secret: String::new(),
            location: PathBuf::new(),
        }
    }

    pub fn from_share(share: &ShareDescriptor) -> Self {
        Self::fresh(
            share.host.clone(),
            share.port,
            share.user.clone(),
            share.path.clone(),
        )
    }

    pub fn share(&self) -> ShareDescriptor {
        ShareDescriptor::new(
            self.user.clone(),
            self.host.clone(),
            self.port,
            self.path.clone(),
        )
    }

    /// The secret-store key for this remote.
    pub fn full_user(&self) -> String {
        format!("{}@{}:{}", self.user, self.host, self.port)
    }

    /// Repository root: the directory holding the config file.
    pub fn root(&self) -> &Path {
        self.location.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Load the config discovered from `start_dir` upwards, resolving the
    /// credential through `secrets`.
    pub fn load(start_dir: &Path, secrets: &dyn SecretStore) -> anyhow::Result<Self> {
        let location = find_config_file(start_dir)?;

        let content = std::fs::read_to_string(&location)
            .with_context(|| format!("Unable to read config file {}", location.display()))?;
        let mut config = toml::from_str::<Config>(&content)
            .with_context(|| format!("Unable to parse config file {}", location.display()))?;
        config.location = location;

        config.secret = secrets
            .get(&config.full_user())
            .context("Unable to retrieve remote credential")?
            .unwrap_or_default();

        Ok(config)
    }

    /// Write a brand-new config file into `dir` and store the credential.
    pub fn save_new(&mut self, dir: &Path, secrets: &dyn SecretStore) -> anyhow::Result<()> {
        self.version = CONFIG_VERSION;
        self.location = dir
            .canonicalize()
            .with_context(|| format!("Unable to resolve repository root {}", dir.display()))?
            .join(CONFIG_FILE_NAME);

        self.write_file()?;
        secrets
            .set(&self.full_user(), &self.secret)
            .context("Unable to store remote credential")?;
        Ok(())
    }

    /// Persist the config back to its known location.
    pub fn save(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.location.as_os_str().is_empty(),
            "config has no on-disk location yet"
        );
        self.write_file()
    }

    fn write_file(&self) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self).context("Unable to serialize config")?;
        std::fs::write(&self.location, content)
            .with_context(|| format!("Unable to write config file {}", self.location.display()))
    }
}

/// Repository-root discovery: walk ancestors until the config file shows up.
fn find_config_file(start_dir: &Path) -> anyhow::Result<PathBuf> {
    let start = start_dir
        .canonicalize()
        .with_context(|| format!("Unable to resolve directory {}", start_dir.display()))?;

    for dir in start.ancestors() {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    anyhow::bail!("no {CONFIG_FILE_NAME} found in {} or any parent", start.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct FixedSecret(&'static str);

    impl SecretStore for FixedSecret {
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Ok(Some(self.0.to_string()))
        }

        fn set(&self, _key: &str, _secret: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn save_and_load_round_trip_without_persisting_the_secret() {
        let dir = tempfile::tempdir().unwrap();
        let secrets = FixedSecret("hunter2");

        let mut config = Config::fresh("host".into(), 22, "alice".into(), "/srv/repo".into());
        config.secret = "hunter2".into();
        config.commit = Some(0x1234);
        config.save_new(dir.path(), &secrets).unwrap();

        let on_disk = std::fs::read_to_string(dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert!(!on_disk.contains("hunter2"));

        let loaded = Config::load(dir.path(), &secrets).unwrap();
        assert_eq!(loaded.host, "host");
        assert_eq!(loaded.commit, Some(0x1234));
        assert_eq!(loaded.ignore, config.ignore);
        assert_eq!(loaded.secret, "hunter2");
    }

    #[test]
    fn discovery_walks_ancestor_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("c");
        std::fs::create_dir_all(&nested).unwrap();

        let secrets = FixedSecret("");
        let mut config = Config::fresh("h".into(), 22, "u".into(), "/r".into());
        config.save_new(dir.path(), &secrets).unwrap();

        let loaded = Config::load(&nested, &secrets).unwrap();
        assert_eq!(loaded.root(), dir.path().canonicalize().unwrap());
    }

    #[test]
    fn missing_config_is_a_discovery_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path(), &FixedSecret("")).unwrap_err();

        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn full_user_matches_the_share_key_format() {
        let config = Config::fresh("srv".into(), 2022, "bob".into(), "/p".into());
        assert_eq!(config.full_user(), "bob@srv:2022");
        assert_eq!(config.share().to_string(), "bob@srv:2022#/p");
    }
}
