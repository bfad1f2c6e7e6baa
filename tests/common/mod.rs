#![allow(dead_code)]

use assert_fs::TempDir;
use quill::areas::config::{Config, SecretStore};
use quill::areas::history::History;
use std::path::Path;

/// Secret store double: nothing stored, nothing retrieved.
pub struct NullSecrets;

impl SecretStore for NullSecrets {
    fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _secret: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Fresh local working copy: config saved, history directory created.
/// The configured remote path is only descriptive; engine tests inject an
/// in-memory remote directly.
pub fn init_local_repo() -> (TempDir, Config) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = Config::fresh(
        "localhost".to_string(),
        22,
        "tester".to_string(),
        "/srv/repo".to_string(),
    );
    config
        .save_new(dir.path(), &NullSecrets)
        .expect("Failed to save config");
    History::init(dir.path()).expect("Failed to init history");
    (dir, config)
}

pub fn reload_config(root: &Path) -> Config {
    Config::load(root, &NullSecrets).expect("Failed to reload config")
}

pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = rel.split('/').fold(root.to_path_buf(), |p, s| p.join(s));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
    }
    std::fs::write(path, content).expect("Failed to write file");
}

pub fn read_file(root: &Path, rel: &str) -> String {
    let path = rel.split('/').fold(root.to_path_buf(), |p, s| p.join(s));
    std::fs::read_to_string(path).expect("Failed to read file")
}

pub fn remove_file(root: &Path, rel: &str) {
    let path = rel.split('/').fold(root.to_path_buf(), |p, s| p.join(s));
    std::fs::remove_file(path).expect("Failed to remove file");
}

pub fn file_exists(root: &Path, rel: &str) -> bool {
    rel.split('/').fold(root.to_path_buf(), |p, s| p.join(s)).exists()
}
