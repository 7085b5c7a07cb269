use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::debug;

use super::{KeyValueStore, Result};
use crate::utils::write_atomic;

const STORE_EXTENSION: &str = "json";

/// File-backed store: one file per key inside a base directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        ensure_dir(&root)?;
        Ok(Self { root })
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", canonical_name(key), STORE_EXTENSION))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        write_atomic(&path, value)?;
        debug!(path = %path.display(), "store entry written");
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "entry".into()
    } else {
        sanitized
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::tmp_path;
    use tempfile::tempdir;

    #[test]
    fn missing_key_reads_as_none() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        assert_eq!(store.get("claimFormData").unwrap(), None);
        store.clear("claimFormData").unwrap();
    }

    #[test]
    fn set_overwrites_and_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        store.set("claimFormData", "{\"a\":\"1\"}").unwrap();
        store.set("claimFormData", "{\"a\":\"2\"}").unwrap();

        assert_eq!(
            store.get("claimFormData").unwrap().as_deref(),
            Some("{\"a\":\"2\"}")
        );
        assert!(store.path_for("claimFormData").exists());
        assert!(!tmp_path(&store.path_for("claimFormData")).exists());
    }

    #[test]
    fn keys_are_sanitised_into_file_names() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        let path = store.path_for("../escape");
        assert_eq!(path.parent(), Some(dir.path()));
        assert_eq!(canonical_name("///"), "entry");
    }
}
