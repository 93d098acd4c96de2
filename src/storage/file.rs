//! Directory-backed key-value store: one `<key>.json` file per key.

use super::engine::{KeyValueStore, StorageUsage, check_quota, entry_size};
use crate::core::{Result, StoreError};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

const EXTENSION: &str = "json";

pub struct FileStorage {
    dir: PathBuf,
    quota: Option<usize>,
    // Serialises quota check + write so two writers cannot both fit.
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            StoreError::IoError(format!("Failed to create data directory {}: {}", dir.display(), e))
        })?;
        Ok(Self {
            dir,
            quota: None,
            write_lock: Mutex::new(()),
        })
    }

    pub fn with_quota(mut self, quota_bytes: Option<usize>) -> Self {
        self.quota = quota_bytes;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(StoreError::Config(format!("Invalid storage key '{key}'")));
        }
        Ok(self.dir.join(format!("{key}.{EXTENSION}")))
    }

    /// Bytes used by all keys except `skip`.
    fn used_bytes(&self, skip: Option<&str>) -> Result<usize> {
        let mut used = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if Some(key) == skip {
                continue;
            }
            let len = fs::metadata(&path)?.len() as usize;
            used += key.len() + len;
        }
        Ok(used)
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::IoError(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock()?;

        if self.quota.is_some() {
            check_quota(key, value, self.used_bytes(Some(key))?, self.quota)?;
        }

        let mut temp = NamedTempFile::new_in(&self.dir)
            .map_err(|e| StoreError::IoError(format!("Failed to create temp file: {}", e)))?;
        temp.write_all(value.as_bytes())
            .map_err(|e| StoreError::IoError(format!("Failed to write {}: {}", key, e)))?;
        temp.flush()
            .map_err(|e| StoreError::IoError(format!("Failed to flush {}: {}", key, e)))?;
        temp.persist(&path)
            .map_err(|e| StoreError::IoError(format!("Failed to replace {}: {}", path.display(), e)))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock()?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::IoError(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn usage(&self) -> Result<StorageUsage> {
        Ok(StorageUsage {
            used_bytes: self.used_bytes(None)?,
            quota_bytes: self.quota,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_roundtrip_and_missing_key() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();
        assert_eq!(storage.get("crm_users_v1").unwrap(), None);
        storage.set("crm_users_v1", "[]").unwrap();
        assert_eq!(storage.get("crm_users_v1").unwrap().as_deref(), Some("[]"));
        assert!(temp_dir.path().join("crm_users_v1.json").exists());
        storage.remove("crm_users_v1").unwrap();
        storage.remove("crm_users_v1").unwrap();
        assert_eq!(storage.get("crm_users_v1").unwrap(), None);
    }

    #[test]
    fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        FileStorage::open(temp_dir.path()).unwrap().set("k", "v").unwrap();
        let reopened = FileStorage::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_quota_rejects_without_touching_prior_value() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap().with_quota(Some(16));
        storage.set("k", "small").unwrap();
        let err = storage.set("k", "this value is far too large").unwrap_err();
        assert!(err.is_capacity());
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("small"));
        assert_eq!(storage.usage().unwrap().used_bytes, entry_size("k", "small"));
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();
        assert!(storage.set("../escape", "x").is_err());
        assert!(storage.get("").is_err());
    }
}
