//! JSON file storage backend.

use crate::{SecureStorage, StorageError, StorageResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};

type Entries = BTreeMap<String, String>;

/// Stores every key in one JSON object on disk.
///
/// Each mutation reads the current file, applies the change, and replaces the
/// file through a temp file + rename, so readers never observe a half-written
/// session. The in-process mutex serializes writers within one console.
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    fn read_entries(&self) -> StorageResult<Entries> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Entries::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Session file is not valid JSON");
            StorageError::Encoding(e.to_string())
        })
    }

    fn write_entries(&self, entries: &Entries) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;

        let tmp_path = self.tmp_path();
        let write_result = (|| -> std::io::Result<()> {
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&tmp_path)?;
            restrict_permissions(&file)?;
            file.write_all(&json)?;
            file.sync_all()?;
            fs::rename(&tmp_path, &self.path)
        })();

        if let Err(e) = write_result {
            if let Err(cleanup) = fs::remove_file(&tmp_path) {
                debug!(path = %tmp_path.display(), error = %cleanup, "Temp file not removed");
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Sibling temp file, unique per write: `.session.json.tmp.<nanos>`.
    fn tmp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let nanos = std::time::SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        self.path.with_file_name(format!(".{}.tmp.{}", file_name, nanos))
    }

    fn update<F, T>(&self, mutate: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Entries) -> T,
    {
        let _guard = self.lock.lock();
        let mut entries = self.read_entries()?;
        let result = mutate(&mut entries);
        self.write_entries(&entries)?;
        Ok(result)
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}

impl SecureStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(key = %key, "Setting session value");
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_entries()?.remove(key))
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        debug!(key = %key, "Deleting session value");
        self.update(|entries| entries.remove(key).is_some())
    }

    fn replace_many(&self, set: &[(&str, &str)], delete: &[&str]) -> StorageResult<()> {
        debug!(set = set.len(), delete = delete.len(), "Writing session batch");
        self.update(|stored| {
            for (key, value) in set {
                stored.insert(key.to_string(), value.to_string());
            }
            for key in delete {
                stored.remove(*key);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("session.json"));

        assert_eq!(storage.get("token").unwrap(), None);
        assert!(!storage.delete("token").unwrap());
    }

    #[test]
    fn test_values_survive_new_instance() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        FileStorage::new(path.clone())
            .replace_many(&[("token", "t-1"), ("refreshToken", "r-1")], &[])
            .unwrap();

        let reopened = FileStorage::new(path);
        assert_eq!(reopened.get("token").unwrap(), Some("t-1".to_string()));
        assert_eq!(reopened.get("refreshToken").unwrap(), Some("r-1".to_string()));
    }

    #[test]
    fn test_delete_many_keeps_other_keys() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("session.json"));

        storage
            .replace_many(&[("token", "t"), ("userId", "u"), ("unrelated", "x")], &[])
            .unwrap();
        storage.delete_many(&["token", "userId", "never-set"]).unwrap();

        assert_eq!(storage.get("token").unwrap(), None);
        assert_eq!(storage.get("unrelated").unwrap(), Some("x".to_string()));
    }

    fn dir_entries(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let storage = FileStorage::new(path.clone());

        storage.set("token", "t").unwrap();
        storage.set("userId", "u").unwrap();

        assert_eq!(dir_entries(dir.path()), vec!["session.json".to_string()]);
    }

    #[test]
    fn test_failed_write_removes_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        // A directory at the target path makes the final rename fail.
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();
        let storage = FileStorage::new(path);

        let mut entries = Entries::new();
        entries.insert("token".to_string(), "t".to_string());

        assert!(storage.write_entries(&entries).is_err());
        assert_eq!(dir_entries(dir.path()), vec!["session.json".to_string()]);
    }

    #[test]
    fn test_replace_many_sets_and_deletes_in_one_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let storage = FileStorage::new(path.clone());
        storage
            .replace_many(&[("token", "old"), ("refreshToken", "r-old")], &[])
            .unwrap();

        storage
            .replace_many(&[("token", "new"), ("userId", "u")], &["refreshToken"])
            .unwrap();

        let on_disk: Entries = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let expected: Entries = [("token", "new"), ("userId", "u")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(on_disk, expected);
    }

    #[test]
    fn test_corrupt_file_is_encoding_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{ not json").unwrap();

        let storage = FileStorage::new(path);
        assert!(matches!(storage.get("token"), Err(StorageError::Encoding(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        FileStorage::new(path.clone()).set("token", "t").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
