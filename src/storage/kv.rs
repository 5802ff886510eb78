use std::{
    cell::RefCell,
    collections::BTreeMap,
    fs::{self, OpenOptions, rename, write},
    path::PathBuf,
};

use fs2::FileExt;
use serde_json::to_string_pretty;
use uuid::Uuid;

use crate::storage::{KeyValue, StorageError};

/// Key-value store persisted as a single JSON object file. Every write
/// rewrites the whole file through a unique temp file and an exclusive
/// lock, then renames it into place.
pub struct JsonFileKv {
    path: PathBuf,
}

impl JsonFileKv {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| StorageError::ParseFailed {
                    path: self.path.clone(),
                    source: e,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StorageError::LoadFailed {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    fn save_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let json =
            to_string_pretty(map).map_err(|e| StorageError::SerializeFailed { source: e })?;

        let unique_temp = format!("{}.tmp.{}", self.path.display(), Uuid::new_v4());
        let temp_path = PathBuf::from(&unique_temp);
        write(&temp_path, json).map_err(|e| StorageError::SaveFailed {
            path: temp_path.clone(),
            source: e,
        })?;

        let lock_file_path = self.path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .open(&lock_file_path)
            .map_err(|e| StorageError::SaveFailed {
                path: lock_file_path.clone(),
                source: e,
            })?;
        lock_file
            .lock_exclusive()
            .map_err(|e| StorageError::SaveFailed {
                path: lock_file_path,
                source: e,
            })?;

        rename(&temp_path, &self.path).map_err(|e| StorageError::SaveFailed {
            path: self.path.clone(),
            source: e,
        })?;

        lock_file.unlock().map_err(|e| StorageError::SaveFailed {
            path: self.path.clone(),
            source: e,
        })?;

        Ok(())
    }
}

impl KeyValue for JsonFileKv {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load_map()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self.load_map()?;
        map.insert(key.to_string(), value.to_string());
        self.save_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut map = self.load_map()?;
        if map.remove(key).is_none() {
            return Ok(());
        }
        self.save_map(&map)
    }
}

/// In-memory store for tests and dry runs. Single-threaded by design,
/// matching the synchronous storage model the operators assume.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValue for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kv_round_trip() {
        let dir = PathBuf::from("/tmp/journey_kv_test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let kv = JsonFileKv::new(dir.join("store.json"));
        assert_eq!(kv.get("journeyTheme").unwrap(), None);

        kv.set("journeyTheme", "ocean").unwrap();
        kv.set("journeyWisdomEnabled", "true").unwrap();
        assert_eq!(kv.get("journeyTheme").unwrap().as_deref(), Some("ocean"));

        kv.remove("journeyTheme").unwrap();
        assert_eq!(kv.get("journeyTheme").unwrap(), None);
        assert_eq!(
            kv.get("journeyWisdomEnabled").unwrap().as_deref(),
            Some("true")
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_file_kv_missing_file_reads_as_empty() {
        let kv = JsonFileKv::new(PathBuf::from("/tmp/journey_kv_missing/none.json"));
        assert_eq!(kv.get("anything").unwrap(), None);
    }

    #[test]
    fn test_file_kv_corrupt_file_surfaces_parse_error() {
        let dir = PathBuf::from("/tmp/journey_kv_corrupt");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("store.json");
        fs::write(&path, "{ not json").unwrap();

        let kv = JsonFileKv::new(path);
        assert!(matches!(
            kv.get("journeyTasks"),
            Err(StorageError::ParseFailed { .. })
        ));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_memory_kv_round_trip() {
        let kv = MemoryKv::new();
        kv.set("k", "v").unwrap();
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("v"));
        kv.remove("k").unwrap();
        assert_eq!(kv.get("k").unwrap(), None);
    }
}
