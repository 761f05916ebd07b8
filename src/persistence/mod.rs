use std::{
    cell::RefCell,
    collections::HashMap,
    fs,
    path::PathBuf,
    rc::Rc,
};

use serde::{
    de::DeserializeOwned,
    Serialize,
};
use tracing::warn;

use crate::core::StudylogError;

const APP_NAME: &str = "studylog";

/// Durable key/value access scoped to the local user profile. Single
/// threaded, single profile; the store that backs a [`crate::store::CourseStore`]
/// is injected through this trait.
pub trait KeyValueStore {
    /// Returns the stored value, or `None` if the key is absent or the
    /// backing entry cannot be read.
    fn get(&self, key: &str) -> Option<String>;

    /// Overwrites unconditionally.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StudylogError>;

    /// Removes the key. Absent keys are not an error.
    fn remove(&mut self, key: &str) -> Result<(), StudylogError>;
}

pub fn default_data_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        data_dir.join(APP_NAME)
    } else {
        PathBuf::from(".")
    }
}

/// File-backed store: one `<key>.json` file per key under a root directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new() -> Self {
        Self::with_root(default_data_dir())
    }

    pub fn with_root(root: PathBuf) -> Self {
        FileStore { root }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.key_path(key);
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StudylogError> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.key_path(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StudylogError> {
        let path = self.key_path(key);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// In-memory store. Clones share the same backing map, which lets tests hand
/// one "profile" to several consecutive [`crate::store::CourseStore`] loads.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StudylogError> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StudylogError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

pub fn save_json<T: Serialize>(
    store: &mut dyn KeyValueStore,
    key: &str,
    data: &T,
) -> Result<(), StudylogError> {
    let json = serde_json::to_string(data)?;
    store.set(key, &json)
}

/// Reads and parses a stored value. Missing or unparsable entries degrade to
/// the type's default; a bad entry is logged, never surfaced.
pub fn load_json_or_default<T: DeserializeOwned + Default>(
    store: &dyn KeyValueStore,
    key: &str,
) -> T {
    match store.get(key) {
        None => T::default(),
        Some(raw) => match serde_json::from_str(&raw) {
            Ok(data) => data,
            Err(e) => {
                warn!("failed to parse stored value for '{}': {}. Using defaults.", key, e);
                T::default()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::with_root(dir.path().to_path_buf());

        store.set("userCourses", "[]").unwrap();
        assert_eq!(store.get("userCourses").as_deref(), Some("[]"));

        store.remove("userCourses").unwrap();
        assert_eq!(store.get("userCourses"), None);
    }

    #[test]
    fn file_store_remove_absent_key_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::with_root(dir.path().to_path_buf());
        assert!(store.remove("nothing").is_ok());
    }

    #[test]
    fn memory_store_clones_share_entries() {
        let mut store = MemoryStore::new();
        let other = store.clone();

        store.set("k", "v").unwrap();
        assert_eq!(other.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn malformed_value_degrades_to_default() {
        let mut store = MemoryStore::new();
        store.set("topicStates", "{not json").unwrap();

        let states: std::collections::HashMap<String, crate::core::TopicState> =
            load_json_or_default(&store, "topicStates");
        assert!(states.is_empty());
    }

    #[test]
    fn absent_key_degrades_to_default() {
        let store = MemoryStore::new();
        let courses: Vec<crate::core::Course> = load_json_or_default(&store, "userCourses");
        assert!(courses.is_empty());
    }
}
