//! String-valued key-value persistence.
//!
//! The pipeline only ever talks to [`KeyValueStore`]; hosts decide whether
//! values land on disk ([`FileStore`]) or stay in memory ([`MemoryStore`]).

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

use crate::Config;

/// Name of the preference file inside the data directory.
pub const PREFERENCE_FILE: &str = "weather_app_preference.toml";

pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    fn put(&self, key: &str, value: &str) -> Result<()>;
}

/// Preference file holding a flat table of string values.
///
/// Every `put` rewrites the whole file through a uniquely named temporary
/// sibling and a rename, so readers see either the old or the new document
/// and overlapping writers never share a temporary file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store living in the platform data directory.
    pub fn in_data_dir() -> Result<Self> {
        let dirs = Config::project_dirs()?;
        Ok(Self::new(dirs.data_dir().join(PREFERENCE_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read preference file: {}", self.path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse preference file: {}", self.path.display()))
    }

    fn write_table(&self, table: &BTreeMap<String, String>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).with_context(|| {
            format!("Failed to create preference directory: {}", dir.display())
        })?;

        let contents =
            toml::to_string(table).context("Failed to serialize preferences to TOML")?;

        let mut tmp = NamedTempFile::new_in(dir).with_context(|| {
            format!("Failed to create temporary preference file in {}", dir.display())
        })?;
        tmp.write_all(contents.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .with_context(|| format!("Failed to write preference file: {}", tmp.path().display()))?;
        tmp.persist(&self.path)
            .map_err(|err| err.error)
            .with_context(|| {
                format!("Failed to replace preference file: {}", self.path.display())
            })?;

        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_table()?.remove(key))
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        // A corrupt file is replaced rather than blocking every future write.
        let mut table = self.read_table().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Discarding unreadable preference file");
            BTreeMap::new()
        });
        table.insert(key.to_string(), value.to_string());
        self.write_table(&table)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_overwrites() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.put("k", "one").unwrap();
        store.put("k", "two").unwrap();

        assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prefs").join(PREFERENCE_FILE);

        FileStore::new(&path).put("k", r#"{"quoted": "json"}"#).unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(
            reopened.get("k").unwrap().as_deref(),
            Some(r#"{"quoted": "json"}"#)
        );
        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn file_store_keeps_other_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join(PREFERENCE_FILE));

        store.put("a", "1").unwrap();
        store.put("b", "2").unwrap();
        store.put("a", "3").unwrap();

        assert_eq!(store.get("a").unwrap().as_deref(), Some("3"));
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn file_store_recovers_from_corrupt_file_on_write() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(PREFERENCE_FILE);
        fs::write(&path, "this is = = not toml").unwrap();

        let store = FileStore::new(&path);
        assert!(store.get("k").is_err());

        store.put("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn overlapping_writers_all_succeed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join(PREFERENCE_FILE));
        let big = "x".repeat(200 * 1024);

        let values: Vec<String> = (0..8).map(|i| format!("{i}{big}")).collect();

        std::thread::scope(|scope| {
            for value in &values {
                let store = &store;
                scope.spawn(move || {
                    for _ in 0..25 {
                        store.put("k", value).expect("concurrent put succeeds");
                    }
                });
            }
        });

        let stored = store.get("k").unwrap().expect("value present");
        assert!(values.contains(&stored));
    }
}
