use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Every key the dashboard persists. One widget owns each key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKey {
    Todos,
    Expenses,
    Bookmarks,
    Projects,
    Notes,
    FavoriteQuotes,
    FocusSessions,
    WaterIntake,
    TimeTracking,
    CurrentActivity,
    ReadingList,
    ImportantDates,
    Goals,
    Habits,
}

impl StoreKey {
    pub const ALL: [StoreKey; 14] = [
        StoreKey::Todos,
        StoreKey::Expenses,
        StoreKey::Bookmarks,
        StoreKey::Projects,
        StoreKey::Notes,
        StoreKey::FavoriteQuotes,
        StoreKey::FocusSessions,
        StoreKey::WaterIntake,
        StoreKey::TimeTracking,
        StoreKey::CurrentActivity,
        StoreKey::ReadingList,
        StoreKey::ImportantDates,
        StoreKey::Goals,
        StoreKey::Habits,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StoreKey::Todos => "todos",
            StoreKey::Expenses => "expenses",
            StoreKey::Bookmarks => "bookmarks",
            StoreKey::Projects => "projects",
            StoreKey::Notes => "notes",
            StoreKey::FavoriteQuotes => "favoriteQuotes",
            StoreKey::FocusSessions => "focusSessionsCompleted",
            StoreKey::WaterIntake => "waterIntake",
            StoreKey::TimeTracking => "timeTracking",
            StoreKey::CurrentActivity => "currentActivity",
            StoreKey::ReadingList => "readingList",
            StoreKey::ImportantDates => "importantDates",
            StoreKey::Goals => "goals",
            StoreKey::Habits => "habits",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw string storage underneath the [`Store`].
pub trait Backend: fmt::Debug {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// One `<key>.json` file per key inside a data directory.
#[derive(Debug)]
pub struct FileBackend {
    pub data_dir: PathBuf,
}

impl FileBackend {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        info!(data_dir = %data_dir.display(), "opened file backend");
        Ok(Self { data_dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }
}

impl Backend for FileBackend {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        Ok(Some(raw))
    }

    fn write(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        debug!(file = %path.display(), bytes = value.len(), "writing key atomically");

        let mut temp = NamedTempFile::new_in(&self.data_dir)?;
        temp.write_all(value.as_bytes())?;
        temp.flush()?;
        temp.persist(&path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
        Ok(())
    }
}

/// In-process map. Clones share the same entries, so a test can keep a
/// handle to inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_raw(&self, key: &str, raw: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), raw.to_string());
    }

    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl Backend for MemoryBackend {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.get_raw(key))
    }

    fn write(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.insert_raw(key, value);
        Ok(())
    }
}

/// Shared handle to the persistence layer. Cloning is cheap; every widget
/// receives its own clone at construction.
#[derive(Debug, Clone)]
pub struct Store {
    backend: Rc<dyn Backend>,
}

impl Store {
    pub fn new<B: Backend + 'static>(backend: B) -> Self {
        Self {
            backend: Rc::new(backend),
        }
    }

    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(FileBackend::open(data_dir)?))
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Returns the saved value for `key`, or `default` when it is missing or
    /// cannot be decoded.
    #[tracing::instrument(skip(self, default))]
    pub fn load<T: DeserializeOwned>(&self, key: StoreKey, default: T) -> T {
        let raw = match self.backend.read(key.as_str()) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("key absent; using default");
                return default;
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "failed reading key; using default");
                return default;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "stored value is not valid json; using default");
                default
            }
        }
    }

    /// Best-effort write. Failures are logged and otherwise ignored; the
    /// caller's in-memory value stays authoritative.
    #[tracing::instrument(skip(self, value))]
    pub fn save<T: Serialize + ?Sized>(&self, key: StoreKey, value: &T) {
        let serialized = match serde_json::to_string(value) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!(error = %err, "failed serializing value; not saved");
                return;
            }
        };

        if let Err(err) = self.backend.write(key.as_str(), &serialized) {
            warn!(error = %format!("{err:#}"), "failed writing key; keeping in-memory state");
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::{Backend, FileBackend, MemoryBackend, Store, StoreKey};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[derive(Debug)]
    struct BrokenBackend;

    impl Backend for BrokenBackend {
        fn read(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Err(anyhow::anyhow!("storage unavailable"))
        }

        fn write(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("quota exceeded"))
        }
    }

    #[test]
    fn load_after_save_returns_equal_value() {
        let store = Store::in_memory();
        let value = vec![
            Sample {
                name: "a".to_string(),
                count: 1,
            },
            Sample {
                name: "b".to_string(),
                count: 2,
            },
        ];

        store.save(StoreKey::Goals, &value);
        let loaded: Vec<Sample> = store.load(StoreKey::Goals, Vec::new());
        assert_eq!(loaded, value);
    }

    #[test]
    fn missing_and_corrupt_keys_fall_back_to_default() {
        let backend = MemoryBackend::new();
        backend.insert_raw("notes", "{not json");
        let store = Store::new(backend);

        let missing: u64 = store.load(StoreKey::FocusSessions, 7);
        assert_eq!(missing, 7);

        let corrupt: Vec<Sample> = store.load(StoreKey::Notes, Vec::new());
        assert!(corrupt.is_empty());
    }

    #[test]
    fn backend_failures_are_swallowed() {
        let store = Store::new(BrokenBackend);
        store.save(StoreKey::Todos, &vec![1, 2, 3]);
        let loaded: Vec<u32> = store.load(StoreKey::Todos, vec![9]);
        assert_eq!(loaded, vec![9]);
    }

    #[test]
    fn file_backend_writes_one_file_per_key() {
        let temp = tempfile::tempdir().expect("tempdir");
        let backend = FileBackend::open(temp.path()).expect("open backend");
        let path = backend.path_for("waterIntake");
        let store = Store::new(backend);

        store.save(StoreKey::WaterIntake, &Sample {
            name: "water".to_string(),
            count: 3,
        });

        assert!(path.exists());
        let reopened = Store::open(temp.path()).expect("reopen");
        let loaded: Option<Sample> = reopened.load(StoreKey::WaterIntake, None);
        assert_eq!(loaded.map(|s| s.count), Some(3));
    }

    #[test]
    fn key_names_are_unique() {
        let mut names: Vec<&str> = StoreKey::ALL.iter().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), StoreKey::ALL.len());
    }
}
