use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use log::{debug, trace};
use crate::error::PersistenceError;
use crate::queue::snapshot::QueueSnapshot;

/// Durable read/write of a serialized queue snapshot. No business logic.
pub trait PersistenceAdapter: Send {
    /// Load the last saved snapshot, `None` if nothing was ever saved
    fn load(&self) -> Result<Option<QueueSnapshot>, PersistenceError>;

    /// Replace the stored snapshot
    fn save(&self, snapshot: &QueueSnapshot) -> Result<(), PersistenceError>;
}

/// Snapshot stored as `<directory>/<key>.json`
pub struct JsonFileStore {
    directory: PathBuf,
    key: String,
    slow_save_threshold: Duration,
}

impl JsonFileStore {
    /// Create a store rooted at `directory`, creating it if it doesn't exist
    pub fn new(directory: PathBuf, key: &str) -> Result<Self, PersistenceError> {
        if !directory.exists() {
            fs::create_dir_all(&directory)?;
        }

        Ok(Self {
            directory,
            key: sanitize_key(key),
            slow_save_threshold: Duration::from_millis(50),
        })
    }

    pub fn with_slow_save_threshold(mut self, threshold: Duration) -> Self {
        self.slow_save_threshold = threshold;
        self
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.directory.join(format!("{}.json", self.key))
    }

    fn temp_path(&self) -> PathBuf {
        self.directory.join(format!(".{}.json.tmp", self.key))
    }

    /// Write through a temp file so a crash mid-write never leaves a torn snapshot
    fn write_atomically(&self, path: &Path, contents: &str) -> Result<(), PersistenceError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.temp_path();
        fs::write(&temp_path, contents)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }
}

impl PersistenceAdapter for JsonFileStore {
    fn load(&self) -> Result<Option<QueueSnapshot>, PersistenceError> {
        let path = self.snapshot_path();
        if !path.exists() {
            debug!("No saved queue at {}", path.display());
            return Ok(None);
        }

        let snapshot = crate::time_operation!(format!("load queue snapshot '{}'", self.key), {
            let contents = fs::read_to_string(&path)?;
            QueueSnapshot::from_json(&contents)?
        });
        debug!(
            "Loaded queue snapshot with {} entries from {}",
            snapshot.entries.len(),
            path.display()
        );
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &QueueSnapshot) -> Result<(), PersistenceError> {
        crate::time_operation_with_threshold!(
            format!("save queue snapshot '{}'", self.key),
            self.slow_save_threshold,
            {
                let contents = snapshot.to_json()?;
                self.write_atomically(&self.snapshot_path(), &contents)?;
            }
        );
        Ok(())
    }
}

/// Keep file names portable: anything outside [A-Za-z0-9_-] becomes '_'
fn sanitize_key(key: &str) -> String {
    let cleaned: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    if cleaned.is_empty() {
        "queue".to_string()
    } else {
        cleaned
    }
}

/// In-memory store holding the serialized JSON; clones share the same slot
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with raw JSON, e.g. to simulate a corrupted snapshot
    pub fn with_raw(raw: &str) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(raw.to_string()))),
        }
    }

    /// Raw JSON currently stored
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl PersistenceAdapter for MemoryStore {
    fn load(&self) -> Result<Option<QueueSnapshot>, PersistenceError> {
        match self.raw() {
            Some(raw) => QueueSnapshot::from_json(&raw).map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, snapshot: &QueueSnapshot) -> Result<(), PersistenceError> {
        let json = snapshot.to_json()?;
        trace!("Memory store holds {} bytes", json.len());
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(json);
        Ok(())
    }
}
