use std::collections::HashSet;
use serde::{Deserialize, Serialize};
use crate::error::PersistenceError;
use crate::models::{QueueEntry, RepeatMode};

/// Current snapshot layout version
pub const SNAPSHOT_VERSION: u32 = 1;

/// The persisted subset of queue state. `is_playing` and any engine state
/// are deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    pub entries: Vec<QueueEntry>,
    #[serde(with = "signed_index")]
    pub current_index: Option<usize>,
    #[serde(default)]
    pub repeat_mode: RepeatMode,
    #[serde(default)]
    pub shuffle_mode: bool,
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

impl QueueSnapshot {
    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and validate a serialized snapshot
    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        let snapshot: QueueSnapshot = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Reject snapshots that would break the queue invariants once loaded
    pub fn validate(&self) -> Result<(), PersistenceError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(PersistenceError::Malformed(format!(
                "unsupported snapshot version {}",
                self.version
            )));
        }

        if let Some(index) = self.current_index {
            if index >= self.entries.len() {
                return Err(PersistenceError::Malformed(format!(
                    "current index {} out of range for {} entries",
                    index,
                    self.entries.len()
                )));
            }
        }

        let mut seen = HashSet::with_capacity(self.entries.len());
        for entry in &self.entries {
            if !seen.insert(&entry.queue_id) {
                return Err(PersistenceError::Malformed(format!(
                    "duplicate queue id {}",
                    entry.queue_id
                )));
            }
        }

        Ok(())
    }
}

/// `Option<usize>` stored as a signed integer with `-1` for "nothing current"
mod signed_index {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(index) => serializer.serialize_i64(*index as i64),
            None => serializer.serialize_i64(-1),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = i64::deserialize(deserializer)?;
        match raw {
            -1 => Ok(None),
            n if n >= 0 => Ok(Some(n as usize)),
            n => Err(serde::de::Error::custom(format!("invalid current index {}", n))),
        }
    }
}
