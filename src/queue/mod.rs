use std::collections::HashMap;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use crate::models::{InsertPosition, QueueEntry, QueueId, RepeatMode, Track};
use crate::queue::persistence::PersistenceAdapter;
use crate::queue::snapshot::{QueueSnapshot, SNAPSHOT_VERSION};

pub mod persistence;
pub mod snapshot;

pub use persistence::{JsonFileStore, MemoryStore};

/// Observable queue state. Read-only outside of `QueueStore`.
///
/// `current_index` is `None` when nothing is current and otherwise always a
/// valid index into `entries`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueState {
    entries: Vec<QueueEntry>,
    current_index: Option<usize>,
    repeat_mode: RepeatMode,
    shuffle_mode: bool,
    is_playing: bool,
}

impl QueueState {
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    pub fn shuffle_mode(&self) -> bool {
        self.shuffle_mode
    }

    /// Mirrors the engine; not authoritative and never persisted
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> Option<&QueueEntry> {
        self.entries.get(index)
    }

    pub fn current_entry(&self) -> Option<&QueueEntry> {
        self.current_index.and_then(|i| self.entries.get(i))
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_entry().map(|e| &e.track)
    }

    /// Entry at `current_index + 1`, ignoring repeat and shuffle
    pub fn next_entry(&self) -> Option<&QueueEntry> {
        self.current_index.and_then(|i| self.entries.get(i + 1))
    }

    /// Entry at `current_index - 1`, ignoring repeat and shuffle
    pub fn previous_entry(&self) -> Option<&QueueEntry> {
        self.current_index
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.entries.get(i))
    }

    pub fn has_next(&self) -> bool {
        self.next_entry().is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.previous_entry().is_some()
    }

    /// The "Up Next" list: everything after the current entry, or the whole
    /// queue when nothing is current
    pub fn upcoming(&self) -> &[QueueEntry] {
        match self.current_index {
            Some(i) => &self.entries[i + 1..],
            None => &self.entries,
        }
    }

    pub fn has_upcoming(&self) -> bool {
        !self.upcoming().is_empty()
    }

    /// Sum of known track durations
    pub fn total_duration_ms(&self) -> u64 {
        self.entries
            .iter()
            .filter_map(|e| e.track.duration_ms)
            .sum()
    }

    pub fn position_of(&self, queue_id: &QueueId) -> Option<usize> {
        self.entries.iter().position(|e| &e.queue_id == queue_id)
    }

    /// First position holding a track with this catalog id
    pub fn index_of_track(&self, track_id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.track.id == track_id)
    }

    fn from_snapshot(snapshot: QueueSnapshot) -> Self {
        Self {
            entries: snapshot.entries,
            current_index: snapshot.current_index,
            repeat_mode: snapshot.repeat_mode,
            shuffle_mode: snapshot.shuffle_mode,
            is_playing: false,
        }
    }
}

/// Owns the ordered entry list and the current index.
///
/// Every mutation keeps `current_index` pointing at the entry the user
/// perceives as playing. Mutations only mark the store dirty; the owner calls
/// [`QueueStore::commit`] once per external event to persist.
pub struct QueueStore {
    state: QueueState,
    adapter: Box<dyn PersistenceAdapter>,
    dirty: bool,
    last_added_at: Option<DateTime<Utc>>,
}

impl QueueStore {
    /// Open the store from the adapter's last snapshot. Load failures are
    /// logged and yield an empty queue.
    pub fn open(adapter: Box<dyn PersistenceAdapter>) -> Self {
        let state = match adapter.load() {
            Ok(Some(snapshot)) => {
                info!(
                    "Restored queue with {} entries (current: {:?})",
                    snapshot.entries.len(),
                    snapshot.current_index
                );
                QueueState::from_snapshot(snapshot)
            }
            Ok(None) => QueueState::default(),
            Err(e) => {
                warn!("Discarding saved queue, starting empty: {}", e);
                QueueState::default()
            }
        };

        let last_added_at = state.entries.iter().map(|e| e.added_at).max();

        Self {
            state,
            adapter,
            dirty: false,
            last_added_at,
        }
    }

    pub fn state(&self) -> &QueueState {
        &self.state
    }

    /// True when a mutation happened since the last successful commit
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Insert a track and return the id of the new entry
    pub fn add_to_queue(&mut self, track: Track, position: InsertPosition) -> QueueId {
        let entry = QueueEntry::new(track, self.next_added_at());
        let queue_id = entry.queue_id.clone();

        let insert_at = match (position, self.state.current_index) {
            (InsertPosition::Next, Some(current)) => current + 1,
            (InsertPosition::Next, None) => 0,
            (InsertPosition::End, _) => self.state.entries.len(),
        };

        debug!(
            "Adding '{}' at position {} ({:?})",
            entry.track.display_title(),
            insert_at,
            position
        );
        // Insertion never lands at or before the current index, so it stays valid
        self.state.entries.insert(insert_at, entry);
        self.dirty = true;
        queue_id
    }

    /// Remove an entry by queue id. Missing ids are a no-op.
    ///
    /// Removing the current entry leaves nothing current; deciding what plays
    /// next is the coordinator's job.
    pub fn remove_from_queue(&mut self, queue_id: &QueueId) -> Option<QueueEntry> {
        let removed_index = match self.state.position_of(queue_id) {
            Some(index) => index,
            None => {
                debug!("remove_from_queue: {} not in queue", queue_id);
                return None;
            }
        };

        let removed = self.state.entries.remove(removed_index);
        self.state.current_index = match self.state.current_index {
            Some(current) if removed_index < current => Some(current - 1),
            Some(current) if removed_index == current => None,
            other => other,
        };

        debug!(
            "Removed '{}' from position {}",
            removed.track.display_title(),
            removed_index
        );
        self.dirty = true;
        Some(removed)
    }

    /// Move the entry at `from_index` to `to_index`. Out-of-range or equal
    /// indices are a no-op.
    pub fn reorder_queue(&mut self, from_index: usize, to_index: usize) -> bool {
        let len = self.state.entries.len();
        if from_index >= len || to_index >= len || from_index == to_index {
            debug!(
                "reorder_queue: ignoring move {} -> {} on {} entries",
                from_index, to_index, len
            );
            return false;
        }

        let moved = self.state.entries.remove(from_index);
        self.state.entries.insert(to_index, moved);
        self.state.current_index = self
            .state
            .current_index
            .map(|current| remap_after_move(current, from_index, to_index));

        debug!("Moved entry {} -> {}", from_index, to_index);
        self.dirty = true;
        true
    }

    pub fn clear_queue(&mut self) {
        if self.state.entries.is_empty() && self.state.current_index.is_none() {
            return;
        }

        debug!("Clearing {} entries", self.state.entries.len());
        self.state.entries.clear();
        self.state.current_index = None;
        self.dirty = true;
    }

    /// Set the current index directly. Out-of-range indices are a no-op.
    pub fn set_current_index(&mut self, index: Option<usize>) -> bool {
        if let Some(i) = index {
            if i >= self.state.entries.len() {
                debug!(
                    "set_current_index: {} out of range for {} entries",
                    i,
                    self.state.entries.len()
                );
                return false;
            }
        }

        if self.state.current_index != index {
            self.state.current_index = index;
            self.dirty = true;
        }
        true
    }

    /// Splice an entry to the head of the queue
    pub fn move_to_top(&mut self, queue_id: &QueueId) -> bool {
        match self.state.position_of(queue_id) {
            Some(0) => false,
            Some(index) => self.reorder_queue(index, 0),
            None => {
                debug!("move_to_top: {} not in queue", queue_id);
                false
            }
        }
    }

    /// Keep the first entry per `(id, name)` key and drop later duplicates.
    /// Returns how many entries were removed.
    ///
    /// If the current entry is itself a later duplicate, the surviving first
    /// occurrence becomes current.
    pub fn remove_duplicates(&mut self) -> usize {
        let old_current = self.state.current_index;
        let original_len = self.state.entries.len();
        let mut first_index: HashMap<(String, Option<String>), usize> = HashMap::new();
        let mut kept = Vec::with_capacity(original_len);
        let mut new_current = None;

        for (index, entry) in std::mem::take(&mut self.state.entries).into_iter().enumerate() {
            let (id, name) = entry.track.dedup_key();
            let key = (id.to_string(), name.map(str::to_string));

            match first_index.get(&key) {
                Some(&survivor) => {
                    if old_current == Some(index) {
                        new_current = Some(survivor);
                    }
                }
                None => {
                    if old_current == Some(index) {
                        new_current = Some(kept.len());
                    }
                    first_index.insert(key, kept.len());
                    kept.push(entry);
                }
            }
        }

        let removed = original_len - kept.len();
        self.state.entries = kept;
        self.state.current_index = new_current;

        if removed > 0 {
            debug!(
                "Removed {} duplicate entries (current {:?} -> {:?})",
                removed, old_current, new_current
            );
            self.dirty = true;
        }
        removed
    }

    /// Track after the current one, ignoring repeat and shuffle
    pub fn next_track(&self) -> Option<&Track> {
        self.state.next_entry().map(|e| &e.track)
    }

    /// Track before the current one, ignoring repeat and shuffle
    pub fn previous_track(&self) -> Option<&Track> {
        self.state.previous_entry().map(|e| &e.track)
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        if self.state.repeat_mode != mode {
            debug!("Repeat mode {} -> {}", self.state.repeat_mode, mode);
            self.state.repeat_mode = mode;
            self.dirty = true;
        }
    }

    pub fn cycle_repeat_mode(&mut self) -> RepeatMode {
        let mode = self.state.repeat_mode.cycle();
        self.set_repeat_mode(mode);
        mode
    }

    pub fn set_shuffle_mode(&mut self, enabled: bool) {
        if self.state.shuffle_mode != enabled {
            debug!("Shuffle {}", if enabled { "on" } else { "off" });
            self.state.shuffle_mode = enabled;
            self.dirty = true;
        }
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        let enabled = !self.state.shuffle_mode;
        self.set_shuffle_mode(enabled);
        enabled
    }

    /// Mirror the engine's playing flag. Transient, never dirties the store.
    pub fn set_playing(&mut self, is_playing: bool) {
        self.state.is_playing = is_playing;
    }

    /// The persisted subset of the current state
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            version: SNAPSHOT_VERSION,
            entries: self.state.entries.clone(),
            current_index: self.state.current_index,
            repeat_mode: self.state.repeat_mode,
            shuffle_mode: self.state.shuffle_mode,
        }
    }

    /// Persist the snapshot if anything changed since the last commit.
    ///
    /// Save failures are logged; the in-memory state stands and the store
    /// stays dirty so the next commit writes again.
    pub fn commit(&mut self) -> bool {
        if !self.dirty {
            return false;
        }

        match self.adapter.save(&self.snapshot()) {
            Ok(()) => {
                self.dirty = false;
                true
            }
            Err(e) => {
                warn!("Failed to persist queue (kept in memory): {}", e);
                false
            }
        }
    }

    /// Non-decreasing insertion timestamp
    fn next_added_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let added_at = match self.last_added_at {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_added_at = Some(added_at);
        added_at
    }
}

/// Where the entry at `current` ends up after moving `from` to `to`
fn remap_after_move(current: usize, from: usize, to: usize) -> usize {
    if from == current {
        to
    } else if from < current && current <= to {
        current - 1
    } else if to <= current && current < from {
        current + 1
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersistenceError;
    use crate::queue::persistence::MemoryStore;

    struct FailingStore;

    impl PersistenceAdapter for FailingStore {
        fn load(&self) -> Result<Option<QueueSnapshot>, PersistenceError> {
            Err(PersistenceError::Malformed("unreadable".to_string()))
        }

        fn save(&self, _snapshot: &QueueSnapshot) -> Result<(), PersistenceError> {
            Err(PersistenceError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        }
    }

    fn store() -> QueueStore {
        QueueStore::open(Box::new(MemoryStore::new()))
    }

    fn track(id: &str) -> Track {
        Track::new(id, format!("Song {}", id)).with_name(id)
    }

    /// Build a queue of tracks named by `ids` with the given current index
    fn store_with(ids: &[&str], current: Option<usize>) -> (QueueStore, Vec<QueueId>) {
        let mut store = store();
        let queue_ids = ids
            .iter()
            .map(|id| store.add_to_queue(track(id), InsertPosition::End))
            .collect();
        assert!(store.set_current_index(current));
        (store, queue_ids)
    }

    fn ids(store: &QueueStore) -> Vec<String> {
        store.state().entries().iter().map(|e| e.track.id.clone()).collect()
    }

    fn assert_index_valid(store: &QueueStore) {
        if let Some(i) = store.state().current_index() {
            assert!(i < store.state().len(), "current index {} out of range", i);
        }
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = store();
        assert!(store.state().is_empty());
        assert_eq!(store.state().current_index(), None);
        assert_eq!(store.state().repeat_mode(), RepeatMode::None);
        assert!(!store.state().shuffle_mode());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_add_next_inserts_after_current() {
        let (mut store, _) = store_with(&["a", "b", "c"], Some(1));
        store.add_to_queue(track("x"), InsertPosition::Next);
        assert_eq!(ids(&store), vec!["a", "b", "x", "c"]);
        assert_eq!(store.state().current_index(), Some(1));
    }

    #[test]
    fn test_add_next_without_current_inserts_at_head() {
        let (mut store, _) = store_with(&["a", "b"], None);
        store.add_to_queue(track("x"), InsertPosition::Next);
        assert_eq!(ids(&store), vec!["x", "a", "b"]);
        assert_eq!(store.state().current_index(), None);
    }

    #[test]
    fn test_add_end_appends() {
        let (mut store, _) = store_with(&["a", "b"], Some(0));
        let queue_id = store.add_to_queue(track("x"), InsertPosition::End);
        assert_eq!(store.state().position_of(&queue_id), Some(2));
        assert_eq!(store.state().current_index(), Some(0));
    }

    #[test]
    fn test_re_adding_same_track_gets_new_queue_id() {
        let mut store = store();
        let first = store.add_to_queue(track("a"), InsertPosition::End);
        let second = store.add_to_queue(track("a"), InsertPosition::End);
        assert_ne!(first, second);
        assert_eq!(store.state().len(), 2);
    }

    #[test]
    fn test_added_at_is_non_decreasing() {
        let (store, _) = store_with(&["a", "b", "c", "d"], None);
        let stamps: Vec<_> = store.state().entries().iter().map(|e| e.added_at).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_remove_before_current_shifts_index() {
        let (mut store, queue_ids) = store_with(&["a", "b", "c"], Some(2));
        let removed = store.remove_from_queue(&queue_ids[1]).unwrap();
        assert_eq!(removed.track.id, "b");
        assert_eq!(ids(&store), vec!["a", "c"]);
        assert_eq!(store.state().current_index(), Some(1));
        assert_eq!(store.state().current_track().unwrap().id, "c");
    }

    #[test]
    fn test_remove_current_clears_index() {
        let (mut store, queue_ids) = store_with(&["a", "b", "c"], Some(1));
        store.remove_from_queue(&queue_ids[1]);
        assert_eq!(ids(&store), vec!["a", "c"]);
        assert_eq!(store.state().current_index(), None);
    }

    #[test]
    fn test_remove_after_current_keeps_index() {
        let (mut store, queue_ids) = store_with(&["a", "b", "c"], Some(0));
        store.remove_from_queue(&queue_ids[2]);
        assert_eq!(store.state().current_index(), Some(0));
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let (mut store, _) = store_with(&["a"], Some(0));
        store.commit();
        assert!(store.remove_from_queue(&QueueId::from("gone")).is_none());
        assert_eq!(store.state().len(), 1);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_reorder_crossing_current_forward() {
        let (mut store, _) = store_with(&["a", "b", "c", "d"], Some(2));
        assert!(store.reorder_queue(0, 3));
        assert_eq!(ids(&store), vec!["b", "c", "d", "a"]);
        assert_eq!(store.state().current_index(), Some(1));
        assert_eq!(store.state().current_track().unwrap().id, "c");
    }

    #[test]
    fn test_reorder_crossing_current_backward() {
        let (mut store, _) = store_with(&["a", "b", "c", "d"], Some(1));
        assert!(store.reorder_queue(3, 0));
        assert_eq!(ids(&store), vec!["d", "a", "b", "c"]);
        assert_eq!(store.state().current_track().unwrap().id, "b");
    }

    #[test]
    fn test_reorder_moving_current() {
        let (mut store, _) = store_with(&["a", "b", "c", "d"], Some(1));
        assert!(store.reorder_queue(1, 3));
        assert_eq!(store.state().current_index(), Some(3));
        assert_eq!(store.state().current_track().unwrap().id, "b");
    }

    #[test]
    fn test_reorder_outside_window_keeps_index() {
        let (mut store, _) = store_with(&["a", "b", "c", "d"], Some(0));
        assert!(store.reorder_queue(2, 3));
        assert_eq!(store.state().current_index(), Some(0));
    }

    #[test]
    fn test_reorder_invalid_is_noop() {
        let (mut store, _) = store_with(&["a", "b"], Some(0));
        assert!(!store.reorder_queue(0, 5));
        assert!(!store.reorder_queue(7, 0));
        assert!(!store.reorder_queue(1, 1));
        assert_eq!(ids(&store), vec!["a", "b"]);
    }

    #[test]
    fn test_reorder_preserves_current_identity_exhaustively() {
        let names = ["a", "b", "c", "d", "e"];
        for current in 0..names.len() {
            for from in 0..names.len() {
                for to in 0..names.len() {
                    let (mut store, _) = store_with(&names, Some(current));
                    store.reorder_queue(from, to);
                    assert_eq!(
                        store.state().current_track().unwrap().id,
                        names[current],
                        "move {} -> {} with current {}",
                        from,
                        to,
                        current
                    );
                }
            }
        }
    }

    #[test]
    fn test_clear_queue() {
        let (mut store, _) = store_with(&["a", "b"], Some(1));
        store.clear_queue();
        assert!(store.state().is_empty());
        assert_eq!(store.state().current_index(), None);
    }

    #[test]
    fn test_set_current_index_out_of_range_is_noop() {
        let (mut store, _) = store_with(&["a", "b"], Some(1));
        assert!(!store.set_current_index(Some(2)));
        assert_eq!(store.state().current_index(), Some(1));
        assert!(store.set_current_index(None));
        assert_eq!(store.state().current_index(), None);
    }

    #[test]
    fn test_move_to_top_entry_after_current() {
        let (mut store, queue_ids) = store_with(&["a", "b", "c"], Some(1));
        assert!(store.move_to_top(&queue_ids[2]));
        assert_eq!(ids(&store), vec!["c", "a", "b"]);
        assert_eq!(store.state().current_track().unwrap().id, "b");
        assert_eq!(store.state().current_index(), Some(2));
    }

    #[test]
    fn test_move_to_top_entry_before_current() {
        let (mut store, queue_ids) = store_with(&["a", "b", "c"], Some(2));
        assert!(store.move_to_top(&queue_ids[1]));
        assert_eq!(ids(&store), vec!["b", "a", "c"]);
        assert_eq!(store.state().current_index(), Some(2));
    }

    #[test]
    fn test_move_to_top_current_becomes_zero() {
        let (mut store, queue_ids) = store_with(&["a", "b", "c"], Some(2));
        assert!(store.move_to_top(&queue_ids[2]));
        assert_eq!(store.state().current_index(), Some(0));
    }

    #[test]
    fn test_move_to_top_without_current() {
        let (mut store, queue_ids) = store_with(&["a", "b"], None);
        assert!(store.move_to_top(&queue_ids[1]));
        assert_eq!(store.state().current_index(), None);
        assert!(!store.move_to_top(&QueueId::from("missing")));
    }

    #[test]
    fn test_remove_duplicates_preserves_current_identity() {
        let mut store = store();
        store.add_to_queue(track("a"), InsertPosition::End);
        store.add_to_queue(track("b"), InsertPosition::End);
        store.add_to_queue(track("a"), InsertPosition::End);
        store.add_to_queue(track("c"), InsertPosition::End);
        store.set_current_index(Some(3));

        assert_eq!(store.remove_duplicates(), 1);
        assert_eq!(ids(&store), vec!["a", "b", "c"]);
        assert_eq!(store.state().current_index(), Some(2));
    }

    #[test]
    fn test_remove_duplicates_when_current_is_duplicate() {
        let (mut store, _) = store_with(&["a", "b", "a"], Some(2));
        assert_eq!(store.remove_duplicates(), 1);
        assert_eq!(ids(&store), vec!["a", "b"]);
        assert_eq!(store.state().current_index(), Some(0));
    }

    #[test]
    fn test_remove_duplicates_uses_id_and_name_only() {
        let mut store = store();
        store.add_to_queue(Track::new("1", "One").with_name("x").with_artist("A"), InsertPosition::End);
        store.add_to_queue(Track::new("1", "One").with_name("x").with_artist("B"), InsertPosition::End);
        store.add_to_queue(Track::new("1", "One").with_name("y"), InsertPosition::End);

        assert_eq!(store.remove_duplicates(), 1);
        assert_eq!(store.state().len(), 2);
        assert_eq!(store.state().entries()[0].track.artist.as_deref(), Some("A"));
    }

    #[test]
    fn test_remove_duplicates_keeps_none_current() {
        let (mut store, _) = store_with(&["a", "a", "b"], None);
        store.remove_duplicates();
        assert_eq!(store.state().current_index(), None);
    }

    #[test]
    fn test_next_and_previous_lookups() {
        let (store, _) = store_with(&["a", "b", "c"], Some(1));
        assert_eq!(store.next_track().unwrap().id, "c");
        assert_eq!(store.previous_track().unwrap().id, "a");

        let (store, _) = store_with(&["a", "b", "c"], Some(2));
        assert!(store.next_track().is_none());
        assert!(!store.state().has_next());

        let (store, _) = store_with(&["a", "b", "c"], Some(0));
        assert!(store.previous_track().is_none());
        assert!(!store.state().has_previous());

        let (store, _) = store_with(&["a"], None);
        assert!(store.next_track().is_none());
        assert!(store.previous_track().is_none());
    }

    #[test]
    fn test_upcoming_view() {
        let (store, _) = store_with(&["a", "b", "c"], Some(1));
        assert_eq!(store.state().upcoming().len(), 1);

        let (store, _) = store_with(&["a", "b", "c"], None);
        assert_eq!(store.state().upcoming().len(), 3);

        let (store, _) = store_with(&["a", "b"], Some(1));
        assert!(!store.state().has_upcoming());
    }

    #[test]
    fn test_total_duration_skips_unknown() {
        let mut store = store();
        store.add_to_queue(track("a").with_duration_ms(1_000), InsertPosition::End);
        store.add_to_queue(track("b"), InsertPosition::End);
        store.add_to_queue(track("c").with_duration_ms(2_500), InsertPosition::End);
        assert_eq!(store.state().total_duration_ms(), 3_500);
    }

    #[test]
    fn test_index_invariant_under_mixed_mutations() {
        let (mut store, mut queue_ids) = store_with(&["a", "b", "c", "d", "e"], Some(4));
        for step in 0..40usize {
            match step % 6 {
                0 => {
                    let id = queue_ids.remove(step % queue_ids.len().max(1));
                    store.remove_from_queue(&id);
                }
                1 => {
                    queue_ids.push(store.add_to_queue(track("n"), InsertPosition::Next));
                }
                2 => {
                    let len = store.state().len();
                    store.reorder_queue(step % len.max(1), (step * 7) % len.max(1));
                }
                3 => {
                    store.remove_duplicates();
                    queue_ids = store.state().entries().iter().map(|e| e.queue_id.clone()).collect();
                }
                4 => {
                    if let Some(id) = queue_ids.last().cloned() {
                        store.move_to_top(&id);
                    }
                }
                _ => {
                    let len = store.state().len();
                    store.set_current_index(if len == 0 { None } else { Some(step % len) });
                }
            }
            assert_index_valid(&store);
            if queue_ids.is_empty() {
                queue_ids.push(store.add_to_queue(track("z"), InsertPosition::End));
            }
        }
    }

    #[test]
    fn test_commit_only_when_dirty() {
        let adapter = MemoryStore::new();
        let mut store = QueueStore::open(Box::new(adapter.clone()));
        assert!(!store.commit());
        assert!(adapter.raw().is_none());

        store.add_to_queue(track("a"), InsertPosition::End);
        store.add_to_queue(track("b"), InsertPosition::End);
        assert!(adapter.raw().is_none(), "mutations must not write before commit");
        assert!(store.commit());
        assert!(adapter.raw().is_some());
        assert!(!store.commit());
    }

    #[test]
    fn test_is_playing_does_not_dirty() {
        let (mut store, _) = store_with(&["a"], Some(0));
        store.commit();
        store.set_playing(true);
        assert!(store.state().is_playing());
        assert!(!store.is_dirty());
        assert!(!store.snapshot().to_json().unwrap().contains("isPlaying"));
    }

    #[test]
    fn test_modes_dirty_and_persist() {
        let adapter = MemoryStore::new();
        let mut store = QueueStore::open(Box::new(adapter.clone()));
        assert_eq!(store.cycle_repeat_mode(), RepeatMode::All);
        assert!(store.toggle_shuffle());
        assert!(store.commit());

        let reopened = QueueStore::open(Box::new(adapter));
        assert_eq!(reopened.state().repeat_mode(), RepeatMode::All);
        assert!(reopened.state().shuffle_mode());
    }

    #[test]
    fn test_persistence_round_trip_reproduces_state() {
        let adapter = MemoryStore::new();
        let mut store = QueueStore::open(Box::new(adapter.clone()));
        store.add_to_queue(track("a").with_artist("X").with_duration_ms(90_000), InsertPosition::End);
        store.add_to_queue(track("b"), InsertPosition::End);
        store.set_current_index(Some(1));
        store.set_repeat_mode(RepeatMode::One);
        store.commit();

        let reopened = QueueStore::open(Box::new(adapter.clone()));
        assert_eq!(reopened.state(), store.state());

        // save(load()) is stable
        let loaded = adapter.load().unwrap().unwrap();
        adapter.save(&loaded).unwrap();
        assert_eq!(adapter.load().unwrap().unwrap(), loaded);
    }

    #[test]
    fn test_load_failure_degrades_to_empty() {
        let store = QueueStore::open(Box::new(FailingStore));
        assert!(store.state().is_empty());
        assert_eq!(store.state().current_index(), None);

        let malformed = MemoryStore::with_raw("{\"entries\": 12}");
        let store = QueueStore::open(Box::new(malformed));
        assert!(store.state().is_empty());
    }

    #[test]
    fn test_save_failure_keeps_mutation_and_stays_dirty() {
        let mut store = QueueStore::open(Box::new(FailingStore));
        store.add_to_queue(track("a"), InsertPosition::End);
        assert!(!store.commit());
        assert_eq!(store.state().len(), 1);
        assert!(store.is_dirty());
    }
}
