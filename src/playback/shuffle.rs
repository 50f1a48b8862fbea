use std::collections::{HashSet, VecDeque};
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use crate::models::{QueueEntry, QueueId};

/// Per-session shuffle bookkeeping.
///
/// Both the consumed set and the history hold queue ids rather than
/// positions, so reorders and removals between skips do not corrupt them.
#[derive(Debug, Clone)]
pub struct ShuffleState {
    consumed: HashSet<QueueId>,
    history: VecDeque<QueueId>,
    history_limit: usize,
}

impl ShuffleState {
    pub fn new(history_limit: usize) -> Self {
        let history_limit = history_limit.max(1);
        Self {
            consumed: HashSet::new(),
            history: VecDeque::with_capacity(history_limit),
            history_limit,
        }
    }

    pub fn mark_played(&mut self, queue_id: &QueueId) {
        self.consumed.insert(queue_id.clone());
    }

    pub fn is_consumed(&self, queue_id: &QueueId) -> bool {
        self.consumed.contains(queue_id)
    }

    pub fn consumed_count(&self) -> usize {
        self.consumed.len()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Remember the entry we are leaving; the oldest entry drops once the
    /// bound is reached
    pub fn push_history(&mut self, queue_id: QueueId) {
        if self.history.back() == Some(&queue_id) {
            return;
        }
        if self.history.len() == self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(queue_id);
    }

    pub fn reset(&mut self) {
        self.consumed.clear();
        self.history.clear();
    }

    /// Pick a random unplayed position other than `current`.
    ///
    /// When every entry has been played the consumed set starts over. With
    /// `wrap` the pick then continues from the fresh set, otherwise `None`
    /// signals the end of the shuffled pass.
    pub fn pick_next<R: Rng + ?Sized>(
        &mut self,
        entries: &[QueueEntry],
        current: Option<usize>,
        wrap: bool,
        rng: &mut R,
    ) -> Option<usize> {
        if entries.is_empty() {
            return None;
        }

        if let Some(entry) = current.and_then(|i| entries.get(i)) {
            self.consumed.insert(entry.queue_id.clone());
        }

        let mut candidates = self.unplayed(entries, current);
        if candidates.is_empty() {
            debug!("Shuffle pass exhausted after {} entries", self.consumed.len());
            self.consumed.clear();
            if !wrap {
                return None;
            }

            candidates = (0..entries.len()).filter(|&i| Some(i) != current).collect();
            if candidates.is_empty() {
                // A single-entry queue wraps onto itself
                candidates = current.into_iter().collect();
            }
        }

        candidates.choose(rng).copied()
    }

    /// Most recent history entry still present in the queue, other than the
    /// current one. Stale ids are discarded on the way.
    pub fn pop_previous(&mut self, entries: &[QueueEntry], current: Option<usize>) -> Option<usize> {
        while let Some(queue_id) = self.history.pop_back() {
            match entries.iter().position(|e| e.queue_id == queue_id) {
                Some(index) if Some(index) != current => return Some(index),
                _ => debug!("Dropping stale shuffle history entry {}", queue_id),
            }
        }
        None
    }

    fn unplayed(&self, entries: &[QueueEntry], current: Option<usize>) -> Vec<usize> {
        entries
            .iter()
            .enumerate()
            .filter(|(i, e)| Some(*i) != current && !self.consumed.contains(&e.queue_id))
            .map(|(i, _)| i)
            .collect()
    }
}
