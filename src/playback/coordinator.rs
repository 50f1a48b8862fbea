use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use crate::models::{QueueEntry, QueueId, RepeatMode, Track};
use crate::playback::shuffle::ShuffleState;
use crate::playback::{AdvanceCause, Direction, EngineEvent, PlaybackEngine};
use crate::queue::QueueStore;

/// Translates queue transitions and engine events into engine commands,
/// applying the repeat and shuffle policy the store is agnostic to.
///
/// The coordinator owns the engine and the shuffle session but never the
/// queue: every call borrows the single `QueueStore` and changes it only
/// through its public operations.
pub struct PlaybackCoordinator<E: PlaybackEngine> {
    engine: E,
    shuffle: ShuffleState,
    rng: StdRng,
    volume: f32,
    /// Entry most recently handed to `load_and_play`
    loaded: Option<QueueId>,
}

impl<E: PlaybackEngine> PlaybackCoordinator<E> {
    pub fn new(engine: E, history_limit: usize) -> Self {
        Self::with_rng(engine, history_limit, StdRng::from_entropy())
    }

    /// Deterministic shuffle order, for tests and reproducible sessions
    pub fn with_seed(engine: E, history_limit: usize, seed: u64) -> Self {
        Self::with_rng(engine, history_limit, StdRng::seed_from_u64(seed))
    }

    fn with_rng(engine: E, history_limit: usize, rng: StdRng) -> Self {
        Self {
            engine,
            shuffle: ShuffleState::new(history_limit),
            rng,
            volume: 1.0,
            loaded: None,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn shuffle_state(&self) -> &ShuffleState {
        &self.shuffle
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Play `track` now. If the queue holds it, the first matching entry
    /// becomes current; the engine is told to play either way.
    pub fn play_track_now(&mut self, store: &mut QueueStore, track: &Track) {
        match store.state().index_of_track(&track.id) {
            Some(index) => {
                self.leave_current(store);
                store.set_current_index(Some(index));
                self.mark_played(store, index);
            }
            None => {
                debug!("'{}' is not queued; playing outside the queue", track.display_title());
                self.loaded = None;
            }
        }
        self.load(store, track);
    }

    /// Play the entry at an exact queue position. Out-of-range positions are
    /// a no-op.
    pub fn play_at(&mut self, store: &mut QueueStore, index: usize) -> bool {
        if index >= store.state().len() {
            debug!("play_at: {} out of range for {} entries", index, store.state().len());
            return false;
        }

        self.leave_current(store);
        self.play_index(store, index);
        true
    }

    /// Move to the adjacent entry under the current repeat and shuffle
    /// policy and play it. Returns the new current position, or `None` when
    /// playback stops without an engine command.
    pub fn advance(
        &mut self,
        store: &mut QueueStore,
        direction: Direction,
        cause: AdvanceCause,
    ) -> Option<usize> {
        let (len, current, repeat_mode, shuffle_mode) = {
            let state = store.state();
            (state.len(), state.current_index(), state.repeat_mode(), state.shuffle_mode())
        };
        if len == 0 {
            debug!("advance({:?}) on empty queue", direction);
            return None;
        }

        if cause == AdvanceCause::TrackEnded && repeat_mode == RepeatMode::One {
            if let Some(index) = current {
                debug!("Repeat one: replaying position {}", index);
                self.play_index(store, index);
                return Some(index);
            }
        }

        let target = if shuffle_mode {
            self.shuffle_target(store, direction)
        } else {
            sequential_target(current, len, direction, repeat_mode)
        };

        match target {
            Some(index) => {
                if direction == Direction::Next {
                    self.leave_current(store);
                }
                self.play_index(store, index);
                Some(index)
            }
            None => {
                info!("Reached the {} of the queue, stopping", match direction {
                    Direction::Next => "end",
                    Direction::Previous => "start",
                });
                None
            }
        }
    }

    /// Manual skip forward
    pub fn next(&mut self, store: &mut QueueStore) -> Option<usize> {
        self.advance(store, Direction::Next, AdvanceCause::Manual)
    }

    /// Manual skip back
    pub fn previous(&mut self, store: &mut QueueStore) -> Option<usize> {
        self.advance(store, Direction::Previous, AdvanceCause::Manual)
    }

    /// The engine reported natural completion of the loaded track
    pub fn on_engine_track_ended(&mut self, store: &mut QueueStore) -> Option<usize> {
        let advanced = self.advance(store, Direction::Next, AdvanceCause::TrackEnded);
        if advanced.is_none() {
            store.set_playing(false);
        }
        advanced
    }

    pub fn handle_engine_event(&mut self, store: &mut QueueStore, event: EngineEvent) {
        debug!("Engine event: {:?}", event);
        match event {
            EngineEvent::TrackEnded => {
                self.on_engine_track_ended(store);
            }
            EngineEvent::SkipRequested(direction) => {
                self.advance(store, direction, AdvanceCause::Manual);
            }
            EngineEvent::PlayingChanged(playing) => store.set_playing(playing),
        }
    }

    /// Dispatch the engine notifications pending at the time of the call.
    /// Anything raised while handling them, such as the end of a
    /// zero-length track replayed under repeat one, waits for the next pump.
    pub fn pump_events(&mut self, store: &mut QueueStore) -> usize {
        let pending: Vec<EngineEvent> = std::iter::from_fn(|| self.engine.poll_event()).collect();
        let handled = pending.len();
        for event in pending {
            self.handle_engine_event(store, event);
        }
        handled
    }

    pub fn pause(&mut self, store: &mut QueueStore) {
        if let Err(e) = self.engine.pause() {
            warn!("Engine failed to pause: {}", e);
        }
        store.set_playing(self.engine.is_playing());
    }

    /// Resume the loaded entry, or load the current one if the engine holds
    /// something else
    pub fn resume(&mut self, store: &mut QueueStore) -> bool {
        let current = match store.state().current_entry() {
            Some(entry) => entry.queue_id.clone(),
            None => return false,
        };

        if self.loaded.as_ref() == Some(&current) {
            if let Err(e) = self.engine.resume() {
                warn!("Engine failed to resume: {}", e);
            }
            store.set_playing(self.engine.is_playing());
        } else if let Some(index) = store.state().current_index() {
            self.play_index(store, index);
        }
        true
    }

    /// Pause when playing, otherwise resume or start the queue. Returns the
    /// resulting playing flag.
    pub fn toggle_play(&mut self, store: &mut QueueStore) -> bool {
        if self.engine.is_playing() {
            self.pause(store);
        } else if !self.resume(store) && !store.state().is_empty() {
            self.play_index(store, 0);
        }
        self.engine.is_playing()
    }

    pub fn seek(&mut self, store: &QueueStore, position_ms: u64) -> bool {
        if store.state().current_entry().is_none() {
            return false;
        }
        if let Err(e) = self.engine.seek(position_ms) {
            warn!("Engine failed to seek to {}ms: {}", position_ms, e);
            return false;
        }
        true
    }

    /// Set the output volume, clamped to 0.0..=1.0
    pub fn set_volume(&mut self, level: f32) -> f32 {
        let level = if level.is_finite() { level.clamp(0.0, 1.0) } else { self.volume };
        self.volume = level;
        if let Err(e) = self.engine.set_volume(level) {
            warn!("Engine failed to set volume {:.2}: {}", level, e);
        }
        level
    }

    /// Switch shuffle on or off. Turning it off ends the shuffle session.
    pub fn set_shuffle(&mut self, store: &mut QueueStore, enabled: bool) {
        store.set_shuffle_mode(enabled);
        if !enabled {
            self.shuffle.reset();
        }
    }

    pub fn toggle_shuffle(&mut self, store: &mut QueueStore) -> bool {
        let enabled = !store.state().shuffle_mode();
        self.set_shuffle(store, enabled);
        enabled
    }

    /// Remove an entry and, if it was the one playing, continue with the
    /// entry that slid into its slot. Nothing left to play pauses the
    /// engine.
    pub fn remove_and_continue(
        &mut self,
        store: &mut QueueStore,
        queue_id: &QueueId,
    ) -> Option<QueueEntry> {
        let removed_index = store.state().position_of(queue_id)?;
        let was_current = store.state().current_index() == Some(removed_index);
        let was_playing = self.engine.is_playing();

        let removed = store.remove_from_queue(queue_id)?;
        if !was_current {
            return Some(removed);
        }
        self.loaded = None;

        if was_playing {
            let len = store.state().len();
            let follow_up = if removed_index < len {
                Some(removed_index)
            } else if store.state().repeat_mode() == RepeatMode::All && len > 0 {
                Some(0)
            } else {
                None
            };

            match follow_up {
                Some(index) => self.play_index(store, index),
                None => self.pause(store),
            }
        }
        Some(removed)
    }

    fn shuffle_target(&mut self, store: &QueueStore, direction: Direction) -> Option<usize> {
        let state = store.state();
        let current = state.current_index();
        match direction {
            Direction::Next => {
                let wrap = state.repeat_mode() == RepeatMode::All;
                self.shuffle.pick_next(state.entries(), current, wrap, &mut self.rng)
            }
            Direction::Previous => self
                .shuffle
                .pop_previous(state.entries(), current)
                .or_else(|| {
                    sequential_target(current, state.len(), direction, state.repeat_mode())
                }),
        }
    }

    /// Record the entry being left in the shuffle history
    fn leave_current(&mut self, store: &QueueStore) {
        if let Some(entry) = store.state().current_entry() {
            self.shuffle.push_history(entry.queue_id.clone());
        }
    }

    fn mark_played(&mut self, store: &QueueStore, index: usize) {
        if let Some(entry) = store.state().entry(index) {
            self.shuffle.mark_played(&entry.queue_id);
            self.loaded = Some(entry.queue_id.clone());
        }
    }

    fn play_index(&mut self, store: &mut QueueStore, index: usize) {
        let track = match store.state().entry(index) {
            Some(entry) => entry.track.clone(),
            None => return,
        };

        store.set_current_index(Some(index));
        self.mark_played(store, index);
        self.load(store, &track);
    }

    /// Issue the load unconditionally; a failure is logged and left to the
    /// user to retry or skip
    fn load(&mut self, store: &mut QueueStore, track: &Track) {
        info!("Now playing: {} - {}", track.display_title(), track.artist_name());
        if let Err(e) = self.engine.load_and_play(track) {
            error!("Engine failed to play '{}': {}", track.display_title(), e);
        }
        store.set_playing(self.engine.is_playing());
    }
}

/// Adjacent position ignoring shuffle, wrapping only under repeat-all.
/// With nothing current, "next" starts from the head.
fn sequential_target(
    current: Option<usize>,
    len: usize,
    direction: Direction,
    repeat_mode: RepeatMode,
) -> Option<usize> {
    if len == 0 {
        return None;
    }

    let adjacent = match (current, direction) {
        (Some(i), Direction::Next) if i + 1 < len => Some(i + 1),
        (Some(i), Direction::Previous) if i > 0 => Some(i - 1),
        (None, Direction::Next) => Some(0),
        _ => None,
    };

    adjacent.or(match (repeat_mode, direction) {
        (RepeatMode::All, Direction::Next) => Some(0),
        (RepeatMode::All, Direction::Previous) => Some(len - 1),
        _ => None,
    })
}
