pub mod coordinator;
pub mod shuffle;
pub mod simulated;

use crate::error::EngineError;
use crate::models::Track;

pub use coordinator::PlaybackCoordinator;
pub use shuffle::ShuffleState;
pub use simulated::SimulatedEngine;

/// Core trait for the playback engine the coordinator drives.
///
/// Commands are fire-and-forget: the engine runs its own pipeline and the
/// coordinator never waits on it. A new `load_and_play` supersedes any load
/// still in flight.
pub trait PlaybackEngine: Send {
    /// Load a track and start playing it immediately
    fn load_and_play(&mut self, track: &Track) -> Result<(), EngineError>;

    /// Pause current playback
    fn pause(&mut self) -> Result<(), EngineError>;

    /// Resume paused playback
    fn resume(&mut self) -> Result<(), EngineError>;

    /// Seek within the loaded track
    fn seek(&mut self, position_ms: u64) -> Result<(), EngineError>;

    /// Set the output volume (0.0 to 1.0)
    fn set_volume(&mut self, level: f32) -> Result<(), EngineError>;

    fn is_playing(&self) -> bool;

    /// Position within the loaded track
    fn progress_ms(&self) -> u64;

    /// Next pending notification, if any. Engines without notifications
    /// never report one.
    fn poll_event(&mut self) -> Option<EngineEvent> {
        None
    }
}

/// Notifications an engine reports back to the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// The loaded track reached its natural end. Pausing never produces this.
    TrackEnded,
    /// A remote control (media key, lock screen) asked to skip
    SkipRequested(Direction),
    /// The engine's playing flag changed on its own
    PlayingChanged(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Why the coordinator is advancing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceCause {
    /// Natural end of the current track; repeat-one replays
    TrackEnded,
    /// Explicit user skip; always moves
    Manual,
}
