use std::collections::VecDeque;
use std::time::{Duration, Instant};
use log::{debug, trace};
use crate::error::EngineError;
use crate::models::Track;
use crate::playback::{EngineEvent, PlaybackEngine};

/// Wall-clock playback engine.
///
/// Produces no sound: it tracks position against the track's duration and
/// reports `TrackEnded` through `poll_event` once the position reaches the
/// end. Tracks without a duration use the fallback length.
#[derive(Debug)]
pub struct SimulatedEngine {
    loaded: Option<LoadedTrack>,
    /// Position at `last_update`
    position: Duration,
    last_update: Instant,
    playing: bool,
    volume: f32,
    fallback_duration: Duration,
    pending: VecDeque<EngineEvent>,
}

#[derive(Debug, Clone)]
struct LoadedTrack {
    id: String,
    duration: Duration,
}

impl SimulatedEngine {
    pub fn new(fallback_duration: Duration) -> Self {
        Self {
            loaded: None,
            position: Duration::ZERO,
            last_update: Instant::now(),
            playing: false,
            volume: 1.0,
            fallback_duration,
            pending: VecDeque::new(),
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Id of the loaded track
    pub fn loaded_track_id(&self) -> Option<&str> {
        self.loaded.as_ref().map(|t| t.id.as_str())
    }

    /// Duration of the loaded track
    pub fn duration_ms(&self) -> u64 {
        self.loaded
            .as_ref()
            .map(|t| t.duration.as_millis() as u64)
            .unwrap_or(0)
    }

    /// Queue a remote-control style notification
    pub fn push_event(&mut self, event: EngineEvent) {
        self.pending.push_back(event);
    }

    fn current_position(&self) -> Duration {
        let duration = match &self.loaded {
            Some(track) => track.duration,
            None => return Duration::ZERO,
        };

        let position = if self.playing {
            self.position.saturating_add(self.last_update.elapsed())
        } else {
            self.position
        };
        position.min(duration)
    }

    /// Fold elapsed time into `position` and detect the natural end
    fn update(&mut self) {
        let position = self.current_position();
        self.position = position;
        self.last_update = Instant::now();

        if let Some(track) = &self.loaded {
            if self.playing && position >= track.duration {
                debug!("Simulated track {} reached its end", track.id);
                self.playing = false;
                self.pending.push_back(EngineEvent::TrackEnded);
            }
        }
    }
}

impl PlaybackEngine for SimulatedEngine {
    fn load_and_play(&mut self, track: &Track) -> Result<(), EngineError> {
        let duration = track.duration().unwrap_or(self.fallback_duration);
        trace!("Simulated load of {} ({:?})", track.id, duration);

        // Supersedes whatever was loaded, including a pending end notification
        self.pending.retain(|e| *e != EngineEvent::TrackEnded);
        self.loaded = Some(LoadedTrack {
            id: track.id.clone(),
            duration,
        });
        self.position = Duration::ZERO;
        self.last_update = Instant::now();
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), EngineError> {
        self.update();
        self.playing = false;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), EngineError> {
        if self.loaded.is_none() {
            return Err(EngineError::command_failed("resume", "nothing loaded"));
        }
        self.update();
        self.playing = true;
        Ok(())
    }

    fn seek(&mut self, position_ms: u64) -> Result<(), EngineError> {
        let duration = match &self.loaded {
            Some(track) => track.duration,
            None => return Err(EngineError::command_failed("seek", "nothing loaded")),
        };

        let position = Duration::from_millis(position_ms);
        if position > duration {
            return Err(EngineError::command_failed(
                "seek",
                format!(
                    "position {:.2}s exceeds track duration {:.2}s",
                    position.as_secs_f64(),
                    duration.as_secs_f64()
                ),
            ));
        }

        self.position = position;
        self.last_update = Instant::now();
        Ok(())
    }

    fn set_volume(&mut self, level: f32) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&level) {
            return Err(EngineError::command_failed(
                "set volume",
                format!("level {} outside 0.0..=1.0", level),
            ));
        }
        self.volume = level;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn progress_ms(&self) -> u64 {
        self.current_position().as_millis() as u64
    }

    fn poll_event(&mut self) -> Option<EngineEvent> {
        if self.pending.is_empty() {
            self.update();
        }
        self.pending.pop_front()
    }
}
