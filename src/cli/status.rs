use std::fmt::Write as _;
use crate::error::{AppError, ErrorSeverity};
use crate::models::{format_duration_ms, QueueEntry};
use crate::queue::QueueState;

/// Playback figures reported by the engine, combined with the queue state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackInfo {
    pub is_playing: bool,
    pub progress_ms: u64,
    /// Length of the loaded track, 0 when unknown
    pub duration_ms: u64,
    pub volume: f32,
}

impl PlaybackInfo {
    /// Progress as a fraction (0.0 to 1.0)
    pub fn progress(&self) -> f32 {
        if self.duration_ms == 0 {
            0.0
        } else {
            (self.progress_ms as f32 / self.duration_ms as f32).clamp(0.0, 1.0)
        }
    }
}

/// Status display formatter for the CLI
pub struct StatusDisplay;

impl StatusDisplay {
    /// Display now playing, modes and queue summary
    pub fn display_full_status(state: &QueueState, playback: &PlaybackInfo) {
        print!("{}", Self::render_full_status(state, playback));
    }

    pub fn render_full_status(state: &QueueState, playback: &PlaybackInfo) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "┌─ Queue Status ──────────────────────────────────────────┐");

        match (state.current_index(), state.current_entry()) {
            (Some(index), Some(entry)) => {
                let track = &entry.track;
                let _ = writeln!(out, "│ Track: {}", Self::truncate(&track.display_title(), 50));
                let _ = writeln!(out, "│ Artist: {}", Self::truncate(&track.artist_name(), 49));
                if track.album.is_some() {
                    let _ = writeln!(out, "│ Album: {}", Self::truncate(&track.album_name(), 50));
                }
                let _ = writeln!(out, "│ Position in queue: {} of {}", index + 1, state.len());
                let _ = writeln!(out, "│");
                let _ = writeln!(out, "│ Status: {}", Self::format_playing(playback.is_playing));
                if playback.duration_ms > 0 {
                    let _ = writeln!(
                        out,
                        "│ Time: {} / {}",
                        format_duration_ms(playback.progress_ms),
                        format_duration_ms(playback.duration_ms)
                    );
                    let _ = writeln!(
                        out,
                        "│ Progress: [{}] {:.1}%",
                        Self::create_progress_bar(playback.progress(), 40),
                        playback.progress() * 100.0
                    );
                }
            }
            _ => {
                let _ = writeln!(out, "│ Nothing playing");
                let _ = writeln!(out, "│ Status: {}", Self::format_playing(playback.is_playing));
            }
        }

        let _ = writeln!(out, "│");
        let _ = writeln!(
            out,
            "│ Repeat: {} | Shuffle: {} | Volume: {}%",
            state.repeat_mode(),
            if state.shuffle_mode() { "on" } else { "off" },
            (playback.volume * 100.0).round() as u8
        );
        let _ = writeln!(
            out,
            "│ Queue: {} tracks ({}), {} up next",
            state.len(),
            format_duration_ms(state.total_duration_ms()),
            state.upcoming().len()
        );
        let _ = writeln!(out, "└─────────────────────────────────────────────────────────┘");
        out
    }

    /// Display the queue with 1-based rows, marking the current entry
    pub fn display_queue(state: &QueueState) {
        print!("{}", Self::render_queue(state));
    }

    pub fn render_queue(state: &QueueState) -> String {
        if state.is_empty() {
            return "Queue is empty\n".to_string();
        }

        let mut out = String::new();
        for (index, entry) in state.entries().iter().enumerate() {
            let marker = if state.current_index() == Some(index) { "▶" } else { " " };
            let _ = writeln!(out, "{} {:>3}. {}", marker, index + 1, Self::format_entry(entry));
        }
        out
    }

    /// One-line entry description: title, artist, duration and short queue id
    pub fn format_entry(entry: &QueueEntry) -> String {
        let track = &entry.track;
        let duration = track
            .duration_ms
            .map(format_duration_ms)
            .unwrap_or_else(|| "-:--".to_string());
        format!(
            "{} - {} [{}] ({})",
            Self::truncate(&track.display_title(), 40),
            Self::truncate(&track.artist_name(), 25),
            duration,
            Self::short_id(entry)
        )
    }

    /// First 8 characters of the queue id, enough to address an entry
    pub fn short_id(entry: &QueueEntry) -> String {
        entry.queue_id.as_str().chars().take(8).collect()
    }

    /// Display error message with formatting and recovery suggestions
    pub fn display_error(error: &AppError) {
        eprint!("{}", Self::render_error(error));
    }

    pub fn render_error(error: &AppError) -> String {
        let severity = error.severity();
        let severity_icon = match severity {
            ErrorSeverity::Info => "ℹ",
            ErrorSeverity::Warning => "⚠",
            ErrorSeverity::Error => "✗",
            ErrorSeverity::Critical => "🔥",
        };

        let mut out = String::new();
        let _ = writeln!(
            out,
            "┌─ {} {} ─────────────────────────────────────────────────┐",
            severity_icon,
            severity.as_str()
        );

        for line in Self::wrap_text(&error.user_message(), 55) {
            let _ = writeln!(out, "│ {}", line);
        }

        let suggestions = error.recovery_suggestions();
        if !suggestions.is_empty() {
            let _ = writeln!(out, "│");
            let _ = writeln!(out, "│ Suggestions:");
            for suggestion in suggestions.iter().take(3) {
                for line in Self::wrap_text(&format!("• {}", suggestion), 53) {
                    let _ = writeln!(out, "│   {}", line);
                }
            }
        }

        let _ = writeln!(out, "└─────────────────────────────────────────────────────────┘");
        out
    }

    /// Display a simple error message for non-interactive contexts
    pub fn display_simple_error(error: &AppError) {
        eprintln!("[{}] {}", error.severity().as_str(), error.user_message());

        if let Some(suggestion) = error.recovery_suggestions().first() {
            eprintln!("Suggestion: {}", suggestion);
        }
    }

    /// Wrap text to fit within specified width
    fn wrap_text(text: &str, width: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current_line = String::new();

        for word in text.split_whitespace() {
            if current_line.is_empty() {
                current_line = word.to_string();
            } else if current_line.chars().count() + word.chars().count() + 1 <= width {
                current_line.push(' ');
                current_line.push_str(word);
            } else {
                lines.push(current_line);
                current_line = word.to_string();
            }
        }

        if !current_line.is_empty() {
            lines.push(current_line);
        }
        lines
    }

    /// Truncate string to fit display width
    pub fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len || max_len <= 3 {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len - 3).collect();
            format!("{}...", kept)
        }
    }

    /// Create a progress bar string
    pub fn create_progress_bar(progress: f32, width: usize) -> String {
        let filled = ((progress.clamp(0.0, 1.0) * width as f32) as usize).min(width);
        format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
    }

    pub fn format_playing(is_playing: bool) -> &'static str {
        if is_playing {
            "▶ Playing"
        } else {
            "⏸ Paused"
        }
    }
}
