use thiserror::Error;

/// Top-level application error
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Playback engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("CLI parse error: {0}")]
    Parse(#[from] crate::cli::ParseError),
}

impl AppError {
    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            AppError::Persistence(err) => err.user_message(),
            AppError::Engine(err) => err.user_message(),
            AppError::Config(err) => err.user_message(),
            AppError::Queue(err) => err.user_message(),
            AppError::Parse(err) => format!("Command error: {}", err),
        }
    }

    /// Get suggested recovery actions for the error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            AppError::Persistence(err) => err.recovery_suggestions(),
            AppError::Engine(err) => err.recovery_suggestions(),
            AppError::Config(err) => err.recovery_suggestions(),
            AppError::Queue(err) => err.recovery_suggestions(),
            AppError::Parse(_) => vec!["Type 'help' to see available commands".to_string()],
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::Persistence(PersistenceError::Malformed(_)) => ErrorSeverity::Warning,
            AppError::Persistence(_) => ErrorSeverity::Error,
            AppError::Engine(_) => ErrorSeverity::Error,
            AppError::Config(_) => ErrorSeverity::Warning,
            AppError::Queue(QueueError::EmptyQueue | QueueError::NoCurrentTrack) => ErrorSeverity::Info,
            AppError::Queue(_) => ErrorSeverity::Warning,
            AppError::Parse(_) => ErrorSeverity::Info,
        }
    }
}

/// Error severity levels for logging and user feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }

    pub fn log_level(&self) -> log::Level {
        match self {
            ErrorSeverity::Info => log::Level::Info,
            ErrorSeverity::Warning => log::Level::Warn,
            ErrorSeverity::Error => log::Level::Error,
            ErrorSeverity::Critical => log::Level::Error,
        }
    }
}

/// Snapshot storage errors. Never escape `QueueStore`; they degrade to an
/// empty queue on load and to a log line on save.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed snapshot: {0}")]
    Malformed(String),
}

impl PersistenceError {
    pub fn user_message(&self) -> String {
        match self {
            PersistenceError::Io(err) => format!("Cannot access the saved queue: {}", err),
            PersistenceError::Serialization(err) => {
                format!("Saved queue could not be read or written: {}", err)
            }
            PersistenceError::Malformed(msg) => {
                format!("Saved queue is inconsistent and was discarded: {}", msg)
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            PersistenceError::Io(_) => vec![
                "Check permissions of the data directory".to_string(),
                "Ensure the disk is not full".to_string(),
            ],
            PersistenceError::Serialization(_) | PersistenceError::Malformed(_) => vec![
                "The queue starts empty; add tracks again".to_string(),
                "Delete the snapshot file to silence this warning".to_string(),
            ],
        }
    }
}

/// Errors reported by a playback engine command
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine command '{command}' failed: {reason}")]
    CommandFailed { command: String, reason: String },
}

impl EngineError {
    pub fn command_failed(command: &str, reason: impl Into<String>) -> Self {
        EngineError::CommandFailed {
            command: command.to_string(),
            reason: reason.into(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            EngineError::CommandFailed { command, reason } => {
                format!("Playback did not {}: {}", command, reason)
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            EngineError::CommandFailed { .. } => vec![
                "Retry with 'play'".to_string(),
                "Skip the track with 'next'".to_string(),
            ],
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::ConfigDirNotFound => {
                "Cannot find configuration directory - using default settings".to_string()
            }
            ConfigError::IoError(err) => format!("Cannot access configuration file: {}", err),
            ConfigError::SerializationError(_) => "Cannot save configuration settings".to_string(),
            ConfigError::DeserializationError(_) => {
                "Configuration file is corrupted - using default settings".to_string()
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ConfigError::ConfigDirNotFound => vec![
                "Check that your home directory is accessible".to_string(),
            ],
            ConfigError::IoError(_) => vec![
                "Check file permissions for ~/.config/queue-player/".to_string(),
            ],
            ConfigError::SerializationError(_) => vec![
                "Try resetting configuration to defaults".to_string(),
            ],
            ConfigError::DeserializationError(_) => vec![
                "Delete the configuration file to reset to defaults".to_string(),
                "Check the configuration file for syntax errors".to_string(),
            ],
        }
    }
}

/// Caller-facing queue errors raised by the CLI layer. Queue mutations
/// themselves absorb invalid input as no-ops.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue is empty")]
    EmptyQueue,

    #[error("Invalid row: {row}")]
    InvalidRow { row: usize },

    #[error("No queue entry with id {queue_id}")]
    EntryNotFound { queue_id: String },

    #[error("Queue id prefix '{prefix}' matches several entries")]
    AmbiguousId { prefix: String },

    #[error("No current track")]
    NoCurrentTrack,
}

impl QueueError {
    pub fn user_message(&self) -> String {
        match self {
            QueueError::EmptyQueue => "No tracks in queue - add some first".to_string(),
            QueueError::InvalidRow { row } => {
                format!("Row {} is not valid for the current queue", row)
            }
            QueueError::EntryNotFound { queue_id } => {
                format!("Queue entry '{}' is no longer in the queue", queue_id)
            }
            QueueError::AmbiguousId { prefix } => {
                format!("'{}' matches more than one queue entry", prefix)
            }
            QueueError::NoCurrentTrack => "Nothing is playing right now".to_string(),
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            QueueError::EmptyQueue => vec!["Use 'add <id> <title>' to add a track".to_string()],
            QueueError::InvalidRow { .. } | QueueError::EntryNotFound { .. } => vec![
                "Use 'list' to see the current queue".to_string(),
                "Rows start from 1".to_string(),
            ],
            QueueError::AmbiguousId { .. } => vec![
                "Type more characters of the queue id".to_string(),
                "Or refer to the entry by its row number".to_string(),
            ],
            QueueError::NoCurrentTrack => vec!["Start playback with 'play <row>'".to_string()],
        }
    }
}
