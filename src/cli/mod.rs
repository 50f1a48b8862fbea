use crate::models::{InsertPosition, RepeatMode, Track};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub mod status;
pub use status::{PlaybackInfo, StatusDisplay};

/// Media playback queue CLI
#[derive(Debug, Parser)]
#[command(name = "qplay")]
#[command(about = "A persistent media playback queue with repeat and shuffle")]
#[command(version)]
pub struct CliApp {
    /// Configuration file (defaults to <config dir>/queue-player/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the queue snapshot, overriding the configuration
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Commands {
    /// Add a track to the queue
    Add {
        /// Insert right after the current track
        #[arg(long)]
        next: bool,
        /// Append to the end, overriding the configured default
        #[arg(long, conflicts_with = "next")]
        end: bool,
        #[arg(long)]
        artist: Option<String>,
        #[arg(long)]
        album: Option<String>,
        /// Track length in milliseconds
        #[arg(long)]
        duration_ms: Option<u64>,
        /// Catalog id of the track
        id: String,
        /// Display title
        title: String,
    },
    /// Remove an entry (row number or queue id prefix)
    Remove { entry: EntryRef },
    /// Move the entry at one row to another (rows start at 1)
    Move { from: usize, to: usize },
    /// Move an entry to the head of the queue
    Top { entry: EntryRef },
    /// Drop later duplicates of the same track
    Dedupe,
    /// Remove every entry
    Clear,
    /// List the queue
    List,
    /// Play a row, or resume/start the current track
    Play { row: Option<usize> },
    /// Skip to the next track
    Next,
    /// Go back to the previous track
    #[command(alias = "previous")]
    Prev,
    /// Report that the current track finished playing
    Ended,
    /// Pause playback
    Pause,
    /// Resume playback
    Resume,
    /// Seek to a time position
    Seek {
        /// Time offset (e.g., "1:30", "90", "90s")
        position: String,
    },
    /// Set playback volume (0-100)
    Volume { level: u8 },
    /// Show or set the repeat mode; without a mode it cycles none -> all -> one
    Repeat { mode: Option<RepeatMode> },
    /// Show or set shuffle; without a value it toggles
    Shuffle {
        #[arg(value_parser = parse_switch)]
        enabled: Option<bool>,
    },
    /// Display now playing and queue summary
    Status,
}

impl Commands {
    /// Whether the command reads state only
    pub fn is_read_only(&self) -> bool {
        matches!(self, Commands::List | Commands::Status)
    }

    /// Build the track described by an `add` command
    pub fn track_to_add(&self) -> Option<Track> {
        match self {
            Commands::Add {
                id,
                title,
                artist,
                album,
                duration_ms,
                ..
            } => {
                let mut track = Track::new(id.clone(), title.clone());
                track.artist = artist.clone();
                track.album = album.clone();
                track.duration_ms = *duration_ms;
                Some(track)
            }
            _ => None,
        }
    }

    /// Insert position for an `add` command, `None` meaning the configured default
    pub fn insert_position(&self) -> Option<InsertPosition> {
        match self {
            Commands::Add { next: true, .. } => Some(InsertPosition::Next),
            Commands::Add { end: true, .. } => Some(InsertPosition::End),
            _ => None,
        }
    }
}

/// How a command names a queue entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryRef {
    /// 1-based row as shown by `list`
    Row(usize),
    /// Queue id or a unique prefix of it
    Id(String),
}

impl FromStr for EntryRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty entry reference".to_string());
        }
        if s.chars().all(|c| c.is_ascii_digit()) && s.len() < 6 {
            return match s.parse::<usize>() {
                Ok(0) | Err(_) => Err(format!("invalid row '{}', rows start at 1", s)),
                Ok(row) => Ok(EntryRef::Row(row)),
            };
        }
        Ok(EntryRef::Id(s.to_lowercase()))
    }
}

fn parse_switch(s: &str) -> Result<bool, String> {
    match s.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(format!("expected on or off, got '{}'", other)),
    }
}

impl CliApp {
    /// Parse command line arguments
    pub fn parse() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// Split an interactive line into words, honoring double quotes
    pub fn split_args(input: &str) -> Result<Vec<String>, ParseError> {
        let mut args = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut has_token = false;

        for c in input.trim().chars() {
            match c {
                '"' => {
                    in_quotes = !in_quotes;
                    has_token = true;
                }
                c if c.is_whitespace() && !in_quotes => {
                    if has_token {
                        args.push(std::mem::take(&mut current));
                        has_token = false;
                    }
                }
                c => {
                    current.push(c);
                    has_token = true;
                }
            }
        }

        if in_quotes {
            return Err(ParseError::UnterminatedQuote {
                input: input.trim().to_string(),
            });
        }
        if has_token {
            args.push(current);
        }
        Ok(args)
    }

    /// Parse command from string (for interactive mode)
    pub fn parse_command(input: &str) -> Result<Commands, ParseError> {
        let args = Self::split_args(input)?;
        if args.is_empty() {
            return Err(ParseError::EmptyCommand);
        }

        let rest = &args[1..];
        match args[0].to_lowercase().as_str() {
            "add" => Self::parse_add(rest),
            "remove" | "rm" => Ok(Commands::Remove {
                entry: Self::parse_entry("remove", rest)?,
            }),
            "move" | "mv" => {
                let from = Self::parse_row("move", "from", rest.first())?;
                let to = Self::parse_row("move", "to", rest.get(1))?;
                Ok(Commands::Move { from, to })
            }
            "top" => Ok(Commands::Top {
                entry: Self::parse_entry("top", rest)?,
            }),
            "dedupe" => Ok(Commands::Dedupe),
            "clear" => Ok(Commands::Clear),
            "list" | "ls" => Ok(Commands::List),
            "play" => match rest.first() {
                Some(_) => Ok(Commands::Play {
                    row: Some(Self::parse_row("play", "row", rest.first())?),
                }),
                None => Ok(Commands::Play { row: None }),
            },
            "next" => Ok(Commands::Next),
            "prev" | "previous" => Ok(Commands::Prev),
            "ended" => Ok(Commands::Ended),
            "pause" => Ok(Commands::Pause),
            "resume" => Ok(Commands::Resume),
            "seek" => match rest.first() {
                Some(position) => Ok(Commands::Seek {
                    position: position.clone(),
                }),
                None => Err(ParseError::MissingArgument {
                    command: "seek".to_string(),
                    argument: "position".to_string(),
                }),
            },
            "volume" | "vol" => match rest.first() {
                Some(value) => match value.parse::<u8>() {
                    Ok(level) if level <= 100 => Ok(Commands::Volume { level }),
                    Ok(_) => Err(ParseError::InvalidArgument {
                        argument: "volume level".to_string(),
                        value: value.clone(),
                        expected: "0-100".to_string(),
                    }),
                    Err(_) => Err(ParseError::InvalidArgument {
                        argument: "volume level".to_string(),
                        value: value.clone(),
                        expected: "number 0-100".to_string(),
                    }),
                },
                None => Err(ParseError::MissingArgument {
                    command: "volume".to_string(),
                    argument: "level".to_string(),
                }),
            },
            "repeat" => match rest.first() {
                Some(value) => value
                    .parse::<RepeatMode>()
                    .map(|mode| Commands::Repeat { mode: Some(mode) })
                    .map_err(|_| ParseError::InvalidArgument {
                        argument: "repeat mode".to_string(),
                        value: value.clone(),
                        expected: "none, one or all".to_string(),
                    }),
                None => Ok(Commands::Repeat { mode: None }),
            },
            "shuffle" => match rest.first() {
                Some(value) => parse_switch(value)
                    .map(|enabled| Commands::Shuffle {
                        enabled: Some(enabled),
                    })
                    .map_err(|_| ParseError::InvalidArgument {
                        argument: "shuffle".to_string(),
                        value: value.clone(),
                        expected: "on or off".to_string(),
                    }),
                None => Ok(Commands::Shuffle { enabled: None }),
            },
            "status" => Ok(Commands::Status),
            "help" => Err(ParseError::HelpRequested),
            _ => Err(ParseError::UnknownCommand {
                command: args[0].clone(),
            }),
        }
    }

    fn parse_add(args: &[String]) -> Result<Commands, ParseError> {
        let mut next = false;
        let mut end = false;
        let mut artist = None;
        let mut album = None;
        let mut duration_ms = None;
        let mut positional = Vec::new();

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--next" => next = true,
                "--end" => end = true,
                "--artist" => artist = Some(Self::flag_value("--artist", iter.next())?),
                "--album" => album = Some(Self::flag_value("--album", iter.next())?),
                "--duration-ms" => {
                    let value = Self::flag_value("--duration-ms", iter.next())?;
                    duration_ms = Some(value.parse::<u64>().map_err(|_| ParseError::InvalidArgument {
                        argument: "duration".to_string(),
                        value: value.clone(),
                        expected: "milliseconds".to_string(),
                    })?);
                }
                "--duration" => {
                    let value = Self::flag_value("--duration", iter.next())?;
                    duration_ms = Some(Self::parse_time(&value)?.as_millis() as u64);
                }
                flag if flag.starts_with("--") => {
                    return Err(ParseError::UnknownCommand {
                        command: format!("add {}", flag),
                    })
                }
                _ => positional.push(arg.clone()),
            }
        }

        if next && end {
            return Err(ParseError::InvalidArgument {
                argument: "position".to_string(),
                value: "--next --end".to_string(),
                expected: "only one of --next or --end".to_string(),
            });
        }

        let mut positional = positional.into_iter();
        let id = positional.next().ok_or_else(|| ParseError::MissingArgument {
            command: "add".to_string(),
            argument: "id".to_string(),
        })?;
        let title = positional.collect::<Vec<_>>().join(" ");
        if title.is_empty() {
            return Err(ParseError::MissingArgument {
                command: "add".to_string(),
                argument: "title".to_string(),
            });
        }

        Ok(Commands::Add {
            next,
            end,
            artist,
            album,
            duration_ms,
            id,
            title,
        })
    }

    fn flag_value(flag: &str, value: Option<&String>) -> Result<String, ParseError> {
        value.cloned().ok_or_else(|| ParseError::MissingArgument {
            command: "add".to_string(),
            argument: flag.to_string(),
        })
    }

    fn parse_entry(command: &str, args: &[String]) -> Result<EntryRef, ParseError> {
        let value = args.first().ok_or_else(|| ParseError::MissingArgument {
            command: command.to_string(),
            argument: "entry".to_string(),
        })?;
        value.parse::<EntryRef>().map_err(|expected| ParseError::InvalidArgument {
            argument: "entry".to_string(),
            value: value.clone(),
            expected,
        })
    }

    fn parse_row(command: &str, argument: &str, value: Option<&String>) -> Result<usize, ParseError> {
        let value = value.ok_or_else(|| ParseError::MissingArgument {
            command: command.to_string(),
            argument: argument.to_string(),
        })?;
        match value.parse::<usize>() {
            Ok(row) if row >= 1 => Ok(row),
            _ => Err(ParseError::InvalidArgument {
                argument: argument.to_string(),
                value: value.clone(),
                expected: "row number starting at 1".to_string(),
            }),
        }
    }

    /// Display help information
    pub fn display_help() {
        println!("Queue Player - Available Commands:");
        println!();
        println!("Queue:");
        println!("  add [--next|--end] [--artist A] [--album B] [--duration 3:20] <id> <title>");
        println!("  list              - Show the queue with row numbers");
        println!("  remove <entry>    - Remove by row or queue id prefix");
        println!("  move <from> <to>  - Move an entry between rows");
        println!("  top <entry>       - Move an entry to the head");
        println!("  dedupe            - Drop duplicate tracks");
        println!("  clear             - Empty the queue");
        println!();
        println!("Playback:");
        println!("  play [row]        - Play a row, or resume/start the current track");
        println!("  pause / resume    - Pause or resume playback");
        println!("  next / prev       - Skip forward or back");
        println!("  ended             - Treat the current track as finished");
        println!("  seek <time>       - Seek to position (e.g., '1:30', '90s')");
        println!("  volume <0-100>    - Set volume level");
        println!("  repeat [mode]     - none, one or all; cycles without a mode");
        println!("  shuffle [on|off]  - Set or toggle shuffle");
        println!("  status            - Show now playing and queue summary");
        println!();
        println!("General:");
        println!("  help              - Show this help message");
        println!("  exit, quit        - Exit the player");
    }

    /// Parse time string to Duration
    pub fn parse_time(time_str: &str) -> Result<Duration, ParseError> {
        let trimmed = time_str.trim();
        let invalid = || ParseError::InvalidTimeFormat {
            input: time_str.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid());
        }

        // "1:30", "1:30.5", "90", "90s"
        if trimmed.contains(':') {
            let parts: Vec<&str> = trimmed.split(':').collect();
            if parts.len() != 2 {
                return Err(invalid());
            }

            let minutes: u64 = parts[0].parse().map_err(|_| invalid())?;
            let seconds: f64 = parts[1].parse().map_err(|_| invalid())?;
            if !(0.0..60.0).contains(&seconds) {
                return Err(invalid());
            }

            Ok(Duration::from_secs_f64(minutes as f64 * 60.0 + seconds))
        } else {
            let seconds: f64 = trimmed
                .trim_end_matches('s')
                .parse()
                .map_err(|_| invalid())?;
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(invalid());
            }

            Ok(Duration::from_secs_f64(seconds))
        }
    }

    /// Validate seek position against track duration
    pub fn validate_seek_time(position: Duration, duration: Option<Duration>) -> Result<Duration, ParseError> {
        if let Some(track_duration) = duration {
            if position > track_duration {
                return Err(ParseError::SeekBeyondDuration {
                    position: position.as_secs_f64(),
                    duration: track_duration.as_secs_f64(),
                });
            }
        }
        Ok(position)
    }
}

/// Command parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },

    #[error("Missing argument for {command}: {argument}")]
    MissingArgument { command: String, argument: String },

    #[error("Invalid argument {argument}: got '{value}', expected {expected}")]
    InvalidArgument {
        argument: String,
        value: String,
        expected: String,
    },

    #[error("Unterminated quote in: {input}")]
    UnterminatedQuote { input: String },

    #[error("Invalid time format: {input}")]
    InvalidTimeFormat { input: String },

    #[error("Seek position {position:.2}s exceeds track duration {duration:.2}s")]
    SeekBeyondDuration { position: f64, duration: f64 },

    #[error("Help requested")]
    HelpRequested,
}

#[cfg(test)]
mod tests;
