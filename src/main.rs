
use log::{error, info, warn};
use queue_player::cli::{CliApp, Commands, EntryRef, ParseError, PlaybackInfo, StatusDisplay};
use queue_player::config::ConfigManager;
use queue_player::error::{AppError, ErrorSeverity, QueueError};
use queue_player::models::{QueueId, RepeatMode};
use queue_player::playback::{PlaybackCoordinator, PlaybackEngine, SimulatedEngine};
use queue_player::queue::persistence::PersistenceAdapter;
use queue_player::queue::{JsonFileStore, MemoryStore, QueueStore};
use std::path::PathBuf;
use std::time::Duration;

/// Main application controller. Owns the single queue store, the
/// coordinator and its engine, and commits the queue once per command or
/// engine poll.
pub struct AppController {
    store: QueueStore,
    coordinator: PlaybackCoordinator<SimulatedEngine>,
    config_manager: ConfigManager,
    /// Queue id of the entry last announced as playing
    announced: Option<QueueId>,
}

impl AppController {
    /// Create a controller from command line options
    pub fn new(cli: &CliApp) -> Result<Self, AppError> {
        let config_manager = match &cli.config {
            Some(path) => ConfigManager::with_path(path.clone()),
            None => ConfigManager::new()?,
        };
        Ok(Self::with_config(config_manager, cli.data_dir.clone()))
    }

    /// Create a controller from a loaded configuration, optionally storing
    /// the snapshot somewhere other than the configured data directory
    pub fn with_config(config_manager: ConfigManager, data_dir: Option<PathBuf>) -> Self {
        let config = config_manager.get_config().clone();
        let directory = data_dir.unwrap_or_else(|| config.data_directory.clone());

        let adapter: Box<dyn PersistenceAdapter> =
            match JsonFileStore::new(directory.clone(), &config.storage_key) {
                Ok(store) => {
                    Box::new(store.with_slow_save_threshold(config.slow_save_threshold()))
                }
                Err(e) => {
                    warn!(
                        "Cannot use {} for the queue snapshot, keeping it in memory: {}",
                        directory.display(),
                        e
                    );
                    Box::new(MemoryStore::new())
                }
            };
        let store = QueueStore::open(adapter);

        let engine = SimulatedEngine::new(config.fallback_track_duration());
        let mut coordinator = match config.shuffle_seed {
            Some(seed) => PlaybackCoordinator::with_seed(engine, config.history_limit, seed),
            None => PlaybackCoordinator::new(engine, config.history_limit),
        };
        coordinator.set_volume(config.default_volume);

        info!("Application controller initialized with {} queued entries", store.state().len());

        Self {
            store,
            coordinator,
            config_manager,
            announced: None,
        }
    }

    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    pub fn coordinator(&self) -> &PlaybackCoordinator<SimulatedEngine> {
        &self.coordinator
    }

    /// Execute a single command and commit the queue once afterwards
    pub fn execute_command(&mut self, command: Commands) -> Result<(), AppError> {
        let result = self.apply_command(command);
        self.store.commit();
        self.announce_track_change();
        result
    }

    fn apply_command(&mut self, command: Commands) -> Result<(), AppError> {
        match command {
            Commands::Add { .. } => {
                let track = match command.track_to_add() {
                    Some(track) => track,
                    None => return Ok(()),
                };
                let position = command
                    .insert_position()
                    .unwrap_or(self.config_manager.get_config().default_insert_position);
                let title = track.display_title();
                let queue_id = self.store.add_to_queue(track, position);
                let row = self.store.state().position_of(&queue_id).map_or(0, |i| i + 1);
                println!("OK: Added '{}' at row {}", title, row);
            }
            Commands::Remove { entry } => {
                let queue_id = self.resolve_entry(&entry)?;
                if let Some(removed) = self.coordinator.remove_and_continue(&mut self.store, &queue_id) {
                    println!("OK: Removed '{}'", removed.track.display_title());
                }
            }
            Commands::Move { from, to } => {
                let from_index = self.row_to_index(from)?;
                let to_index = self.row_to_index(to)?;
                if self.store.reorder_queue(from_index, to_index) {
                    println!("OK: Moved row {} to row {}", from, to);
                }
            }
            Commands::Top { entry } => {
                let queue_id = self.resolve_entry(&entry)?;
                self.store.move_to_top(&queue_id);
                println!("OK: Moved to top");
            }
            Commands::Dedupe => {
                let removed = self.store.remove_duplicates();
                println!("OK: Removed {} duplicate(s)", removed);
            }
            Commands::Clear => {
                if self.coordinator.engine().is_playing() {
                    self.coordinator.pause(&mut self.store);
                }
                self.store.clear_queue();
                println!("OK: Queue cleared");
            }
            Commands::List => {
                StatusDisplay::display_queue(self.store.state());
            }
            Commands::Play { row } => {
                self.ensure_not_empty()?;
                match row {
                    Some(row) => {
                        let index = self.row_to_index(row)?;
                        self.coordinator.play_at(&mut self.store, index);
                    }
                    None => {
                        if !self.coordinator.resume(&mut self.store) {
                            self.coordinator.play_at(&mut self.store, 0);
                        }
                    }
                }
            }
            Commands::Next => {
                self.ensure_not_empty()?;
                if self.coordinator.next(&mut self.store).is_none() {
                    println!("End of queue");
                }
            }
            Commands::Prev => {
                self.ensure_not_empty()?;
                if self.coordinator.previous(&mut self.store).is_none() {
                    println!("Start of queue");
                }
            }
            Commands::Ended => {
                self.ensure_not_empty()?;
                if self.coordinator.on_engine_track_ended(&mut self.store).is_none() {
                    println!("Queue finished");
                }
            }
            Commands::Pause => {
                self.coordinator.pause(&mut self.store);
                println!("OK: Paused");
            }
            Commands::Resume => {
                if !self.coordinator.resume(&mut self.store) {
                    return Err(QueueError::NoCurrentTrack.into());
                }
                println!("OK: Resumed");
            }
            Commands::Seek { position } => {
                let current = self
                    .store
                    .state()
                    .current_track()
                    .ok_or(QueueError::NoCurrentTrack)?;
                let engine_duration = self.coordinator.engine().duration_ms();
                let duration = if engine_duration > 0 {
                    Some(Duration::from_millis(engine_duration))
                } else {
                    current.duration()
                };

                let position = CliApp::validate_seek_time(CliApp::parse_time(&position)?, duration)?;
                if self.coordinator.seek(&self.store, position.as_millis() as u64) {
                    println!("Seeked to: {}", queue_player::format_duration_ms(position.as_millis() as u64));
                } else {
                    println!("Seek ignored: nothing loaded");
                }
            }
            Commands::Volume { level } => {
                let volume = self.coordinator.set_volume(f32::from(level) / 100.0);
                self.config_manager.set_volume(volume)?;
                println!("OK: Volume {}%", level);
            }
            Commands::Repeat { mode } => {
                let mode = match mode {
                    Some(mode) => {
                        self.store.set_repeat_mode(mode);
                        mode
                    }
                    None => self.store.cycle_repeat_mode(),
                };
                println!("Repeat: {}", Self::describe_repeat(mode));
            }
            Commands::Shuffle { enabled } => {
                let enabled = match enabled {
                    Some(enabled) => {
                        self.coordinator.set_shuffle(&mut self.store, enabled);
                        enabled
                    }
                    None => self.coordinator.toggle_shuffle(&mut self.store),
                };
                println!("Shuffle: {}", if enabled { "on" } else { "off" });
            }
            Commands::Status => {
                StatusDisplay::display_full_status(self.store.state(), &self.playback_info());
            }
        }

        Ok(())
    }

    /// Dispatch pending engine notifications; commits if they changed the queue
    pub fn poll_engine(&mut self) -> usize {
        let handled = self.coordinator.pump_events(&mut self.store);
        if handled > 0 {
            self.store.commit();
            self.announce_track_change();
        }
        handled
    }

    fn playback_info(&self) -> PlaybackInfo {
        let engine = self.coordinator.engine();
        PlaybackInfo {
            is_playing: engine.is_playing(),
            progress_ms: engine.progress_ms(),
            duration_ms: engine.duration_ms(),
            volume: self.coordinator.volume(),
        }
    }

    fn announce_track_change(&mut self) {
        let current = if self.coordinator.engine().is_playing() {
            self.store.state().current_entry()
        } else {
            None
        };

        match current {
            Some(entry) if self.announced.as_ref() != Some(&entry.queue_id) => {
                println!(
                    "Now playing: {} - {}",
                    entry.track.display_title(),
                    entry.track.artist_name()
                );
                self.announced = Some(entry.queue_id.clone());
            }
            Some(_) => {}
            None => self.announced = None,
        }
    }

    fn describe_repeat(mode: RepeatMode) -> &'static str {
        match mode {
            RepeatMode::None => "off",
            RepeatMode::One => "current track",
            RepeatMode::All => "whole queue",
        }
    }

    fn ensure_not_empty(&self) -> Result<(), AppError> {
        if self.store.state().is_empty() {
            return Err(QueueError::EmptyQueue.into());
        }
        Ok(())
    }

    /// 1-based row to queue position
    fn row_to_index(&self, row: usize) -> Result<usize, AppError> {
        if row == 0 || row > self.store.state().len() {
            return Err(QueueError::InvalidRow { row }.into());
        }
        Ok(row - 1)
    }

    fn resolve_entry(&self, entry: &EntryRef) -> Result<QueueId, AppError> {
        let state = self.store.state();
        match entry {
            EntryRef::Row(row) => {
                let index = self.row_to_index(*row)?;
                state
                    .entry(index)
                    .map(|e| e.queue_id.clone())
                    .ok_or_else(|| QueueError::InvalidRow { row: *row }.into())
            }
            EntryRef::Id(prefix) => {
                let mut matches = state
                    .entries()
                    .iter()
                    .filter(|e| e.queue_id.as_str().starts_with(prefix.as_str()));

                match (matches.next(), matches.next()) {
                    (Some(entry), None) => Ok(entry.queue_id.clone()),
                    (Some(_), Some(_)) => Err(QueueError::AmbiguousId {
                        prefix: prefix.clone(),
                    }
                    .into()),
                    (None, _) => Err(QueueError::EntryNotFound {
                        queue_id: prefix.clone(),
                    }
                    .into()),
                }
            }
        }
    }

    /// Run interactive mode
    pub async fn run_interactive_mode(&mut self) -> Result<(), AppError> {
        println!("Queue Player v{}", env!("CARGO_PKG_VERSION"));
        println!("Type 'help' for available commands, 'exit' or 'quit' to quit.");
        println!();

        let shutdown_flag = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let shutdown_flag_clone = shutdown_flag.clone();

        if let Err(e) = ctrlc::set_handler(move || {
            println!("\nReceived interrupt signal. Shutting down gracefully...");
            shutdown_flag_clone.store(true, std::sync::atomic::Ordering::Relaxed);
        }) {
            warn!("Could not install Ctrl-C handler: {}", e);
        }

        // Stdin is read on a dedicated thread; the loop polls the engine every 100ms
        let mut interval = tokio::time::interval(Duration::from_millis(100));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match stdin.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if tx.send(line.trim().to_string()).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        let mut awaiting_input = false;

        loop {
            if shutdown_flag.load(std::sync::atomic::Ordering::Relaxed) {
                break;
            }

            if !awaiting_input {
                print!("> ");
                let _ = std::io::Write::flush(&mut std::io::stdout());
                awaiting_input = true;
            }

            tokio::select! {
                biased;

                line = rx.recv() => {
                    awaiting_input = false;
                    match line {
                        Some(line) => {
                            if line.is_empty() {
                                continue;
                            }
                            if line == "exit" || line == "quit" {
                                println!("Goodbye!");
                                break;
                            }
                            match CliApp::parse_command(&line) {
                                Ok(command) => {
                                    if let Err(e) = self.execute_command(command) {
                                        self.handle_error(&e);
                                    }
                                }
                                Err(ParseError::HelpRequested) => CliApp::display_help(),
                                Err(e) => {
                                    eprintln!("Error: {}", e);
                                    println!("Type 'help' for available commands.");
                                }
                            }
                        }
                        None => {
                            // EOF
                            println!();
                            break;
                        }
                    }
                }

                _ = interval.tick() => {
                    let had_current = self.store.state().current_index().is_some();
                    if self.poll_engine() > 0
                        && had_current
                        && !self.coordinator.engine().is_playing()
                    {
                        println!("\nQueue finished");
                        awaiting_input = false;
                    }
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Persist the queue and remember the volume for the next session
    pub fn shutdown(&mut self) {
        println!("Shutting down...");

        if self.coordinator.engine().is_playing() {
            self.coordinator.pause(&mut self.store);
        }
        self.store.commit();

        let volume = self.coordinator.volume();
        if let Err(e) = self.config_manager.update_config(|config| config.default_volume = volume) {
            warn!("Error saving configuration: {}", e);
        }
        info!("Shutdown complete");
    }

    /// Log the error at its severity and show it to the user
    fn handle_error(&self, error: &AppError) {
        let severity = error.severity();
        match severity {
            ErrorSeverity::Info => info!("{}", error),
            ErrorSeverity::Warning => warn!("{}", error),
            ErrorSeverity::Error | ErrorSeverity::Critical => error!("{}", error),
        }
        StatusDisplay::display_error(error);
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = queue_player::logging::init(log::LevelFilter::Warn) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let cli = CliApp::parse();

    let mut app = match AppController::new(&cli) {
        Ok(app) => app,
        Err(e) => {
            StatusDisplay::display_simple_error(&e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(command) => {
            if let Err(e) = app.execute_command(command) {
                app.handle_error(&e);
                std::process::exit(1);
            }
        }
        None => {
            if let Err(e) = app.run_interactive_mode().await {
                app.handle_error(&e);
                std::process::exit(1);
            }
        }
    }

    info!("Application shutdown complete");
}
