use std::path::{Path, PathBuf};
use std::time::Duration;
use log::warn;
use serde::{Deserialize, Serialize};
use crate::error::ConfigError;
use crate::models::InsertPosition;

const APP_DIR: &str = "queue-player";

/// Queue player configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueueConfig {
    /// Where queue snapshots are stored
    pub data_directory: PathBuf,
    /// Snapshot key; the file is `<key>.json`
    pub storage_key: String,
    /// Bound of the shuffle "previous" history
    pub history_limit: usize,
    pub default_volume: f32,
    pub default_insert_position: InsertPosition,
    /// Fixed seed for a reproducible shuffle order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shuffle_seed: Option<u64>,
    /// Simulated length of tracks without a known duration
    pub fallback_track_ms: u64,
    pub slow_save_threshold_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            data_directory: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR),
            storage_key: "queue".to_string(),
            history_limit: 50,
            default_volume: 0.8,
            default_insert_position: InsertPosition::End,
            shuffle_seed: None,
            fallback_track_ms: 180_000,
            slow_save_threshold_ms: 50,
        }
    }
}

impl QueueConfig {
    pub fn fallback_track_duration(&self) -> Duration {
        Duration::from_millis(self.fallback_track_ms)
    }

    pub fn slow_save_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_save_threshold_ms)
    }

    /// Pull out-of-range values back into their valid ranges
    fn normalized(mut self) -> Self {
        self.history_limit = self.history_limit.max(1);
        self.default_volume = if self.default_volume.is_finite() {
            self.default_volume.clamp(0.0, 1.0)
        } else {
            QueueConfig::default().default_volume
        };
        if self.storage_key.trim().is_empty() {
            self.storage_key = QueueConfig::default().storage_key;
        }
        self
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    config: QueueConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Load from `<config dir>/queue-player/config.toml`. A corrupted file
    /// is reported and replaced by defaults in memory.
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path()?;
        Ok(Self::with_path(config_path))
    }

    /// Load from an explicit file
    pub fn with_path(config_path: PathBuf) -> Self {
        let config = match Self::load_config(&config_path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{} ({})", e.user_message(), config_path.display());
                QueueConfig::default()
            }
        };

        Self {
            config,
            config_path,
        }
    }

    pub fn get_config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn update_config<F>(&mut self, updater: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut QueueConfig),
    {
        updater(&mut self.config);
        self.config = self.config.clone().normalized();
        self.save_config()
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<(), ConfigError> {
        self.config.default_volume = volume.clamp(0.0, 1.0);
        self.save_config()
    }

    pub fn set_data_directory(&mut self, directory: PathBuf) -> Result<(), ConfigError> {
        self.config.data_directory = directory;
        self.save_config()
    }

    pub fn set_history_limit(&mut self, limit: usize) -> Result<(), ConfigError> {
        self.config.history_limit = limit.max(1);
        self.save_config()
    }

    pub fn set_default_insert_position(&mut self, position: InsertPosition) -> Result<(), ConfigError> {
        self.config.default_insert_position = position;
        self.save_config()
    }

    pub fn set_shuffle_seed(&mut self, seed: Option<u64>) -> Result<(), ConfigError> {
        self.config.shuffle_seed = seed;
        self.save_config()
    }

    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.config = QueueConfig::default();
        self.save_config()
    }

    fn get_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::ConfigDirNotFound)?
            .join(APP_DIR);

        std::fs::create_dir_all(&config_dir).map_err(ConfigError::IoError)?;

        Ok(config_dir.join("config.toml"))
    }

    fn load_config(path: &Path) -> Result<QueueConfig, ConfigError> {
        if !path.exists() {
            return Ok(QueueConfig::default());
        }

        let config_content = std::fs::read_to_string(path).map_err(ConfigError::IoError)?;

        let config: QueueConfig =
            toml::from_str(&config_content).map_err(ConfigError::DeserializationError)?;

        Ok(config.normalized())
    }

    fn save_config(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::IoError)?;
        }

        let config_content =
            toml::to_string_pretty(&self.config).map_err(ConfigError::SerializationError)?;

        std::fs::write(&self.config_path, config_content).map_err(ConfigError::IoError)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let config_manager = ConfigManager {
            config: QueueConfig::default(),
            config_path,
        };

        (config_manager, temp_dir)
    }

    #[test]
    fn test_queue_config_default() {
        let config = QueueConfig::default();

        assert_eq!(config.storage_key, "queue");
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.default_volume, 0.8);
        assert_eq!(config.default_insert_position, InsertPosition::End);
        assert_eq!(config.shuffle_seed, None);
        assert_eq!(config.fallback_track_duration(), Duration::from_secs(180));
        assert_eq!(config.slow_save_threshold(), Duration::from_millis(50));
        assert!(config.data_directory.to_string_lossy().contains("queue-player"));
    }

    #[test]
    fn test_save_and_load_config() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        config_manager.config.storage_key = "work".to_string();
        config_manager.config.shuffle_seed = Some(99);
        config_manager.config.default_insert_position = InsertPosition::Next;
        config_manager.save_config().unwrap();

        let loaded = ConfigManager::load_config(&config_manager.config_path).unwrap();
        assert_eq!(loaded, config_manager.config);
    }

    #[test]
    fn test_load_nonexistent_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigManager::load_config(&temp_dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, QueueConfig::default());
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "history_limit = 5\ndefault_insert_position = \"next\"\n").unwrap();

        let config = ConfigManager::load_config(&config_path).unwrap();
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.default_insert_position, InsertPosition::Next);
        assert_eq!(config.storage_key, "queue");
    }

    #[test]
    fn test_load_normalizes_out_of_range_values() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "history_limit = 0\ndefault_volume = 3.0\nstorage_key = \" \"\n").unwrap();

        let config = ConfigManager::load_config(&config_path).unwrap();
        assert_eq!(config.history_limit, 1);
        assert_eq!(config.default_volume, 1.0);
        assert_eq!(config.storage_key, "queue");
    }

    #[test]
    fn test_load_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        fs::write(&config_path, "invalid toml content [[[").unwrap();

        match ConfigManager::load_config(&config_path) {
            Err(ConfigError::DeserializationError(_)) => {}
            other => panic!("Expected DeserializationError, got {:?}", other),
        }
    }

    #[test]
    fn test_with_path_degrades_to_defaults_on_corruption() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "history_limit = \"many\"").unwrap();

        let manager = ConfigManager::with_path(config_path);
        assert_eq!(manager.get_config(), &QueueConfig::default());
    }

    #[test]
    fn test_update_config() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        config_manager
            .update_config(|config| {
                config.fallback_track_ms = 1_000;
                config.history_limit = 0;
            })
            .unwrap();

        assert_eq!(config_manager.config.fallback_track_ms, 1_000);
        assert_eq!(config_manager.config.history_limit, 1);

        let loaded = ConfigManager::load_config(&config_manager.config_path).unwrap();
        assert_eq!(loaded.fallback_track_ms, 1_000);
    }

    #[test]
    fn test_setters() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        config_manager.set_volume(1.5).unwrap();
        assert_eq!(config_manager.config.default_volume, 1.0);

        config_manager.set_history_limit(0).unwrap();
        assert_eq!(config_manager.config.history_limit, 1);

        config_manager.set_shuffle_seed(Some(7)).unwrap();
        config_manager.set_default_insert_position(InsertPosition::Next).unwrap();
        let dir = PathBuf::from("/custom/queue/dir");
        config_manager.set_data_directory(dir.clone()).unwrap();

        let loaded = ConfigManager::load_config(&config_manager.config_path).unwrap();
        assert_eq!(loaded.shuffle_seed, Some(7));
        assert_eq!(loaded.default_insert_position, InsertPosition::Next);
        assert_eq!(loaded.data_directory, dir);
    }

    #[test]
    fn test_reset_to_defaults() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();
        config_manager.config.storage_key = "other".to_string();
        config_manager.config.shuffle_seed = Some(1);

        config_manager.reset_to_defaults().unwrap();
        assert_eq!(config_manager.config, QueueConfig::default());
    }

    #[test]
    fn test_config_path_creation() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir.path().join("nested").join("config").join("config.toml");

        let config_manager = ConfigManager {
            config: QueueConfig::default(),
            config_path: nested_path.clone(),
        };
        config_manager.save_config().unwrap();

        assert!(nested_path.exists());
    }

    #[test]
    fn test_toml_format() {
        let config = QueueConfig {
            shuffle_seed: Some(1234),
            ..QueueConfig::default()
        };

        let toml_string = toml::to_string_pretty(&config).unwrap();
        assert!(toml_string.contains("storage_key = \"queue\""));
        assert!(toml_string.contains("history_limit = 50"));
        assert!(toml_string.contains("default_insert_position = \"end\""));
        assert!(toml_string.contains("shuffle_seed = 1234"));

        let without_seed = toml::to_string_pretty(&QueueConfig::default()).unwrap();
        assert!(!without_seed.contains("shuffle_seed"));
    }
}
