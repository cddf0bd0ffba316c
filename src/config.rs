// Configuration file loading and CLI overrides

use crate::clock::Clock;
use crate::file_kv::FileKv;
use crate::kv::{KvStore, MemoryKv};
use crate::sqlite_kv::SqliteKv;
use crate::task::DISPLAY_FORMAT;
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const APP_DIR_NAME: &str = "todolist";
const CONFIG_FILE_NAME: &str = "config.yaml";
const SQLITE_FILE_NAME: &str = "todolist.db";

/// Which key-value backend holds the task lists
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Nothing survives the process
    Memory,
    /// One JSON file per key under the data directory
    #[default]
    File,
    /// Single SQLite database under the data directory
    Sqlite,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: Backend,
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub format: String,
    pub interval_ms: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            format: DISPLAY_FORMAT.to_string(),
            interval_ms: 1000,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub clock: ClockConfig,
}

/// A loaded config plus the error that forced a fallback to defaults, if any
#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<eyre::Report>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub backend: Option<Backend>,
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Directory the file and SQLite backends write into
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.storage.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or_else(|| eyre!("Could not determine a data directory"))
    }

    pub fn clock(&self) -> Result<Clock> {
        Clock::new(
            self.clock.format.clone(),
            Duration::from_millis(self.clock.interval_ms),
        )
        .context("Invalid clock settings")
    }

    /// Open the configured key-value backend
    pub fn open_backend(&self) -> Result<Box<dyn KvStore>> {
        debug!(backend = ?self.storage.backend, "Opening storage backend");
        let kv: Box<dyn KvStore> = match self.storage.backend {
            Backend::Memory => Box::new(MemoryKv::new()),
            Backend::File => Box::new(FileKv::open(self.data_dir()?)?),
            Backend::Sqlite => Box::new(SqliteKv::open(self.data_dir()?.join(SQLITE_FILE_NAME))?),
        };
        Ok(kv)
    }
}

/// Default location of the config file
pub fn config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or_else(|| eyre!("Could not determine a config directory"))
}

/// Load `path` (or the default location), falling back to defaults
///
/// A missing file is not an error. An unreadable or invalid file yields the
/// defaults together with the error so the caller can report it.
pub fn load_config_with_fallback(path: Option<&Path>) -> ConfigLoad {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match config_path() {
            Ok(path) => path,
            Err(err) => {
                return ConfigLoad {
                    config: Config::default(),
                    error: Some(err),
                };
            }
        },
    };
    load_config_with_fallback_from_path(&path)
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad { config, error: None },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content =
        std::fs::read_to_string(path).wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    // An empty file parses as YAML null
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&content).wrap_err_with(|| format!("Invalid YAML in {}", path.display()))
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(backend) = overrides.backend {
        merged.storage.backend = backend;
    }
    if let Some(dir) = overrides.data_dir.as_ref() {
        merged.storage.data_dir = Some(dir.clone());
    }
    merged
}
