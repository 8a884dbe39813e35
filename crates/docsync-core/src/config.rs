//! User configuration, read from `<config dir>/docsync/config.toml`.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coordinator::CoordinatorSettings;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub autosave_delay_ms: u64,
    pub saved_status_ms: u64,
    pub save_failed_status_ms: u64,
    pub autosave_failed_status_ms: u64,
    pub watch: WatchConfig,
}

/// `[watch]` section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        let settings = CoordinatorSettings::default();
        Self {
            autosave_delay_ms: millis(settings.autosave_delay),
            saved_status_ms: millis(settings.saved_status),
            save_failed_status_ms: millis(settings.save_failed_status),
            autosave_failed_status_ms: millis(settings.autosave_failed_status),
            watch: WatchConfig::default(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// `~/.config/docsync/config.toml` or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("docsync").join(CONFIG_FILE))
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Load from [`Self::default_path`], falling back to defaults when there
    /// is no config directory.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::default_path().map_or_else(|| Ok(Self::default()), |path| Self::load(&path))
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub const fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            autosave_delay: Duration::from_millis(self.autosave_delay_ms),
            saved_status: Duration::from_millis(self.saved_status_ms),
            save_failed_status: Duration::from_millis(self.save_failed_status_ms),
            autosave_failed_status: Duration::from_millis(self.autosave_failed_status_ms),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
