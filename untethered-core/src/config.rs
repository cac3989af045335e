//! Global untethered configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::backend::{IdentityProvider, LocalBackend, Persistence};
use crate::constants::{DEFAULT_HISTORY_PAGE_SIZE, DEFAULT_ROLLOVER_CHECK};
use crate::error::{UntetheredError, UntetheredResult};

static DEFAULT_DATA_DIR: &str = "~/.untethered";

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn is_default_data_dir(p: &PathBuf) -> bool {
    *p == default_data_dir()
}

fn is_default_persistence(p: &Persistence) -> bool {
    *p == Persistence::default()
}

fn default_rollover_check() -> String {
    DEFAULT_ROLLOVER_CHECK.to_string()
}

fn is_default_rollover_check(s: &String) -> bool {
    s == DEFAULT_ROLLOVER_CHECK
}

fn default_history_page_size() -> usize {
    DEFAULT_HISTORY_PAGE_SIZE
}

fn is_default_history_page_size(n: &usize) -> bool {
    *n == DEFAULT_HISTORY_PAGE_SIZE
}

/// Global configuration at ~/.config/untethered/config.toml
///
/// Every key can be overridden with an `UNTETHERED_` environment variable,
/// e.g. `UNTETHERED_DATA_DIR=/tmp/untethered`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UntetheredConfig {
    #[serde(default = "default_data_dir", skip_serializing_if = "is_default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default, skip_serializing_if = "is_default_persistence")]
    pub persistence: Persistence,

    #[serde(
        default = "default_rollover_check",
        skip_serializing_if = "is_default_rollover_check"
    )]
    pub rollover_check: String,

    #[serde(
        default = "default_history_page_size",
        skip_serializing_if = "is_default_history_page_size"
    )]
    pub history_page_size: usize,
}

impl Default for UntetheredConfig {
    fn default() -> Self {
        UntetheredConfig {
            data_dir: default_data_dir(),
            persistence: Persistence::default(),
            rollover_check: default_rollover_check(),
            history_page_size: default_history_page_size(),
        }
    }
}

impl UntetheredConfig {
    pub fn config_path() -> UntetheredResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| UntetheredError::Config("Could not determine config directory".into()))?
            .join("untethered");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the global config path, writing a commented default file
    /// first if none exists.
    pub fn load() -> UntetheredResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> UntetheredResult<Self> {
        let config: UntetheredConfig = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("UNTETHERED"))
            .build()
            .map_err(|e| UntetheredError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| UntetheredError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> UntetheredResult<()> {
        if self.history_page_size == 0 {
            return Err(UntetheredError::Config(
                "history_page_size must be at least 1".into(),
            ));
        }
        self.rollover_every()?;
        Ok(())
    }

    /// Save the current config to ~/.config/untethered/config.toml
    pub fn save(&self) -> UntetheredResult<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> UntetheredResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| UntetheredError::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                UntetheredError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, content)
            .map_err(|e| UntetheredError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> UntetheredResult<()> {
        let contents = format!(
            "\
# untethered configuration

# Where goals, bookings, resources and uploads are stored:
# data_dir = \"{DEFAULT_DATA_DIR}\"

# Stay signed in across runs (\"durable\") or only for one run (\"session\"):
# persistence = \"durable\"

# How often `goals --watch` checks for a new month:
# rollover_check = \"{DEFAULT_ROLLOVER_CHECK}\"

# Past months shown per page of goal history:
# history_page_size = {DEFAULT_HISTORY_PAGE_SIZE}
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                UntetheredError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| UntetheredError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    pub fn data_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.data_dir.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    pub fn rollover_every(&self) -> UntetheredResult<Duration> {
        humantime::parse_duration(&self.rollover_check).map_err(|e| {
            UntetheredError::Config(format!(
                "Invalid rollover_check '{}': {e}",
                self.rollover_check
            ))
        })
    }

    /// Open the local backend at `data_dir` with the configured persistence.
    pub fn open_backend(&self) -> UntetheredResult<LocalBackend> {
        let backend = LocalBackend::open(self.data_path())?;
        backend.set_persistence(self.persistence)?;
        Ok(backend)
    }
}
