//! TOML configuration for store setup.
//!
//! ```toml
//! [cache]
//! id_to_term_cache = 100000
//! term_to_id_cache = 100000
//! miss_cache = 10000
//!
//! [index]
//! promotion_threshold = 16
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::catalog::DictOptions;
use crate::storage::index::DEFAULT_PROMOTION_THRESHOLD;
use crate::storage::StoreOptions;

/// Environment variable naming a config file for [`StoreConfig::load_default`].
pub const CONFIG_ENV: &str = "PENUMBRA_CONFIG";

/// Store settings read from TOML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Dictionary cache capacities.
    #[serde(default)]
    pub cache: DictOptions,
    /// Triple index tuning.
    #[serde(default)]
    pub index: IndexSection,
}

/// The `[index]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct IndexSection {
    /// Bunch size at which array storage switches to hashed storage.
    pub promotion_threshold: usize,
}

impl Default for IndexSection {
    fn default() -> Self {
        Self {
            promotion_threshold: DEFAULT_PROMOTION_THRESHOLD,
        }
    }
}

impl StoreConfig {
    /// Reads and parses the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the file named by `PENUMBRA_CONFIG`, then the per-user file from
    /// [`default_config_path`]; falls back to defaults when neither exists.
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Parses configuration from an in-memory TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|source| ConfigError::Parse { path: None, source })?;
        config.validate()?;
        Ok(config)
    }

    /// Renders the configuration as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|source| ConfigError::Serialize { source })
    }

    /// Writes the configuration to `path`, creating parent directories.
    pub fn persist(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let serialized = self.to_toml_string()?;
        fs::write(path, serialized).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Copies the configured sizes onto `opts`.
    pub fn apply(&self, opts: StoreOptions) -> StoreOptions {
        opts.dict_options(self.cache)
            .promotion_threshold(self.index.promotion_threshold)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.index.promotion_threshold == 0 {
            return Err(ConfigError::Invalid {
                field: "index.promotion_threshold",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

/// `<config dir>/penumbra/store.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("penumbra").join("store.toml"))
}

/// Errors raised while loading or saving a [`StoreConfig`].
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read store config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse store config{}: {source}", describe_path(.path))]
    Parse {
        path: Option<PathBuf>,
        source: toml::de::Error,
    },
    #[error("failed to serialize store config: {source}")]
    Serialize { source: toml::ser::Error },
    #[error("failed to write store config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid store config value {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

fn describe_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" {}", p.display()))
        .unwrap_or_default()
}
