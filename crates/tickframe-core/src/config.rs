//! Dataset configuration.
//!
//! Exactly one option is recognized:
//!
//! | Key | Meaning | Default |
//! |-----|---------|---------|
//! | `DATA_CACHE` | Directory holding the per-symbol cache files | `$DATA_CACHE`, then `$HOME/.tickframe/cache` |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tickframe_warehouse::{StoreConfig, DATA_CACHE_ENV};

use crate::FrameError;

/// Keys accepted by [`FrameConfig::from_mapping`].
pub const RECOGNIZED_OPTIONS: [&str; 1] = [DATA_CACHE_ENV];

/// Explicit configuration passed to a [`Dataset`](crate::Dataset).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameConfig {
    pub store: StoreConfig,
}

impl FrameConfig {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: StoreConfig::new(cache_dir),
        }
    }

    /// Build a configuration from a key/value mapping.
    ///
    /// A missing `DATA_CACHE` falls back to the process default.
    ///
    /// # Errors
    /// Returns [`FrameError::Configuration`] for unknown keys or an empty
    /// cache location.
    pub fn from_mapping(options: &BTreeMap<String, String>) -> Result<Self, FrameError> {
        if let Some(unknown) = options
            .keys()
            .find(|key| !RECOGNIZED_OPTIONS.contains(&key.as_str()))
        {
            return Err(FrameError::configuration(format!(
                "unrecognized option '{unknown}', expected one of {RECOGNIZED_OPTIONS:?}"
            )));
        }

        match options.get(DATA_CACHE_ENV) {
            Some(dir) if dir.trim().is_empty() => Err(FrameError::configuration(format!(
                "{DATA_CACHE_ENV} must not be empty"
            ))),
            Some(dir) => Ok(Self::new(dir.trim())),
            None => Ok(Self::default()),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        self.store.cache_dir.as_path()
    }
}
