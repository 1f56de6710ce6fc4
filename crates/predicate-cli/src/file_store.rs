// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `ConfigStore` backed by a single JSON file given on the command line.

use std::fs;
use std::path::PathBuf;

use predicate_core::{ConfigError, ConfigStore, CONFIG_KEY};

/// Serves the predicate config key from one file; every other key is absent.
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    /// Store reading and writing `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigStore for FileConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        if key != CONFIG_KEY {
            return Err(ConfigError::NotFound);
        }
        match fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::NotFound),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        if key != CONFIG_KEY {
            return Err(ConfigError::Other(format!("unsupported config key `{key}`")));
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, data)?;
        Ok(())
    }
}
