use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use liab_flake::{FlakeError, RetryPolicy};
use liab_types::FlakeConfig;

use crate::error::{StoreError, StoreResult};

/// Settings for opening a [`Store`](crate::Store).
///
/// ```toml
/// path = "data/app.redb"
/// worker_id = 0
///
/// [flake]
/// epoch_ms = 1413370800000
///
/// [retry]
/// max_wait_ms = 5000
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file, created if absent.
    pub path: PathBuf,
    /// Worker tag embedded in every identifier this process issues.
    pub worker_id: u32,
    /// Identifier layout.
    pub flake: FlakeConfig,
    /// Ceilings on the generator's wait-and-retry loop.
    pub retry: RetryPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("liab.redb"),
            worker_id: 0,
            flake: FlakeConfig::default(),
            retry: RetryPolicy::unbounded(),
        }
    }
}

impl StoreConfig {
    /// Default settings for the database at `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> StoreResult<()> {
        self.flake.validate()?;
        let max = self.flake.max_worker_id();
        if self.worker_id > max {
            return Err(FlakeError::WorkerOutOfRange {
                worker_id: self.worker_id,
                max,
            }
            .into());
        }
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Read a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
