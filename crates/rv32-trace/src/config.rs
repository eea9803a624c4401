use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Bad config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Address of the first word of a memory image
    pub fetch_base: u32,
    /// Keep a shadow register file from writeback records
    pub track_writeback: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            fetch_base: 0x0100_0000,
            track_writeback: true,
        }
    }
}

impl TraceConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply command-line flags on top of the file values. `base` replaces
    /// `fetch_base` when given; `reset_only` turns writeback tracking off.
    pub fn with_overrides(mut self, base: Option<u32>, reset_only: bool) -> Self {
        if let Some(base) = base {
            self.fetch_base = base;
        }
        self.track_writeback &= !reset_only;
        self
    }
}
