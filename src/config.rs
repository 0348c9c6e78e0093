//! Engine configuration with defaults.
//!
//! Configuration is plain JSON. Every field is optional; missing fields
//! take their default.
//!
//! ```json
//! {
//!     "unreachable_states": "deny",
//!     "handler_timeout_ms": 5000,
//!     "catch_handler_panics": true
//! }
//! ```

use crate::graph::UnreachablePolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings shared by graph building and the transition engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Whether unreachable states fail graph building
    pub unreachable_states: UnreachablePolicy,

    /// Time limit applied to handlers without their own timeout
    pub handler_timeout_ms: Option<u64>,

    /// Report handler panics as failed attempts. When false the attempt is
    /// still rolled back and logged, then the panic resumes in the caller.
    pub catch_handler_panics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unreachable_states: UnreachablePolicy::Warn,
            handler_timeout_ms: None,
            catch_handler_panics: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn handler_timeout(&self) -> Option<Duration> {
        self.handler_timeout_ms.map(Duration::from_millis)
    }
}
