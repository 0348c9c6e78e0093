//! Versioned snapshots of a store's entities and transition log.
//!
//! Checkpoints let an in-memory store survive process restarts. They can be
//! written as JSON for inspection or as compact binary.

use super::error::PersistenceError;
use crate::core::{State, TransitionLogEntry};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Version identifier for checkpoint format
pub const CHECKPOINT_VERSION: u32 = 1;

/// Serializable snapshot of a store.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound(serialize = "E: Serialize", deserialize = "E: DeserializeOwned"))]
pub struct StoreCheckpoint<S: State, E> {
    /// Checkpoint format version
    pub version: u32,

    pub id: Uuid,

    /// When the checkpoint was taken
    pub timestamp: DateTime<Utc>,

    pub entities: Vec<E>,

    /// Log entries grouped by entity, each group in insertion order
    pub log: Vec<TransitionLogEntry<S>>,
}

impl<S: State, E> StoreCheckpoint<S, E>
where
    E: Serialize + DeserializeOwned,
{
    pub fn to_json(&self) -> Result<String, PersistenceError> {
        serde_json::to_string_pretty(self).map_err(|e| PersistenceError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        let checkpoint: Self =
            serde_json::from_str(json).map_err(|e| PersistenceError::Serialization(e.to_string()))?;
        checkpoint.check_version()
    }

    pub fn to_binary(&self) -> Result<Vec<u8>, PersistenceError> {
        bincode::serialize(self).map_err(|e| PersistenceError::Serialization(e.to_string()))
    }

    pub fn from_binary(bytes: &[u8]) -> Result<Self, PersistenceError> {
        let checkpoint: Self =
            bincode::deserialize(bytes).map_err(|e| PersistenceError::Serialization(e.to_string()))?;
        checkpoint.check_version()
    }

    fn check_version(self) -> Result<Self, PersistenceError> {
        if self.version == CHECKPOINT_VERSION {
            Ok(self)
        } else {
            Err(PersistenceError::UnsupportedVersion {
                found: self.version,
                supported: CHECKPOINT_VERSION,
            })
        }
    }
}
