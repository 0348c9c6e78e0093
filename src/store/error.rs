//! Storage-layer errors.

use thiserror::Error;

/// Failure to read or durably write entities or log entries.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PersistenceError {
    /// The stored state moved since the attempt read it
    #[error("entity {entity} is in state '{actual}', expected '{expected}'")]
    Conflict {
        entity: String,
        expected: String,
        actual: String,
    },

    #[error("entity {entity} not found")]
    NotFound { entity: String },

    /// A plain save tried to change the entity's state
    #[error("state of entity {entity} may only change through a transition")]
    StateChangeRejected { entity: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("unsupported checkpoint version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}
