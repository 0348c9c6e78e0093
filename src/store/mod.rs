//! Persistence boundaries consumed by the engine.
//!
//! The engine never talks to storage directly. It goes through three
//! traits:
//! - [`EntityRepository`] loads and saves entities
//! - [`TransitionLogRecorder`] appends to and reads the transition log
//! - [`TransitionStore`] commits a state change and its log entry as one unit
//!
//! [`MemoryStore`] implements all three in memory.

pub mod checkpoint;
mod error;
mod memory;

pub use checkpoint::{StoreCheckpoint, CHECKPOINT_VERSION};
pub use error::PersistenceError;
pub use memory::MemoryStore;

use crate::core::{EntityRef, History, State, TransitionLogEntry};

/// Loads and saves entities.
pub trait EntityRepository<E>: Send + Sync {
    fn load(&self, entity: &EntityRef) -> Result<E, PersistenceError>;

    fn save(&self, entity: &E) -> Result<(), PersistenceError>;
}

/// Append-only transition log.
///
/// Entries can be added and read, never updated or removed.
pub trait TransitionLogRecorder<S: State>: Send + Sync {
    fn append(&self, entry: TransitionLogEntry<S>) -> Result<(), PersistenceError>;

    /// Entries for one entity, oldest first; ties keep insertion order.
    fn history(&self, entity: &EntityRef) -> Result<History<S>, PersistenceError>;
}

/// What the engine asks the store to make durable for one attempt.
#[derive(Debug)]
pub enum Commit<'a, S: State, E> {
    /// A failed attempt: only the log entry is written.
    Rejected { entry: &'a TransitionLogEntry<S> },

    /// A successful attempt: the entity, already in its new state, and the
    /// log entry are written together, provided the stored state still
    /// equals `expected`.
    Applied {
        entity: &'a E,
        expected: &'a S,
        entry: &'a TransitionLogEntry<S>,
    },
}

impl<'a, S: State, E> Commit<'a, S, E> {
    pub fn entry(&self) -> &'a TransitionLogEntry<S> {
        match self {
            Self::Rejected { entry } | Self::Applied { entry, .. } => entry,
        }
    }
}

/// The transactional boundary of a transition attempt.
///
/// `commit` must be all-or-nothing: either everything in the [`Commit`] is
/// durable, or nothing is and an error is returned.
///
/// The entry's timestamp is provisional. Implementations restamp it when
/// the commit takes effect, never earlier than the entity's last entry, so
/// a history read later only ever extends one read earlier.
pub trait TransitionStore<S: State, E>: TransitionLogRecorder<S> {
    fn commit(&self, commit: Commit<'_, S, E>) -> Result<(), PersistenceError>;
}
