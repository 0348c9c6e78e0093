//! Thread-safe in-memory store.

use super::checkpoint::{StoreCheckpoint, CHECKPOINT_VERSION};
use super::{
    Commit, EntityRepository, PersistenceError, TransitionLogRecorder, TransitionStore,
};
use crate::core::{EntityRef, History, State, StatefulEntity, TransitionLogEntry};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::marker::PhantomData;
use tracing::debug;
use uuid::Uuid;

struct Inner<S: State, E> {
    entities: HashMap<EntityRef, E>,
    logs: HashMap<EntityRef, Vec<TransitionLogEntry<S>>>,
}

/// In-memory entity repository and transition log.
///
/// A single lock covers both entities and log, so a [`Commit`] is applied
/// atomically. Successful commits compare the stored state with the state
/// the attempt started from, which makes concurrent attempts on the same
/// entity safe: only the first one to commit moves it.
pub struct MemoryStore<S: State, E> {
    inner: RwLock<Inner<S, E>>,
    _phantom: PhantomData<S>,
}

impl<S: State, E> Default for MemoryStore<S, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State, E> MemoryStore<S, E> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                entities: HashMap::new(),
                logs: HashMap::new(),
            }),
            _phantom: PhantomData,
        }
    }

    pub fn entity_count(&self) -> usize {
        self.inner.read().entities.len()
    }

    /// Total log entries across all entities.
    pub fn log_len(&self) -> usize {
        self.inner.read().logs.values().map(Vec::len).sum()
    }
}

impl<S: State, E> MemoryStore<S, E>
where
    E: StatefulEntity<S> + Clone,
{
    /// Snapshot every entity and log entry.
    pub fn checkpoint(&self) -> StoreCheckpoint<S, E> {
        let inner = self.inner.read();
        let mut entities: Vec<E> = inner.entities.values().cloned().collect();
        entities.sort_by_key(|e| e.entity_ref());

        let mut refs: Vec<&EntityRef> = inner.logs.keys().collect();
        refs.sort();
        let log = refs
            .into_iter()
            .flat_map(|r| inner.logs[r].iter().cloned())
            .collect();

        StoreCheckpoint {
            version: CHECKPOINT_VERSION,
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            entities,
            log,
        }
    }

    /// Rebuild a store from a checkpoint.
    pub fn restore(checkpoint: StoreCheckpoint<S, E>) -> Result<Self, PersistenceError> {
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: checkpoint.version,
                supported: CHECKPOINT_VERSION,
            });
        }

        let store = Self::new();
        {
            let mut inner = store.inner.write();
            for entity in checkpoint.entities {
                inner.entities.insert(entity.entity_ref(), entity);
            }
            for entry in checkpoint.log {
                inner
                    .logs
                    .entry(entry.entity_ref().clone())
                    .or_default()
                    .push(entry);
            }
        }
        debug!(checkpoint = %checkpoint.id, "restored store from checkpoint");
        Ok(store)
    }
}

impl<S: State, E> EntityRepository<E> for MemoryStore<S, E>
where
    E: StatefulEntity<S> + Clone + Send + Sync,
{
    fn load(&self, entity: &EntityRef) -> Result<E, PersistenceError> {
        self.inner
            .read()
            .entities
            .get(entity)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound {
                entity: entity.to_string(),
            })
    }

    /// Insert a new entity or update an existing one's other fields.
    ///
    /// Updating an existing entity with a different state is rejected:
    /// state only moves through a committed transition.
    fn save(&self, entity: &E) -> Result<(), PersistenceError> {
        let key = entity.entity_ref();
        let mut inner = self.inner.write();
        if let Some(stored) = inner.entities.get(&key) {
            if stored.current_state() != entity.current_state() {
                return Err(PersistenceError::StateChangeRejected {
                    entity: key.to_string(),
                });
            }
        }
        inner.entities.insert(key, entity.clone());
        Ok(())
    }
}

impl<S: State, E> TransitionLogRecorder<S> for MemoryStore<S, E>
where
    E: Send + Sync,
{
    fn append(&self, entry: TransitionLogEntry<S>) -> Result<(), PersistenceError> {
        let stamp = entry.timestamp();
        record(&mut self.inner.write().logs, entry, stamp);
        Ok(())
    }

    fn history(&self, entity: &EntityRef) -> Result<History<S>, PersistenceError> {
        let entries = self
            .inner
            .read()
            .logs
            .get(entity)
            .cloned()
            .unwrap_or_default();
        Ok(History::from_entries(entries))
    }
}

impl<S: State, E> TransitionStore<S, E> for MemoryStore<S, E>
where
    E: StatefulEntity<S> + Clone + Send + Sync,
{
    fn commit(&self, commit: Commit<'_, S, E>) -> Result<(), PersistenceError> {
        let mut inner = self.inner.write();
        match commit {
            Commit::Rejected { entry } => {
                record(&mut inner.logs, entry.clone(), Utc::now());
            }
            Commit::Applied {
                entity,
                expected,
                entry,
            } => {
                let key = entity.entity_ref();
                let stored = inner
                    .entities
                    .get(&key)
                    .ok_or_else(|| PersistenceError::NotFound {
                        entity: key.to_string(),
                    })?;
                if stored.current_state() != expected {
                    return Err(PersistenceError::Conflict {
                        entity: key.to_string(),
                        expected: expected.name().to_string(),
                        actual: stored.current_state().name().to_string(),
                    });
                }
                inner.entities.insert(key, entity.clone());
                record(&mut inner.logs, entry.clone(), Utc::now());
            }
        }
        Ok(())
    }
}

/// Push `entry` onto its entity's log, stamped no earlier than the last
/// entry already there. Callers hold the write lock, so log order is
/// commit order and timestamps never decrease within one log.
fn record<S: State>(
    logs: &mut HashMap<EntityRef, Vec<TransitionLogEntry<S>>>,
    entry: TransitionLogEntry<S>,
    stamp: DateTime<Utc>,
) {
    let log = logs.entry(entry.entity_ref().clone()).or_default();
    let stamp = match log.last() {
        Some(last) if last.timestamp() > stamp => last.timestamp(),
        _ => stamp,
    };
    log.push(entry.at(stamp));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorDetail, ErrorKind, StateToken};
    use crate::state_enum;

    state_enum! {
        enum TestState {
            Open = "open",
            Closed = "closed",
        }
    }

    #[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
    struct Ticket {
        id: u32,
        title: String,
        state: TestState,
    }

    impl StatefulEntity<TestState> for Ticket {
        fn entity_ref(&self) -> EntityRef {
            EntityRef::new("ticket", self.id.to_string())
        }

        fn current_state(&self) -> &TestState {
            &self.state
        }

        fn set_current_state(&mut self, state: TestState, _token: StateToken) {
            self.state = state;
        }
    }

    fn ticket(id: u32, state: TestState) -> Ticket {
        Ticket {
            id,
            title: format!("ticket {id}"),
            state,
        }
    }

    fn closed_copy(t: &Ticket) -> Ticket {
        Ticket {
            state: TestState::Closed,
            ..t.clone()
        }
    }

    fn success(t: &Ticket) -> TransitionLogEntry<TestState> {
        TransitionLogEntry::success(t.entity_ref(), "close", TestState::Open, TestState::Closed)
    }

    #[test]
    fn save_then_load_returns_entity() {
        let store: MemoryStore<TestState, Ticket> = MemoryStore::new();
        store.save(&ticket(1, TestState::Open)).unwrap();

        let loaded: Ticket = store.load(&EntityRef::new("ticket", "1")).unwrap();
        assert_eq!(loaded.title, "ticket 1");
    }

    #[test]
    fn load_missing_entity_is_not_found() {
        let store: MemoryStore<TestState, Ticket> = MemoryStore::new();
        let err = store.load(&EntityRef::new("ticket", "9")).unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound { .. }));
    }

    #[test]
    fn save_cannot_change_state() {
        let store: MemoryStore<TestState, Ticket> = MemoryStore::new();
        let t = ticket(1, TestState::Open);
        store.save(&t).unwrap();

        let mut renamed = t.clone();
        renamed.title = "renamed".to_string();
        assert!(store.save(&renamed).is_ok());

        let err = store.save(&closed_copy(&t)).unwrap_err();
        assert!(matches!(err, PersistenceError::StateChangeRejected { .. }));
    }

    #[test]
    fn applied_commit_writes_entity_and_entry() {
        let store: MemoryStore<TestState, Ticket> = MemoryStore::new();
        let t = ticket(1, TestState::Open);
        store.save(&t).unwrap();

        let moved = closed_copy(&t);
        let entry = success(&t);
        store
            .commit(Commit::Applied {
                entity: &moved,
                expected: &TestState::Open,
                entry: &entry,
            })
            .unwrap();

        let loaded: Ticket = store.load(&t.entity_ref()).unwrap();
        assert_eq!(loaded.state, TestState::Closed);
        assert_eq!(store.history(&t.entity_ref()).unwrap().len(), 1);
    }

    #[test]
    fn stale_commit_is_a_conflict_and_writes_nothing() {
        let store: MemoryStore<TestState, Ticket> = MemoryStore::new();
        let t = ticket(1, TestState::Open);
        store.save(&t).unwrap();
        let moved = closed_copy(&t);
        let entry = success(&t);

        store
            .commit(Commit::Applied {
                entity: &moved,
                expected: &TestState::Open,
                entry: &entry,
            })
            .unwrap();
        let second = success(&t);
        let err = store
            .commit(Commit::Applied {
                entity: &moved,
                expected: &TestState::Open,
                entry: &second,
            })
            .unwrap_err();

        assert!(matches!(err, PersistenceError::Conflict { ref actual, .. } if actual == "closed"));
        assert_eq!(store.history(&t.entity_ref()).unwrap().len(), 1);
    }

    #[test]
    fn applied_commit_for_unknown_entity_is_not_found() {
        let store: MemoryStore<TestState, Ticket> = MemoryStore::new();
        let t = ticket(3, TestState::Open);
        let moved = closed_copy(&t);
        let entry = success(&t);

        let err = store
            .commit(Commit::Applied {
                entity: &moved,
                expected: &TestState::Open,
                entry: &entry,
            })
            .unwrap_err();

        assert!(matches!(err, PersistenceError::NotFound { .. }));
        assert_eq!(store.log_len(), 0);
    }

    #[test]
    fn rejected_commit_only_logs() {
        let store: MemoryStore<TestState, Ticket> = MemoryStore::new();
        let t = ticket(1, TestState::Open);
        store.save(&t).unwrap();
        let entry = TransitionLogEntry::failure(
            t.entity_ref(),
            "reopen",
            TestState::Open,
            ErrorDetail {
                kind: ErrorKind::IllegalTransition,
                message: "not allowed".to_string(),
            },
        );

        let commit: Commit<'_, TestState, Ticket> = Commit::Rejected { entry: &entry };
        store.commit(commit).unwrap();

        let loaded: Ticket = store.load(&t.entity_ref()).unwrap();
        assert_eq!(loaded.state, TestState::Open);
        assert_eq!(store.history(&t.entity_ref()).unwrap().len(), 1);
    }

    fn rejected(t: &Ticket, name: &str) -> TransitionLogEntry<TestState> {
        TransitionLogEntry::failure(
            t.entity_ref(),
            name,
            TestState::Open,
            ErrorDetail {
                kind: ErrorKind::IllegalTransition,
                message: "not allowed".to_string(),
            },
        )
    }

    fn names(store: &MemoryStore<TestState, Ticket>, t: &Ticket) -> Vec<String> {
        store
            .history(&t.entity_ref())
            .unwrap()
            .iter()
            .map(|e| e.transition_name().to_string())
            .collect()
    }

    #[test]
    fn log_order_follows_commit_order() {
        let store: MemoryStore<TestState, Ticket> = MemoryStore::new();
        let t = ticket(1, TestState::Open);
        store.save(&t).unwrap();
        let built_first = rejected(&t, "a").at(Utc::now() - chrono::Duration::seconds(5));
        let built_second = rejected(&t, "b");

        store.commit(Commit::Rejected { entry: &built_second }).unwrap();
        assert_eq!(names(&store, &t), vec!["b"]);

        store.commit(Commit::Rejected { entry: &built_first }).unwrap();
        assert_eq!(names(&store, &t), vec!["b", "a"]);

        let history = store.history(&t.entity_ref()).unwrap();
        assert!(history.entries()[0].timestamp() <= history.entries()[1].timestamp());
    }

    #[test]
    fn appended_entries_never_jump_ahead() {
        let store: MemoryStore<TestState, Ticket> = MemoryStore::new();
        let t = ticket(1, TestState::Open);

        store.append(rejected(&t, "now")).unwrap();
        store
            .append(rejected(&t, "stale").at(Utc::now() - chrono::Duration::hours(1)))
            .unwrap();

        assert_eq!(names(&store, &t), vec!["now", "stale"]);
    }

    #[test]
    fn histories_are_kept_per_entity() {
        let store = MemoryStore::<TestState, Ticket>::new();
        let a = ticket(1, TestState::Open);
        let b = ticket(2, TestState::Open);

        store.append(success(&a)).unwrap();
        store.append(success(&a)).unwrap();
        store.append(success(&b)).unwrap();

        assert_eq!(store.history(&a.entity_ref()).unwrap().len(), 2);
        assert_eq!(store.history(&b.entity_ref()).unwrap().len(), 1);
        assert_eq!(store.log_len(), 3);
    }

    #[test]
    fn checkpoint_restores_entities_and_history() {
        let store: MemoryStore<TestState, Ticket> = MemoryStore::new();
        let t = ticket(1, TestState::Open);
        store.save(&t).unwrap();
        store.save(&ticket(2, TestState::Closed)).unwrap();
        store.append(success(&t)).unwrap();

        let restored = MemoryStore::restore(store.checkpoint()).unwrap();

        assert_eq!(restored.entity_count(), 2);
        assert_eq!(restored.history(&t.entity_ref()).unwrap().len(), 1);
        let loaded: Ticket = restored.load(&t.entity_ref()).unwrap();
        assert_eq!(loaded.title, "ticket 1");
    }

    #[test]
    fn restore_rejects_unknown_versions() {
        let store: MemoryStore<TestState, Ticket> = MemoryStore::new();
        let mut checkpoint = store.checkpoint();
        checkpoint.version = CHECKPOINT_VERSION + 1;

        let err = MemoryStore::restore(checkpoint).err().unwrap();
        assert!(matches!(err, PersistenceError::UnsupportedVersion { .. }));
    }
}
