//! The capability an entity type implements to be governed by a graph.

use super::history::History;
use super::state::State;
use crate::store::{PersistenceError, TransitionLogRecorder};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one entity across repositories and the transition log.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: String,
    pub id: String,
}

impl EntityRef {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Proof that a state write originates from the transition engine.
///
/// Only this crate can construct a token, so an implementor of
/// [`StatefulEntity::set_current_state`] can be sure the assignment went
/// through a validated, logged transition.
#[derive(Debug)]
pub struct StateToken {
    _private: (),
}

impl StateToken {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

/// A record whose lifecycle is governed by a [`StateGraph`](crate::graph::StateGraph).
///
/// # Example
///
/// ```rust
/// use statekeeper::core::{EntityRef, StateToken, StatefulEntity};
/// use statekeeper::state_enum;
///
/// state_enum! {
///     enum Article { Draft, Published }
/// }
///
/// #[derive(Clone)]
/// struct Post {
///     id: u64,
///     state: Article,
/// }
///
/// impl StatefulEntity<Article> for Post {
///     fn entity_ref(&self) -> EntityRef {
///         EntityRef::new("post", self.id.to_string())
///     }
///
///     fn current_state(&self) -> &Article {
///         &self.state
///     }
///
///     fn set_current_state(&mut self, state: Article, _token: StateToken) {
///         self.state = state;
///     }
/// }
/// ```
pub trait StatefulEntity<S: State> {
    fn entity_ref(&self) -> EntityRef;

    fn current_state(&self) -> &S;

    /// Accept a new state. Callable only with an engine-issued token.
    fn set_current_state(&mut self, state: S, token: StateToken);

    /// Read-only view of this entity's transition log.
    fn transition_log<R>(&self, recorder: &R) -> Result<History<S>, PersistenceError>
    where
        Self: Sized,
        R: TransitionLogRecorder<S> + ?Sized,
    {
        recorder.history(&self.entity_ref())
    }
}
