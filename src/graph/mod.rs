//! Declarative state graphs.
//!
//! A [`StateGraph`] is the immutable declaration of every state and
//! transition for one entity kind. It is assembled with
//! [`StateGraphBuilder`], which validates the declaration once, up front:
//! - exactly one initial state
//! - every transition source and target is a declared state
//! - transition and state names are unique
//! - every transition has at least one source and a target
//!
//! States unreachable from the initial state are logged as warnings, or
//! rejected under [`UnreachablePolicy::Deny`].

mod builder;
mod error;
pub mod export;
pub mod macros;
mod transition;

pub use builder::StateGraphBuilder;
pub use error::{GraphDefinitionError, GraphViolation};
pub use transition::{TransitionBuilder, TransitionDefinition};

use crate::core::{State, StateDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// How graph building treats states no transition path can reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreachablePolicy {
    /// Log a warning and build anyway
    #[default]
    Warn,

    /// Reject the graph
    Deny,
}

/// Immutable declaration of states and transitions for one entity kind.
///
/// `E` is the entity type transition handlers operate on.
pub struct StateGraph<S: State, E> {
    pub(crate) kind: String,
    pub(crate) states: Vec<StateDefinition<S>>,
    pub(crate) transitions: Vec<TransitionDefinition<S, E>>,
    pub(crate) transition_index: HashMap<String, usize>,
    pub(crate) initial: usize,
}

impl<S: State, E> StateGraph<S, E> {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// All states in declaration order.
    pub fn states(&self) -> &[StateDefinition<S>] {
        &self.states
    }

    /// All transitions in declaration order.
    pub fn transitions(&self) -> &[TransitionDefinition<S, E>] {
        &self.transitions
    }

    pub fn state(&self, state: &S) -> Option<&StateDefinition<S>> {
        self.states.iter().find(|def| def.state() == state)
    }

    pub fn state_named(&self, name: &str) -> Option<&StateDefinition<S>> {
        self.states.iter().find(|def| def.name() == name)
    }

    pub fn contains(&self, state: &S) -> bool {
        self.state(state).is_some()
    }

    pub fn transition(&self, name: &str) -> Option<&TransitionDefinition<S, E>> {
        self.transition_index
            .get(name)
            .and_then(|&i| self.transitions.get(i))
    }

    /// Transitions whose sources include `state`, in declaration order.
    pub fn transitions_from(&self, state: &S) -> Vec<&TransitionDefinition<S, E>> {
        self.transitions
            .iter()
            .filter(|t| t.allows_from(state))
            .collect()
    }

    /// Transitions external actors may invoke from `state`.
    pub fn public_transitions_from(&self, state: &S) -> Vec<&TransitionDefinition<S, E>> {
        self.transitions
            .iter()
            .filter(|t| t.is_public() && t.allows_from(state))
            .collect()
    }

    pub fn initial_state(&self) -> &StateDefinition<S> {
        &self.states[self.initial]
    }

    /// The state new entities start in.
    pub fn initial(&self) -> S {
        self.initial_state().state().clone()
    }

    /// States no transition path from the initial state reaches.
    pub fn unreachable_states(&self) -> Vec<&StateDefinition<S>> {
        let names = unreachable_names(&self.states, &self.transitions, self.initial);
        self.states
            .iter()
            .filter(|def| names.iter().any(|n| n == def.name()))
            .collect()
    }
}

impl<S: State, E> Clone for StateGraph<S, E> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            states: self.states.clone(),
            transitions: self.transitions.clone(),
            transition_index: self.transition_index.clone(),
            initial: self.initial,
        }
    }
}

impl<S: State, E> fmt::Debug for StateGraph<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateGraph")
            .field("kind", &self.kind)
            .field("states", &self.states.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field(
                "transitions",
                &self.transitions.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("initial", &self.initial_state().name())
            .finish()
    }
}

/// Names of states not reachable from `states[initial]`, in declaration order.
pub(crate) fn unreachable_names<S: State, E>(
    states: &[StateDefinition<S>],
    transitions: &[TransitionDefinition<S, E>],
    initial: usize,
) -> Vec<String> {
    let Some(start) = states.get(initial) else {
        return Vec::new();
    };
    let mut reached: Vec<&S> = vec![start.state()];

    loop {
        let mut grew = false;
        for t in transitions {
            let enters = t.sources().iter().any(|s| reached.contains(&s));
            if enters && !reached.contains(&t.target()) {
                reached.push(t.target());
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }

    states
        .iter()
        .filter(|def| !reached.contains(&def.state()))
        .map(|def| def.name().to_string())
        .collect()
}
