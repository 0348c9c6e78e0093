//! Errors raised while building a state graph.

use thiserror::Error;

/// One inconsistency found in a graph declaration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphViolation {
    #[error("no initial state declared")]
    NoInitialState,

    #[error("more than one initial state declared: {}", .states.join(", "))]
    MultipleInitialStates { states: Vec<String> },

    #[error("state '{name}' is declared more than once")]
    DuplicateState { name: String },

    #[error("transition '{name}' is declared more than once")]
    DuplicateTransition { name: String },

    #[error("transition '{transition}' references unknown state '{state}'")]
    UnknownState { transition: String, state: String },

    #[error("transition '{transition}' has no source states")]
    EmptySources { transition: String },

    #[error("transition '{transition}' has no target state. Call .to(state)")]
    MissingTarget { transition: String },

    #[error("state '{state}' is unreachable from the initial state")]
    UnreachableState { state: String },
}

/// A graph declaration failed validation.
///
/// Carries every violation found, not only the first.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid state graph '{kind}': {}", join(.violations))]
pub struct GraphDefinitionError {
    kind: String,
    violations: Vec<GraphViolation>,
}

impl GraphDefinitionError {
    pub(crate) fn new(kind: impl Into<String>, violations: Vec<GraphViolation>) -> Self {
        Self {
            kind: kind.into(),
            violations,
        }
    }

    /// Entity kind of the rejected graph.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn violations(&self) -> &[GraphViolation] {
        &self.violations
    }

    pub fn has(&self, predicate: impl Fn(&GraphViolation) -> bool) -> bool {
        self.violations.iter().any(predicate)
    }
}

fn join(violations: &[GraphViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
