//! Transition log entries and ordered history views.
//!
//! Every transition attempt, successful or not, produces exactly one
//! [`TransitionLogEntry`]. Entries are immutable once created: fields are
//! private and only readable through accessors.

use super::entity::EntityRef;
use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Whether an attempt moved the entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
}

/// Classification of a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownTransition,
    IllegalTransition,
    ConfirmationRequired,
    Handler,
    Persistence,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnknownTransition => "unknown_transition",
            Self::IllegalTransition => "illegal_transition",
            Self::ConfirmationRequired => "confirmation_required",
            Self::Handler => "handler",
            Self::Persistence => "persistence",
        };
        f.write_str(s)
    }
}

/// Why a logged attempt failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub message: String,
}

/// Immutable record of a single transition attempt.
///
/// `to_state` is present iff the outcome is a success, and `error_detail`
/// is present iff it is a failure.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct TransitionLogEntry<S: State> {
    id: Uuid,
    entity_ref: EntityRef,
    transition_name: String,
    from_state: S,
    to_state: Option<S>,
    timestamp: DateTime<Utc>,
    outcome: Outcome,
    error_detail: Option<ErrorDetail>,
}

impl<S: State> TransitionLogEntry<S> {
    pub fn success(
        entity_ref: EntityRef,
        transition_name: impl Into<String>,
        from_state: S,
        to_state: S,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_ref,
            transition_name: transition_name.into(),
            from_state,
            to_state: Some(to_state),
            timestamp: Utc::now(),
            outcome: Outcome::Success,
            error_detail: None,
        }
    }

    pub fn failure(
        entity_ref: EntityRef,
        transition_name: impl Into<String>,
        from_state: S,
        error: ErrorDetail,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_ref,
            transition_name: transition_name.into(),
            from_state,
            to_state: None,
            timestamp: Utc::now(),
            outcome: Outcome::Failure,
            error_detail: Some(error),
        }
    }

    /// Override the timestamp, for importing entries recorded elsewhere.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn entity_ref(&self) -> &EntityRef {
        &self.entity_ref
    }

    pub fn transition_name(&self) -> &str {
        &self.transition_name
    }

    pub fn from_state(&self) -> &S {
        &self.from_state
    }

    pub fn to_state(&self) -> Option<&S> {
        self.to_state.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    pub fn error_detail(&self) -> Option<&ErrorDetail> {
        self.error_detail.as_ref()
    }
}

/// Ordered, finite view over one entity's transition log.
///
/// Entries are ordered by timestamp ascending; entries sharing a timestamp
/// keep their insertion order. Iterating does not consume the history, so
/// it can be walked any number of times.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct History<S: State> {
    entries: Vec<TransitionLogEntry<S>>,
}

impl<S: State> Default for History<S> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<S: State> History<S> {
    /// Build a history from entries given in insertion order.
    pub fn from_entries(mut entries: Vec<TransitionLogEntry<S>>) -> Self {
        // stable sort keeps insertion order for equal timestamps
        entries.sort_by_key(|e| e.timestamp);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TransitionLogEntry<S>> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[TransitionLogEntry<S>] {
        &self.entries
    }

    pub fn last(&self) -> Option<&TransitionLogEntry<S>> {
        self.entries.last()
    }

    /// Successful attempts only.
    pub fn successes(&self) -> impl Iterator<Item = &TransitionLogEntry<S>> + '_ {
        self.entries.iter().filter(|e| e.is_success())
    }

    /// States traversed by successful transitions.
    ///
    /// Starts with the source of the first successful transition, followed
    /// by the target of each successful transition.
    pub fn path(&self) -> Vec<&S> {
        let mut path = Vec::new();
        for entry in self.successes() {
            if path.is_empty() {
                path.push(entry.from_state());
            }
            if let Some(to) = entry.to_state() {
                path.push(to);
            }
        }
        path
    }

    /// Time between the first and last logged attempt.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.entries.first(), self.entries.last()) {
            last.timestamp
                .signed_duration_since(first.timestamp)
                .to_std()
                .ok()
        } else {
            None
        }
    }
}

impl<'a, S: State> IntoIterator for &'a History<S> {
    type Item = &'a TransitionLogEntry<S>;
    type IntoIter = std::slice::Iter<'a, TransitionLogEntry<S>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
