//! Attempt requests, results and the transition error taxonomy.

use crate::core::{CancellationToken, ErrorDetail, ErrorKind, HandlerError, Outcome, State};
use crate::store::PersistenceError;
use serde_json::Value;
use thiserror::Error;

/// Why an attempt did not move the entity.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransitionError {
    #[error("unknown transition '{name}'")]
    UnknownTransition { name: String },

    #[error("transition '{transition}' is not allowed from state '{state}'")]
    IllegalTransition { transition: String, state: String },

    #[error("transition '{transition}' requires confirmation")]
    ConfirmationRequired { transition: String },

    #[error("handler for transition '{transition}' failed: {source}")]
    Handler {
        transition: String,
        #[source]
        source: HandlerError,
    },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl TransitionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownTransition { .. } => ErrorKind::UnknownTransition,
            Self::IllegalTransition { .. } => ErrorKind::IllegalTransition,
            Self::ConfirmationRequired { .. } => ErrorKind::ConfirmationRequired,
            Self::Handler { .. } => ErrorKind::Handler,
            Self::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Errors caused by the request rather than by the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownTransition { .. }
                | Self::IllegalTransition { .. }
                | Self::ConfirmationRequired { .. }
        )
    }

    /// The log representation of this error.
    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// A request to run one named transition.
#[derive(Clone, Debug)]
pub struct AttemptRequest {
    pub transition: String,
    pub confirmed: bool,
    pub args: Value,
    pub cancellation: Option<CancellationToken>,
}

impl AttemptRequest {
    pub fn new(transition: impl Into<String>) -> Self {
        Self {
            transition: transition.into(),
            confirmed: false,
            args: Value::Null,
            cancellation: None,
        }
    }

    /// Confirm a transition declared with `confirm_needed`.
    pub fn confirmed(mut self) -> Self {
        self.confirmed = true;
        self
    }

    pub fn with_confirmation(mut self, confirmed: bool) -> Self {
        self.confirmed = confirmed;
        self
    }

    pub fn args(mut self, args: Value) -> Self {
        self.args = args;
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Outcome of one attempt, as returned to the caller.
///
/// `to_state` is set only on success and `error` only on failure.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionResult<S: State> {
    pub outcome: Outcome,
    pub from_state: S,
    pub to_state: Option<S>,
    pub error: Option<TransitionError>,
}

impl<S: State> TransitionResult<S> {
    pub(crate) fn succeeded(from_state: S, to_state: S) -> Self {
        Self {
            outcome: Outcome::Success,
            from_state,
            to_state: Some(to_state),
            error: None,
        }
    }

    pub(crate) fn failed(from_state: S, error: TransitionError) -> Self {
        Self {
            outcome: Outcome::Failure,
            from_state,
            to_state: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    pub fn error(&self) -> Option<&TransitionError> {
        self.error.as_ref()
    }

    /// The new state, or the error that prevented the move.
    pub fn into_result(self) -> Result<S, TransitionError> {
        match (self.to_state, self.error) {
            (_, Some(error)) => Err(error),
            (Some(to), None) => Ok(to),
            (None, None) => Err(TransitionError::Persistence(PersistenceError::Unavailable(
                "attempt produced neither a state nor an error".to_string(),
            ))),
        }
    }
}
