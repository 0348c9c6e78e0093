//! Request handling for externally triggered transitions.
//!
//! A trigger looks the entity up, runs the transition through the engine
//! and maps the result onto a response a transport layer (HTTP, RPC, a
//! queue consumer) can return as is.

use crate::core::{EntityRef, State, StatefulEntity};
use crate::engine::{AttemptRequest, TransitionEngine, TransitionError};
use crate::graph::StateGraph;
use crate::store::{EntityRepository, PersistenceError, TransitionStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// An external request to run a transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriggerRequest {
    pub entity_id: String,
    pub transition: String,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub args: Value,
}

/// Response to a [`TriggerRequest`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TriggerResponse {
    /// The entity moved
    Completed {
        state: String,
        label: String,
        available_transitions: Vec<String>,
    },

    /// The transition must be repeated with `confirmed: true`
    NeedsConfirmation { transition: String },

    /// The request cannot succeed as sent
    Rejected { kind: String, message: String },

    #[serde(rename = "not_found")]
    EntityNotFound { entity: String },

    /// The system failed while processing a valid request
    Failed { kind: String, message: String },
}

impl TriggerResponse {
    /// HTTP-style status code for the response.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Completed { .. } => 200,
            Self::Rejected { .. } => 400,
            Self::EntityNotFound { .. } => 404,
            Self::NeedsConfirmation { .. } => 409,
            Self::Failed { .. } => 500,
        }
    }

    fn from_error(error: &TransitionError) -> Self {
        match error {
            TransitionError::ConfirmationRequired { transition } => Self::NeedsConfirmation {
                transition: transition.clone(),
            },
            e if e.is_client_error() => Self::Rejected {
                kind: e.kind().to_string(),
                message: e.to_string(),
            },
            e => Self::Failed {
                kind: e.kind().to_string(),
                message: e.to_string(),
            },
        }
    }
}

/// Load the entity, attempt the transition and map the outcome.
///
/// Only public transitions can be triggered; others are rejected before
/// the engine sees them and leave no log entry. The available transitions
/// in a response are the public ones leaving the new state.
pub fn trigger<S, E, St, R>(
    engine: &TransitionEngine<S, E, St>,
    repository: &R,
    graph: &StateGraph<S, E>,
    request: TriggerRequest,
) -> TriggerResponse
where
    S: State + 'static,
    E: StatefulEntity<S> + Clone + 'static,
    St: TransitionStore<S, E>,
    R: EntityRepository<E> + ?Sized,
{
    let entity_ref = EntityRef::new(graph.kind(), request.entity_id.as_str());
    debug!(entity = %entity_ref, transition = %request.transition, "handling trigger");

    let mut entity = match repository.load(&entity_ref) {
        Ok(entity) => entity,
        Err(PersistenceError::NotFound { entity }) => {
            return TriggerResponse::EntityNotFound { entity };
        }
        Err(e) => return TriggerResponse::from_error(&TransitionError::Persistence(e)),
    };

    if let Some(transition) = graph.transition(&request.transition) {
        if !transition.is_public() {
            debug!(transition = %request.transition, "refusing non-public transition");
            return TriggerResponse::Rejected {
                kind: "not_public".to_string(),
                message: format!(
                    "transition '{}' cannot be triggered externally",
                    request.transition
                ),
            };
        }
    }

    let attempt = AttemptRequest::new(request.transition)
        .with_confirmation(request.confirmed)
        .args(request.args);
    let result = engine.attempt(&mut entity, graph, attempt);

    if let Some(error) = result.error() {
        return TriggerResponse::from_error(error);
    }

    let state = entity.current_state();
    TriggerResponse::Completed {
        state: state.name().to_string(),
        label: graph
            .state(state)
            .map(|def| def.display_label().to_string())
            .unwrap_or_else(|| state.name().to_string()),
        available_transitions: graph
            .public_transitions_from(state)
            .iter()
            .map(|t| t.name().to_string())
            .collect(),
    }
}
