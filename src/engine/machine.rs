//! The transition engine.

use super::observer::{TransitionEvent, TransitionObserver};
use super::result::{AttemptRequest, TransitionError, TransitionResult};
use crate::config::EngineConfig;
use crate::core::{
    EntityRef, HandlerError, History, State, StateToken, StatefulEntity, TransitionContext,
    TransitionLogEntry,
};
use crate::graph::{StateGraph, TransitionDefinition};
use crate::store::{Commit, PersistenceError, TransitionStore};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

/// Executes named transitions against entities and records every attempt.
///
/// The engine holds no per-entity state and can be shared between threads.
/// Each [`attempt`](Self::attempt) either moves the entity and commits the
/// new state together with a success entry, or leaves the entity exactly
/// as it was and commits a failure entry.
pub struct TransitionEngine<S: State + 'static, E: 'static, St> {
    store: Arc<St>,
    observers: Vec<Arc<dyn TransitionObserver<S, E>>>,
    config: EngineConfig,
}

impl<S, E, St> TransitionEngine<S, E, St>
where
    S: State + 'static,
    E: StatefulEntity<S> + Clone + 'static,
    St: TransitionStore<S, E>,
{
    pub fn new(store: Arc<St>) -> Self {
        Self {
            store,
            observers: Vec::new(),
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Register an observer. Observers are notified in registration order.
    pub fn with_observer(mut self, observer: impl TransitionObserver<S, E> + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    pub fn store(&self) -> &Arc<St> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ordered transition log of `entity`.
    pub fn history(&self, entity: &E) -> Result<History<S>, PersistenceError> {
        self.store.history(&entity.entity_ref())
    }

    /// Attempt one named transition on `entity`.
    ///
    /// The entity is only modified when the returned result is a success.
    /// Exactly one log entry is committed per call, unless the store itself
    /// fails, in which case the result carries a persistence error.
    pub fn attempt(
        &self,
        entity: &mut E,
        graph: &StateGraph<S, E>,
        request: AttemptRequest,
    ) -> TransitionResult<S> {
        let entity_ref = entity.entity_ref();
        let from = entity.current_state().clone();
        let span = info_span!(
            "transition",
            kind = graph.kind(),
            entity = %entity_ref,
            transition = %request.transition
        );
        let _enter = span.enter();
        debug!(from = from.name(), "attempting transition");

        let transition = match check_legality(graph, &from, &request) {
            Ok(transition) => transition,
            Err(error) => return self.reject(&entity_ref, &request.transition, from, error),
        };
        let to = transition.target().clone();
        let snapshot = entity.clone();

        self.notify(entity, transition.name(), &from, &to, |observer, event| {
            observer.before(event)
        });

        if let Err(failure) = self.run_handler(entity, transition, &from, &to, &request) {
            *entity = snapshot;
            let (source, payload) = match failure {
                HandlerFailure::Error(source) => (source, None),
                HandlerFailure::Panic(payload) => (
                    HandlerError::Panicked(panic_message(&*payload)),
                    Some(payload),
                ),
            };
            let error = TransitionError::Handler {
                transition: transition.name().to_string(),
                source,
            };
            let result = self.reject(&entity_ref, transition.name(), from, error);
            if let Some(payload) = payload {
                if !self.config.catch_handler_panics {
                    panic::resume_unwind(payload);
                }
            }
            return result;
        }

        entity.set_current_state(to.clone(), StateToken::new());
        let entry = TransitionLogEntry::success(
            entity_ref.clone(),
            transition.name(),
            from.clone(),
            to.clone(),
        );
        let committed = self.store.commit(Commit::Applied {
            entity: &*entity,
            expected: &from,
            entry: &entry,
        });

        if let Err(error) = committed {
            *entity = snapshot;
            return self.reject(
                &entity_ref,
                transition.name(),
                from,
                TransitionError::Persistence(error),
            );
        }

        info!(from = from.name(), to = to.name(), "transition committed");
        self.notify(entity, transition.name(), &from, &to, |observer, event| {
            observer.after(event)
        });
        TransitionResult::succeeded(from, to)
    }

    /// Log a failed attempt and build its result.
    ///
    /// If the failure entry cannot be written either, the result reports
    /// the persistence error instead of the original one.
    fn reject(
        &self,
        entity_ref: &EntityRef,
        transition: &str,
        from: S,
        error: TransitionError,
    ) -> TransitionResult<S> {
        warn!(from = from.name(), kind = %error.kind(), error = %error, "transition rejected");

        let entry = TransitionLogEntry::failure(
            entity_ref.clone(),
            transition,
            from.clone(),
            error.detail(),
        );
        match self.store.commit(Commit::Rejected { entry: &entry }) {
            Ok(()) => TransitionResult::failed(from, error),
            Err(log_error) => {
                warn!(error = %log_error, "failed to record rejected transition");
                let reported = match error {
                    TransitionError::Persistence(original) => original,
                    _ => log_error,
                };
                TransitionResult::failed(from, TransitionError::Persistence(reported))
            }
        }
    }

    fn run_handler(
        &self,
        entity: &mut E,
        transition: &TransitionDefinition<S, E>,
        from: &S,
        to: &S,
        request: &AttemptRequest,
    ) -> Result<(), HandlerFailure> {
        let timeout = transition.timeout().or_else(|| self.config.handler_timeout());
        let ctx = TransitionContext::new(
            transition.name(),
            from.clone(),
            to.clone(),
            request.args.clone(),
        )
        .with_limits(timeout, request.cancellation.clone());
        ctx.check()?;

        if let Some(handler) = transition.handler() {
            match panic::catch_unwind(AssertUnwindSafe(|| handler.call(entity, &ctx))) {
                Ok(result) => result?,
                Err(payload) => return Err(HandlerFailure::Panic(payload)),
            }
        }

        // A handler that ignored cancellation or overran still must not move the entity.
        Ok(ctx.check()?)
    }

    fn notify<F>(&self, entity: &E, transition: &str, from: &S, to: &S, call: F)
    where
        F: Fn(&dyn TransitionObserver<S, E>, &TransitionEvent<'_, S, E>),
    {
        let event = TransitionEvent {
            entity,
            transition,
            from,
            to,
        };
        for observer in &self.observers {
            call(observer.as_ref(), &event);
        }
    }
}

/// Why a handler run did not complete.
enum HandlerFailure {
    Error(HandlerError),
    /// The handler unwound. The payload is resumed after the attempt is
    /// rolled back and logged, unless panics are contained.
    Panic(Box<dyn Any + Send>),
}

impl From<HandlerError> for HandlerFailure {
    fn from(error: HandlerError) -> Self {
        Self::Error(error)
    }
}

/// Steps that need no side effects: the transition exists, is legal from
/// the current state, and is confirmed if it has to be.
fn check_legality<'g, S: State, E>(
    graph: &'g StateGraph<S, E>,
    from: &S,
    request: &AttemptRequest,
) -> Result<&'g TransitionDefinition<S, E>, TransitionError> {
    let transition =
        graph
            .transition(&request.transition)
            .ok_or_else(|| TransitionError::UnknownTransition {
                name: request.transition.clone(),
            })?;

    if !transition.allows_from(from) {
        return Err(TransitionError::IllegalTransition {
            transition: transition.name().to_string(),
            state: from.name().to_string(),
        });
    }

    if transition.confirm_needed() && !request.confirmed {
        return Err(TransitionError::ConfirmationRequired {
            transition: transition.name().to_string(),
        });
    }

    Ok(transition)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
