//! Before/after notifications for transitions.
//!
//! Observers are owned by a [`TransitionEngine`](super::TransitionEngine)
//! and called synchronously on the caller's thread: `before` once a
//! transition has passed its legality and confirmation checks and before
//! its handler runs, `after` once the new state has been committed.

use crate::core::{State, StatefulEntity};
use tracing::{debug, info};

/// One transition, as seen by observers.
#[derive(Debug)]
pub struct TransitionEvent<'a, S: State, E> {
    pub entity: &'a E,
    pub transition: &'a str,
    pub from: &'a S,
    pub to: &'a S,
}

pub trait TransitionObserver<S: State, E>: Send + Sync {
    fn before(&self, _event: &TransitionEvent<'_, S, E>) {}

    fn after(&self, _event: &TransitionEvent<'_, S, E>) {}
}

/// Observer that writes every transition to the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl<S: State, E: StatefulEntity<S>> TransitionObserver<S, E> for TracingObserver {
    fn before(&self, event: &TransitionEvent<'_, S, E>) {
        debug!(
            entity = %event.entity.entity_ref(),
            transition = event.transition,
            from = event.from.name(),
            to = event.to.name(),
            "before transition"
        );
    }

    fn after(&self, event: &TransitionEvent<'_, S, E>) {
        info!(
            entity = %event.entity.entity_ref(),
            transition = event.transition,
            from = event.from.name(),
            to = event.to.name(),
            "after transition"
        );
    }
}
