//! Transition declarations and their builder.

use crate::core::{Handler, HandlerError, State, TransitionContext};
use std::fmt;
use std::time::Duration;

/// A named operation moving an entity from one of its sources to its target.
pub struct TransitionDefinition<S: State, E> {
    name: String,
    sources: Vec<S>,
    target: S,
    handler: Option<Handler<S, E>>,
    confirm_needed: bool,
    public: bool,
    timeout: Option<Duration>,
    description: Option<String>,
}

impl<S: State, E> TransitionDefinition<S, E> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source states in declaration order.
    pub fn sources(&self) -> &[S] {
        &self.sources
    }

    pub fn target(&self) -> &S {
        &self.target
    }

    pub fn handler(&self) -> Option<&Handler<S, E>> {
        self.handler.as_ref()
    }

    pub fn confirm_needed(&self) -> bool {
        self.confirm_needed
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    /// Per-transition handler time limit, overriding the engine default.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether this transition is declared legal from `state`.
    pub fn allows_from(&self, state: &S) -> bool {
        self.sources.contains(state)
    }
}

impl<S: State, E> Clone for TransitionDefinition<S, E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            sources: self.sources.clone(),
            target: self.target.clone(),
            handler: self.handler.clone(),
            confirm_needed: self.confirm_needed,
            public: self.public,
            timeout: self.timeout,
            description: self.description.clone(),
        }
    }
}

impl<S: State, E> fmt::Debug for TransitionDefinition<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionDefinition")
            .field("name", &self.name)
            .field("sources", &self.sources)
            .field("target", &self.target)
            .field("handler", &self.handler.is_some())
            .field("confirm_needed", &self.confirm_needed)
            .field("public", &self.public)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Builder for declaring transitions with a fluent API.
///
/// Structural problems (no target, no sources, unknown states) are not
/// reported here but collected by
/// [`StateGraphBuilder::build`](super::StateGraphBuilder::build), so a
/// graph declaration reports all of its problems at once.
pub struct TransitionBuilder<S: State, E> {
    pub(crate) name: String,
    pub(crate) sources: Vec<S>,
    pub(crate) target: Option<S>,
    handler: Option<Handler<S, E>>,
    confirm_needed: bool,
    public: bool,
    timeout: Option<Duration>,
    description: Option<String>,
}

impl<S: State, E> TransitionBuilder<S, E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sources: Vec::new(),
            target: None,
            handler: None,
            confirm_needed: false,
            public: false,
            timeout: None,
            description: None,
        }
    }

    /// Add a permitted source state. Repeated sources are ignored.
    pub fn from(mut self, state: S) -> Self {
        if !self.sources.contains(&state) {
            self.sources.push(state);
        }
        self
    }

    /// Add several permitted source states.
    pub fn from_any(self, states: impl IntoIterator<Item = S>) -> Self {
        states
            .into_iter()
            .fold(self, |builder, state| builder.from(state))
    }

    /// Set the target state (required).
    pub fn to(mut self, state: S) -> Self {
        self.target = Some(state);
        self
    }

    pub fn handler(mut self, handler: Handler<S, E>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Attach a handler from a closure.
    pub fn handle<F>(self, run: F) -> Self
    where
        F: Fn(&mut E, &TransitionContext<S>) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.handler(Handler::new(run))
    }

    /// Require callers to confirm before the handler may run.
    pub fn confirm_needed(mut self) -> Self {
        self.confirm_needed = true;
        self
    }

    /// Allow external actors to invoke this transition.
    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Finish the declaration. `None` when no target was set.
    pub(crate) fn into_definition(self) -> Option<TransitionDefinition<S, E>> {
        let target = self.target?;
        Some(TransitionDefinition {
            name: self.name,
            sources: self.sources,
            target,
            handler: self.handler,
            confirm_needed: self.confirm_needed,
            public: self.public,
            timeout: self.timeout,
            description: self.description,
        })
    }
}
