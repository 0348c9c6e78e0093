//! Typed side-effect handlers attached to transitions.
//!
//! A handler runs after a transition has been found legal and confirmed,
//! and before the entity's state moves. Returning an error aborts the
//! transition; the engine then restores the entity as it was before the
//! handler ran.

use super::context::TransitionContext;
use super::state::State;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failure raised by (or on behalf of) a transition handler.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error("invalid argument '{key}': {reason}")]
    InvalidArgument { key: String, reason: String },

    #[error("handler was cancelled")]
    Cancelled,

    #[error("handler exceeded its time limit of {limit:?} (elapsed: {elapsed:?})")]
    TimedOut { limit: Duration, elapsed: Duration },

    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

type HandlerFn<S, E> =
    Arc<dyn Fn(&mut E, &TransitionContext<S>) -> Result<(), HandlerError> + Send + Sync>;

/// Side effect run as part of a transition.
///
/// # Example
///
/// ```rust
/// use statekeeper::core::{Handler, HandlerError, StateName, TransitionContext};
///
/// struct Account {
///     balance: i64,
/// }
///
/// let deposit: Handler<StateName, Account> = Handler::new(|account: &mut Account, ctx: &TransitionContext<StateName>| {
///     let amount: i64 = ctx.arg("amount")?;
///     if amount <= 0 {
///         return Err(HandlerError::failed("amount must be positive"));
///     }
///     account.balance += amount;
///     Ok(())
/// });
/// # let _ = deposit;
/// ```
pub struct Handler<S: State, E> {
    run: HandlerFn<S, E>,
}

impl<S: State, E> Handler<S, E> {
    pub fn new<F>(run: F) -> Self
    where
        F: Fn(&mut E, &TransitionContext<S>) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        Self { run: Arc::new(run) }
    }

    pub fn call(&self, entity: &mut E, ctx: &TransitionContext<S>) -> Result<(), HandlerError> {
        (self.run)(entity, ctx)
    }
}

impl<S: State, E> Clone for Handler<S, E> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

impl<S: State, E> fmt::Debug for Handler<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}
