//! Context handed to transition handlers.

use super::handler::HandlerError;
use super::state::State;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cooperative cancellation flag shared between a caller and a running handler.
///
/// The integration layer keeps a clone and calls [`cancel`](Self::cancel);
/// handlers observe it through [`TransitionContext::check`]. The engine also
/// checks it once the handler returns, so a cancelled attempt never moves the
/// entity even if the handler ignored the flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// What a handler knows about the attempt it runs in.
#[derive(Clone, Debug)]
pub struct TransitionContext<S: State> {
    pub transition: String,
    pub from: S,
    pub to: S,
    pub args: Value,
    pub started_at: DateTime<Utc>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl<S: State> TransitionContext<S> {
    pub(crate) fn new(transition: &str, from: S, to: S, args: Value) -> Self {
        Self {
            transition: transition.to_string(),
            from,
            to,
            args,
            started_at: Utc::now(),
            timeout: None,
            cancellation: None,
        }
    }

    pub(crate) fn with_limits(
        mut self,
        timeout: Option<Duration>,
        cancellation: Option<CancellationToken>,
    ) -> Self {
        self.timeout = timeout;
        self.cancellation = cancellation;
        self
    }

    /// Time since the attempt started.
    pub fn elapsed(&self) -> Duration {
        Utc::now()
            .signed_duration_since(self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Fail if the attempt was cancelled or ran past its time limit.
    ///
    /// Long-running handlers should call this between steps and return
    /// early with `?`.
    pub fn check(&self) -> Result<(), HandlerError> {
        if self.is_cancelled() {
            return Err(HandlerError::Cancelled);
        }
        if let Some(limit) = self.timeout {
            let elapsed = self.elapsed();
            if elapsed > limit {
                return Err(HandlerError::TimedOut { limit, elapsed });
            }
        }
        Ok(())
    }

    /// Deserialize a named argument.
    ///
    /// ```rust
    /// # use statekeeper::core::HandlerError;
    /// # fn demo(ctx: &statekeeper::core::TransitionContext<statekeeper::core::StateName>) -> Result<(), HandlerError> {
    /// let amount: i64 = ctx.arg("amount")?;
    /// # let _ = amount;
    /// # Ok(())
    /// # }
    /// ```
    pub fn arg<T: DeserializeOwned>(&self, key: &str) -> Result<T, HandlerError> {
        let value = self
            .args
            .get(key)
            .ok_or_else(|| HandlerError::InvalidArgument {
                key: key.to_string(),
                reason: "missing".to_string(),
            })?;
        serde_json::from_value(value.clone()).map_err(|e| HandlerError::InvalidArgument {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Deserialize an optional argument; absent or null yields `None`.
    pub fn opt_arg<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, HandlerError> {
        match self.args.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.arg(key).map(Some),
        }
    }
}
