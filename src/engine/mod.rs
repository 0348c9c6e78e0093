//! Executing transitions.
//!
//! The [`TransitionEngine`] is where the guarantees live:
//! - a transition only fires from a state it declares as a source
//! - a confirmation-gated transition never runs its handler unconfirmed
//! - a failed handler, cancellation or storage failure leaves the entity untouched
//! - every attempt, failed or not, is committed to the transition log
//!
//! Attempts are synchronous and run on the caller's thread.

mod machine;
mod observer;
mod result;

pub use machine::TransitionEngine;
pub use observer::{TracingObserver, TransitionEvent, TransitionObserver};
pub use result::{AttemptRequest, TransitionError, TransitionResult};
