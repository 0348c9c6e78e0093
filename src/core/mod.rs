//! Core types for per-entity state machines.
//!
//! This module contains the building blocks the rest of the crate is
//! assembled from:
//! - State values via the `State` trait and their `StateDefinition` metadata
//! - The `StatefulEntity` capability implemented by governed records
//! - Typed transition handlers and the context they run in
//! - Immutable transition log entries and ordered history views

mod context;
mod entity;
mod handler;
mod history;
mod state;

pub use context::{CancellationToken, TransitionContext};
pub use entity::{EntityRef, StateToken, StatefulEntity};
pub use handler::{Handler, HandlerError};
pub use history::{ErrorDetail, ErrorKind, History, Outcome, TransitionLogEntry};
pub use state::{State, StateDefinition, StateName};
