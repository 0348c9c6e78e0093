//! Statekeeper: per-entity finite state machines with an audit trail
//!
//! A [`StateGraph`] declares the states an entity type can be in and the
//! named transitions between them. The [`TransitionEngine`] is the only
//! path through which an entity's state changes: it checks the transition
//! against the graph, runs the transition's handler, commits the new state
//! and appends one [`TransitionLogEntry`] for every attempt, whether it
//! succeeded or not.
//!
//! # Core Concepts
//!
//! - **State**: a value implementing [`State`], usually from [`state_enum!`]
//! - **StatefulEntity**: the contract a record implements to be governed
//! - **Handler**: side-effecting work a transition runs before it commits
//! - **History**: the ordered, immutable log of an entity's attempts
//!
//! # Example
//!
//! ```rust
//! use statekeeper::core::{EntityRef, StateDefinition, StateToken, StatefulEntity};
//! use statekeeper::engine::{AttemptRequest, TransitionEngine};
//! use statekeeper::graph::{StateGraphBuilder, TransitionBuilder};
//! use statekeeper::store::{EntityRepository, MemoryStore};
//! use statekeeper::state_enum;
//! use std::sync::Arc;
//!
//! state_enum! {
//!     pub enum DocState {
//!         Draft = "draft",
//!         Published = "published",
//!     }
//! }
//!
//! #[derive(Clone, Debug)]
//! struct Doc {
//!     id: u32,
//!     state: DocState,
//! }
//!
//! impl StatefulEntity<DocState> for Doc {
//!     fn entity_ref(&self) -> EntityRef {
//!         EntityRef::new("doc", self.id.to_string())
//!     }
//!
//!     fn current_state(&self) -> &DocState {
//!         &self.state
//!     }
//!
//!     fn set_current_state(&mut self, state: DocState, _token: StateToken) {
//!         self.state = state;
//!     }
//! }
//!
//! let graph = StateGraphBuilder::new("doc")
//!     .state(StateDefinition::new(DocState::Draft).initial())
//!     .state(StateDefinition::new(DocState::Published))
//!     .transition(
//!         TransitionBuilder::new("publish")
//!             .from(DocState::Draft)
//!             .to(DocState::Published),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let store: Arc<MemoryStore<DocState, Doc>> = Arc::new(MemoryStore::new());
//! let mut doc = Doc { id: 1, state: DocState::Draft };
//! store.save(&doc).unwrap();
//!
//! let engine = TransitionEngine::new(Arc::clone(&store));
//! let result = engine.attempt(&mut doc, &graph, AttemptRequest::new("publish"));
//!
//! assert!(result.is_success());
//! assert_eq!(doc.state, DocState::Published);
//! assert_eq!(engine.history(&doc).unwrap().len(), 1);
//! ```

pub mod config;
pub mod core;
pub mod engine;
pub mod graph;
pub mod store;
pub mod trigger;

// Re-export commonly used types
pub use crate::config::EngineConfig;
pub use crate::core::{
    EntityRef, Handler, HandlerError, History, State, StateDefinition, StatefulEntity,
    TransitionContext, TransitionLogEntry,
};
pub use crate::engine::{AttemptRequest, TransitionEngine, TransitionError, TransitionResult};
pub use crate::graph::{StateGraph, StateGraphBuilder, TransitionBuilder};
pub use crate::store::{EntityRepository, MemoryStore, PersistenceError, TransitionLogRecorder};
