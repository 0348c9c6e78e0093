//! Document Approval Workflow
//!
//! A multi-stage approval workflow driven through the transition engine.
//!
//! Key concepts:
//! - Linear workflow (Draft -> Review -> Approved -> Published)
//! - Handlers validate arguments and may reject a transition
//! - A confirmation gate on the final publish step
//! - Every attempt, failed or not, ends up in the transition log
//! - Graph export to Graphviz DOT
//!
//! Run with: RUST_LOG=debug cargo run --example document_workflow

use serde::{Deserialize, Serialize};
use serde_json::json;
use statekeeper::core::{
    EntityRef, HandlerError, State, StateDefinition, StateToken, StatefulEntity,
};
use statekeeper::engine::{AttemptRequest, TracingObserver, TransitionEngine};
use statekeeper::graph::export::{DotOptions, GraphExport};
use statekeeper::graph::{StateGraph, StateGraphBuilder, TransitionBuilder};
use statekeeper::state_enum;
use statekeeper::store::{EntityRepository, MemoryStore};
use statekeeper::trigger::{trigger, TriggerRequest};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

state_enum! {
    pub enum DocState {
        Draft = "draft",
        Review = "review",
        Approved = "approved",
        Published = "published",
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Document {
    id: u64,
    content: String,
    reviewer: Option<String>,
    state: DocState,
}

impl StatefulEntity<DocState> for Document {
    fn entity_ref(&self) -> EntityRef {
        EntityRef::new("document", self.id.to_string())
    }

    fn current_state(&self) -> &DocState {
        &self.state
    }

    fn set_current_state(&mut self, state: DocState, _token: StateToken) {
        self.state = state;
    }
}

fn document_graph() -> StateGraph<DocState, Document> {
    StateGraphBuilder::new("document")
        .state(
            StateDefinition::new(DocState::Draft)
                .initial()
                .label("Draft")
                .description("Being written"),
        )
        .state(StateDefinition::new(DocState::Review).label("In review"))
        .state(StateDefinition::new(DocState::Approved).label("Approved"))
        .state(
            StateDefinition::new(DocState::Published)
                .public()
                .label("Published")
                .description("Visible to every reader of the site"),
        )
        .transition(
            TransitionBuilder::new("submit_for_review")
                .from(DocState::Draft)
                .to(DocState::Review)
                .public()
                .handle(|doc: &mut Document, ctx| {
                    let reviewer: String = ctx.arg("reviewer")?;
                    if doc.content.split_whitespace().count() < 5 {
                        return Err(HandlerError::failed("document is too short to review"));
                    }
                    doc.reviewer = Some(reviewer);
                    Ok(())
                }),
        )
        .transition(
            TransitionBuilder::new("approve")
                .from(DocState::Review)
                .to(DocState::Approved)
                .public(),
        )
        .transition(
            TransitionBuilder::new("request_changes")
                .from_any([DocState::Review, DocState::Approved])
                .to(DocState::Draft)
                .public(),
        )
        .transition(
            TransitionBuilder::new("publish")
                .from(DocState::Approved)
                .to(DocState::Published)
                .confirm_needed()
                .public()
                .description("Make the document visible"),
        )
        .build()
        .expect("document graph is well formed")
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Document Approval Workflow ===\n");

    let graph = document_graph();
    let store: Arc<MemoryStore<DocState, Document>> = Arc::new(MemoryStore::new());
    let engine = TransitionEngine::new(Arc::clone(&store)).with_observer(TracingObserver);

    let mut doc = Document {
        id: 1,
        content: "Short".to_string(),
        reviewer: None,
        state: graph.initial(),
    };
    store.save(&doc).expect("save document");

    println!("1. Submitting a document that is too short");
    let result = engine.attempt(
        &mut doc,
        &graph,
        AttemptRequest::new("submit_for_review").args(json!({"reviewer": "ana"})),
    );
    if let Some(error) = result.error() {
        println!("   Rejected: {}", error);
    }
    println!("   State: {}\n", doc.state.name());

    println!("2. Publishing straight from draft");
    let result = engine.attempt(&mut doc, &graph, AttemptRequest::new("publish").confirmed());
    if let Some(error) = result.error() {
        println!("   Rejected: {}\n", error);
    }

    println!("3. Expanding the document and going through review");
    doc.content = "A document with enough words for a reviewer".to_string();
    store.save(&doc).expect("save document");
    for request in [
        AttemptRequest::new("submit_for_review").args(json!({"reviewer": "ana"})),
        AttemptRequest::new("approve"),
    ] {
        let name = request.transition.clone();
        let result = engine.attempt(&mut doc, &graph, request);
        println!("   {} -> success: {}", name, result.is_success());
    }
    println!("   Reviewer: {:?}\n", doc.reviewer);

    println!("4. Publishing through a trigger request");
    let request = TriggerRequest {
        entity_id: "1".to_string(),
        transition: "publish".to_string(),
        confirmed: false,
        args: json!(null),
    };
    let response = trigger(&engine, store.as_ref(), &graph, request.clone());
    println!("   {} {:?}", response.status_code(), response);

    let confirmed = TriggerRequest {
        confirmed: true,
        ..request
    };
    let response = trigger(&engine, store.as_ref(), &graph, confirmed);
    println!("   {} {:?}\n", response.status_code(), response);

    println!("5. Transition log");
    let history = engine.history(&doc).expect("read history");
    for entry in &history {
        println!(
            "   {:<20} {:<10} -> {:<10} {:?}",
            entry.transition_name(),
            entry.from_state().name(),
            entry.to_state().map(|s| s.name()).unwrap_or("-"),
            entry.outcome()
        );
    }
    let path: Vec<_> = history.path().iter().map(|s| s.name()).collect();
    println!("   Path: {}\n", path.join(" -> "));

    println!("6. Graphviz export");
    let export = GraphExport::from_graph(&graph);
    println!("{}", export.to_dot(&DotOptions::default()));
}
