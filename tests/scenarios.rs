//! End-to-end scenarios for the transition engine.

use serde_json::json;
use statekeeper::core::{
    EntityRef, ErrorKind, HandlerError, Outcome, StateDefinition, StateToken, StatefulEntity,
};
use statekeeper::engine::{AttemptRequest, TransitionEngine, TransitionError};
use statekeeper::graph::{StateGraph, StateGraphBuilder, TransitionBuilder};
use statekeeper::state_enum;
use statekeeper::store::{EntityRepository, MemoryStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

state_enum! {
    pub enum DocState {
        Draft = "draft",
        Review = "review",
        Published = "published",
        Archived = "archived",
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Document {
    id: u32,
    state: DocState,
    budget: i64,
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

type Store = MemoryStore<DocState, Document>;
type Engine = TransitionEngine<DocState, Document, Store>;

fn document(id: u32, state: DocState) -> Document {
    Document {
        id,
        state,
        budget: 0,
    }
}

fn graph(archive_calls: Arc<AtomicUsize>) -> StateGraph<DocState, Document> {
    StateGraphBuilder::new("document")
        .state(StateDefinition::new(DocState::Draft).initial())
        .state(StateDefinition::new(DocState::Review))
        .state(StateDefinition::new(DocState::Published).public())
        .state(StateDefinition::new(DocState::Archived))
        .transition(
            TransitionBuilder::new("publish")
                .from(DocState::Draft)
                .to(DocState::Published),
        )
        .transition(
            TransitionBuilder::new("submit")
                .from(DocState::Draft)
                .to(DocState::Review),
        )
        .transition(
            TransitionBuilder::new("fund")
                .from_any([DocState::Draft, DocState::Review])
                .to(DocState::Review)
                .handle(|doc: &mut Document, ctx| {
                    let amount: i64 = ctx.arg("amount")?;
                    doc.budget += amount;
                    if amount < 0 {
                        return Err(HandlerError::failed("amount must not be negative"));
                    }
                    Ok(())
                }),
        )
        .transition(
            TransitionBuilder::new("archive")
                .from(DocState::Published)
                .to(DocState::Archived)
                .confirm_needed()
                .handle(move |_doc: &mut Document, _ctx| {
                    archive_calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
        )
        .build()
        .unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn setup(doc: &Document) -> (Engine, StateGraph<DocState, Document>, Arc<AtomicUsize>) {
    init_tracing();
    let store = Arc::new(Store::new());
    store.save(doc).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    (TransitionEngine::new(store), graph(Arc::clone(&calls)), calls)
}

#[test]
fn legal_transition_moves_entity_and_logs_success() {
    let mut doc = document(1, DocState::Draft);
    let (engine, graph, _) = setup(&doc);

    let result = engine.attempt(&mut doc, &graph, AttemptRequest::new("publish"));

    assert!(result.is_success());
    assert_eq!(doc.state, DocState::Published);

    let history = engine.history(&doc).unwrap();
    assert_eq!(history.len(), 1);
    let entry = &history.entries()[0];
    assert_eq!(entry.transition_name(), "publish");
    assert_eq!(entry.from_state(), &DocState::Draft);
    assert_eq!(entry.to_state(), Some(&DocState::Published));
    assert_eq!(entry.outcome(), Outcome::Success);

    let stored = engine.store().load(&doc.entity_ref()).unwrap();
    assert_eq!(stored.state, DocState::Published);
}

#[test]
fn illegal_transition_is_rejected_and_logged() {
    let mut doc = document(2, DocState::Published);
    let (engine, graph, _) = setup(&doc);

    let result = engine.attempt(&mut doc, &graph, AttemptRequest::new("publish"));

    assert!(matches!(
        result.error(),
        Some(TransitionError::IllegalTransition { .. })
    ));
    assert_eq!(doc.state, DocState::Published);

    let history = engine.history(&doc).unwrap();
    assert_eq!(history.len(), 1);
    let entry = &history.entries()[0];
    assert_eq!(entry.outcome(), Outcome::Failure);
    assert!(entry.to_state().is_none());
    assert_eq!(
        entry.error_detail().map(|d| d.kind),
        Some(ErrorKind::IllegalTransition)
    );
}

#[test]
fn confirmation_is_required_before_handler_runs() {
    let mut doc = document(3, DocState::Published);
    let (engine, graph, calls) = setup(&doc);

    let unconfirmed = engine.attempt(&mut doc, &graph, AttemptRequest::new("archive"));
    assert!(matches!(
        unconfirmed.error(),
        Some(TransitionError::ConfirmationRequired { .. })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(doc.state, DocState::Published);

    let confirmed = engine.attempt(
        &mut doc,
        &graph,
        AttemptRequest::new("archive").confirmed(),
    );
    assert!(confirmed.is_success());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(doc.state, DocState::Archived);
    assert_eq!(engine.history(&doc).unwrap().len(), 2);
}

#[test]
fn handler_failure_leaves_entity_untouched() {
    let mut doc = document(4, DocState::Draft);
    let (engine, graph, _) = setup(&doc);

    let failed = engine.attempt(
        &mut doc,
        &graph,
        AttemptRequest::new("fund").args(json!({"amount": -1})),
    );
    assert!(matches!(
        failed.error(),
        Some(TransitionError::Handler { .. })
    ));
    assert_eq!(doc, document(4, DocState::Draft));

    let funded = engine.attempt(
        &mut doc,
        &graph,
        AttemptRequest::new("fund").args(json!({"amount": 5})),
    );
    assert!(funded.is_success());
    assert_eq!(doc.state, DocState::Review);
    assert_eq!(doc.budget, 5);

    let kinds: Vec<_> = engine
        .history(&doc)
        .unwrap()
        .iter()
        .map(|e| e.outcome())
        .collect();
    assert_eq!(kinds, vec![Outcome::Failure, Outcome::Success]);
}

#[test]
fn transitions_from_keeps_declaration_order() {
    let graph = graph(Arc::new(AtomicUsize::new(0)));

    let names: Vec<_> = graph
        .transitions_from(&DocState::Draft)
        .iter()
        .map(|t| t.name())
        .collect();

    assert_eq!(names, vec!["publish", "submit", "fund"]);
    assert!(graph.transitions_from(&DocState::Archived).is_empty());
}

#[test]
fn unknown_transition_is_logged_without_mutation() {
    let mut doc = document(5, DocState::Draft);
    let (engine, graph, _) = setup(&doc);

    let result = engine.attempt(&mut doc, &graph, AttemptRequest::new("teleport"));

    assert!(matches!(
        result.error(),
        Some(TransitionError::UnknownTransition { .. })
    ));
    assert_eq!(doc.state, DocState::Draft);
    assert_eq!(engine.history(&doc).unwrap().len(), 1);
}

#[test]
fn entity_changes_only_on_success() {
    let mut doc = document(6, DocState::Draft);
    let (engine, graph, _) = setup(&doc);
    let attempts = [
        ("archive", json!(null)),
        ("fund", json!({"amount": -3})),
        ("fund", json!({})),
        ("submit", json!(null)),
        ("submit", json!(null)),
        ("fund", json!({"amount": 2})),
    ];

    let count = attempts.len();

    for (i, (name, args)) in attempts.into_iter().enumerate() {
        let before = doc.clone();
        let result = engine.attempt(&mut doc, &graph, AttemptRequest::new(name).args(args));
        if result.is_success() {
            let last = engine.history(&doc).unwrap();
            assert_eq!(last.last().and_then(|e| e.to_state()), Some(&doc.state));
        } else {
            assert_eq!(before, doc, "attempt {i} mutated the entity");
        }
    }

    let history = engine.history(&doc).unwrap();
    assert_eq!(history.len(), count);
    assert_eq!(history.successes().count(), 2);
    assert_eq!(
        history.path(),
        vec![&DocState::Draft, &DocState::Review, &DocState::Review]
    );
}
