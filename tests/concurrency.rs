//! Concurrent attempts against one stored entity.

use statekeeper::core::{EntityRef, ErrorKind, StateDefinition, StateToken, StatefulEntity};
use statekeeper::engine::{AttemptRequest, TransitionEngine, TransitionError};
use statekeeper::graph::{StateGraph, StateGraphBuilder, TransitionBuilder};
use statekeeper::state_enum;
use statekeeper::store::{EntityRepository, MemoryStore, PersistenceError, TransitionLogRecorder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

state_enum! {
    enum OrderState {
        Placed = "placed",
        Paid = "paid",
        Shipped = "shipped",
    }
}

#[derive(Clone, Debug)]
struct Order {
    id: u32,
    state: OrderState,
}

impl StatefulEntity<OrderState> for Order {
    fn entity_ref(&self) -> EntityRef {
        EntityRef::new("order", self.id.to_string())
    }

    fn current_state(&self) -> &OrderState {
        &self.state
    }

    fn set_current_state(&mut self, state: OrderState, _token: StateToken) {
        self.state = state;
    }
}

type Store = MemoryStore<OrderState, Order>;

fn graph() -> StateGraph<OrderState, Order> {
    StateGraphBuilder::new("order")
        .state(StateDefinition::new(OrderState::Placed).initial())
        .state(StateDefinition::new(OrderState::Paid))
        .state(StateDefinition::new(OrderState::Shipped))
        .transition(
            TransitionBuilder::new("pay")
                .from(OrderState::Placed)
                .to(OrderState::Paid)
                .handle(|_order: &mut Order, _ctx| {
                    thread::yield_now();
                    Ok(())
                }),
        )
        .transition(
            TransitionBuilder::new("ship")
                .from(OrderState::Paid)
                .to(OrderState::Shipped),
        )
        .build()
        .unwrap()
}

fn order_ref(id: u32) -> EntityRef {
    EntityRef::new("order", id.to_string())
}

#[test]
fn only_one_racing_attempt_wins() {
    const WORKERS: usize = 8;

    let store = Arc::new(Store::new());
    store
        .save(&Order {
            id: 1,
            state: OrderState::Placed,
        })
        .unwrap();
    let engine = TransitionEngine::new(Arc::clone(&store));
    let graph = graph();
    let barrier = Barrier::new(WORKERS);

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..WORKERS)
            .map(|_| {
                scope.spawn(|| {
                    let mut order = store.load(&order_ref(1)).unwrap();
                    barrier.wait();
                    let result = engine.attempt(&mut order, &graph, AttemptRequest::new("pay"));
                    (result, order)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners: Vec<_> = results.iter().filter(|(r, _)| r.is_success()).collect();
    assert_eq!(winners.len(), 1);

    for (result, order) in &results {
        if !result.is_success() {
            assert_eq!(order.state, OrderState::Placed);
            assert!(matches!(
                result.error(),
                Some(TransitionError::Persistence(PersistenceError::Conflict { .. }))
                    | Some(TransitionError::IllegalTransition { .. })
            ));
        }
    }

    let history = store.history(&order_ref(1)).unwrap();
    assert_eq!(history.len(), WORKERS);
    assert_eq!(history.successes().count(), 1);
    assert_eq!(store.load(&order_ref(1)).unwrap().state, OrderState::Paid);
}

#[test]
fn history_reads_only_ever_grow_at_the_end() {
    const WRITERS: usize = 4;
    const ATTEMPTS: usize = 50;

    let store = Arc::new(Store::new());
    store
        .save(&Order {
            id: 1,
            state: OrderState::Placed,
        })
        .unwrap();
    let engine = TransitionEngine::new(Arc::clone(&store));
    let graph = graph();
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        let reader = scope.spawn(|| {
            let mut previous: Vec<uuid::Uuid> = Vec::new();
            let mut reads = 0;
            while !done.load(Ordering::SeqCst) || reads == 0 {
                let ids: Vec<_> = store
                    .history(&order_ref(1))
                    .unwrap()
                    .iter()
                    .map(|e| e.id())
                    .collect();
                assert!(ids.len() >= previous.len());
                assert_eq!(&ids[..previous.len()], &previous[..]);
                previous = ids;
                reads += 1;
            }
        });

        let writers: Vec<_> = (0..WRITERS)
            .map(|_| {
                scope.spawn(|| {
                    let mut order = store.load(&order_ref(1)).unwrap();
                    for _ in 0..ATTEMPTS {
                        engine.attempt(&mut order, &graph, AttemptRequest::new("ship"));
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
        done.store(true, Ordering::SeqCst);
        reader.join().unwrap();
    });

    let history = store.history(&order_ref(1)).unwrap();
    assert_eq!(history.len(), WRITERS * ATTEMPTS);
    assert!(history
        .entries()
        .windows(2)
        .all(|pair| pair[0].timestamp() <= pair[1].timestamp()));
}

#[tokio::test]
async fn blocking_tasks_on_distinct_entities_all_succeed() {
    let store = Arc::new(Store::new());
    for id in 0..16 {
        store
            .save(&Order {
                id,
                state: OrderState::Placed,
            })
            .unwrap();
    }
    let engine = Arc::new(TransitionEngine::new(Arc::clone(&store)));
    let graph = Arc::new(graph());

    let tasks: Vec<_> = (0..16)
        .map(|id| {
            let engine = Arc::clone(&engine);
            let graph = Arc::clone(&graph);
            let store = Arc::clone(&store);
            tokio::task::spawn_blocking(move || {
                let mut order = store.load(&order_ref(id)).unwrap();
                let paid = engine.attempt(&mut order, &graph, AttemptRequest::new("pay"));
                let shipped = engine.attempt(&mut order, &graph, AttemptRequest::new("ship"));
                paid.is_success() && shipped.is_success()
            })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap());
    }

    assert_eq!(store.log_len(), 32);
    for id in 0..16 {
        let history = store.history(&order_ref(id)).unwrap();
        let names: Vec<_> = history.iter().map(|e| e.transition_name()).collect();
        assert_eq!(names, vec!["pay", "ship"]);
        assert!(history.iter().all(|e| e.error_detail().map(|d| d.kind) != Some(ErrorKind::Persistence)));
    }
}
