//! Builder for declaring and validating state graphs.

use super::error::{GraphDefinitionError, GraphViolation};
use super::transition::{TransitionBuilder, TransitionDefinition};
use super::{unreachable_names, StateGraph, UnreachablePolicy};
use crate::config::EngineConfig;
use crate::core::{State, StateDefinition};
use std::collections::{HashMap, HashSet};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use tracing::{debug, warn};

type Check = Validation<(), NonEmptyVec<GraphViolation>>;

fn ensure(ok: bool, violation: impl FnOnce() -> GraphViolation) -> Check {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(violation())
    }
}

/// Builder for constructing a [`StateGraph`] with a fluent API.
///
/// # Example
///
/// ```
/// use statekeeper::core::StateDefinition;
/// use statekeeper::graph::{StateGraphBuilder, TransitionBuilder};
/// use statekeeper::state_enum;
///
/// state_enum! {
///     enum Doc { Draft = "draft", Published = "published" }
/// }
///
/// let graph = StateGraphBuilder::<Doc, ()>::new("document")
///     .state(StateDefinition::new(Doc::Draft).initial())
///     .state(StateDefinition::new(Doc::Published).public())
///     .transition(TransitionBuilder::new("publish").from(Doc::Draft).to(Doc::Published))
///     .build()
///     .unwrap();
///
/// assert_eq!(graph.initial(), Doc::Draft);
/// ```
pub struct StateGraphBuilder<S: State, E> {
    kind: String,
    states: Vec<StateDefinition<S>>,
    transitions: Vec<TransitionBuilder<S, E>>,
    unreachable: UnreachablePolicy,
}

impl<S: State, E> StateGraphBuilder<S, E> {
    /// Start declaring the graph for one entity kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            states: Vec::new(),
            transitions: Vec::new(),
            unreachable: UnreachablePolicy::default(),
        }
    }

    pub fn state(mut self, state: StateDefinition<S>) -> Self {
        self.states.push(state);
        self
    }

    pub fn states(mut self, states: impl IntoIterator<Item = StateDefinition<S>>) -> Self {
        self.states.extend(states);
        self
    }

    pub fn transition(mut self, transition: TransitionBuilder<S, E>) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn unreachable_states(mut self, policy: UnreachablePolicy) -> Self {
        self.unreachable = policy;
        self
    }

    /// Apply graph-related settings from the engine configuration.
    pub fn configure(self, config: &EngineConfig) -> Self {
        self.unreachable_states(config.unreachable_states)
    }

    /// Validate the declaration and build the graph.
    ///
    /// Every violation is collected before failing, so the returned
    /// [`GraphDefinitionError`] describes the whole declaration.
    pub fn build(self) -> Result<StateGraph<S, E>, GraphDefinitionError> {
        let Self {
            kind,
            states,
            transitions,
            unreachable,
        } = self;

        let mut checks: Vec<Check> = Vec::new();

        let mut seen_states = HashSet::new();
        for def in &states {
            checks.push(ensure(seen_states.insert(def.name().to_string()), || {
                GraphViolation::DuplicateState {
                    name: def.name().to_string(),
                }
            }));
        }

        let initials: Vec<&StateDefinition<S>> = states.iter().filter(|s| s.is_initial()).collect();
        checks.push(match initials.len() {
            0 => Validation::fail(GraphViolation::NoInitialState),
            1 => Validation::success(()),
            _ => Validation::fail(GraphViolation::MultipleInitialStates {
                states: initials.iter().map(|s| s.name().to_string()).collect(),
            }),
        });

        let declared = |state: &S| states.iter().any(|def| def.state() == state);
        let mut seen_transitions = HashSet::new();
        let mut definitions: Vec<TransitionDefinition<S, E>> = Vec::with_capacity(transitions.len());

        for builder in transitions {
            let name = builder.name.clone();
            checks.push(ensure(seen_transitions.insert(name.clone()), || {
                GraphViolation::DuplicateTransition { name: name.clone() }
            }));
            checks.push(ensure(!builder.sources.is_empty(), || {
                GraphViolation::EmptySources {
                    transition: name.clone(),
                }
            }));
            for state in builder.sources.iter().chain(builder.target.iter()) {
                checks.push(ensure(declared(state), || GraphViolation::UnknownState {
                    transition: name.clone(),
                    state: state.name().to_string(),
                }));
            }

            match builder.into_definition() {
                Some(def) => definitions.push(def),
                None => checks.push(Validation::fail(GraphViolation::MissingTarget {
                    transition: name,
                })),
            }
        }

        // Reachability only makes sense once the graph is otherwise sound.
        let structurally_valid = Validation::all_vec(checks).map(|_| ());
        if let Validation::Failure(errors) = structurally_valid {
            let violations: Vec<GraphViolation> = errors.iter().cloned().collect();
            warn!(kind = %kind, count = violations.len(), "rejected state graph");
            return Err(GraphDefinitionError::new(kind, violations));
        }

        let initial = states.iter().position(|s| s.is_initial()).unwrap_or_default();
        let unreachable_states = unreachable_names(&states, &definitions, initial);
        if !unreachable_states.is_empty() {
            match unreachable {
                UnreachablePolicy::Warn => {
                    for state in &unreachable_states {
                        warn!(kind = %kind, state = %state, "state is unreachable from the initial state");
                    }
                }
                UnreachablePolicy::Deny => {
                    let violations = unreachable_states
                        .into_iter()
                        .map(|state| GraphViolation::UnreachableState { state })
                        .collect();
                    return Err(GraphDefinitionError::new(kind, violations));
                }
            }
        }

        let transition_index: HashMap<String, usize> = definitions
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name().to_string(), i))
            .collect();

        debug!(
            kind = %kind,
            states = states.len(),
            transitions = definitions.len(),
            "built state graph"
        );

        Ok(StateGraph {
            kind,
            states,
            transitions: definitions,
            transition_index,
            initial,
        })
    }
}
