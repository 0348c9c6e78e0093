//! State values and their declared metadata.
//!
//! A state value is any type implementing [`State`], typically an enum
//! generated with [`state_enum!`](crate::state_enum). The metadata that a
//! graph attaches to each state lives in [`StateDefinition`].

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for the state values an entity can hold.
///
/// All methods are pure. The name is the state's identity inside a
/// [`StateGraph`](crate::graph::StateGraph) and is what gets written to
/// logs and exports.
///
/// # Required Traits
///
/// - `Clone`: states are copied into log entries and results
/// - `PartialEq`: source-state membership checks
/// - `Debug`: diagnostics
/// - `Serialize` + `Deserialize`: log entries and checkpoints are persisted
///
/// # Example
///
/// ```rust
/// use statekeeper::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Article {
///     Draft,
///     Published,
/// }
///
/// impl State for Article {
///     fn name(&self) -> &str {
///         match self {
///             Self::Draft => "draft",
///             Self::Published => "published",
///         }
///     }
/// }
///
/// assert_eq!(Article::Draft.name(), "draft");
/// ```
pub trait State:
    Clone + PartialEq + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync
{
    /// The state's unique name within its graph.
    fn name(&self) -> &str;
}

/// A state identified only by its name.
///
/// Useful when graphs are assembled at runtime, e.g. from configuration,
/// rather than from a Rust enum.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateName(String);

impl StateName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl State for StateName {
    fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StateName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl std::fmt::Display for StateName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declared metadata for one state of a graph.
///
/// Built fluently and handed to
/// [`StateGraphBuilder::state`](crate::graph::StateGraphBuilder::state).
///
/// ```rust
/// use statekeeper::core::StateDefinition;
/// # use statekeeper::state_enum;
/// # state_enum! { enum Doc { Draft } }
///
/// let draft = StateDefinition::new(Doc::Draft)
///     .initial()
///     .label("Draft")
///     .description("Not yet visible to readers");
///
/// assert!(draft.is_initial());
/// assert!(!draft.is_public());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateDefinition<S: State> {
    state: S,
    label: Option<String>,
    initial: bool,
    public: bool,
    description: Option<String>,
}

impl<S: State> StateDefinition<S> {
    pub fn new(state: S) -> Self {
        Self {
            state,
            label: None,
            initial: false,
            public: false,
            description: None,
        }
    }

    /// Mark this state as the graph's initial state.
    pub fn initial(mut self) -> Self {
        self.initial = true;
        self
    }

    /// Allow external actors to target this state directly.
    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn name(&self) -> &str {
        self.state.name()
    }

    /// Human label, falling back to the state name.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or_else(|| self.state.name())
    }

    pub fn is_initial(&self) -> bool {
        self.initial
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }
}
