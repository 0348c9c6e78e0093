//! Serializable graph descriptions and Graphviz DOT rendering.
//!
//! Exports carry only what a diagram needs: state names, labels and flags,
//! and one edge per transition source. Nothing flows back into the graph.

use super::StateGraph;
use crate::core::State;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Descriptions longer than this are truncated in node labels.
const MAX_LABEL_LEN: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateNode {
    pub name: String,
    pub label: String,
    pub initial: bool,
    pub public: bool,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEdge {
    pub name: String,
    pub sources: Vec<String>,
    pub target: String,
    pub confirm_needed: bool,
    pub public: bool,
    pub description: Option<String>,
}

/// Everything needed to draw a graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphExport {
    pub kind: String,
    pub states: Vec<StateNode>,
    pub transitions: Vec<TransitionEdge>,
}

/// Layout hints for DOT output.
#[derive(Clone, Debug)]
pub struct DotOptions {
    /// Graphviz layout engine: circo, dot, fdp, neato or twopi
    pub layout: String,
    pub font: String,
}

impl Default for DotOptions {
    fn default() -> Self {
        Self {
            layout: "dot".to_string(),
            font: "Arial".to_string(),
        }
    }
}

impl GraphExport {
    pub fn from_graph<S: State, E>(graph: &StateGraph<S, E>) -> Self {
        let states = graph
            .states()
            .iter()
            .map(|def| StateNode {
                name: def.name().to_string(),
                label: def.display_label().to_string(),
                initial: def.is_initial(),
                public: def.is_public(),
                description: def.description_text().map(str::to_string),
            })
            .collect();

        let transitions = graph
            .transitions()
            .iter()
            .map(|t| TransitionEdge {
                name: t.name().to_string(),
                sources: t.sources().iter().map(|s| s.name().to_string()).collect(),
                target: t.target().name().to_string(),
                confirm_needed: t.confirm_needed(),
                public: t.is_public(),
                description: t.description().map(str::to_string),
            })
            .collect();

        Self {
            kind: graph.kind().to_string(),
            states,
            transitions,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Number of drawn edges: one per (source, target) pair.
    pub fn edge_count(&self) -> usize {
        self.transitions.iter().map(|t| t.sources.len()).sum()
    }

    /// Render the graph as Graphviz DOT source.
    pub fn to_dot(&self, options: &DotOptions) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "digraph {} {{", quote(&format!("state_machine_{}", self.kind)));
        let _ = writeln!(out, "    label={};", quote(&format!("{} State Machine", self.kind)));
        let _ = writeln!(out, "    layout={};", quote(&options.layout));
        let _ = writeln!(out, "    rankdir=TB;");
        let _ = writeln!(out, "    ranksep=0.5;");

        for node in &self.states {
            let shape = if node.initial { "invtrapezium" } else { "rect" };
            let color = if node.public { "black" } else { "lightgrey" };
            let _ = writeln!(
                out,
                "    {} [label={}, shape={}, color={}, fontname={}];",
                quote(&node.name),
                quote(&node_label(node)),
                shape,
                color,
                quote(&options.font),
            );
        }

        for edge in &self.transitions {
            let label = edge.name.split('_').collect::<Vec<_>>().join("\n");
            let style = if edge.confirm_needed { ", style=dotted" } else { "" };
            for source in &edge.sources {
                let _ = writeln!(
                    out,
                    "    {} -> {} [label={}, arrowhead=normal, fontsize=8, fontname={}{}];",
                    quote(source),
                    quote(&edge.target),
                    quote(&label),
                    quote(&options.font),
                    style,
                );
            }
        }

        out.push_str("}\n");
        out
    }
}

fn node_label(node: &StateNode) -> String {
    match &node.description {
        Some(description) => {
            let mut label = if description.chars().count() > MAX_LABEL_LEN {
                let head: String = description.chars().take(MAX_LABEL_LEN - 3).collect();
                format!("{head}...")
            } else {
                description.clone()
            };
            label.push_str(&format!("\n ({})", node.name));
            label
        }
        None => capitalize(&node.name),
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn quote(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    format!("\"{escaped}\"")
}
