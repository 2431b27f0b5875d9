//! Portable flow documents: `{ nodes: [...], edges: [...] }`.
//!
//! JSON is the exchange format (share envelopes, the web front-end);
//! MessagePack with named fields is the compact storage format.

use crate::error::{EntityKind, FlowError};
use crate::id::{EdgeId, NodeId};
use crate::model::{FlowEdge, FlowGraph, FlowNode};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowDocument {
    #[serde(default)]
    pub nodes: Vec<FlowNode>,
    #[serde(default)]
    pub edges: Vec<FlowEdge>,
}

impl FlowDocument {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn to_json(&self) -> Result<String, FlowError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, FlowError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, FlowError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_value(&self) -> Result<serde_json::Value, FlowError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, FlowError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, FlowError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, FlowError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Structural equality of the node and edge sets, ignoring order.
    pub fn same_structure(&self, other: &FlowDocument) -> bool {
        fn sorted_nodes(doc: &FlowDocument) -> Vec<&FlowNode> {
            let mut v: Vec<&FlowNode> = doc.nodes.iter().collect();
            v.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
            v
        }
        fn sorted_edges(doc: &FlowDocument) -> Vec<&FlowEdge> {
            let mut v: Vec<&FlowEdge> = doc.edges.iter().collect();
            v.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
            v
        }
        self.nodes.len() == other.nodes.len()
            && self.edges.len() == other.edges.len()
            && sorted_nodes(self) == sorted_nodes(other)
            && sorted_edges(self) == sorted_edges(other)
    }

    /// A copy with every node and edge id replaced by a freshly generated
    /// one, positions shifted by `(dx, dy)`. Used when merging a document
    /// into a flow that may already use the same ids.
    pub fn with_fresh_ids(&self, dx: f64, dy: f64) -> FlowDocument {
        let mapping: HashMap<NodeId, NodeId> = self
            .nodes
            .iter()
            .map(|n| (n.id, NodeId::generate()))
            .collect();
        let nodes = self
            .nodes
            .iter()
            .map(|n| FlowNode {
                id: mapping[&n.id],
                position: n.position.translated(dx, dy),
                ..n.clone()
            })
            .collect();
        let edges = self
            .edges
            .iter()
            .filter_map(|e| {
                let (Some(&source), Some(&target)) = (mapping.get(&e.source), mapping.get(&e.target))
                else {
                    log::warn!("dropping dangling edge {} while remapping ids", e.id);
                    return None;
                };
                Some(FlowEdge {
                    id: EdgeId::generate(),
                    source,
                    target,
                    ..e.clone()
                })
            })
            .collect();
        FlowDocument { nodes, edges }
    }
}

impl FlowGraph {
    /// Serialize to a document, preserving insertion order.
    pub fn to_document(&self) -> FlowDocument {
        FlowDocument {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().cloned().collect(),
        }
    }

    /// Build a graph from a document, validating referential integrity.
    pub fn from_document(doc: &FlowDocument) -> Result<FlowGraph, FlowError> {
        let mut graph = FlowGraph::new();
        for node in &doc.nodes {
            if graph.contains_node(node.id) {
                return Err(FlowError::InvalidDocument(format!(
                    "duplicate node id '{}'",
                    node.id
                )));
            }
            graph.insert_node(node.clone());
        }
        let mut seen_edges = HashSet::new();
        for edge in &doc.edges {
            if !seen_edges.insert(edge.id) {
                return Err(FlowError::InvalidDocument(format!(
                    "duplicate edge id '{}'",
                    edge.id
                )));
            }
            if graph.insert_edge(edge.clone()).is_none() {
                let missing = if graph.contains_node(edge.source) {
                    edge.target
                } else {
                    edge.source
                };
                return Err(FlowError::invalid_edge(
                    edge.source,
                    edge.target,
                    &FlowError::not_found(EntityKind::Node, missing).to_string(),
                ));
            }
        }
        log::debug!(
            "loaded flow document: {} node(s), {} edge(s)",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }
}
