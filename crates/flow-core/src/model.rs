//! Core graph model for technique flows.
//!
//! A flow is a directed graph: nodes are techniques, positions (conditions)
//! or notes placed in canvas space, edges are labelled transitions between
//! them. The graph is a plain container. Policy (self-loops, duplicate
//! pairs, "not found" errors) is enforced by the edit operations that sit
//! on top of it; the container only refuses what petgraph itself cannot
//! represent, i.e. an edge whose endpoint does not exist.

use crate::id::{EdgeId, NodeId};
use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

// ─── Position ────────────────────────────────────────────────────────────

/// A point in canvas space (independent of pan/zoom).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<Position> for kurbo::Point {
    fn from(p: Position) -> Self {
        kurbo::Point::new(p.x, p.y)
    }
}

impl From<kurbo::Point> for Position {
    fn from(p: kurbo::Point) -> Self {
        Position::new(p.x, p.y)
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// What a node stands for. Controls default rendering and whether `ref_id`
/// is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A technique; may point into the technique library via `ref_id`.
    #[default]
    Technique,
    /// A position or situational condition ("opponent in half guard").
    #[serde(alias = "position")]
    Condition,
    /// Free-form annotation.
    Note,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Technique => "technique",
            NodeKind::Condition => "condition",
            NodeKind::Note => "note",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "technique" => Some(NodeKind::Technique),
            "condition" | "position" => Some(NodeKind::Condition),
            "note" => Some(NodeKind::Note),
            _ => None,
        }
    }
}

/// A single node in the flow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    pub id: NodeId,
    pub kind: NodeKind,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    pub position: Position,
}

impl FlowNode {
    pub fn new(id: NodeId, kind: NodeKind, position: Position) -> Self {
        Self {
            id,
            kind,
            label: String::new(),
            ref_id: None,
            position,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_ref(mut self, ref_id: impl Into<String>) -> Self {
        self.ref_id = Some(ref_id.into());
        self
    }

    /// Text to draw for this node. Empty labels fall back to a placeholder.
    pub fn display_label(&self) -> &str {
        if !self.label.trim().is_empty() {
            return &self.label;
        }
        match self.kind {
            NodeKind::Technique => "Technique",
            _ => "Node",
        }
    }
}

/// Partial update for a node. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodePatch {
    pub kind: Option<NodeKind>,
    pub label: Option<String>,
    /// `Some(None)` clears the technique reference.
    pub ref_id: Option<Option<String>>,
    pub position: Option<Position>,
}

impl NodePatch {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    /// A patch that restores every field of `node`.
    pub fn restoring(node: &FlowNode) -> Self {
        Self {
            kind: Some(node.kind),
            label: Some(node.label.clone()),
            ref_id: Some(node.ref_id.clone()),
            position: Some(node.position),
        }
    }

    pub fn apply_to(&self, node: &mut FlowNode) {
        if let Some(kind) = self.kind {
            node.kind = kind;
        }
        if let Some(label) = &self.label {
            node.label = label.clone();
        }
        if let Some(ref_id) = &self.ref_id {
            node.ref_id = ref_id.clone();
        }
        if let Some(position) = self.position {
            node.position = position;
        }
    }
}

// ─── Edges ───────────────────────────────────────────────────────────────

/// Cosmetic edge category. Only affects stroke colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    #[default]
    Default,
    Success,
    Counter,
}

impl EdgeType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "" => Some(EdgeType::Default),
            "success" => Some(EdgeType::Success),
            "counter" => Some(EdgeType::Counter),
            _ => None,
        }
    }
}

/// A directed, optionally labelled transition between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub edge_type: EdgeType,
}

impl FlowEdge {
    pub fn new(id: EdgeId, source: NodeId, target: NodeId) -> Self {
        Self {
            id,
            source,
            target,
            label: None,
            edge_type: EdgeType::Default,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = normalize_label(Some(label.into()));
        self
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// Trim an edge label; blank labels become `None`.
pub fn normalize_label(label: Option<String>) -> Option<String> {
    label.and_then(|l| {
        let trimmed = l.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Partial update for an edge. Endpoints are immutable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EdgePatch {
    /// `Some(None)` clears the label.
    pub label: Option<Option<String>>,
    pub edge_type: Option<EdgeType>,
}

impl EdgePatch {
    pub fn label(label: Option<String>) -> Self {
        Self {
            label: Some(label),
            ..Default::default()
        }
    }

    pub fn restoring(edge: &FlowEdge) -> Self {
        Self {
            label: Some(edge.label.clone()),
            edge_type: Some(edge.edge_type),
        }
    }

    pub fn apply_to(&self, edge: &mut FlowEdge) {
        if let Some(label) = &self.label {
            edge.label = normalize_label(label.clone());
        }
        if let Some(edge_type) = self.edge_type {
            edge.edge_type = edge_type;
        }
    }
}

// ─── Flow graph ──────────────────────────────────────────────────────────

/// A node removed from the graph together with the edges that went with it.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedNode {
    pub node: FlowNode,
    pub edges: Vec<FlowEdge>,
}

/// The node/edge container of one flow.
///
/// Backed by a `StableDiGraph` so indices survive removals. Insertion order
/// is tracked separately: it is the render (z) order and the order used by
/// hit-testing and serialization, and petgraph reuses vacant slots.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    graph: StableDiGraph<FlowNode, FlowEdge>,
    node_index: HashMap<NodeId, NodeIndex>,
    edge_index: HashMap<EdgeId, EdgeIndex>,
    node_order: Vec<NodeId>,
    edge_order: Vec<EdgeId>,
}

impl FlowGraph {
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            node_index: HashMap::new(),
            edge_index: HashMap::new(),
            node_order: Vec::new(),
            edge_order: Vec::new(),
        }
    }

    /// Insert a node. A node with the same id is replaced in place and keeps
    /// its position in the ordering and its edges.
    pub fn insert_node(&mut self, node: FlowNode) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(&node.id) {
            self.graph[idx] = node;
            return idx;
        }
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.node_index.insert(id, idx);
        self.node_order.push(id);
        idx
    }

    /// Remove a node and every edge that references it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<RemovedNode> {
        let idx = self.node_index.get(&id).copied()?;
        let incident = self.incident_edges(id);
        let mut edges = Vec::with_capacity(incident.len());
        for edge_id in incident {
            if let Some(edge) = self.remove_edge(edge_id) {
                edges.push(edge);
            }
        }
        let node = self.graph.remove_node(idx)?;
        self.node_index.remove(&id);
        self.node_order.retain(|n| *n != id);
        log::trace!("removed node {id} with {} edge(s)", edges.len());
        Some(RemovedNode { node, edges })
    }

    /// Insert an edge. Returns `None` when either endpoint is missing.
    /// An edge with the same id is replaced and keeps its ordering slot.
    pub fn insert_edge(&mut self, edge: FlowEdge) -> Option<EdgeIndex> {
        let from = self.node_index.get(&edge.source).copied()?;
        let to = self.node_index.get(&edge.target).copied()?;
        let id = edge.id;
        let replaced = match self.edge_index.remove(&id) {
            Some(old) => {
                self.graph.remove_edge(old);
                true
            }
            None => false,
        };
        let idx = self.graph.add_edge(from, to, edge);
        self.edge_index.insert(id, idx);
        if !replaced {
            self.edge_order.push(id);
        }
        Some(idx)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Option<FlowEdge> {
        let idx = self.edge_index.remove(&id)?;
        self.edge_order.retain(|e| *e != id);
        self.graph.remove_edge(idx)
    }

    pub fn node(&self, id: NodeId) -> Option<&FlowNode> {
        self.node_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn edge(&self, id: EdgeId) -> Option<&FlowEdge> {
        self.edge_index.get(&id).map(|idx| &self.graph[*idx])
    }

    /// Mutable access to a node. Callers must not change `id`.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut FlowNode> {
        let idx = *self.node_index.get(&id)?;
        self.graph.node_weight_mut(idx)
    }

    /// Mutable access to an edge. Callers must not change `id` or endpoints;
    /// re-insert the edge to move it.
    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut FlowEdge> {
        let idx = *self.edge_index.get(&id)?;
        self.graph.edge_weight_mut(idx)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node_index.contains_key(&id)
    }

    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edge_index.contains_key(&id)
    }

    /// Apply a patch to a node. Returns false if the node does not exist.
    pub fn patch_node(&mut self, id: NodeId, patch: &NodePatch) -> bool {
        match self.node_index.get(&id) {
            Some(&idx) => {
                patch.apply_to(&mut self.graph[idx]);
                true
            }
            None => false,
        }
    }

    pub fn set_position(&mut self, id: NodeId, position: Position) -> bool {
        match self.node_index.get(&id) {
            Some(&idx) => {
                self.graph[idx].position = position;
                true
            }
            None => false,
        }
    }

    pub fn patch_edge(&mut self, id: EdgeId, patch: &EdgePatch) -> bool {
        match self.edge_index.get(&id) {
            Some(&idx) => {
                patch.apply_to(&mut self.graph[idx]);
                true
            }
            None => false,
        }
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &FlowNode> + '_ {
        self.node_order
            .iter()
            .filter_map(|id| self.node_index.get(id).map(|idx| &self.graph[*idx]))
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &FlowEdge> + '_ {
        self.edge_order
            .iter()
            .filter_map(|id| self.edge_index.get(id).map(|idx| &self.graph[*idx]))
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_order
    }

    pub fn edge_ids(&self) -> &[EdgeId] {
        &self.edge_order
    }

    pub fn node_count(&self) -> usize {
        self.node_order.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_order.is_empty()
    }

    /// Ids of every edge that starts or ends at `id`, in edge order.
    pub fn incident_edges(&self, id: NodeId) -> SmallVec<[EdgeId; 4]> {
        let Some(&idx) = self.node_index.get(&id) else {
            return SmallVec::new();
        };
        let mut found: SmallVec<[EdgeId; 4]> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .chain(self.graph.edges_directed(idx, Direction::Incoming))
            .map(|e| e.weight().id)
            .collect();
        // Self-loops show up in both directions.
        found.sort_by_key(|e| self.edge_order.iter().position(|o| o == e));
        found.dedup();
        found
    }

    /// Whether an edge `source -> target` already exists.
    pub fn has_edge_between(&self, source: NodeId, target: NodeId) -> bool {
        match (self.node_index.get(&source), self.node_index.get(&target)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// Every edge `source -> target`, in edge order. The position of an
    /// edge in this list is its lane when drawing parallel edges.
    pub fn parallel_edges(&self, source: NodeId, target: NodeId) -> SmallVec<[EdgeId; 4]> {
        self.edges()
            .filter(|e| e.source == source && e.target == target)
            .map(|e| e.id)
            .collect()
    }

    /// Axis-aligned extent of all node positions: `(min, max)`.
    pub fn extent(&self) -> Option<(Position, Position)> {
        let mut nodes = self.nodes();
        let first = nodes.next()?.position;
        let (min, max) = nodes.fold((first, first), |(min, max), n| {
            (
                Position::new(min.x.min(n.position.x), min.y.min(n.position.y)),
                Position::new(max.x.max(n.position.x), max.y.max(n.position.y)),
            )
        });
        Some((min, max))
    }

    /// Borrow the underlying petgraph structure (read-only).
    pub fn petgraph(&self) -> &StableDiGraph<FlowNode, FlowEdge> {
        &self.graph
    }
}

impl Default for FlowGraph {
    fn default() -> Self {
        Self::new()
    }
}
