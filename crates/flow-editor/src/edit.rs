//! Edit engine: the single owner of a flow's graph while it is open.
//!
//! Every change is a `FlowMutation` applied through `EditEngine::apply`,
//! which enforces the referential policy (existing endpoints, self-loop and
//! parallel-edge flags) and bumps the revision. The convenience methods
//! (`add_node`, `add_edge`, ...) build a mutation and apply it; the session
//! goes through `CommandStack` instead so the change can be undone.
//!
//! The persistence boundary is explicit: `snapshot()` captures what to save,
//! `mark_saved()` records what was saved, and `apply_patch()` takes updates
//! coming back from the store.

use flow_core::model::*;
use flow_core::{
    EdgeId, EditorConfig, EntityKind, Flow, FlowDocument, FlowError, FlowHeader, FlowPatch,
    FlowSnapshot, NodeId, TechniqueLibrary,
};

/// A change to the open flow.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowMutation {
    AddNode {
        node: Box<FlowNode>,
    },
    UpdateNode {
        id: NodeId,
        patch: NodePatch,
    },
    MoveNode {
        id: NodeId,
        position: Position,
    },
    /// Removes the node and every incident edge.
    RemoveNode {
        id: NodeId,
    },
    /// Re-inserts a node together with edges removed alongside it.
    RestoreNode {
        node: Box<FlowNode>,
        edges: Vec<FlowEdge>,
    },
    AddEdge {
        edge: Box<FlowEdge>,
    },
    UpdateEdge {
        id: EdgeId,
        patch: EdgePatch,
    },
    RemoveEdge {
        id: EdgeId,
    },
    RenameFlow {
        name: String,
    },
    /// Adds every node and edge of a document whose ids are already unique.
    MergeDocument {
        document: FlowDocument,
    },
    ReplaceDocument {
        document: FlowDocument,
    },
}

pub struct EditEngine {
    header: FlowHeader,
    graph: FlowGraph,
    config: EditorConfig,
    revision: u64,
    saved_revision: u64,
    /// Canvas point where the user last dropped or tapped; new nodes go here.
    drop_point: Option<Position>,
}

impl EditEngine {
    /// Open an existing flow. Fails if its document is inconsistent.
    pub fn open(flow: Flow, config: EditorConfig) -> Result<Self, FlowError> {
        let graph = FlowGraph::from_document(&flow.document)?;
        log::debug!(
            "opened flow {} ({} nodes, {} edges)",
            flow.header.id,
            graph.node_count(),
            graph.edge_count()
        );
        Ok(Self {
            header: flow.header,
            graph,
            config,
            revision: 0,
            saved_revision: 0,
            drop_point: None,
        })
    }

    /// An engine over an empty, unsaved flow.
    pub fn new(header: FlowHeader, config: EditorConfig) -> Self {
        Self {
            header,
            graph: FlowGraph::new(),
            config,
            revision: 0,
            saved_revision: 0,
            drop_point: None,
        }
    }

    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    pub fn header(&self) -> &FlowHeader {
        &self.header
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn document(&self) -> FlowDocument {
        self.graph.to_document()
    }

    pub fn to_flow(&self) -> Flow {
        Flow {
            header: self.header.clone(),
            document: self.document(),
        }
    }

    // ─── Revisions ───────────────────────────────────────────────────────

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn saved_revision(&self) -> u64 {
        self.saved_revision
    }

    /// Whether there are changes newer than the last successful save.
    pub fn is_dirty(&self) -> bool {
        self.revision > self.saved_revision
    }

    /// Record that the state at `revision` was persisted. Older
    /// acknowledgements arriving late never move the mark backwards.
    pub fn mark_saved(&mut self, revision: u64) {
        self.saved_revision = self.saved_revision.max(revision.min(self.revision));
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            revision: self.revision,
            header: self.header.clone(),
            document: self.document(),
        }
    }

    /// Apply an update coming from the persistence side. The result is
    /// considered saved.
    pub fn apply_patch(&mut self, patch: FlowPatch) -> Result<(), FlowError> {
        if let Some(document) = &patch.document {
            self.graph = FlowGraph::from_document(document)?;
        }
        patch.apply_to_header(&mut self.header);
        self.revision += 1;
        self.saved_revision = self.revision;
        Ok(())
    }

    // ─── Mutation ────────────────────────────────────────────────────────

    /// Record where the user last dropped or tapped on the canvas.
    pub fn set_drop_point(&mut self, point: Option<Position>) {
        self.drop_point = point;
    }

    /// Position for a node created without an explicit one.
    pub fn next_node_position(&self) -> Position {
        self.drop_point
            .unwrap_or(self.config.default_node_position)
    }

    /// Apply a mutation. Returns `Ok(false)` when it was valid but changed
    /// nothing (e.g. renaming to a blank name); the revision only moves on
    /// `Ok(true)`.
    pub fn apply(&mut self, mutation: FlowMutation) -> Result<bool, FlowError> {
        let changed = self.apply_inner(mutation)?;
        if changed {
            self.revision += 1;
        }
        Ok(changed)
    }

    fn apply_inner(&mut self, mutation: FlowMutation) -> Result<bool, FlowError> {
        match mutation {
            FlowMutation::AddNode { node } => {
                if self.graph.contains_node(node.id) {
                    return Err(FlowError::InvalidDocument(format!(
                        "node '{}' already exists",
                        node.id
                    )));
                }
                log::trace!("add node {} ({})", node.id, node.kind.as_str());
                self.graph.insert_node(*node);
                Ok(true)
            }
            FlowMutation::UpdateNode { id, patch } => {
                if self.graph.patch_node(id, &patch) {
                    Ok(true)
                } else {
                    Err(FlowError::not_found(EntityKind::Node, id))
                }
            }
            FlowMutation::MoveNode { id, position } => {
                if self.graph.set_position(id, position) {
                    Ok(true)
                } else {
                    Err(FlowError::not_found(EntityKind::Node, id))
                }
            }
            FlowMutation::RemoveNode { id } => {
                let removed = self
                    .graph
                    .remove_node(id)
                    .ok_or_else(|| FlowError::not_found(EntityKind::Node, id))?;
                log::debug!("deleted node {id} and {} edge(s)", removed.edges.len());
                Ok(true)
            }
            FlowMutation::RestoreNode { node, edges } => {
                self.graph.insert_node(*node);
                for edge in edges {
                    let id = edge.id;
                    if self.graph.insert_edge(edge).is_none() {
                        log::warn!("could not restore edge {id}: endpoint missing");
                    }
                }
                Ok(true)
            }
            FlowMutation::AddEdge { edge } => {
                self.check_edge(&edge)?;
                log::trace!("add edge {} ({} -> {})", edge.id, edge.source, edge.target);
                self.graph.insert_edge(*edge);
                Ok(true)
            }
            FlowMutation::UpdateEdge { id, patch } => {
                if self.graph.patch_edge(id, &patch) {
                    Ok(true)
                } else {
                    Err(FlowError::not_found(EntityKind::Edge, id))
                }
            }
            FlowMutation::RemoveEdge { id } => {
                self.graph
                    .remove_edge(id)
                    .ok_or_else(|| FlowError::not_found(EntityKind::Edge, id))?;
                Ok(true)
            }
            FlowMutation::RenameFlow { name } => {
                let name = name.trim();
                if name.is_empty() || name == self.header.name {
                    return Ok(false);
                }
                self.header.name = name.to_string();
                Ok(true)
            }
            FlowMutation::MergeDocument { document } => {
                if document.is_empty() {
                    return Ok(false);
                }
                let mut merged = self.graph.clone();
                for node in &document.nodes {
                    if merged.contains_node(node.id) {
                        return Err(FlowError::InvalidDocument(format!(
                            "merged node '{}' already exists",
                            node.id
                        )));
                    }
                    merged.insert_node(node.clone());
                }
                for edge in &document.edges {
                    if merged.insert_edge(edge.clone()).is_none() {
                        return Err(FlowError::invalid_edge(
                            edge.source,
                            edge.target,
                            "endpoint missing",
                        ));
                    }
                }
                self.graph = merged;
                Ok(true)
            }
            FlowMutation::ReplaceDocument { document } => {
                self.graph = FlowGraph::from_document(&document)?;
                Ok(true)
            }
        }
    }

    fn check_edge(&self, edge: &FlowEdge) -> Result<(), FlowError> {
        if self.graph.contains_edge(edge.id) {
            return Err(FlowError::InvalidDocument(format!(
                "edge '{}' already exists",
                edge.id
            )));
        }
        for endpoint in [edge.source, edge.target] {
            if !self.graph.contains_node(endpoint) {
                return Err(FlowError::invalid_edge(
                    edge.source,
                    edge.target,
                    &format!("node '{endpoint}' does not exist"),
                ));
            }
        }
        if edge.is_self_loop() && !self.config.allow_self_loops {
            return Err(FlowError::invalid_edge(
                edge.source,
                edge.target,
                "self-loops are disabled",
            ));
        }
        if !self.config.allow_parallel_edges && self.graph.has_edge_between(edge.source, edge.target)
        {
            return Err(FlowError::invalid_edge(
                edge.source,
                edge.target,
                "these nodes are already connected",
            ));
        }
        Ok(())
    }

    // ─── Mutation builders ───────────────────────────────────────────────

    /// A fresh node at `next_node_position()`, not yet inserted.
    pub fn new_node(&self, kind: NodeKind, label: Option<&str>, ref_id: Option<&str>) -> FlowNode {
        let mut node = FlowNode::new(NodeId::generate(), kind, self.next_node_position());
        if let Some(label) = label {
            node.label = label.trim().to_string();
        }
        node.ref_id = ref_id.map(str::to_string);
        node
    }

    /// A technique node labelled from the library, not yet inserted.
    pub fn new_technique_node(
        &self,
        library: &dyn TechniqueLibrary,
        technique_id: &str,
    ) -> Result<FlowNode, FlowError> {
        let technique = library
            .find_by_id(technique_id)
            .ok_or_else(|| FlowError::not_found(EntityKind::Technique, technique_id))?;
        Ok(self.new_node(
            NodeKind::Technique,
            Some(&technique.name),
            Some(&technique.id),
        ))
    }

    /// A fresh edge, not yet inserted.
    pub fn new_edge(
        &self,
        source: NodeId,
        target: NodeId,
        label: Option<&str>,
        edge_type: EdgeType,
    ) -> FlowEdge {
        let mut edge = FlowEdge::new(EdgeId::generate(), source, target);
        edge.label = normalize_label(label.map(str::to_string));
        edge.edge_type = edge_type;
        edge
    }

    /// `document` with fresh ids, shifted by `offset`, or placed to the
    /// right of the current content when `offset` is `None`.
    pub fn prepare_merge(&self, document: &FlowDocument, offset: Option<(f64, f64)>) -> FlowDocument {
        let (dx, dy) = offset.unwrap_or_else(|| self.merge_offset(document));
        document.with_fresh_ids(dx, dy)
    }

    fn merge_offset(&self, document: &FlowDocument) -> (f64, f64) {
        let (Some((min, max)), Some(incoming_min)) = (
            self.graph.extent(),
            document.nodes.iter().map(|n| n.position).reduce(|a, b| {
                Position::new(a.x.min(b.x), a.y.min(b.y))
            }),
        ) else {
            return (0.0, 0.0);
        };
        let gap = self.config.node_width;
        (max.x + gap - incoming_min.x, min.y - incoming_min.y)
    }

    // ─── Direct operations (no undo) ─────────────────────────────────────

    pub fn add_node(&mut self, kind: NodeKind, label: Option<&str>, ref_id: Option<&str>) -> NodeId {
        let node = self.new_node(kind, label, ref_id);
        let id = node.id;
        self.graph.insert_node(node);
        self.revision += 1;
        id
    }

    pub fn add_technique_node(
        &mut self,
        library: &dyn TechniqueLibrary,
        technique_id: &str,
    ) -> Result<NodeId, FlowError> {
        let node = self.new_technique_node(library, technique_id)?;
        let id = node.id;
        self.apply(FlowMutation::AddNode {
            node: Box::new(node),
        })?;
        Ok(id)
    }

    pub fn update_node(&mut self, id: NodeId, patch: NodePatch) -> Result<(), FlowError> {
        self.apply(FlowMutation::UpdateNode { id, patch }).map(drop)
    }

    pub fn move_node(&mut self, id: NodeId, position: Position) -> Result<(), FlowError> {
        self.apply(FlowMutation::MoveNode { id, position }).map(drop)
    }

    /// Delete a node and every incident edge, returning what was removed.
    pub fn delete_node(&mut self, id: NodeId) -> Result<RemovedNode, FlowError> {
        let removed = self
            .graph
            .remove_node(id)
            .ok_or_else(|| FlowError::not_found(EntityKind::Node, id))?;
        self.revision += 1;
        Ok(removed)
    }

    pub fn add_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        label: Option<&str>,
        edge_type: EdgeType,
    ) -> Result<EdgeId, FlowError> {
        let edge = self.new_edge(source, target, label, edge_type);
        let id = edge.id;
        self.apply(FlowMutation::AddEdge {
            edge: Box::new(edge),
        })?;
        Ok(id)
    }

    pub fn update_edge(&mut self, id: EdgeId, patch: EdgePatch) -> Result<(), FlowError> {
        self.apply(FlowMutation::UpdateEdge { id, patch }).map(drop)
    }

    pub fn delete_edge(&mut self, id: EdgeId) -> Result<FlowEdge, FlowError> {
        let edge = self
            .graph
            .remove_edge(id)
            .ok_or_else(|| FlowError::not_found(EntityKind::Edge, id))?;
        self.revision += 1;
        Ok(edge)
    }

    /// Rename the flow. Returns false (keeping the old name) for blank input.
    pub fn rename_flow(&mut self, name: &str) -> bool {
        // RenameFlow never fails
        self.apply(FlowMutation::RenameFlow {
            name: name.to_string(),
        })
        .unwrap_or(false)
    }

    /// Merge another document into this flow with fresh ids. Returns the
    /// new node ids in document order.
    pub fn merge_document(
        &mut self,
        document: &FlowDocument,
        offset: Option<(f64, f64)>,
    ) -> Result<Vec<NodeId>, FlowError> {
        let prepared = self.prepare_merge(document, offset);
        let ids = prepared.nodes.iter().map(|n| n.id).collect();
        self.apply(FlowMutation::MergeDocument { document: prepared })?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::{StaticLibrary, Technique};
    use pretty_assertions::assert_eq;

    fn engine() -> EditEngine {
        EditEngine::new(FlowHeader::new("user-1", "Closed guard"), EditorConfig::default())
    }

    #[test]
    fn add_node_uses_drop_point_then_default() {
        let mut e = engine();
        let a = e.add_node(NodeKind::Technique, Some("Armbar"), None);
        assert_eq!(e.graph().node(a).unwrap().position, Position::new(120.0, 120.0));
        e.set_drop_point(Some(Position::new(-40.0, 75.5)));
        let b = e.add_node(NodeKind::Note, None, None);
        assert_eq!(e.graph().node(b).unwrap().position, Position::new(-40.0, 75.5));
        assert_ne!(a, b);
        assert_eq!(e.revision(), 2);
    }

    #[test]
    fn technique_label_comes_from_library() {
        let lib = StaticLibrary::new([Technique {
            id: "tech-7".into(),
            name: "Triangle choke".into(),
            category: Some("submission".into()),
        }]);
        let mut e = engine();
        let id = e.add_technique_node(&lib, "tech-7").unwrap();
        let node = e.graph().node(id).unwrap();
        assert_eq!(node.label, "Triangle choke");
        assert_eq!(node.ref_id.as_deref(), Some("tech-7"));

        let err = e.add_technique_node(&lib, "tech-404").unwrap_err();
        assert_eq!(err, FlowError::not_found(EntityKind::Technique, "tech-404"));
    }

    #[test]
    fn missing_targets_are_not_found() {
        let mut e = engine();
        let ghost = NodeId::intern("e_ghost");
        assert!(matches!(
            e.move_node(ghost, Position::default()),
            Err(FlowError::NotFound { entity: EntityKind::Node, .. })
        ));
        assert!(e.delete_node(ghost).is_err());
        assert!(matches!(
            e.delete_edge(EdgeId::intern("e_ghost_edge")),
            Err(FlowError::NotFound { entity: EntityKind::Edge, .. })
        ));
        assert_eq!(e.revision(), 0);
    }

    #[test]
    fn edge_policy_is_enforced() {
        let mut e = engine();
        let a = e.add_node(NodeKind::Technique, None, None);
        let b = e.add_node(NodeKind::Technique, None, None);

        let missing = e.add_edge(a, NodeId::intern("e_nowhere"), None, EdgeType::Default);
        assert!(matches!(missing, Err(FlowError::InvalidEdge { .. })));

        // Defaults allow self-loops and parallel edges
        e.add_edge(a, a, None, EdgeType::Default).unwrap();
        e.add_edge(a, b, None, EdgeType::Default).unwrap();
        e.add_edge(a, b, Some("again"), EdgeType::Success).unwrap();
        assert_eq!(e.graph().edge_count(), 3);

        let strict = EditorConfig {
            allow_self_loops: false,
            allow_parallel_edges: false,
            ..EditorConfig::default()
        };
        let mut e = EditEngine::open(e.to_flow(), strict).unwrap();
        assert!(e.add_edge(b, b, None, EdgeType::Default).is_err());
        assert!(e.add_edge(a, b, None, EdgeType::Default).is_err());
        assert!(e.add_edge(b, a, None, EdgeType::Counter).is_ok());
    }

    #[test]
    fn rename_trims_and_ignores_blank() {
        let mut e = engine();
        assert!(e.rename_flow("  Half guard sweeps  "));
        assert_eq!(e.header().name, "Half guard sweeps");
        let rev = e.revision();
        assert!(!e.rename_flow("   "));
        assert_eq!(e.header().name, "Half guard sweeps");
        assert_eq!(e.revision(), rev);
    }

    #[test]
    fn dirty_tracking_follows_revisions() {
        let mut e = engine();
        assert!(!e.is_dirty());
        e.add_node(NodeKind::Technique, None, None);
        let snap = e.snapshot();
        assert!(e.is_dirty());
        e.add_node(NodeKind::Note, None, None);
        e.mark_saved(snap.revision);
        // Edit made after the snapshot keeps the engine dirty
        assert!(e.is_dirty());
        e.mark_saved(e.revision());
        assert!(!e.is_dirty());
        // A stale acknowledgement never un-saves
        e.mark_saved(snap.revision);
        assert!(!e.is_dirty());
    }

    #[test]
    fn apply_patch_replaces_document_and_header() {
        let mut e = engine();
        e.add_node(NodeKind::Technique, None, None);
        let mut doc = FlowDocument::default();
        doc.nodes.push(FlowNode::new(
            NodeId::intern("e_remote"),
            NodeKind::Condition,
            Position::new(5.0, 5.0),
        ));
        e.apply_patch(FlowPatch {
            name: Some("Remote name".into()),
            document: Some(doc),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(e.header().name, "Remote name");
        assert_eq!(e.graph().node_ids(), &[NodeId::intern("e_remote")]);
        assert!(!e.is_dirty());
    }

    #[test]
    fn merge_places_content_to_the_right_with_fresh_ids() {
        let mut e = engine();
        e.set_drop_point(Some(Position::new(0.0, 0.0)));
        e.add_node(NodeKind::Technique, None, None);
        e.set_drop_point(Some(Position::new(300.0, 50.0)));
        e.add_node(NodeKind::Technique, None, None);

        let incoming = e.document();
        let ids = e.merge_document(&incoming, None).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(e.graph().node_count(), 4);
        for (id, original) in ids.iter().zip(&incoming.nodes) {
            assert_ne!(*id, original.id);
            let placed = e.graph().node(*id).unwrap().position;
            assert_eq!(placed.x, original.position.x + 440.0);
            assert_eq!(placed.y, original.position.y);
        }

        let explicit = e.merge_document(&incoming, Some((0.0, 500.0))).unwrap();
        assert_eq!(
            e.graph().node(explicit[0]).unwrap().position,
            Position::new(0.0, 500.0)
        );
    }
}
