//! Editor session: one open flow plus all transient interaction state.
//!
//! Front-ends feed canonical `InputEvent`s into `handle()` and redraw from
//! `geometry()`, `viewport()` and `connection_preview()` when the returned
//! `SessionUpdate` says something changed. Gesture paths never fail: domain
//! errors raised while handling input are logged and dropped. The explicit
//! API (`add_node`, `connect`, ...) returns them.

use crate::commands::CommandStack;
use crate::connect::{ConnectionOutcome, ConnectionStateMachine};
use crate::edit::{EditEngine, FlowMutation};
use crate::input::InputEvent;
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::tools::NodeDrag;
use crate::viewport::ViewportController;
use flow_core::model::*;
use flow_core::{
    EdgeId, EditorConfig, EntityKind, Flow, FlowDocument, FlowError, FlowSnapshot, NodeId,
    TechniqueLibrary,
};
use flow_render::geometry::anchor_point;
use flow_render::{
    FlowGeometry, Line, Point, Size, Vec2, Viewport, edge_at, flow_geometry, handle_at, node_at,
};
use serde::Serialize;

/// What is currently selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Selection {
    #[default]
    None,
    Node(NodeId),
    Edge(EdgeId),
}

/// Something the session needs the host to do.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostRequest {
    /// Show the technique picker; the host answers with
    /// `EditorSession::add_technique_node`.
    PickTechnique,
}

/// What changed while handling one event.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionUpdate {
    pub graph_changed: bool,
    pub viewport_changed: bool,
    pub selection_changed: bool,
    pub preview_changed: bool,
    /// A connection was just committed; the host may ask for its label.
    pub label_prompt: Option<EdgeId>,
    pub request: Option<HostRequest>,
}

impl SessionUpdate {
    pub fn needs_redraw(&self) -> bool {
        self.graph_changed || self.viewport_changed || self.selection_changed || self.preview_changed
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Idle,
    Connecting,
    DraggingNode,
    /// Dragging empty canvas. `origin` is the screen-local press point.
    Panning { origin: Point },
}

pub struct EditorSession {
    engine: EditEngine,
    commands: CommandStack,
    viewport: ViewportController,
    connection: ConnectionStateMachine,
    drag: NodeDrag,
    gesture: Gesture,
    selection: Selection,
    label_prompt: Option<EdgeId>,
    screen_size: Size,
}

impl EditorSession {
    pub fn new(engine: EditEngine) -> Self {
        let config = engine.config().clone();
        Self {
            commands: CommandStack::new(config.undo_depth),
            viewport: ViewportController::new(&config),
            connection: ConnectionStateMachine::new(&config),
            drag: NodeDrag::new(config.drag_threshold_sq),
            gesture: Gesture::Idle,
            selection: Selection::None,
            label_prompt: None,
            screen_size: Size::ZERO,
            engine,
        }
    }

    /// Open `flow` for editing.
    pub fn open(flow: Flow, config: EditorConfig) -> Result<Self, FlowError> {
        Ok(Self::new(EditEngine::open(flow, config)?))
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn engine(&self) -> &EditEngine {
        &self.engine
    }

    pub fn graph(&self) -> &FlowGraph {
        self.engine.graph()
    }

    pub fn config(&self) -> &EditorConfig {
        self.engine.config()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport.current()
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn geometry(&self) -> FlowGeometry {
        flow_geometry(self.engine.graph(), self.engine.config())
    }

    /// The dashed line from the source handle to the pointer while a
    /// connection is being drafted.
    pub fn connection_preview(&self) -> Option<Line> {
        self.connection.preview()
    }

    pub fn pending_label_prompt(&self) -> Option<EdgeId> {
        self.label_prompt
    }

    pub fn can_undo(&self) -> bool {
        self.commands.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.commands.can_redo()
    }

    pub fn is_dirty(&self) -> bool {
        self.engine.is_dirty()
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        self.engine.snapshot()
    }

    pub fn mark_saved(&mut self, revision: u64) {
        self.engine.mark_saved(revision);
    }

    /// Canvas element size, used by zoom-to-fit.
    pub fn set_screen_size(&mut self, size: Size) {
        self.screen_size = size;
    }

    // ─── Input ───────────────────────────────────────────────────────────

    pub fn handle(&mut self, event: InputEvent) -> SessionUpdate {
        let mut update = SessionUpdate::default();
        match event {
            InputEvent::PointerDown { x, y } => self.pointer_down(Point::new(x, y), &mut update),
            InputEvent::PointerMove { x, y } => self.pointer_move(Point::new(x, y), &mut update),
            InputEvent::PointerUp { x, y } => self.pointer_up(Point::new(x, y), &mut update),
            InputEvent::PointerCancel => self.cancel_gesture(&mut update),
            InputEvent::Pan { dx, dy } => {
                self.viewport.pan_update(Vec2::new(dx, dy));
                update.viewport_changed = true;
            }
            InputEvent::PanEnd => {
                self.viewport.pan_end();
                update.viewport_changed = true;
            }
            InputEvent::Pinch { scale } => {
                self.viewport.pinch_update(scale);
                update.viewport_changed = true;
            }
            InputEvent::PinchEnd => {
                self.viewport.pinch_end();
                update.viewport_changed = true;
            }
            InputEvent::Key { key, modifiers } => {
                if let Some(action) = ShortcutMap::resolve(&key, modifiers) {
                    self.run_action(action, &mut update);
                }
            }
        }
        update
    }

    fn to_canvas(&self, screen: Point) -> Point {
        self.viewport.current().screen_to_canvas(screen)
    }

    fn pointer_down(&mut self, screen: Point, update: &mut SessionUpdate) {
        if self.gesture != Gesture::Idle {
            log::warn!("pointer down during {:?}; cancelling it", self.gesture);
            self.cancel_gesture(update);
        }
        let canvas = self.to_canvas(screen);
        let config = self.engine.config();
        let graph = self.engine.graph();

        if let Some((id, anchor)) = handle_at(graph, canvas, config)
            && let Some(node) = graph.node(id)
        {
            let start = anchor_point(node.position, anchor, config);
            self.connection.press(id, start, canvas);
            self.gesture = Gesture::Connecting;
            return;
        }

        if let Some(id) = node_at(graph, canvas, config)
            && let Some(node) = graph.node(id)
        {
            let start = node.position;
            self.drag.begin(id, start, screen);
            self.commands.begin_batch(&self.engine, "move node");
            self.gesture = Gesture::DraggingNode;
            self.select(Selection::Node(id), update);
            return;
        }

        if let Some(id) = edge_at(&self.geometry(), canvas, config) {
            self.select(Selection::Edge(id), update);
            return;
        }

        self.engine.set_drop_point(Some(canvas.into()));
        self.select(Selection::None, update);
        self.gesture = Gesture::Panning { origin: screen };
    }

    fn pointer_move(&mut self, screen: Point, update: &mut SessionUpdate) {
        match self.gesture {
            Gesture::Idle => {}
            Gesture::Connecting => {
                let canvas = self.to_canvas(screen);
                update.preview_changed = self.connection.drag_to(canvas);
            }
            Gesture::DraggingNode => {
                let scale = self.viewport.current().scale;
                if let Some(mutation) = self.drag.update(screen, scale) {
                    match self.commands.execute(&mut self.engine, mutation, "move node") {
                        Ok(changed) => update.graph_changed |= changed,
                        Err(err) => log::warn!("node drag: {err}"),
                    }
                }
            }
            Gesture::Panning { origin } => {
                self.viewport.pan_update(screen - origin);
                update.viewport_changed = true;
            }
        }
    }

    fn pointer_up(&mut self, screen: Point, update: &mut SessionUpdate) {
        self.pointer_move(screen, update);
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => {}
            Gesture::Connecting => {
                let canvas = self.to_canvas(screen);
                let outcome =
                    self.connection
                        .release(canvas, self.engine.graph(), self.engine.config());
                update.preview_changed = true;
                match outcome {
                    Some(ConnectionOutcome::Commit { source, target }) => {
                        self.commit_connection(source, target, update);
                    }
                    Some(ConnectionOutcome::Tap { source }) => {
                        self.select(Selection::Node(source), update);
                    }
                    Some(ConnectionOutcome::Cancelled { .. }) | None => {}
                }
            }
            Gesture::DraggingNode => {
                self.drag.end();
                self.commands.end_batch(&self.engine);
            }
            Gesture::Panning { .. } => {
                self.viewport.pan_end();
                update.viewport_changed = true;
            }
        }
    }

    fn commit_connection(&mut self, source: NodeId, target: NodeId, update: &mut SessionUpdate) {
        let edge = self
            .engine
            .new_edge(source, target, None, EdgeType::Default);
        let id = edge.id;
        match self.commands.execute(
            &mut self.engine,
            FlowMutation::AddEdge {
                edge: Box::new(edge),
            },
            "connect",
        ) {
            Ok(_) => {
                log::debug!("connected {source} -> {target} as {id}");
                update.graph_changed = true;
                update.label_prompt = Some(id);
                self.label_prompt = Some(id);
                self.select(Selection::Edge(id), update);
            }
            Err(err) => log::debug!("connection refused: {err}"),
        }
    }

    fn cancel_gesture(&mut self, update: &mut SessionUpdate) {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => {}
            Gesture::Connecting => {
                self.connection.cancel();
                update.preview_changed = true;
            }
            Gesture::DraggingNode => {
                if let Some(restore) = self.drag.cancel() {
                    match self.commands.execute(&mut self.engine, restore, "move node") {
                        Ok(changed) => update.graph_changed |= changed,
                        Err(err) => log::warn!("restoring dragged node: {err}"),
                    }
                }
                self.commands.end_batch(&self.engine);
            }
            Gesture::Panning { .. } => {}
        }
        if self.viewport.is_gesture_active() {
            self.viewport.cancel_gesture();
            update.viewport_changed = true;
        }
    }

    fn run_action(&mut self, action: ShortcutAction, update: &mut SessionUpdate) {
        log::trace!("shortcut: {}", action.label());
        match action {
            ShortcutAction::Undo | ShortcutAction::Redo => {
                self.cancel_gesture(update);
                let result = if action == ShortcutAction::Undo {
                    self.commands.undo(&mut self.engine)
                } else {
                    self.commands.redo(&mut self.engine)
                };
                match result {
                    Ok(Some(_)) => {
                        update.graph_changed = true;
                        self.prune_selection(update);
                    }
                    Ok(None) => {}
                    Err(err) => log::warn!("{}: {err}", action.label()),
                }
            }
            ShortcutAction::DeleteSelection => {
                if self.selection == Selection::None {
                    return;
                }
                self.cancel_gesture(update);
                if let Err(err) = self.delete_selection() {
                    log::warn!("delete: {err}");
                }
                update.graph_changed = true;
                update.selection_changed = true;
            }
            ShortcutAction::ZoomIn => {
                self.viewport.zoom_in();
                update.viewport_changed = true;
            }
            ShortcutAction::ZoomOut => {
                self.viewport.zoom_out();
                update.viewport_changed = true;
            }
            ShortcutAction::ZoomReset => {
                self.viewport.reset();
                update.viewport_changed = true;
            }
            ShortcutAction::AddTechnique => update.request = Some(HostRequest::PickTechnique),
            ShortcutAction::AddCondition | ShortcutAction::AddNote => {
                let kind = if action == ShortcutAction::AddNote {
                    NodeKind::Note
                } else {
                    NodeKind::Condition
                };
                match self.add_node(kind, None) {
                    Ok(id) => {
                        update.graph_changed = true;
                        self.select(Selection::Node(id), update);
                    }
                    Err(err) => log::warn!("add node: {err}"),
                }
            }
            ShortcutAction::Cancel => {
                if self.label_prompt.is_some() {
                    self.dismiss_label_prompt();
                } else if self.gesture != Gesture::Idle {
                    self.cancel_gesture(update);
                } else {
                    self.select(Selection::None, update);
                }
            }
        }
    }

    fn select(&mut self, selection: Selection, update: &mut SessionUpdate) {
        if self.selection != selection {
            self.selection = selection;
            update.selection_changed = true;
        }
    }

    /// Drop the selection if what it points at no longer exists.
    fn prune_selection(&mut self, update: &mut SessionUpdate) {
        let graph = self.engine.graph();
        let alive = match self.selection {
            Selection::None => true,
            Selection::Node(id) => graph.contains_node(id),
            Selection::Edge(id) => graph.contains_edge(id),
        };
        let prompt_alive = self.label_prompt.is_none_or(|id| graph.contains_edge(id));
        if !alive {
            self.select(Selection::None, update);
        }
        if !prompt_alive {
            self.label_prompt = None;
        }
    }

    // ─── Explicit operations ─────────────────────────────────────────────

    pub fn set_selection(&mut self, selection: Selection) -> SessionUpdate {
        let mut update = SessionUpdate::default();
        self.select(selection, &mut update);
        update
    }

    /// Add a node at the last drop point (or the configured default).
    pub fn add_node(&mut self, kind: NodeKind, label: Option<&str>) -> Result<NodeId, FlowError> {
        let node = self.engine.new_node(kind, label, None);
        self.insert_node(node)
    }

    pub fn add_technique_node(
        &mut self,
        library: &dyn TechniqueLibrary,
        technique_id: &str,
    ) -> Result<NodeId, FlowError> {
        let node = self.engine.new_technique_node(library, technique_id)?;
        self.insert_node(node)
    }

    fn insert_node(&mut self, node: FlowNode) -> Result<NodeId, FlowError> {
        let id = node.id;
        self.commands.execute(
            &mut self.engine,
            FlowMutation::AddNode {
                node: Box::new(node),
            },
            "add node",
        )?;
        Ok(id)
    }

    pub fn update_node(&mut self, id: NodeId, patch: NodePatch) -> Result<(), FlowError> {
        self.commands
            .execute(&mut self.engine, FlowMutation::UpdateNode { id, patch }, "edit node")
            .map(drop)
    }

    pub fn move_node(&mut self, id: NodeId, position: Position) -> Result<(), FlowError> {
        self.commands
            .execute(&mut self.engine, FlowMutation::MoveNode { id, position }, "move node")
            .map(drop)
    }

    /// Delete a node and its incident edges.
    pub fn delete_node(&mut self, id: NodeId) -> Result<(), FlowError> {
        self.commands
            .execute(&mut self.engine, FlowMutation::RemoveNode { id }, "delete node")?;
        let mut update = SessionUpdate::default();
        self.prune_selection(&mut update);
        Ok(())
    }

    /// Connect two nodes directly (no gesture, no label prompt).
    pub fn connect(
        &mut self,
        source: NodeId,
        target: NodeId,
        label: Option<&str>,
        edge_type: EdgeType,
    ) -> Result<EdgeId, FlowError> {
        let edge = self.engine.new_edge(source, target, label, edge_type);
        let id = edge.id;
        self.commands.execute(
            &mut self.engine,
            FlowMutation::AddEdge {
                edge: Box::new(edge),
            },
            "connect",
        )?;
        Ok(id)
    }

    pub fn update_edge(&mut self, id: EdgeId, patch: EdgePatch) -> Result<(), FlowError> {
        self.commands
            .execute(&mut self.engine, FlowMutation::UpdateEdge { id, patch }, "edit edge")
            .map(drop)
    }

    pub fn delete_edge(&mut self, id: EdgeId) -> Result<(), FlowError> {
        self.commands
            .execute(&mut self.engine, FlowMutation::RemoveEdge { id }, "delete edge")?;
        let mut update = SessionUpdate::default();
        self.prune_selection(&mut update);
        Ok(())
    }

    fn delete_selection(&mut self) -> Result<(), FlowError> {
        match std::mem::take(&mut self.selection) {
            Selection::None => Ok(()),
            Selection::Node(id) => self.delete_node(id),
            Selection::Edge(id) => self.delete_edge(id),
        }
    }

    /// Rename the flow; blank names are ignored. Returns whether it changed.
    pub fn rename_flow(&mut self, name: &str) -> bool {
        match self.commands.execute(
            &mut self.engine,
            FlowMutation::RenameFlow {
                name: name.to_string(),
            },
            "rename flow",
        ) {
            Ok(changed) => changed,
            Err(err) => {
                log::warn!("rename: {err}");
                false
            }
        }
    }

    /// Merge another document into this flow with fresh ids.
    pub fn merge_document(
        &mut self,
        document: &FlowDocument,
        offset: Option<(f64, f64)>,
    ) -> Result<Vec<NodeId>, FlowError> {
        let prepared = self.engine.prepare_merge(document, offset);
        let ids = prepared.nodes.iter().map(|n| n.id).collect();
        self.commands.execute(
            &mut self.engine,
            FlowMutation::MergeDocument { document: prepared },
            "merge flow",
        )?;
        Ok(ids)
    }

    /// Label the edge awaiting a label. Blank text leaves it unlabelled.
    pub fn submit_label(&mut self, text: &str) -> Result<(), FlowError> {
        let Some(id) = self.label_prompt.take() else {
            return Ok(());
        };
        if !self.engine.graph().contains_edge(id) {
            return Err(FlowError::not_found(EntityKind::Edge, id));
        }
        if text.trim().is_empty() {
            return Ok(());
        }
        self.update_edge(id, EdgePatch::label(Some(text.to_string())))
    }

    /// Close the label prompt. The edge stays, unlabelled.
    pub fn dismiss_label_prompt(&mut self) {
        if let Some(id) = self.label_prompt.take() {
            log::trace!("label prompt for {id} dismissed");
        }
    }

    pub fn undo(&mut self) -> Result<bool, FlowError> {
        let mut update = SessionUpdate::default();
        self.cancel_gesture(&mut update);
        let undone = self.commands.undo(&mut self.engine)?.is_some();
        self.prune_selection(&mut update);
        Ok(undone)
    }

    pub fn redo(&mut self) -> Result<bool, FlowError> {
        let mut update = SessionUpdate::default();
        self.cancel_gesture(&mut update);
        let redone = self.commands.redo(&mut self.engine)?.is_some();
        self.prune_selection(&mut update);
        Ok(redone)
    }

    pub fn zoom_to_fit(&mut self) {
        let geometry = self.geometry();
        let config = self.engine.config().clone();
        self.viewport.zoom_to_fit(&geometry, self.screen_size, &config);
    }

    /// Persisted state arrived (e.g. after a reload). Clears history.
    pub fn apply_patch(&mut self, patch: flow_core::FlowPatch) -> Result<(), FlowError> {
        let mut update = SessionUpdate::default();
        self.cancel_gesture(&mut update);
        self.engine.apply_patch(patch)?;
        self.commands.clear();
        self.prune_selection(&mut update);
        Ok(())
    }

    /// Tear down: discard every transient gesture and prompt. Committed
    /// graph changes are kept.
    pub fn close(&mut self) {
        let mut update = SessionUpdate::default();
        self.cancel_gesture(&mut update);
        self.dismiss_label_prompt();
        self.selection = Selection::None;
        log::debug!(
            "closed session for {} (dirty: {})",
            self.engine.header().id,
            self.engine.is_dirty()
        );
    }

    /// Consume the session, returning the engine (e.g. to save it).
    pub fn into_engine(mut self) -> EditEngine {
        self.close();
        self.engine
    }
}
