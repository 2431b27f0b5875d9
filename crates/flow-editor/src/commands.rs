//! Undo/Redo command stack.
//!
//! Every mutation is wrapped in a reversible `Command`. The inverse is
//! computed from the graph *before* the forward mutation runs, so a cascade
//! node delete records the node together with the edges it takes with it.
//!
//! Drag gestures use **document-snapshot batching**: the document is
//! captured when the gesture starts and when it ends, and undo/redo swaps
//! the whole document in a single step.

use crate::edit::{EditEngine, FlowMutation};
use flow_core::{FlowDocument, FlowError};

#[derive(Debug, Clone)]
pub enum Command {
    Single {
        forward: Box<FlowMutation>,
        inverse: Box<FlowMutation>,
        description: String,
    },
    Snapshot {
        before: FlowDocument,
        after: FlowDocument,
        description: String,
    },
}

impl Command {
    pub fn description(&self) -> &str {
        match self {
            Command::Single { description, .. } | Command::Snapshot { description, .. } => {
                description
            }
        }
    }
}

pub struct CommandStack {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    max_depth: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    batch_snapshot: Option<FlowDocument>,
    batch_description: String,
    batch_dirty: bool,
}

impl CommandStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
            batch_depth: 0,
            batch_snapshot: None,
            batch_description: String::new(),
            batch_dirty: false,
        }
    }

    /// Start a batch. Mutations until the matching `end_batch()` are applied
    /// live but undone as one step.
    pub fn begin_batch(&mut self, engine: &EditEngine, description: &str) {
        if self.batch_depth == 0 {
            self.batch_snapshot = Some(engine.document());
            self.batch_description = description.to_string();
            self.batch_dirty = false;
        }
        self.batch_depth += 1;
    }

    /// Close a batch. When the outermost batch closes and the document
    /// actually changed, one snapshot command is pushed.
    pub fn end_batch(&mut self, engine: &EditEngine) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return;
        }
        let before = self.batch_snapshot.take();
        if self.batch_dirty
            && let Some(before) = before
        {
            let after = engine.document();
            if before != after {
                let description = std::mem::take(&mut self.batch_description);
                self.push(Command::Snapshot {
                    before,
                    after,
                    description,
                });
            }
        }
        self.batch_dirty = false;
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    /// Apply `mutation` and record it. Returns whether anything changed;
    /// failed or no-op mutations are not recorded.
    pub fn execute(
        &mut self,
        engine: &mut EditEngine,
        mutation: FlowMutation,
        description: &str,
    ) -> Result<bool, FlowError> {
        if self.batch_depth > 0 {
            let changed = engine.apply(mutation)?;
            self.batch_dirty |= changed;
            return Ok(changed);
        }

        let inverse = compute_inverse(engine, &mutation);
        let changed = engine.apply(mutation.clone())?;
        if !changed {
            return Ok(false);
        }
        match inverse {
            Some(inverse) => self.push(Command::Single {
                forward: Box::new(mutation),
                inverse: Box::new(inverse),
                description: description.to_string(),
            }),
            None => log::warn!("no inverse for {description}; not undoable"),
        }
        Ok(true)
    }

    fn push(&mut self, cmd: Command) {
        log::trace!("push undo: {}", cmd.description());
        self.undo_stack.push(cmd);
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// Undo the last command. Returns its description.
    pub fn undo(&mut self, engine: &mut EditEngine) -> Result<Option<String>, FlowError> {
        let Some(cmd) = self.undo_stack.pop() else {
            return Ok(None);
        };
        let result = match &cmd {
            Command::Single { inverse, .. } => engine.apply(*inverse.clone()),
            Command::Snapshot { before, .. } => engine.apply(FlowMutation::ReplaceDocument {
                document: before.clone(),
            }),
        };
        if let Err(err) = result {
            // Leave the history as it was
            self.undo_stack.push(cmd);
            return Err(err);
        }
        let description = cmd.description().to_string();
        self.redo_stack.push(cmd);
        Ok(Some(description))
    }

    /// Redo the last undone command. Returns its description.
    pub fn redo(&mut self, engine: &mut EditEngine) -> Result<Option<String>, FlowError> {
        let Some(cmd) = self.redo_stack.pop() else {
            return Ok(None);
        };
        let result = match &cmd {
            Command::Single { forward, .. } => engine.apply(*forward.clone()),
            Command::Snapshot { after, .. } => engine.apply(FlowMutation::ReplaceDocument {
                document: after.clone(),
            }),
        };
        if let Err(err) = result {
            self.redo_stack.push(cmd);
            return Err(err);
        }
        let description = cmd.description().to_string();
        self.undo_stack.push(cmd);
        Ok(Some(description))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

/// The mutation that undoes `mutation`, computed against the current
/// state. `None` when the target is missing (the forward mutation will
/// fail anyway).
fn compute_inverse(engine: &EditEngine, mutation: &FlowMutation) -> Option<FlowMutation> {
    let graph = engine.graph();
    Some(match mutation {
        FlowMutation::AddNode { node } => FlowMutation::RemoveNode { id: node.id },
        FlowMutation::UpdateNode { id, .. } => FlowMutation::UpdateNode {
            id: *id,
            patch: flow_core::NodePatch::restoring(graph.node(*id)?),
        },
        FlowMutation::MoveNode { id, .. } => FlowMutation::MoveNode {
            id: *id,
            position: graph.node(*id)?.position,
        },
        FlowMutation::RemoveNode { id } => {
            let node = graph.node(*id)?.clone();
            let edges = graph
                .incident_edges(*id)
                .iter()
                .filter_map(|e| graph.edge(*e).cloned())
                .collect();
            FlowMutation::RestoreNode {
                node: Box::new(node),
                edges,
            }
        }
        FlowMutation::RestoreNode { node, .. } => FlowMutation::RemoveNode { id: node.id },
        FlowMutation::AddEdge { edge } => FlowMutation::RemoveEdge { id: edge.id },
        FlowMutation::UpdateEdge { id, .. } => FlowMutation::UpdateEdge {
            id: *id,
            patch: flow_core::EdgePatch::restoring(graph.edge(*id)?),
        },
        FlowMutation::RemoveEdge { id } => FlowMutation::AddEdge {
            edge: Box::new(graph.edge(*id)?.clone()),
        },
        FlowMutation::RenameFlow { .. } => FlowMutation::RenameFlow {
            name: engine.header().name.clone(),
        },
        FlowMutation::MergeDocument { .. } | FlowMutation::ReplaceDocument { .. } => {
            FlowMutation::ReplaceDocument {
                document: engine.document(),
            }
        }
    })
}
