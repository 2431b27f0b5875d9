//! Drag-to-connect state machine.
//!
//! ```text
//! Idle --press--> Pressed --moved past threshold--> Dragging
//!   ^                |                                  |
//!   |              release                           release
//!   |                v                                  v
//!   +------------- Tap                     Commit / Cancelled
//! ```
//!
//! The machine never touches the graph. It reports an outcome and the
//! session turns a `Commit` into an edge.

use flow_core::model::FlowGraph;
use flow_core::{EditorConfig, NodeId};
use flow_render::{Line, Point, connection_target};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionState {
    Idle,
    /// Handle pressed; the pointer has not moved far enough to draft.
    Pressed {
        source: NodeId,
        /// Handle anchor the preview line starts from (canvas space).
        start: Point,
        /// Where the pointer went down (canvas space).
        pressed_at: Point,
    },
    /// Drafting: the preview line follows `end`.
    Dragging {
        source: NodeId,
        start: Point,
        end: Point,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOutcome {
    /// Released over another node.
    Commit { source: NodeId, target: NodeId },
    /// Released over empty canvas or the source itself.
    Cancelled { source: NodeId },
    /// Released without ever crossing the drag threshold.
    Tap { source: NodeId },
}

#[derive(Debug, Clone)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
    threshold_sq: f64,
}

impl ConnectionStateMachine {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            state: ConnectionState::Idle,
            threshold_sq: config.drag_threshold_sq,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, ConnectionState::Idle)
    }

    pub fn source(&self) -> Option<NodeId> {
        match self.state {
            ConnectionState::Idle => None,
            ConnectionState::Pressed { source, .. } | ConnectionState::Dragging { source, .. } => {
                Some(source)
            }
        }
    }

    /// Press on `source`'s handle. `start` is the handle anchor,
    /// `pressed_at` the pointer position, both in canvas space.
    pub fn press(&mut self, source: NodeId, start: Point, pressed_at: Point) {
        if self.is_active() {
            debug_assert!(false, "connection press while {:?}", self.state);
            log::warn!("connection press while {:?}; restarting", self.state);
        }
        self.state = ConnectionState::Pressed {
            source,
            start,
            pressed_at,
        };
    }

    /// Pointer moved to `p` (canvas space). Returns true while a preview
    /// should be drawn.
    pub fn drag_to(&mut self, p: Point) -> bool {
        match self.state {
            ConnectionState::Idle => {
                debug_assert!(false, "connection drag without press");
                log::warn!("connection drag without press; ignored");
                false
            }
            ConnectionState::Pressed {
                source,
                start,
                pressed_at,
            } => {
                if (p - pressed_at).hypot2() > self.threshold_sq {
                    self.state = ConnectionState::Dragging {
                        source,
                        start,
                        end: p,
                    };
                    true
                } else {
                    false
                }
            }
            ConnectionState::Dragging { source, start, .. } => {
                self.state = ConnectionState::Dragging { source, start, end: p };
                true
            }
        }
    }

    /// Pointer released at `p` (canvas space). Resolves the target against
    /// `graph` and returns to `Idle`. `None` only for a release without a
    /// press.
    pub fn release(
        &mut self,
        p: Point,
        graph: &FlowGraph,
        config: &EditorConfig,
    ) -> Option<ConnectionOutcome> {
        if matches!(self.state, ConnectionState::Idle) {
            debug_assert!(false, "connection release without press");
            log::warn!("connection release without press; treated as cancel");
            return None;
        }
        self.drag_to(p);
        let outcome = match std::mem::replace(&mut self.state, ConnectionState::Idle) {
            ConnectionState::Idle => return None,
            ConnectionState::Pressed { source, .. } => ConnectionOutcome::Tap { source },
            ConnectionState::Dragging { source, end, .. } => {
                match connection_target(graph, end, Some(source), config) {
                    Some(target) => ConnectionOutcome::Commit { source, target },
                    None => ConnectionOutcome::Cancelled { source },
                }
            }
        };
        log::debug!("connection released: {outcome:?}");
        Some(outcome)
    }

    /// Discard the draft. Returns true if there was one.
    pub fn cancel(&mut self) -> bool {
        let was_active = self.is_active();
        self.state = ConnectionState::Idle;
        was_active
    }

    /// The dashed preview line, while dragging.
    pub fn preview(&self) -> Option<Line> {
        match self.state {
            ConnectionState::Dragging { start, end, .. } => Some(Line::new(start, end)),
            _ => None,
        }
    }
}
