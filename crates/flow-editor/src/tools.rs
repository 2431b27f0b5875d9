//! Node drag tool.
//!
//! The pre-drag position and the pointer's screen position are recorded
//! once at the start; every move recomputes the absolute position
//! `start + (pointer - pointer_start) / scale`, so rounding never
//! accumulates and zooming mid-drag keeps the node under the finger.

use crate::edit::FlowMutation;
use flow_core::NodeId;
use flow_core::model::Position;
use flow_render::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
struct DragSession {
    id: NodeId,
    start_position: Position,
    pointer_start: Point,
    moved: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NodeDrag {
    session: Option<DragSession>,
    threshold_sq: f64,
}

impl NodeDrag {
    pub fn new(threshold_sq: f64) -> Self {
        Self {
            session: None,
            threshold_sq,
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn node(&self) -> Option<NodeId> {
        self.session.map(|s| s.id)
    }

    /// Whether the pointer has left the drag threshold.
    pub fn has_moved(&self) -> bool {
        self.session.is_some_and(|s| s.moved)
    }

    /// Begin dragging `id`. `pointer` is screen-local.
    pub fn begin(&mut self, id: NodeId, start_position: Position, pointer: Point) {
        if let Some(prev) = self.session {
            log::warn!("node drag of {} replaced by {id}", prev.id);
        }
        self.session = Some(DragSession {
            id,
            start_position,
            pointer_start: pointer,
            moved: false,
        });
    }

    /// Pointer moved to `pointer` (screen-local) at viewport `scale`.
    /// Returns the absolute move to apply, or `None` inside the threshold.
    pub fn update(&mut self, pointer: Point, scale: f64) -> Option<FlowMutation> {
        let session = self.session.as_mut()?;
        let delta = pointer - session.pointer_start;
        if !session.moved {
            if delta.hypot2() <= self.threshold_sq {
                return None;
            }
            session.moved = true;
        }
        let scale = if scale > 0.0 { scale } else { 1.0 };
        Some(FlowMutation::MoveNode {
            id: session.id,
            position: session
                .start_position
                .translated(delta.x / scale, delta.y / scale),
        })
    }

    /// Finish the drag. Returns the node id and whether it moved.
    pub fn end(&mut self) -> Option<(NodeId, bool)> {
        self.session.take().map(|s| (s.id, s.moved))
    }

    /// Abort the drag, returning the move that puts the node back.
    pub fn cancel(&mut self) -> Option<FlowMutation> {
        let session = self.session.take()?;
        session.moved.then_some(FlowMutation::MoveNode {
            id: session.id,
            position: session.start_position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn moved_to(m: Option<FlowMutation>) -> Position {
        match m {
            Some(FlowMutation::MoveNode { position, .. }) => position,
            other => panic!("expected a move, got {other:?}"),
        }
    }

    #[test]
    fn absolute_math_under_zoom() {
        let mut drag = NodeDrag::new(16.0);
        let id = NodeId::intern("t_a");
        drag.begin(id, Position::new(100.0, 50.0), Point::new(300.0, 300.0));
        // 2x zoom: 80 screen px is 40 canvas units
        assert_eq!(
            moved_to(drag.update(Point::new(380.0, 300.0), 2.0)),
            Position::new(140.0, 50.0)
        );
        // Recomputed from the start, not accumulated
        assert_eq!(
            moved_to(drag.update(Point::new(380.0, 240.0), 2.0)),
            Position::new(140.0, 20.0)
        );
        assert_eq!(drag.end(), Some((id, true)));
        assert!(!drag.is_active());
    }

    #[test]
    fn threshold_suppresses_jitter() {
        let mut drag = NodeDrag::new(16.0);
        drag.begin(NodeId::intern("t_b"), Position::default(), Point::new(0.0, 0.0));
        assert!(drag.update(Point::new(3.0, 0.0), 1.0).is_none());
        assert!(!drag.has_moved());
        assert_eq!(drag.end(), Some((NodeId::intern("t_b"), false)));
    }

    #[test]
    fn cancel_restores_start() {
        let mut drag = NodeDrag::new(16.0);
        let id = NodeId::intern("t_c");
        drag.begin(id, Position::new(7.0, 8.0), Point::ORIGIN);
        drag.update(Point::new(50.0, 50.0), 1.0);
        assert_eq!(
            drag.cancel(),
            Some(FlowMutation::MoveNode {
                id,
                position: Position::new(7.0, 8.0)
            })
        );
        assert_eq!(drag.cancel(), None);
    }
}
