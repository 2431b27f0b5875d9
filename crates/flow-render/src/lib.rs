pub mod geometry;
pub mod hit;
pub mod theme;

pub use geometry::{
    EdgeCurve, EdgeGeometry, FlowGeometry, HandleAnchor, NodeBox, Viewport, flow_geometry,
};
pub use hit::{connection_target, edge_at, handle_at, node_at};
pub use theme::{Color, Theme};

// Re-export kurbo primitives so front-ends and the editor speak the same types
pub use kurbo::{Line, Point, Rect, Size, Vec2};
