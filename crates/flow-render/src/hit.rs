//! Hit testing: canvas point → node, handle, or edge.
//!
//! Pointer picking walks nodes front-to-back (last inserted = topmost).
//! Connection targets use plain iteration order so the first overlapping
//! node wins, matching how drops are resolved on every front-end.

use crate::geometry::{FlowGeometry, HandleAnchor, anchor_point, node_rect};
use flow_core::model::FlowGraph;
use flow_core::{EdgeId, EditorConfig, NodeId};
use kurbo::{ParamCurveNearest, Point};

/// Topmost node whose box contains `p`.
pub fn node_at(graph: &FlowGraph, p: Point, config: &EditorConfig) -> Option<NodeId> {
    graph
        .node_ids()
        .iter()
        .rev()
        .filter_map(|id| graph.node(*id))
        .find(|n| node_rect(n.position, config).contains(p))
        .map(|n| n.id)
}

/// First node (in iteration order) whose box contains `p`, skipping `exclude`.
/// Used to decide where a dragged connection terminates.
pub fn connection_target(
    graph: &FlowGraph,
    p: Point,
    exclude: Option<NodeId>,
    config: &EditorConfig,
) -> Option<NodeId> {
    graph
        .nodes()
        .filter(|n| Some(n.id) != exclude)
        .find(|n| node_rect(n.position, config).contains(p))
        .map(|n| n.id)
}

/// Topmost connection handle within `handle_radius` of `p`.
pub fn handle_at(
    graph: &FlowGraph,
    p: Point,
    config: &EditorConfig,
) -> Option<(NodeId, HandleAnchor)> {
    let r_sq = config.handle_radius * config.handle_radius;
    for id in graph.node_ids().iter().rev() {
        let Some(node) = graph.node(*id) else {
            continue;
        };
        for anchor in [HandleAnchor::Bottom, HandleAnchor::Top] {
            let a = anchor_point(node.position, anchor, config);
            if (a - p).hypot2() <= r_sq {
                return Some((node.id, anchor));
            }
        }
    }
    None
}

/// Topmost edge whose curve passes within `edge_hit_tolerance` of `p`.
pub fn edge_at(geometry: &FlowGeometry, p: Point, config: &EditorConfig) -> Option<EdgeId> {
    let tol_sq = config.edge_hit_tolerance * config.edge_hit_tolerance;
    geometry
        .edges
        .iter()
        .rev()
        .find(|e| e.curve.path().nearest(p, 0.01).distance_sq <= tol_sq)
        .map(|e| e.id)
}
