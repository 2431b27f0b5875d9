//! Integration tests: graph → geometry → hit testing through a viewport.

use flow_core::model::{FlowEdge, FlowGraph, FlowNode, NodeKind, Position};
use flow_core::{EdgeId, EditorConfig, NodeId};
use flow_render::{
    HandleAnchor, Point, Size, Vec2, Viewport, connection_target, edge_at, flow_geometry,
    handle_at, node_at,
};
use pretty_assertions::assert_eq;

fn close(a: Point, b: Point) -> bool {
    (a - b).hypot() < 1e-6
}

/// A above B, two parallel edges A→B, one B→A, and a self-loop on A.
fn fixture() -> FlowGraph {
    let a = NodeId::intern("gs_a");
    let b = NodeId::intern("gs_b");
    let mut g = FlowGraph::new();
    g.insert_node(
        FlowNode::new(a, NodeKind::Condition, Position::new(0.0, 0.0)).with_label("Mount"),
    );
    g.insert_node(
        FlowNode::new(b, NodeKind::Technique, Position::new(0.0, 200.0)).with_label("Americana"),
    );
    for (id, s, t) in [
        ("gs_ab1", a, b),
        ("gs_ab2", a, b),
        ("gs_ba", b, a),
        ("gs_aa", a, a),
    ] {
        g.insert_edge(FlowEdge::new(EdgeId::intern(id), s, t));
    }
    g
}

#[test]
fn parallel_edges_fan_out_and_reverse_edges_bow_the_other_way() {
    let config = EditorConfig::default();
    let geom = flow_geometry(&fixture(), &config);
    let curve = |id: &str| geom.edge(EdgeId::intern(id)).unwrap().curve;

    let first = curve("gs_ab1");
    let second = curve("gs_ab2");
    assert!(close(first.start, Point::new(0.0, 30.0)));
    assert!(close(first.end, Point::new(0.0, 170.0)));
    assert!(close(first.control, Point::new(-40.0, 100.0)));
    assert!(close(second.control, Point::new(-64.0, 100.0)));
    assert!(close(first.label_anchor, Point::new(-52.0, 100.0)));
    assert!(!close(first.label_anchor, second.label_anchor));

    let back = curve("gs_ba");
    assert!(back.control.x > 0.0, "reverse edge should bow right, got {:?}", back.control);
}

#[test]
fn self_loop_sits_above_its_node() {
    let config = EditorConfig::default();
    let geom = flow_geometry(&fixture(), &config);
    let lp = geom.edge(EdgeId::intern("gs_aa")).unwrap().curve;
    let top = -config.node_height / 2.0;
    assert_eq!(lp.start.y, top);
    assert_eq!(lp.end.y, top);
    assert!(lp.start.x < 0.0 && lp.end.x > 0.0);
    assert!(lp.control.y < top - config.self_loop_height);
    assert!(lp.label_anchor.y < top);
}

#[test]
fn arrowheads_point_into_the_target() {
    let config = EditorConfig::default();
    let geom = flow_geometry(&fixture(), &config);
    for edge in &geom.edges {
        let [tip, w1, w2] = edge.curve.arrow;
        assert!(close(tip, edge.curve.end), "{} tip off the end", edge.id);
        assert!(((w1 - tip).hypot() - config.arrow_length).abs() < 1e-9);
        assert!(((w2 - tip).hypot() - config.arrow_length).abs() < 1e-9);
        // Wings trail behind the tip, towards the control point
        let back = edge.curve.control - tip;
        assert!((w1 - tip).dot(back) > 0.0);
        assert!((w2 - tip).dot(back) > 0.0);
    }
}

#[test]
fn picking_through_a_zoomed_viewport() {
    let config = EditorConfig::default();
    let graph = fixture();
    let geom = flow_geometry(&graph, &config);
    let vp = Viewport::new(2.0, Vec2::new(100.0, 50.0));

    let on_b = vp.screen_to_canvas(Point::new(100.0, 450.0));
    assert_eq!(node_at(&graph, on_b, &config), Some(NodeId::intern("gs_b")));

    let on_handle = vp.screen_to_canvas(Point::new(100.0, 110.0));
    assert_eq!(
        handle_at(&graph, on_handle, &config),
        Some((NodeId::intern("gs_a"), HandleAnchor::Bottom))
    );

    // Apex of the first A→B curve
    let apex = vp.screen_to_canvas(vp.canvas_to_screen(Point::new(-20.0, 100.0)));
    assert_eq!(edge_at(&geom, apex, &config), Some(EdgeId::intern("gs_ab1")));
    assert_eq!(edge_at(&geom, Point::new(-300.0, 100.0), &config), None);
}

#[test]
fn connection_target_skips_the_source() {
    let config = EditorConfig::default();
    let graph = fixture();
    let a = NodeId::intern("gs_a");
    assert_eq!(connection_target(&graph, Point::new(10.0, 5.0), Some(a), &config), None);
    assert_eq!(connection_target(&graph, Point::new(10.0, 5.0), None, &config), Some(a));
}

#[test]
fn zoom_to_fit_keeps_every_node_on_screen() {
    let config = EditorConfig::default();
    let geom = flow_geometry(&fixture(), &config);
    let screen = Size::new(800.0, 600.0);
    let vp = Viewport::fit(geom.bounds().unwrap(), screen, 24.0, &config);
    assert!(vp.scale >= config.min_scale && vp.scale <= config.max_scale);
    for node in &geom.nodes {
        for corner in [
            Point::new(node.rect.x0, node.rect.y0),
            Point::new(node.rect.x1, node.rect.y1),
        ] {
            let s = vp.canvas_to_screen(corner);
            assert!(s.x >= 0.0 && s.x <= screen.width, "{} off screen at {s:?}", node.id);
            assert!(s.y >= 0.0 && s.y <= screen.height, "{} off screen at {s:?}", node.id);
        }
    }
}
