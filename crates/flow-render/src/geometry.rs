//! Geometry engine: canvas ↔ screen transforms and edge shapes.
//!
//! Everything here is canvas-space except `Viewport`, which maps canvas
//! space onto the host's screen-local coordinates. Logic always runs in
//! canvas space; `canvas_to_screen` exists for renderers only.

use flow_core::model::{EdgeType, FlowGraph, NodeKind, Position};
use flow_core::{EdgeId, EditorConfig, NodeId};
use kurbo::{Point, QuadBez, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─── Viewport transform ─────────────────────────────────────────────────

/// Pan/zoom transform: `screen = canvas * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub scale: f64,
    pub offset: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Vec2::ZERO,
        }
    }
}

impl Viewport {
    pub fn new(scale: f64, offset: Vec2) -> Self {
        Self { scale, offset }
    }

    /// Convert a point relative to the canvas element's origin into canvas space.
    pub fn screen_to_canvas(&self, screen_local: Point) -> Point {
        ((screen_local.to_vec2() - self.offset) / self.scale).to_point()
    }

    pub fn canvas_to_screen(&self, canvas: Point) -> Point {
        (canvas.to_vec2() * self.scale + self.offset).to_point()
    }

    /// Convert a screen-space drag delta into a canvas-space delta.
    pub fn screen_delta_to_canvas(&self, delta: Vec2) -> Vec2 {
        delta / self.scale
    }

    /// The canvas-space rectangle visible in a screen of `size`.
    pub fn visible_canvas_rect(&self, size: Size) -> Rect {
        let p0 = self.screen_to_canvas(Point::ORIGIN);
        let p1 = self.screen_to_canvas(Point::new(size.width, size.height));
        Rect::from_points(p0, p1)
    }

    /// A viewport that fits `content` (canvas space) into `screen` with
    /// `padding` screen units on each side, scale clamped by `config`.
    pub fn fit(content: Rect, screen: Size, padding: f64, config: &EditorConfig) -> Viewport {
        let avail_w = (screen.width - 2.0 * padding).max(1.0);
        let avail_h = (screen.height - 2.0 * padding).max(1.0);
        let raw = if content.width() <= f64::EPSILON || content.height() <= f64::EPSILON {
            1.0
        } else {
            (avail_w / content.width()).min(avail_h / content.height())
        };
        let scale = config.clamp_scale(raw);
        let screen_center = Vec2::new(screen.width / 2.0, screen.height / 2.0);
        let offset = screen_center - content.center().to_vec2() * scale;
        Viewport { scale, offset }
    }
}

// ─── Node boxes & anchors ───────────────────────────────────────────────

/// The box a node occupies, centred on its position.
pub fn node_rect(position: Position, config: &EditorConfig) -> Rect {
    Rect::from_center_size(
        Point::from(position),
        Size::new(config.node_width, config.node_height),
    )
}

/// Which connection handle of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleAnchor {
    Top,
    Bottom,
}

pub fn anchor_point(position: Position, anchor: HandleAnchor, config: &EditorConfig) -> Point {
    let half = config.node_height / 2.0;
    match anchor {
        HandleAnchor::Top => Point::new(position.x, position.y - half),
        HandleAnchor::Bottom => Point::new(position.x, position.y + half),
    }
}

// ─── Edge curves ────────────────────────────────────────────────────────

/// Renderable shape of one edge: a quadratic curve, a filled arrowhead
/// triangle at the end, and an anchor point for the label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeCurve {
    pub start: Point,
    pub control: Point,
    pub end: Point,
    /// `(tip, wing1, wing2)`.
    pub arrow: [Point; 3],
    pub label_anchor: Point,
}

impl EdgeCurve {
    pub fn path(&self) -> QuadBez {
        QuadBez::new(self.start, self.control, self.end)
    }
}

/// Curve from `start` to `end`. `lane` fans out edges sharing endpoints.
pub fn edge_curve(start: Point, end: Point, lane: usize, config: &EditorConfig) -> EdgeCurve {
    let chord = end - start;
    let len = chord.hypot();
    // Coincident endpoints have no direction; bow upwards.
    let normal = if len > f64::EPSILON {
        Vec2::new(-chord.y / len, chord.x / len)
    } else {
        Vec2::new(0.0, -1.0)
    };
    let offset = (len / config.curve_offset_divisor).min(config.max_curve_offset)
        + lane as f64 * config.parallel_edge_spacing;
    let mid = start.midpoint(end);
    let control = mid + normal * offset;
    EdgeCurve {
        start,
        control,
        end,
        arrow: arrowhead(control, end, chord, config),
        label_anchor: mid + normal * (offset + config.label_gap),
    }
}

/// Loop drawn above a node for an edge whose source is its target.
pub fn self_loop_curve(position: Position, lane: usize, config: &EditorConfig) -> EdgeCurve {
    let top = anchor_point(position, HandleAnchor::Top, config);
    let spread = config.node_width / 4.0;
    let height = config.self_loop_height + lane as f64 * config.parallel_edge_spacing;
    let start = Point::new(top.x - spread, top.y);
    let end = Point::new(top.x + spread, top.y);
    // A quadratic's apex sits halfway to its control point.
    let control = Point::new(top.x, top.y - 2.0 * height);
    EdgeCurve {
        start,
        control,
        end,
        arrow: arrowhead(control, end, end - start, config),
        label_anchor: Point::new(top.x, top.y - height - config.label_gap),
    }
}

/// Arrowhead at `tip`, oriented along `tip - control` (the curve tangent
/// at its end), falling back to `fallback` when that is degenerate.
fn arrowhead(control: Point, tip: Point, fallback: Vec2, config: &EditorConfig) -> [Point; 3] {
    let mut dir = tip - control;
    if dir.hypot() <= f64::EPSILON {
        dir = if fallback.hypot() > f64::EPSILON {
            fallback
        } else {
            Vec2::new(0.0, 1.0)
        };
    }
    let angle = dir.atan2();
    let spread = config.arrow_angle_deg.to_radians();
    let wing1 = tip - Vec2::from_angle(angle - spread) * config.arrow_length;
    let wing2 = tip - Vec2::from_angle(angle + spread) * config.arrow_length;
    [tip, wing1, wing2]
}

// ─── Whole-flow geometry ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeBox {
    pub id: NodeId,
    pub kind: NodeKind,
    pub label: String,
    pub rect: Rect,
    pub top_handle: Point,
    pub bottom_handle: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeGeometry {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub edge_type: EdgeType,
    pub label: Option<String>,
    pub curve: EdgeCurve,
}

/// Everything a renderer needs, in draw order (edges below nodes is the
/// renderer's choice).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlowGeometry {
    pub nodes: Vec<NodeBox>,
    pub edges: Vec<EdgeGeometry>,
}

impl FlowGeometry {
    /// Union of node boxes and edge control points, if the flow is not empty.
    pub fn bounds(&self) -> Option<Rect> {
        let mut rects = self
            .nodes
            .iter()
            .map(|n| n.rect)
            .chain(self.edges.iter().map(|e| {
                Rect::from_points(e.curve.start, e.curve.end).union_pt(e.curve.control)
            }));
        let first = rects.next()?;
        Some(rects.fold(first, |acc, r| acc.union(r)))
    }

    pub fn edge(&self, id: EdgeId) -> Option<&EdgeGeometry> {
        self.edges.iter().find(|e| e.id == id)
    }
}

/// Compute geometry for every node and edge of `graph`.
///
/// Edges run from the source's bottom anchor to the target's top anchor.
/// The n-th edge with the same `(source, target)` pair gets lane n.
pub fn flow_geometry(graph: &FlowGraph, config: &EditorConfig) -> FlowGeometry {
    let nodes = graph
        .nodes()
        .map(|n| NodeBox {
            id: n.id,
            kind: n.kind,
            label: n.display_label().to_string(),
            rect: node_rect(n.position, config),
            top_handle: anchor_point(n.position, HandleAnchor::Top, config),
            bottom_handle: anchor_point(n.position, HandleAnchor::Bottom, config),
        })
        .collect();

    let mut lanes: HashMap<(NodeId, NodeId), usize> = HashMap::new();
    let mut edges = Vec::with_capacity(graph.edge_count());
    for edge in graph.edges() {
        let (Some(source), Some(target)) = (graph.node(edge.source), graph.node(edge.target))
        else {
            log::warn!("edge {} references a missing node, skipped", edge.id);
            continue;
        };
        let lane = lanes.entry((edge.source, edge.target)).or_insert(0);
        let curve = if edge.is_self_loop() {
            self_loop_curve(source.position, *lane, config)
        } else {
            edge_curve(
                anchor_point(source.position, HandleAnchor::Bottom, config),
                anchor_point(target.position, HandleAnchor::Top, config),
                *lane,
                config,
            )
        };
        *lane += 1;
        edges.push(EdgeGeometry {
            id: edge.id,
            source: edge.source,
            target: edge.target,
            edge_type: edge.edge_type,
            label: edge.label.clone(),
            curve,
        });
    }

    FlowGeometry { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::model::{FlowEdge, FlowNode};

    const EPS: f64 = 1e-9;

    fn close(a: Point, b: Point) -> bool {
        (a - b).hypot() < 1e-6
    }

    #[test]
    fn transform_inverse_holds() {
        let viewports = [
            Viewport::default(),
            Viewport::new(0.6, Vec2::new(-120.0, 33.5)),
            Viewport::new(2.4, Vec2::new(400.0, -250.25)),
            Viewport::new(1.37, Vec2::new(0.1, 0.2)),
        ];
        let points = [
            Point::new(0.0, 0.0),
            Point::new(123.4, -56.7),
            Point::new(-9999.0, 4242.0),
        ];
        for vp in viewports {
            for p in points {
                assert!(close(vp.canvas_to_screen(vp.screen_to_canvas(p)), p));
                assert!(close(vp.screen_to_canvas(vp.canvas_to_screen(p)), p));
            }
        }
    }

    #[test]
    fn screen_to_canvas_applies_offset_then_scale() {
        let vp = Viewport::new(2.0, Vec2::new(100.0, 50.0));
        let p = vp.screen_to_canvas(Point::new(300.0, 250.0));
        assert!(close(p, Point::new(100.0, 100.0)));
        let d = vp.screen_delta_to_canvas(Vec2::new(40.0, -20.0));
        assert!((d.x - 20.0).abs() < EPS && (d.y + 10.0).abs() < EPS);
    }

    #[test]
    fn curve_offset_is_capped() {
        let config = EditorConfig::default();
        // Long horizontal chord: offset = min(40, 300/3) = 40
        let c = edge_curve(Point::new(0.0, 0.0), Point::new(300.0, 0.0), 0, &config);
        assert!(close(c.control, Point::new(150.0, 40.0)));
        assert!(close(c.label_anchor, Point::new(150.0, 52.0)));

        // Short chord: offset = 60/3 = 20
        let c = edge_curve(Point::new(0.0, 0.0), Point::new(60.0, 0.0), 0, &config);
        assert!(close(c.control, Point::new(30.0, 20.0)));
    }

    #[test]
    fn arrowhead_wings_sit_behind_tip() {
        let config = EditorConfig::default();
        let c = edge_curve(Point::new(0.0, 0.0), Point::new(300.0, 0.0), 0, &config);
        let [tip, w1, w2] = c.arrow;
        assert!(close(tip, c.end));
        assert!((tip.distance(w1) - 8.0).abs() < 1e-9);
        assert!((tip.distance(w2) - 8.0).abs() < 1e-9);
        // Wings are symmetric about the tangent (control -> tip).
        let tangent = (tip - c.control).normalize();
        let a1 = (tip - w1).normalize().dot(tangent).acos().to_degrees();
        let a2 = (tip - w2).normalize().dot(tangent).acos().to_degrees();
        assert!((a1 - 30.0).abs() < 1e-6 && (a2 - 30.0).abs() < 1e-6);
    }

    #[test]
    fn coincident_endpoints_do_not_produce_nan() {
        let config = EditorConfig::default();
        let p = Point::new(10.0, 10.0);
        let c = edge_curve(p, p, 0, &config);
        assert!(c.control.is_finite());
        assert!(c.arrow.iter().all(|q| q.is_finite()));
    }

    #[test]
    fn parallel_edges_fan_out_and_self_loops_sit_above() {
        let config = EditorConfig::default();
        let mut g = FlowGraph::new();
        let a = NodeId::intern("g_a");
        let b = NodeId::intern("g_b");
        g.insert_node(FlowNode::new(a, NodeKind::Technique, Position::new(0.0, 0.0)));
        g.insert_node(FlowNode::new(b, NodeKind::Technique, Position::new(0.0, 300.0)));
        g.insert_edge(FlowEdge::new(EdgeId::intern("g_e1"), a, b)).unwrap();
        g.insert_edge(FlowEdge::new(EdgeId::intern("g_e2"), a, b)).unwrap();
        g.insert_edge(FlowEdge::new(EdgeId::intern("g_loop"), a, a)).unwrap();

        let geo = flow_geometry(&g, &config);
        assert_eq!(geo.nodes.len(), 2);
        assert_eq!(geo.edges.len(), 3);
        let e1 = geo.edge(EdgeId::intern("g_e1")).unwrap();
        let e2 = geo.edge(EdgeId::intern("g_e2")).unwrap();
        assert!(close(e1.curve.start, Point::new(0.0, 30.0)));
        assert!(close(e1.curve.end, Point::new(0.0, 270.0)));
        let d1 = e1.curve.control.distance(e1.curve.start.midpoint(e1.curve.end));
        let d2 = e2.curve.control.distance(e2.curve.start.midpoint(e2.curve.end));
        assert!((d2 - d1 - config.parallel_edge_spacing).abs() < 1e-9);

        let lp = geo.edge(EdgeId::intern("g_loop")).unwrap();
        assert!(lp.curve.control.y < -30.0);
        assert!(lp.curve.start.x < lp.curve.end.x);
    }

    #[test]
    fn fit_centres_content() {
        let config = EditorConfig::default();
        let content = Rect::new(0.0, 0.0, 400.0, 200.0);
        let vp = Viewport::fit(content, Size::new(800.0, 600.0), 0.0, &config);
        assert!((vp.scale - 2.0).abs() < EPS);
        let centre = vp.canvas_to_screen(content.center());
        assert!(close(centre, Point::new(400.0, 300.0)));
    }

    #[test]
    fn geometry_serializes_for_renderers() {
        let config = EditorConfig::default();
        let mut g = FlowGraph::new();
        g.insert_node(FlowNode::new(
            NodeId::intern("g_solo"),
            NodeKind::Note,
            Position::new(5.0, 5.0),
        ));
        let json = serde_json::to_string(&flow_geometry(&g, &config)).unwrap();
        assert!(json.contains("\"label\":\"Node\""));
        assert!(json.contains("\"kind\":\"note\""));
    }
}
