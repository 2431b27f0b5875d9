//! Canvas2D renderer.
//!
//! Draws a `FlowGeometry` to an HTML `<canvas>` through
//! `CanvasRenderingContext2d`. All shapes come precomputed from
//! `flow-render`; this module only maps them onto canvas calls.

use flow_core::EdgeId;
use flow_editor::Selection;
use flow_render::{FlowGeometry, Line, Point, Theme, Viewport};
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

pub struct Frame<'a> {
    pub geometry: &'a FlowGeometry,
    pub viewport: Viewport,
    pub selection: Selection,
    pub preview: Option<Line>,
    pub handle_radius: f64,
    pub width: f64,
    pub height: f64,
}

pub fn render_flow(ctx: &CanvasRenderingContext2d, frame: &Frame<'_>, theme: &Theme) {
    if let Err(err) = draw(ctx, frame, theme) {
        log::warn!("render failed: {err:?}");
    }
}

fn draw(ctx: &CanvasRenderingContext2d, frame: &Frame<'_>, theme: &Theme) -> Result<(), JsValue> {
    ctx.reset_transform()?;
    ctx.set_fill_style_str(&theme.background.to_hex());
    ctx.fill_rect(0.0, 0.0, frame.width, frame.height);

    let vp = frame.viewport;
    ctx.set_transform(vp.scale, 0.0, 0.0, vp.scale, vp.offset.x, vp.offset.y)?;

    let selected_edge: Option<EdgeId> = match frame.selection {
        Selection::Edge(id) => Some(id),
        _ => None,
    };

    ctx.set_font("12px -apple-system, system-ui, sans-serif");
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");

    for edge in &frame.geometry.edges {
        let stroke = if selected_edge == Some(edge.id) {
            theme.accent
        } else {
            theme.edge_color(edge.edge_type)
        }
        .to_hex();
        let c = &edge.curve;
        ctx.set_stroke_style_str(&stroke);
        ctx.set_line_width(if selected_edge == Some(edge.id) { 2.5 } else { 1.5 });
        ctx.begin_path();
        ctx.move_to(c.start.x, c.start.y);
        ctx.quadratic_curve_to(c.control.x, c.control.y, c.end.x, c.end.y);
        ctx.stroke();

        ctx.set_fill_style_str(&stroke);
        polygon(ctx, &c.arrow);
        ctx.fill();

        if let Some(label) = &edge.label {
            ctx.set_fill_style_str(&theme.node_text.to_hex());
            ctx.fill_text(label, c.label_anchor.x, c.label_anchor.y)?;
        }
    }

    for node in &frame.geometry.nodes {
        let r = node.rect;
        let selected = frame.selection == Selection::Node(node.id);
        ctx.set_fill_style_str(&theme.node_fill(node.kind).to_hex());
        ctx.fill_rect(r.x0, r.y0, r.width(), r.height());
        ctx.set_stroke_style_str(
            &if selected {
                theme.accent
            } else {
                theme.edge_default
            }
            .to_hex(),
        );
        ctx.set_line_width(if selected { 2.0 } else { 1.0 });
        ctx.stroke_rect(r.x0, r.y0, r.width(), r.height());

        ctx.set_fill_style_str(&theme.node_text.to_hex());
        let center = r.center();
        ctx.fill_text(&node.label, center.x, center.y)?;

        if selected {
            ctx.set_fill_style_str(&theme.accent.to_hex());
            for handle in [node.top_handle, node.bottom_handle] {
                circle(ctx, handle, frame.handle_radius / 2.0)?;
                ctx.fill();
            }
        }
    }

    if let Some(line) = frame.preview {
        let dash = js_sys::Array::of2(&JsValue::from_f64(6.0), &JsValue::from_f64(4.0));
        ctx.set_line_dash(&dash)?;
        ctx.set_stroke_style_str(&theme.accent.to_hex());
        ctx.set_line_width(1.5);
        ctx.begin_path();
        ctx.move_to(line.p0.x, line.p0.y);
        ctx.line_to(line.p1.x, line.p1.y);
        ctx.stroke();
        ctx.set_line_dash(&js_sys::Array::new())?;
    }

    ctx.reset_transform()
}

fn polygon(ctx: &CanvasRenderingContext2d, points: &[Point]) {
    let Some((first, rest)) = points.split_first() else {
        return;
    };
    ctx.begin_path();
    ctx.move_to(first.x, first.y);
    for p in rest {
        ctx.line_to(p.x, p.y);
    }
    ctx.close_path();
}

fn circle(ctx: &CanvasRenderingContext2d, center: Point, radius: f64) -> Result<(), JsValue> {
    ctx.begin_path();
    ctx.arc(center.x, center.y, radius, 0.0, std::f64::consts::TAU)
}
