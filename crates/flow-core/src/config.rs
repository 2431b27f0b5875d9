//! Editor configuration.
//!
//! Every tunable the editor core uses lives here and is passed in
//! explicitly. Hosts can load it from JSON; missing fields keep defaults.

use crate::model::Position;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Viewport scale range and discrete zoom step.
    pub min_scale: f64,
    pub max_scale: f64,
    pub zoom_step: f64,

    /// Size of the node box used for rendering and hit-testing (canvas units).
    pub node_width: f64,
    pub node_height: f64,

    /// Radius of the top/bottom connection handles.
    pub handle_radius: f64,

    /// Squared pointer distance a press must travel before it becomes a drag.
    pub drag_threshold_sq: f64,

    /// Curve offset cap and the divisor applied to the chord length.
    pub max_curve_offset: f64,
    pub curve_offset_divisor: f64,
    /// Extra offset per lane when several edges share the same endpoints.
    pub parallel_edge_spacing: f64,
    pub arrow_length: f64,
    pub arrow_angle_deg: f64,
    /// Distance beyond the curve offset at which the label is anchored.
    pub label_gap: f64,
    /// Height of the loop drawn for a self-referencing edge.
    pub self_loop_height: f64,
    /// Pointer tolerance for picking an edge curve.
    pub edge_hit_tolerance: f64,

    /// Where `add_node` places a node when no drop point is known.
    pub default_node_position: Position,

    pub allow_self_loops: bool,
    pub allow_parallel_edges: bool,

    /// Maximum undo depth.
    pub undo_depth: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.6,
            max_scale: 2.4,
            zoom_step: 0.1,
            node_width: 140.0,
            node_height: 60.0,
            handle_radius: 12.0,
            drag_threshold_sq: 16.0,
            max_curve_offset: 40.0,
            curve_offset_divisor: 3.0,
            parallel_edge_spacing: 24.0,
            arrow_length: 8.0,
            arrow_angle_deg: 30.0,
            label_gap: 12.0,
            self_loop_height: 56.0,
            edge_hit_tolerance: 8.0,
            default_node_position: Position::new(120.0, 120.0),
            allow_self_loops: true,
            allow_parallel_edges: true,
            undo_depth: 200,
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, crate::FlowError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn clamp_scale(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale)
    }
}
