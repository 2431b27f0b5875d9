//! Pan/zoom controller.
//!
//! Gestures update a transient delta (pan) or factor (pinch) layered over
//! the committed viewport; the transient part is folded into the committed
//! state when the gesture ends and thrown away when it is cancelled.
//! `current()` is what renderers and hit-testing use mid-gesture.

use flow_core::EditorConfig;
use flow_render::{FlowGeometry, Size, Vec2, Viewport};

#[derive(Debug, Clone)]
pub struct ViewportController {
    committed: Viewport,
    pan_delta: Vec2,
    pinch_factor: f64,
    min_scale: f64,
    max_scale: f64,
    zoom_step: f64,
}

impl ViewportController {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            committed: Viewport::default(),
            pan_delta: Vec2::ZERO,
            pinch_factor: 1.0,
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            zoom_step: config.zoom_step,
        }
    }

    fn clamp(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale)
    }

    /// The effective viewport, transient gesture state included.
    pub fn current(&self) -> Viewport {
        Viewport {
            scale: self.clamp(self.committed.scale * self.pinch_factor),
            offset: self.committed.offset + self.pan_delta,
        }
    }

    pub fn committed(&self) -> Viewport {
        self.committed
    }

    pub fn is_gesture_active(&self) -> bool {
        self.pan_delta != Vec2::ZERO || self.pinch_factor != 1.0
    }

    /// `total` is the screen-space translation since the pan began.
    pub fn pan_update(&mut self, total: Vec2) {
        self.pan_delta = total;
    }

    pub fn pan_end(&mut self) {
        self.committed.offset += self.pan_delta;
        self.pan_delta = Vec2::ZERO;
    }

    /// `factor` is the cumulative magnification since the pinch began.
    pub fn pinch_update(&mut self, factor: f64) {
        if factor.is_finite() && factor > 0.0 {
            self.pinch_factor = factor;
        } else {
            log::warn!("ignoring pinch factor {factor}");
        }
    }

    pub fn pinch_end(&mut self) {
        self.committed.scale = self.clamp(self.committed.scale * self.pinch_factor);
        self.pinch_factor = 1.0;
    }

    /// Drop the transient part of any in-flight gesture.
    pub fn cancel_gesture(&mut self) {
        self.pan_delta = Vec2::ZERO;
        self.pinch_factor = 1.0;
    }

    pub fn zoom_in(&mut self) {
        self.committed.scale = self.clamp(self.committed.scale + self.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.committed.scale = self.clamp(self.committed.scale - self.zoom_step);
    }

    /// Back to `scale = 1`, `offset = 0`.
    pub fn reset(&mut self) {
        self.cancel_gesture();
        self.committed = Viewport::default();
    }

    pub fn set(&mut self, viewport: Viewport) {
        self.cancel_gesture();
        self.committed = Viewport {
            scale: self.clamp(viewport.scale),
            offset: viewport.offset,
        };
    }

    /// Fit the whole flow into a screen of `screen` size. Empty flows reset.
    pub fn zoom_to_fit(&mut self, geometry: &FlowGeometry, screen: Size, config: &EditorConfig) {
        match geometry.bounds() {
            Some(bounds) => self.set(Viewport::fit(bounds, screen, 24.0, config)),
            None => self.reset(),
        }
    }
}
