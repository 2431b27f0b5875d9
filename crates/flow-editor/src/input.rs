//! Input abstraction layer.
//!
//! Front-ends (web canvas, native gesture recognisers) normalize their
//! mouse, touch and trackpad events into `InputEvent`. Pointer coordinates
//! are screen-local: relative to the canvas element's origin, before the
//! viewport transform.

use flow_render::Point;
use serde::{Deserialize, Serialize};

/// Keyboard modifier state at the time of an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
        meta: false,
    };

    /// Ctrl, or Cmd on macOS.
    pub fn primary(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A normalized input event from any pointing device or keyboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    /// Pointer pressed (mouse down, touch start).
    PointerDown { x: f64, y: f64 },

    PointerMove { x: f64, y: f64 },

    PointerUp { x: f64, y: f64 },

    /// The platform took the pointer away (touch cancel, focus loss).
    PointerCancel,

    /// Two-finger / trackpad pan. `dx, dy` are cumulative since the
    /// gesture started, in screen units.
    Pan { dx: f64, dy: f64 },

    PanEnd,

    /// Pinch zoom. `scale` is the cumulative magnification since the
    /// gesture started (1.0 = no change).
    Pinch { scale: f64 },

    PinchEnd,

    /// Key press. `key` is the `KeyboardEvent.key` value.
    Key {
        key: String,
        #[serde(default)]
        modifiers: Modifiers,
    },
}

impl InputEvent {
    pub fn pointer_down(x: f64, y: f64) -> Self {
        Self::PointerDown { x, y }
    }

    pub fn pointer_move(x: f64, y: f64) -> Self {
        Self::PointerMove { x, y }
    }

    pub fn pointer_up(x: f64, y: f64) -> Self {
        Self::PointerUp { x, y }
    }

    pub fn key(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self::Key {
            key: key.into(),
            modifiers,
        }
    }

    /// Extract the screen-local position if this is a pointer event.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { x, y } | Self::PointerMove { x, y } | Self::PointerUp { x, y } => {
                Some(Point::new(*x, *y))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn events_decode_from_front_end_json() {
        let ev: InputEvent =
            serde_json::from_str(r#"{ "type": "pointer_down", "x": 10.5, "y": 4 }"#).unwrap();
        assert_eq!(ev, InputEvent::pointer_down(10.5, 4.0));
        assert_eq!(ev.position(), Some(Point::new(10.5, 4.0)));

        let key: InputEvent =
            serde_json::from_str(r#"{ "type": "key", "key": "z", "modifiers": { "meta": true } }"#)
                .unwrap();
        let InputEvent::Key { modifiers, .. } = key else {
            panic!("expected key event");
        };
        assert!(modifiers.primary());
        assert!(!modifiers.shift);
    }

    #[test]
    fn gesture_events_have_no_position() {
        assert_eq!(InputEvent::Pinch { scale: 1.5 }.position(), None);
        assert_eq!(InputEvent::PointerCancel.position(), None);
    }
}
