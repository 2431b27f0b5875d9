//! Colour theme handed to renderers.
//!
//! The editor logic never looks at colours; this is the one opaque value
//! the host passes through (light/dark plus an optional accent such as a
//! belt colour).

use flow_core::model::{EdgeType, NodeKind};
use serde::{Deserialize, Serialize};

/// RGBA colour, components in [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let byte = |i: usize| -> Option<f32> {
            Some(f32::from(hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?) / 255.0)
        };
        match bytes.len() {
            6 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, 1.0)),
            8 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        let (r, g, b, a) = (q(self.r), q(self.g), q(self.b), q(self.a));
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}

fn hex(s: &str) -> Color {
    Color::from_hex(s).unwrap_or(Color::rgba(0.0, 0.0, 0.0, 1.0))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub background: Color,
    pub node_text: Color,
    pub technique_fill: Color,
    pub condition_fill: Color,
    pub note_fill: Color,
    pub edge_default: Color,
    pub edge_success: Color,
    pub edge_counter: Color,
    /// Selection outline, handles and the dashed connection preview.
    pub accent: Color,
}

impl Theme {
    pub fn light() -> Self {
        Self {
            background: hex("#F5F5F7"),
            node_text: hex("#1D1D1F"),
            technique_fill: hex("#FFFFFF"),
            condition_fill: hex("#E8F0FE"),
            note_fill: hex("#FFF8DC"),
            edge_default: hex("#6B7080"),
            edge_success: hex("#2E9E5B"),
            edge_counter: hex("#D9534F"),
            accent: hex("#0A84FF"),
        }
    }

    pub fn dark() -> Self {
        Self {
            background: hex("#1C1C1E"),
            node_text: hex("#F2F2F7"),
            technique_fill: hex("#2C2C2E"),
            condition_fill: hex("#1F2A3D"),
            note_fill: hex("#3A3423"),
            edge_default: hex("#98989D"),
            edge_success: hex("#30D158"),
            edge_counter: hex("#FF453A"),
            accent: hex("#0A84FF"),
        }
    }

    /// Override the accent, e.g. with the user's belt colour.
    pub fn with_accent(mut self, accent: Color) -> Self {
        self.accent = accent;
        self
    }

    pub fn edge_color(&self, edge_type: EdgeType) -> Color {
        match edge_type {
            EdgeType::Default => self.edge_default,
            EdgeType::Success => self.edge_success,
            EdgeType::Counter => self.edge_counter,
        }
    }

    pub fn node_fill(&self, kind: NodeKind) -> Color {
        match kind {
            NodeKind::Technique => self.technique_fill,
            NodeKind::Condition => self.condition_fill,
            NodeKind::Note => self.note_fill,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_hex_roundtrip() {
        let c = Color::from_hex("#6C5CE7").unwrap();
        assert_eq!(c.to_hex(), "#6C5CE7");
        let c2 = Color::from_hex("FF000080").unwrap();
        assert!((c2.a - 128.0 / 255.0).abs() < 0.01);
        assert_eq!(c2.to_hex(), "#FF000080");
        assert!(Color::from_hex("#12").is_none());
        assert!(Color::from_hex("#GG0000").is_none());
    }

    #[test]
    fn edge_type_selects_stroke() {
        let theme = Theme::dark().with_accent(Color::rgba(0.5, 0.0, 0.5, 1.0));
        assert_eq!(theme.edge_color(EdgeType::Counter), theme.edge_counter);
        assert_eq!(theme.accent.to_hex(), "#800080");
        assert_ne!(
            theme.node_fill(NodeKind::Note),
            theme.node_fill(NodeKind::Technique)
        );
    }
}
