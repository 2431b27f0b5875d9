//! Keyboard shortcut map.
//!
//! Maps key events to editor actions. The primary modifier is Cmd on
//! macOS and Ctrl elsewhere; both are accepted so one map serves every
//! platform.

use crate::input::Modifiers;

/// An action a key combo can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShortcutAction {
    Undo,
    Redo,
    DeleteSelection,
    ZoomIn,
    ZoomOut,
    ZoomReset,
    AddTechnique,
    AddCondition,
    AddNote,
    /// Escape: cancel an in-flight connection or drag, else clear selection.
    Cancel,
}

impl ShortcutAction {
    pub fn label(&self) -> &'static str {
        match self {
            ShortcutAction::Undo => "Undo",
            ShortcutAction::Redo => "Redo",
            ShortcutAction::DeleteSelection => "Delete",
            ShortcutAction::ZoomIn => "Zoom in",
            ShortcutAction::ZoomOut => "Zoom out",
            ShortcutAction::ZoomReset => "Reset zoom",
            ShortcutAction::AddTechnique => "Add technique",
            ShortcutAction::AddCondition => "Add position",
            ShortcutAction::AddNote => "Add note",
            ShortcutAction::Cancel => "Cancel",
        }
    }
}

pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`).
    /// Returns `None` if the combo has no binding.
    pub fn resolve(key: &str, modifiers: Modifiers) -> Option<ShortcutAction> {
        let cmd = modifiers.primary();

        if cmd && modifiers.shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                "=" | "+" => Some(ShortcutAction::ZoomIn),
                "-" => Some(ShortcutAction::ZoomOut),
                "0" => Some(ShortcutAction::ZoomReset),
                _ => None,
            };
        }

        if modifiers.alt {
            return None;
        }

        match key {
            "t" | "T" => Some(ShortcutAction::AddTechnique),
            "p" | "P" => Some(ShortcutAction::AddCondition),
            "n" | "N" => Some(ShortcutAction::AddNote),
            "Delete" | "Backspace" => Some(ShortcutAction::DeleteSelection),
            "Escape" => Some(ShortcutAction::Cancel),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const META: Modifiers = Modifiers {
        meta: true,
        ..Modifiers::NONE
    };
    const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };

    #[test]
    fn resolve_undo_redo() {
        assert_eq!(ShortcutMap::resolve("z", META), Some(ShortcutAction::Undo));
        assert_eq!(ShortcutMap::resolve("z", CTRL), Some(ShortcutAction::Undo));
        let shifted = Modifiers {
            shift: true,
            ..META
        };
        assert_eq!(ShortcutMap::resolve("Z", shifted), Some(ShortcutAction::Redo));
        assert_eq!(ShortcutMap::resolve("y", CTRL), Some(ShortcutAction::Redo));
    }

    #[test]
    fn resolve_zoom() {
        assert_eq!(ShortcutMap::resolve("=", META), Some(ShortcutAction::ZoomIn));
        assert_eq!(ShortcutMap::resolve("-", CTRL), Some(ShortcutAction::ZoomOut));
        assert_eq!(ShortcutMap::resolve("0", META), Some(ShortcutAction::ZoomReset));
    }

    #[test]
    fn resolve_single_keys() {
        let none = Modifiers::NONE;
        assert_eq!(
            ShortcutMap::resolve("Backspace", none),
            Some(ShortcutAction::DeleteSelection)
        );
        assert_eq!(ShortcutMap::resolve("Escape", none), Some(ShortcutAction::Cancel));
        assert_eq!(ShortcutMap::resolve("t", none), Some(ShortcutAction::AddTechnique));
        assert_eq!(ShortcutMap::resolve("P", none), Some(ShortcutAction::AddCondition));
        assert_eq!(ShortcutMap::resolve("n", none), Some(ShortcutAction::AddNote));
    }

    #[test]
    fn modifier_precedence() {
        // Plain "z" is not undo; Cmd+T is left to the browser
        assert_eq!(ShortcutMap::resolve("z", Modifiers::NONE), None);
        assert_eq!(ShortcutMap::resolve("t", META), None);
        let alt = Modifiers {
            alt: true,
            ..Modifiers::NONE
        };
        assert_eq!(ShortcutMap::resolve("n", alt), None);
    }
}
