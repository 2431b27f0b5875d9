//! WASM bridge for the flow editor: exposes `EditorSession` to JavaScript.
//!
//! Built with `wasm-pack build --target web`. Every call takes and returns
//! plain values or JSON strings; the host owns persistence and the
//! technique library.

mod render2d;

use flow_core::model::NodeKind;
use flow_core::{
    EditorConfig, Flow, FlowDocument, FlowError, FlowHeader, FlowPatch, StaticLibrary, Technique,
};
use flow_editor::{EditEngine, EditorSession, InputEvent, Modifiers, SessionUpdate};
use flow_render::{Color, Size, Theme};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

/// The canvas controller handed to the webview.
#[wasm_bindgen]
pub struct FlowCanvas {
    session: EditorSession,
    width: f64,
    height: f64,
    /// Dark mode flag; `false` = light (default).
    dark_mode: bool,
    accent: Option<Color>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SavePayload {
    revision: u64,
    patch: FlowPatch,
}

#[wasm_bindgen]
impl FlowCanvas {
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> Self {
        console_error_panic_hook_setup();

        let header = FlowHeader::new("local", "Untitled flow");
        let session = EditorSession::new(EditEngine::new(header, EditorConfig::default()));
        let mut canvas = Self {
            session,
            width,
            height,
            dark_mode: false,
            accent: None,
        };
        canvas.resize(width, height);
        canvas
    }

    // ─── Document ────────────────────────────────────────────────────────

    /// Open a stored flow. `config_json` may be empty for defaults.
    /// Returns `false` (and keeps the current flow) if either fails to
    /// parse or the document is inconsistent.
    pub fn load_flow_json(&mut self, flow_json: &str, config_json: &str) -> bool {
        match open_session(flow_json, config_json) {
            Ok(session) => {
                self.session.close();
                self.session = session;
                self.session.set_screen_size(Size::new(self.width, self.height));
                true
            }
            Err(err) => {
                log::warn!("load_flow_json: {err}");
                false
            }
        }
    }

    /// Apply persisted changes that arrived from the backend.
    pub fn apply_patch_json(&mut self, patch_json: &str) -> bool {
        let result = serde_json::from_str::<FlowPatch>(patch_json)
            .map_err(FlowError::from)
            .and_then(|patch| self.session.apply_patch(patch));
        report("apply_patch_json", result)
    }

    /// Merge another flow's document (e.g. from a template) with fresh ids.
    pub fn merge_document_json(&mut self, document_json: &str) -> bool {
        let result = FlowDocument::from_json(document_json)
            .and_then(|doc| self.session.merge_document(&doc, None));
        report("merge_document_json", result)
    }

    pub fn get_document_json(&self) -> String {
        to_json(&self.session.engine().document())
    }

    pub fn get_flow_json(&self) -> String {
        to_json(&self.session.engine().to_flow())
    }

    /// Node boxes, edge curves and label anchors in canvas coordinates.
    pub fn get_geometry_json(&self) -> String {
        to_json(&self.session.geometry())
    }

    pub fn get_viewport_json(&self) -> String {
        to_json(&self.session.viewport())
    }

    /// `{"kind":"none"}`, `{"kind":"node","id":..}` or `{"kind":"edge","id":..}`.
    pub fn get_selection_json(&self) -> String {
        to_json(&self.session.selection())
    }

    // ─── Input ───────────────────────────────────────────────────────────
    //
    // Each handler returns the `SessionUpdate` as JSON so the host knows
    // whether to redraw, prompt for a label or open the technique picker.

    pub fn handle_pointer_down(&mut self, x: f64, y: f64) -> String {
        self.dispatch(InputEvent::pointer_down(x, y))
    }

    pub fn handle_pointer_move(&mut self, x: f64, y: f64) -> String {
        self.dispatch(InputEvent::pointer_move(x, y))
    }

    pub fn handle_pointer_up(&mut self, x: f64, y: f64) -> String {
        self.dispatch(InputEvent::pointer_up(x, y))
    }

    pub fn handle_pointer_cancel(&mut self) -> String {
        self.dispatch(InputEvent::PointerCancel)
    }

    /// Cumulative pan translation since the gesture began.
    pub fn handle_pan(&mut self, dx: f64, dy: f64) -> String {
        self.dispatch(InputEvent::Pan { dx, dy })
    }

    pub fn handle_pan_end(&mut self) -> String {
        self.dispatch(InputEvent::PanEnd)
    }

    /// Cumulative pinch factor since the gesture began.
    pub fn handle_pinch(&mut self, scale: f64) -> String {
        self.dispatch(InputEvent::Pinch { scale })
    }

    pub fn handle_pinch_end(&mut self) -> String {
        self.dispatch(InputEvent::PinchEnd)
    }

    pub fn handle_key(&mut self, key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> String {
        let modifiers = Modifiers {
            ctrl,
            shift,
            alt,
            meta,
        };
        self.dispatch(InputEvent::key(key, modifiers))
    }

    /// Any `InputEvent` in its JSON form, e.g. `{"type":"pan","dx":4,"dy":0}`.
    pub fn handle_event(&mut self, event_json: &str) -> String {
        match serde_json::from_str::<InputEvent>(event_json) {
            Ok(event) => self.dispatch(event),
            Err(err) => {
                log::warn!("handle_event: {err}");
                to_json(&SessionUpdate::default())
            }
        }
    }

    // ─── Editing ─────────────────────────────────────────────────────────

    /// Answer the label prompt. Blank text leaves the edge unlabelled.
    pub fn submit_label(&mut self, text: &str) -> bool {
        report("submit_label", self.session.submit_label(text))
    }

    pub fn dismiss_label_prompt(&mut self) {
        self.session.dismiss_label_prompt();
    }

    /// Add a node at the last drop point. Returns the new id, or an empty
    /// string if `kind` is unknown.
    pub fn add_node(&mut self, kind: &str, label: &str) -> String {
        let Some(kind) = NodeKind::parse(kind) else {
            log::warn!("add_node: unknown kind {kind:?}");
            return String::new();
        };
        let label = Some(label).filter(|l| !l.trim().is_empty());
        match self.session.add_node(kind, label) {
            Ok(id) => id.as_str().to_string(),
            Err(err) => {
                log::warn!("add_node: {err}");
                String::new()
            }
        }
    }

    /// Add the technique the host's picker returned (`{"id":..,"name":..}`).
    pub fn add_technique_node(&mut self, technique_json: &str) -> String {
        let technique = match serde_json::from_str::<Technique>(technique_json) {
            Ok(t) => t,
            Err(err) => {
                log::warn!("add_technique_node: {err}");
                return String::new();
            }
        };
        let id = technique.id.clone();
        let library = StaticLibrary::new([technique]);
        match self.session.add_technique_node(&library, &id) {
            Ok(node) => node.as_str().to_string(),
            Err(err) => {
                log::warn!("add_technique_node: {err}");
                String::new()
            }
        }
    }

    pub fn rename_flow(&mut self, name: &str) -> bool {
        self.session.rename_flow(name)
    }

    pub fn delete_selected(&mut self) -> bool {
        self.session
            .handle(InputEvent::key("Delete", Modifiers::NONE))
            .graph_changed
    }

    pub fn undo(&mut self) -> bool {
        report_value("undo", self.session.undo())
    }

    pub fn redo(&mut self) -> bool {
        report_value("redo", self.session.redo())
    }

    pub fn can_undo(&self) -> bool {
        self.session.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.session.can_redo()
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    pub fn zoom_in(&mut self) -> String {
        self.dispatch(InputEvent::key("=", primary()))
    }

    pub fn zoom_out(&mut self) -> String {
        self.dispatch(InputEvent::key("-", primary()))
    }

    pub fn zoom_reset(&mut self) -> String {
        self.dispatch(InputEvent::key("0", primary()))
    }

    pub fn zoom_to_fit(&mut self) {
        self.session.zoom_to_fit();
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.session.set_screen_size(Size::new(width, height));
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    pub fn set_theme(&mut self, is_dark: bool) {
        self.dark_mode = is_dark;
    }

    /// Override the accent color with a `#RRGGBB` hex string.
    pub fn set_accent(&mut self, hex: &str) -> bool {
        match Color::from_hex(hex) {
            Some(color) => {
                self.accent = Some(color);
                true
            }
            None => false,
        }
    }

    pub fn render(&self, ctx: &CanvasRenderingContext2d) {
        let geometry = self.session.geometry();
        let frame = render2d::Frame {
            geometry: &geometry,
            viewport: self.session.viewport(),
            selection: self.session.selection(),
            preview: self.session.connection_preview(),
            handle_radius: self.session.config().handle_radius,
            width: self.width,
            height: self.height,
        };
        render2d::render_flow(ctx, &frame, &self.theme());
    }

    // ─── Saving ──────────────────────────────────────────────────────────

    pub fn is_dirty(&self) -> bool {
        self.session.is_dirty()
    }

    /// `{"revision":n,"patch":{..}}` for the host to persist. Pass the
    /// revision back to `mark_saved` once the write succeeds.
    pub fn get_save_payload(&self) -> String {
        let snapshot = self.session.snapshot();
        to_json(&SavePayload {
            revision: snapshot.revision,
            patch: snapshot.to_patch(),
        })
    }

    pub fn mark_saved(&mut self, revision: f64) {
        if revision.is_finite() && revision >= 0.0 {
            self.session.mark_saved(revision as u64);
        }
    }

    /// Drop transient gestures and prompts before the host tears down.
    pub fn close(&mut self) {
        self.session.close();
    }
}

impl FlowCanvas {
    fn dispatch(&mut self, event: InputEvent) -> String {
        to_json(&self.session.handle(event))
    }

    fn theme(&self) -> Theme {
        let theme = if self.dark_mode {
            Theme::dark()
        } else {
            Theme::light()
        };
        match self.accent {
            Some(accent) => theme.with_accent(accent),
            None => theme,
        }
    }
}

// ─── Standalone functions (no canvas needed) ────────────────────────────

/// Check a flow document. Returns `{"ok":true}` or `{"ok":false,"error":".."}`.
#[wasm_bindgen]
pub fn validate_document(document_json: &str) -> String {
    let result = FlowDocument::from_json(document_json)
        .and_then(|doc| flow_core::model::FlowGraph::from_document(&doc).map(|_| ()));
    match result {
        Ok(()) => serde_json::json!({ "ok": true }).to_string(),
        Err(err) => serde_json::json!({ "ok": false, "error": err.to_string() }).to_string(),
    }
}

fn open_session(flow_json: &str, config_json: &str) -> Result<EditorSession, FlowError> {
    let flow: Flow = serde_json::from_str(flow_json)?;
    let config = if config_json.trim().is_empty() {
        EditorConfig::default()
    } else {
        EditorConfig::from_json(config_json)?
    };
    EditorSession::open(flow, config)
}

fn primary() -> Modifiers {
    Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| {
        log::error!("serialization failed: {err}");
        "null".to_string()
    })
}

fn report<T>(what: &str, result: Result<T, FlowError>) -> bool {
    match result {
        Ok(_) => true,
        Err(err) => {
            log::warn!("{what}: {err}");
            false
        }
    }
}

fn report_value(what: &str, result: Result<bool, FlowError>) -> bool {
    result.unwrap_or_else(|err| {
        log::warn!("{what}: {err}");
        false
    })
}

/// Route panics to the browser console.
fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("flow editor panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}
