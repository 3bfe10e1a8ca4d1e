//! WASM bridge for PageForge. Exposes the editor session to the browser
//! canvas.
//!
//! Compiled via `wasm-pack build --target web`. The JS side owns the DOM:
//! it reports element measurements through [`ComposerCanvas::set_measurement`],
//! forwards pointer events with a `performance.now()` timestamp, and calls
//! [`ComposerCanvas::tick`] every animation frame. Structured results cross
//! the boundary as JSON strings.

use pf_core::{BoxMetrics, Document, Insets, NodeId, PropKeys, PropPatch, PropValue, Size};
use pf_core::{StaticLayout, dimension};
use pf_editor::{EditorConfig, EditorSession, GestureError, Handle, Point};
use std::time::Duration;
use wasm_bindgen::prelude::*;

/// Canvas-side controller. All interaction from the page goes through it.
#[wasm_bindgen]
pub struct ComposerCanvas {
    session: EditorSession,
    layout: StaticLayout,
}

#[wasm_bindgen]
impl ComposerCanvas {
    /// Create a controller over an empty document. `config_json` may be
    /// empty or a partial `EditorConfig`.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Self {
        console_error_panic_hook_setup();

        let config = if config_json.trim().is_empty() {
            EditorConfig::default()
        } else {
            serde_json::from_str(config_json).unwrap_or_else(|e| {
                log::warn!("ignoring bad editor config: {e}");
                EditorConfig::default()
            })
        };
        Self {
            session: EditorSession::new(Document::new(), config),
            layout: StaticLayout::new(),
        }
    }

    /// Replace the document with a JSON node map. Mounted renderers must
    /// mount again. Returns `false` on a malformed document.
    pub fn load_document(&mut self, json: &str) -> bool {
        match Document::from_json(json) {
            Ok(doc) => {
                let config = self.session.config().clone();
                self.session = EditorSession::new(doc, config);
                true
            }
            Err(e) => {
                log::warn!("load_document failed: {e}");
                false
            }
        }
    }

    // ─── Measurements ────────────────────────────────────────────────────

    /// Report the rendered box of a node: bounding size, client size, and
    /// padding (top, right, bottom, left).
    #[allow(clippy::too_many_arguments)]
    pub fn set_measurement(
        &mut self,
        node_id: &str,
        width: f64,
        height: f64,
        client_width: f64,
        client_height: f64,
        pad_top: f64,
        pad_right: f64,
        pad_bottom: f64,
        pad_left: f64,
    ) {
        self.layout.set(
            NodeId::intern(node_id),
            BoxMetrics {
                border_box: Size::new(width, height),
                client: Size::new(client_width, client_height),
                padding: Insets {
                    top: pad_top,
                    right: pad_right,
                    bottom: pad_bottom,
                    left: pad_left,
                },
            },
        );
    }

    pub fn remove_measurement(&mut self, node_id: &str) {
        self.layout.remove(NodeId::intern(node_id));
    }

    // ─── Renderer lifecycle ──────────────────────────────────────────────

    /// Empty keys fall back to `width` / `height`.
    pub fn mount(&mut self, node_id: &str, width_key: &str, height_key: &str) -> bool {
        let defaults = PropKeys::default();
        let keys = PropKeys::new(
            non_empty(width_key).unwrap_or(&defaults.width),
            non_empty(height_key).unwrap_or(&defaults.height),
        );
        self.session
            .mount(NodeId::intern(node_id), keys, &self.layout)
    }

    pub fn unmount(&mut self, node_id: &str) -> bool {
        self.session.unmount(NodeId::intern(node_id))
    }

    /// Working size as `{"width":..,"height":..}`, or `null`.
    pub fn working_size(&self, node_id: &str) -> String {
        let size = self.session.working_size(NodeId::intern(node_id));
        serde_json::to_string(&size).unwrap_or_else(|_| "null".to_string())
    }

    /// Committed props of a node as a JSON object, or `null`.
    pub fn node_props(&self, node_id: &str) -> String {
        match self.session.document().get(NodeId::intern(node_id)) {
            Some(node) => serde_json::to_string(&node.props).unwrap_or_else(|_| "null".into()),
            None => "null".to_string(),
        }
    }

    // ─── Selection & handles ─────────────────────────────────────────────

    pub fn select(&mut self, node_id: &str) -> bool {
        self.session.select(NodeId::intern(node_id))
    }

    pub fn deselect(&mut self) {
        self.session.deselect();
    }

    pub fn selected_id(&self) -> Option<String> {
        self.session.selected().map(|id| id.as_str().to_string())
    }

    /// Names of the enabled handles (`"top"`, `"bottomRight"`, ...).
    pub fn handles(&self, node_id: &str) -> js_sys::Array {
        self.session
            .handles(NodeId::intern(node_id))
            .iter()
            .map(|h| JsValue::from_str(h.name()))
            .collect()
    }

    /// Handle overlays as a JSON array of
    /// `{"handle","name","x","y","cursor"}`.
    pub fn indicators(&self, node_id: &str) -> String {
        let overlays = self.session.indicators(NodeId::intern(node_id));
        serde_json::to_string(overlays.as_slice()).unwrap_or_else(|_| "[]".to_string())
    }

    // ─── Resize gesture ──────────────────────────────────────────────────

    /// Returns `{"ok":true,"width":..,"height":..}` with the starting
    /// working size, or `{"ok":false,"error":".."}`.
    pub fn begin_resize(&mut self, node_id: &str, handle: &str, x: f64, y: f64) -> String {
        let Some(handle) = Handle::from_name(handle) else {
            return error_json(&format!("unknown handle '{handle}'"));
        };
        match self.session.begin_resize(
            NodeId::intern(node_id),
            handle,
            Point::new(x, y),
            &self.layout,
        ) {
            Ok(size) => size_json(size),
            Err(e) => gesture_error_json(&e),
        }
    }

    /// Returns the live size and the patch that was queued.
    pub fn pointer_move(&mut self, x: f64, y: f64, now_ms: f64) -> String {
        match self
            .session
            .pointer_move(Point::new(x, y), host_time(now_ms), &self.layout)
        {
            Ok(step) => serde_json::json!({
                "ok": true,
                "width": step.live.width,
                "height": step.live.height,
                "patch": patch_object(&step.patch),
            })
            .to_string(),
            Err(e) => gesture_error_json(&e),
        }
    }

    pub fn end_resize(&mut self, now_ms: f64) -> String {
        match self.session.end_resize(host_time(now_ms), &self.layout) {
            Ok(generation) => serde_json::json!({ "ok": true, "generation": generation }).to_string(),
            Err(e) => gesture_error_json(&e),
        }
    }

    pub fn cancel_resize(&mut self) -> String {
        match self.session.cancel_resize(&self.layout) {
            Ok(()) => r#"{"ok":true}"#.to_string(),
            Err(e) => gesture_error_json(&e),
        }
    }

    pub fn is_resizing(&self) -> bool {
        self.session.is_resizing()
    }

    // ─── Clock & layout ──────────────────────────────────────────────────

    pub fn notify_layout_change(&mut self, now_ms: f64) {
        self.session.notify_layout_change(host_time(now_ms));
    }

    /// Returns `{"committed":[..],"rejected":[..],"recomputed":[..]}`.
    pub fn tick(&mut self, now_ms: f64) -> String {
        let report = self.session.tick(host_time(now_ms), &self.layout);
        serde_json::to_string(&report).unwrap_or_else(|_| "{}".to_string())
    }

    /// When the next queued patch falls due, in host milliseconds.
    pub fn next_deadline_ms(&self) -> Option<f64> {
        self.session
            .next_deadline()
            .map(|d| d.as_secs_f64() * 1000.0)
    }

    // ─── Property panel & history ────────────────────────────────────────

    /// Write one prop. `value_json` is any JSON value; `null` removes the
    /// prop. A positive `debounce_ms` parks the write in the queue.
    pub fn set_prop(
        &mut self,
        node_id: &str,
        key: &str,
        value_json: &str,
        debounce_ms: f64,
        now_ms: f64,
    ) -> bool {
        let value: Option<PropValue> = match serde_json::from_str(value_json) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("set_prop {node_id}.{key}: bad value: {e}");
                return false;
            }
        };
        let mut patch = PropPatch::new();
        patch.insert(key, value);
        let debounce = (debounce_ms.is_finite() && debounce_ms > 0.0).then(|| host_time(debounce_ms));
        self.session
            .set_props(NodeId::intern(node_id), patch, debounce, host_time(now_ms))
            .is_ok()
    }

    /// Commit every queued write now. Returns the ids as a JSON array.
    pub fn flush_pending(&mut self) -> String {
        let ids = self.session.flush_pending();
        serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn undo(&mut self) -> bool {
        self.session.undo().is_some()
    }

    pub fn redo(&mut self) -> bool {
        self.session.redo().is_some()
    }

    pub fn can_undo(&self) -> bool {
        self.session.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.session.can_redo()
    }
}

// ─── Standalone unit conversion (no canvas needed) ───────────────────────

#[wasm_bindgen]
pub fn px_to_percent(px: f64, reference: f64) -> f64 {
    dimension::px_to_percent(px, reference)
}

#[wasm_bindgen]
pub fn percent_to_px(dim: &str, reference: f64) -> f64 {
    dimension::percent_to_px(dim, reference)
}

#[wasm_bindgen]
pub fn is_percentage(dim: &str) -> bool {
    dimension::is_percentage(dim)
}

// ─── Helpers ─────────────────────────────────────────────────────────────

/// Host milliseconds to a session timestamp. Negative or non-finite input
/// reads as the origin.
fn host_time(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_secs_f64(ms / 1000.0)
    } else {
        Duration::ZERO
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

fn patch_object(patch: &PropPatch) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = patch
        .iter()
        .map(|(k, v)| {
            let value = v
                .and_then(|v| serde_json::to_value(v).ok())
                .unwrap_or(serde_json::Value::Null);
            (k.to_string(), value)
        })
        .collect();
    serde_json::Value::Object(map)
}

fn size_json(size: Size) -> String {
    serde_json::json!({ "ok": true, "width": size.width, "height": size.height }).to_string()
}

fn error_json(message: &str) -> String {
    serde_json::json!({ "ok": false, "error": message }).to_string()
}

fn gesture_error_json(e: &GestureError) -> String {
    error_json(&e.to_string())
}

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("PageForge WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"{
        "ROOT": { "parent": null, "props": { "width": "800px" } },
        "card": { "parent": "ROOT", "props": { "width": "25%", "height": "40px" } }
    }"#;

    fn canvas() -> ComposerCanvas {
        let mut c = ComposerCanvas::new(r#"{ "commitDebounceMs": 100 }"#);
        assert!(c.load_document(PAGE));
        c.set_measurement("ROOT", 800.0, 600.0, 800.0, 600.0, 0.0, 0.0, 0.0, 0.0);
        c.set_measurement("card", 200.0, 40.0, 200.0, 40.0, 0.0, 0.0, 0.0, 0.0);
        assert!(c.mount("card", "", ""));
        c
    }

    fn json(s: &str) -> serde_json::Value {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn drag_through_bridge() {
        let mut c = canvas();
        assert!(c.select("card"));
        let start = json(&c.begin_resize("card", "right", 0.0, 0.0));
        assert_eq!(start["ok"], true);
        assert_eq!(start["width"], 200.0);

        let step = json(&c.pointer_move(200.0, 0.0, 16.0));
        assert_eq!(step["patch"]["width"], "50%");

        let end = json(&c.end_resize(32.0));
        assert_eq!(end["ok"], true);
        assert_eq!(json(&c.node_props("card"))["width"], "50%");
        assert_eq!(json(&c.working_size("card"))["width"], 400.0);
        assert!(c.undo());
        assert_eq!(json(&c.node_props("card"))["width"], "25%");
    }

    #[test]
    fn errors_become_json() {
        let mut c = canvas();
        let res = json(&c.begin_resize("card", "sideways", 0.0, 0.0));
        assert_eq!(res["ok"], false);
        let res = json(&c.begin_resize("ROOT", "right", 0.0, 0.0));
        assert_eq!(res["ok"], false);
        assert!(res["error"].as_str().unwrap().contains("root"));
        assert_eq!(json(&c.end_resize(0.0))["ok"], false);
    }

    #[test]
    fn debounced_prop_write_lands_on_tick() {
        let mut c = canvas();
        assert!(c.set_prop("card", "height", r#""64px""#, 50.0, 0.0));
        assert_eq!(json(&c.node_props("card"))["height"], "40px");
        assert_eq!(c.next_deadline_ms(), Some(50.0));
        let report = json(&c.tick(50.0));
        assert_eq!(report["committed"], serde_json::json!(["card"]));
        assert_eq!(json(&c.node_props("card"))["height"], "64px");
        assert!(!c.set_prop("card", "height", "not json", 0.0, 0.0));
    }

    #[test]
    fn indicators_json() {
        let mut c = canvas();
        assert_eq!(c.indicators("card"), "[]");
        c.select("card");
        let overlays = json(&c.indicators("card"));
        assert_eq!(overlays.as_array().map(Vec::len), Some(8));
        assert_eq!(overlays[0]["name"], "top");
    }

    #[test]
    fn bad_document_rejected() {
        let mut c = ComposerCanvas::new("");
        assert!(!c.load_document("{ not json"));
        assert_eq!(c.node_props("card"), "null");
    }

    #[test]
    fn standalone_conversions() {
        assert_eq!(px_to_percent(150.0, 500.0), 30.0);
        assert_eq!(px_to_percent(10.0, 0.0), 0.0);
        assert_eq!(percent_to_px("30%", 500.0), 150.0);
        assert!(is_percentage("12.5%"));
        assert!(!is_percentage("12.5px"));
    }
}
