//! WASM exports for the gesture backend
//!
//! The page owns the gesture recognizer and forwards every pan event to
//! [`GestureBackendController::handle_gesture`]; the controller turns it into
//! a [`GestureEvent`] and dispatches it along the DOM path of the element the
//! gesture started on.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Node;
use zos_dnd_host::{NodeId, Vec2};

use super::host::WebHost;
use super::manager::JsManager;
use crate::backend::{DragPhase, GestureBackend};
use crate::connection::Disconnect;
use crate::event::{GestureEvent, GesturePhase, PointerKind};
use crate::listeners::{GestureListeners, Subject};
use crate::options::BackendOptions;
use crate::slot::BackendContext;

thread_local! {
    /// Environment shared by every controller on this page
    static DEFAULT_CONTEXT: BackendContext<WebHost> = BackendContext::new(Rc::new(WebHost::new()));
}

fn default_context() -> BackendContext<WebHost> {
    DEFAULT_CONTEXT.with(|context| context.clone())
}

/// Parse a plain JS options object through its JSON form
fn parse_js<T: serde::de::DeserializeOwned + Default>(value: &JsValue) -> Result<T, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    let json = js_sys::JSON::stringify(value)?
        .as_string()
        .unwrap_or_else(|| "{}".to_string());
    serde_json::from_str(&json).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// JSON form of an arbitrary JS value, `null` when it has none
fn to_json_value(value: &JsValue) -> serde_json::Value {
    if value.is_undefined() || value.is_null() {
        return serde_json::Value::Null;
    }
    let json = match js_sys::JSON::stringify(value).ok().and_then(|s| s.as_string()) {
        Some(json) => json,
        None => {
            log::warn!("[dnd-web] preview options are not serializable, storing null");
            return serde_json::Value::Null;
        }
    };
    serde_json::from_str(&json).unwrap_or_else(|e| {
        log::warn!("[dnd-web] preview options unreadable ({}), storing null", e);
        serde_json::Value::Null
    })
}

fn get(value: &JsValue, key: &str) -> Option<JsValue> {
    js_sys::Reflect::get(value, &JsValue::from_str(key))
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null())
}

/// Handle returned by the `connect*` methods
///
/// Disconnecting also releases the host's hold on the connected node.
#[wasm_bindgen]
pub struct ConnectionHandle {
    inner: Disconnect,
    host: Rc<WebHost>,
    node: Cell<Option<NodeId>>,
}

#[wasm_bindgen]
impl ConnectionHandle {
    /// Undo the connection; repeated calls do nothing
    #[wasm_bindgen]
    pub fn disconnect(&self) {
        self.inner.disconnect();
        if let Some(node) = self.node.take() {
            self.host.unpin(node);
        }
    }

    #[wasm_bindgen(getter)]
    pub fn connected(&self) -> bool {
        self.inner.is_connected()
    }
}

impl ConnectionHandle {
    fn new(inner: Disconnect, host: &Rc<WebHost>, node: NodeId) -> Self {
        Self {
            inner,
            host: host.clone(),
            node: Cell::new(Some(node)),
        }
    }
}

/// Gesture backend controller for WASM
#[wasm_bindgen]
pub struct GestureBackendController {
    backend: GestureBackend<WebHost>,
    host: Rc<WebHost>,
    listeners: Rc<GestureListeners>,
    /// Dispatch path and target of the gesture in progress, fixed at its start
    gesture: RefCell<Option<(Vec<Subject>, Option<NodeId>)>>,
}

#[wasm_bindgen]
impl GestureBackendController {
    /// Create a controller for `manager` with optional `options`
    #[wasm_bindgen(constructor)]
    pub fn new(manager: JsValue, options: JsValue) -> Result<GestureBackendController, JsValue> {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        let options: BackendOptions = parse_js(&options)?;
        let manager = JsManager::new(&manager)?;
        let context = default_context();
        let host = context.host.clone();
        let listeners = context.listeners.clone();

        Ok(Self {
            backend: GestureBackend::new(&manager, context, options),
            host,
            listeners,
            gesture: RefCell::new(None),
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    #[wasm_bindgen]
    pub fn setup(&self) -> Result<(), JsValue> {
        self.backend
            .setup()
            .map_err(|e| js_sys::Error::new(&e.to_string()).into())
    }

    #[wasm_bindgen]
    pub fn teardown(&self) {
        self.backend.teardown();
        self.gesture.borrow_mut().take();
    }

    // =========================================================================
    // Connections
    // =========================================================================

    #[wasm_bindgen(js_name = connectDragSource)]
    pub fn connect_drag_source(&self, source_id: &str, node: Node) -> ConnectionHandle {
        let node = self.host.pin(&node);
        let inner = self.backend.connect_drag_source(source_id, node);
        ConnectionHandle::new(inner, &self.host, node)
    }

    /// Options are kept as given; anything that is not plain JSON data is
    /// stored as `null`.
    #[wasm_bindgen(js_name = connectDragPreview)]
    pub fn connect_drag_preview(
        &self,
        source_id: &str,
        node: Node,
        options: JsValue,
    ) -> ConnectionHandle {
        let options = to_json_value(&options);
        let node = self.host.pin(&node);
        let inner = self.backend.connect_drag_preview(source_id, node, options);
        ConnectionHandle::new(inner, &self.host, node)
    }

    #[wasm_bindgen(js_name = connectDropTarget)]
    pub fn connect_drop_target(&self, target_id: &str, node: Node) -> ConnectionHandle {
        let node = self.host.pin(&node);
        let inner = self.backend.connect_drop_target(target_id, node);
        ConnectionHandle::new(inner, &self.host, node)
    }

    // =========================================================================
    // Gestures
    // =========================================================================

    /// Feed one recognizer event (`panstart`, `pan`, `panend`, `pancancel`)
    ///
    /// Returns whether a handler asked for the native default to be
    /// suppressed; `srcEvent.preventDefault()` has already been called then.
    #[wasm_bindgen(js_name = handleGesture)]
    pub fn handle_gesture(&self, event: JsValue) -> bool {
        let Some(phase) = get(&event, "type")
            .and_then(|t| t.as_string())
            .and_then(|t| GesturePhase::from_event_name(&t))
        else {
            return false;
        };

        let center = get(&event, "center").and_then(|c| {
            let x = get(&c, "x")?.as_f64()?;
            let y = get(&c, "y")?.as_f64()?;
            Some(Vec2::new(x, y))
        });
        let pointer = get(&event, "pointerType")
            .and_then(|p| p.as_string())
            .map(|p| PointerKind::from_pointer_type(&p))
            .unwrap_or_default();

        // Nodes seen during the previous gesture are no longer needed
        if phase == GesturePhase::Start {
            self.host.sweep();
        }

        // The recognizer reports moves against whatever is under the pointer;
        // sources and targets are resolved against the starting element.
        let (path, target) = {
            let mut current = self.gesture.borrow_mut();
            if phase == GesturePhase::Start || current.is_none() {
                let target = get(&event, "target")
                    .and_then(|t| t.dyn_into::<Node>().ok())
                    .map(|t| self.host.intern(&t));
                let path = GestureListeners::event_path(self.host.as_ref(), target);
                *current = Some((path, target));
            }
            current
                .clone()
                .unwrap_or_else(|| (vec![Subject::Window], None))
        };

        let mut gesture = GestureEvent::new(phase, pointer, center);
        if let Some(target) = target {
            gesture = gesture.with_target(target);
        }
        self.listeners.dispatch(&gesture, &path);

        if matches!(phase, GesturePhase::End | GesturePhase::Cancel) {
            self.gesture.borrow_mut().take();
            self.host.sweep();
        }

        let prevented = gesture.is_default_prevented();
        if prevented {
            if let Some(src) = get(&event, "srcEvent") {
                if let Ok(src) = src.dyn_into::<web_sys::Event>() {
                    src.prevent_default();
                }
            }
        }
        prevented
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// `"idle"`, `"armed"` or `"dragging"`
    #[wasm_bindgen(getter)]
    pub fn phase(&self) -> String {
        match self.backend.phase() {
            DragPhase::Idle => "idle",
            DragPhase::Armed => "armed",
            DragPhase::Dragging => "dragging",
        }
        .to_string()
    }

    #[wasm_bindgen(js_name = sourceClientOffset)]
    pub fn source_client_offset(&self, source_id: &str) -> JsValue {
        match self.backend.source_client_offset(source_id) {
            Some(offset) => {
                serde_json::to_string(&offset)
                    .ok()
                    .and_then(|json| js_sys::JSON::parse(&json).ok())
                    .unwrap_or(JsValue::NULL)
            }
            None => JsValue::NULL,
        }
    }
}
