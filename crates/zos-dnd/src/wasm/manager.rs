//! Adapter for a JavaScript drag-and-drop manager
//!
//! The page hands in its manager object; actions and monitor are fetched once
//! through `getActions()` / `getMonitor()` and called through `Reflect`.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use zos_dnd_host::Vec2;

use crate::manager::{
    BeginDragOptions, DragActions, DragDropManager, DragMonitor, HoverOptions, SourceId, TargetId,
};

type OffsetClosure = Closure<dyn Fn(JsValue) -> JsValue>;

/// Call `target[name](...args)`
fn call_method(target: &JsValue, name: &str, args: &js_sys::Array) -> Result<JsValue, JsValue> {
    let function = js_sys::Reflect::get(target, &JsValue::from_str(name))?
        .dyn_into::<js_sys::Function>()
        .map_err(|_| JsValue::from_str(&format!("{} is not a function", name)))?;
    js_sys::Reflect::apply(&function, target, args)
}

fn vec2_to_js(v: Vec2) -> JsValue {
    let obj = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&obj, &"x".into(), &v.x.into());
    let _ = js_sys::Reflect::set(&obj, &"y".into(), &v.y.into());
    obj.into()
}

fn ids_to_js(ids: &[String]) -> js_sys::Array {
    ids.iter().map(|id| JsValue::from_str(id)).collect()
}

/// `actions` half of a JS manager
struct JsActions {
    actions: JsValue,
    /// Keeps the latest `getSourceClientOffset` callback alive
    offset_closure: RefCell<Option<OffsetClosure>>,
}

impl JsActions {
    fn call(&self, name: &str, args: &js_sys::Array) {
        if let Err(e) = call_method(&self.actions, name, args) {
            log::warn!("[dnd-web] actions.{} failed: {:?}", name, e);
        }
    }
}

impl DragActions for JsActions {
    fn begin_drag(&self, source_ids: Vec<SourceId>, options: BeginDragOptions) {
        let lookup = options.get_source_client_offset.clone();
        let closure: OffsetClosure = Closure::wrap(Box::new(move |id: JsValue| {
            id.as_string()
                .and_then(|id| lookup(&id))
                .map(vec2_to_js)
                .unwrap_or(JsValue::NULL)
        }) as Box<dyn Fn(JsValue) -> JsValue>);

        let js_options = js_sys::Object::new();
        let _ = js_sys::Reflect::set(&js_options, &"clientOffset".into(), &vec2_to_js(options.client_offset));
        let _ = js_sys::Reflect::set(&js_options, &"getSourceClientOffset".into(), closure.as_ref());
        let _ = js_sys::Reflect::set(&js_options, &"publishSource".into(), &options.publish_source.into());

        self.call(
            "beginDrag",
            &js_sys::Array::of2(&ids_to_js(&source_ids), &js_options),
        );
        *self.offset_closure.borrow_mut() = Some(closure);
    }

    fn publish_drag_source(&self) {
        self.call("publishDragSource", &js_sys::Array::new());
    }

    fn hover(&self, target_ids: Vec<TargetId>, options: HoverOptions) {
        let js_options = js_sys::Object::new();
        if let Some(offset) = options.client_offset {
            let _ = js_sys::Reflect::set(&js_options, &"clientOffset".into(), &vec2_to_js(offset));
        }
        self.call(
            "hover",
            &js_sys::Array::of2(&ids_to_js(&target_ids), &js_options),
        );
    }

    fn drop(&self) {
        self.call("drop", &js_sys::Array::new());
    }

    fn end_drag(&self) {
        self.call("endDrag", &js_sys::Array::new());
    }
}

/// `monitor` half of a JS manager
struct JsMonitor {
    monitor: JsValue,
}

impl JsMonitor {
    fn query(&self, name: &str) -> Option<JsValue> {
        match call_method(&self.monitor, name, &js_sys::Array::new()) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("[dnd-web] monitor.{} failed: {:?}", name, e);
                None
            }
        }
    }
}

impl DragMonitor for JsMonitor {
    fn is_dragging(&self) -> bool {
        self.query("isDragging").map(|v| v.is_truthy()).unwrap_or(false)
    }

    fn did_drop(&self) -> bool {
        self.query("didDrop").map(|v| v.is_truthy()).unwrap_or(false)
    }

    fn source_id(&self) -> Option<SourceId> {
        self.query("getSourceId")?.as_string()
    }
}

/// JavaScript manager seen through the Rust manager traits
pub struct JsManager {
    actions: Rc<JsActions>,
    monitor: Rc<JsMonitor>,
}

impl JsManager {
    /// Wrap `manager`, fetching its actions and monitor
    pub fn new(manager: &JsValue) -> Result<Self, JsValue> {
        let actions = call_method(manager, "getActions", &js_sys::Array::new())?;
        let monitor = call_method(manager, "getMonitor", &js_sys::Array::new())?;
        Ok(Self {
            actions: Rc::new(JsActions {
                actions,
                offset_closure: RefCell::new(None),
            }),
            monitor: Rc::new(JsMonitor { monitor }),
        })
    }
}

impl DragDropManager for JsManager {
    fn actions(&self) -> Rc<dyn DragActions> {
        self.actions.clone()
    }

    fn monitor(&self) -> Rc<dyn DragMonitor> {
        self.monitor.clone()
    }
}
