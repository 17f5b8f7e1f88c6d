//! `DomHost` backed by the browser document

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, MutationObserver, MutationObserverInit, Node, Window};
use zos_dnd_host::{
    DomHost, HostError, MutationCallback, NodeId, ObserverHandle, Rect, TimerCallback,
    TimerHandle, Vec2,
};

/// Property used to stamp interned nodes with their id
const NODE_ID_KEY: &str = "__zosDndNodeId";

type MutationClosure = Closure<dyn FnMut(js_sys::Array, MutationObserver)>;

struct ActiveObserver {
    observer: MutationObserver,
    _closure: MutationClosure,
}

/// Browser document host
///
/// Nodes are interned when they cross into Rust: each gets a numeric id
/// stamped on the JS object so the same node always maps to the same
/// [`NodeId`], even after the host has let go of it and sees it again.
///
/// Connected nodes are pinned and stay referenced until every connection
/// that pinned them is gone. Everything else (gesture targets, their
/// ancestors, the body) is held only until the next [`WebHost::sweep`],
/// which the controller runs at the start and end of every gesture.
pub struct WebHost {
    window: Option<Window>,
    document: Option<Document>,
    pinned: RefCell<HashMap<u64, (Node, usize)>>,
    transient: RefCell<HashMap<u64, Node>>,
    next_node: Cell<u64>,
    observers: RefCell<HashMap<u64, ActiveObserver>>,
    /// Observers disconnected from inside their own callback
    retired: RefCell<Vec<ActiveObserver>>,
    next_observer: Cell<u64>,
}

impl Default for WebHost {
    fn default() -> Self {
        Self::new()
    }
}

impl WebHost {
    pub fn new() -> Self {
        let window = web_sys::window();
        let document = window.as_ref().and_then(|w| w.document());
        Self {
            window,
            document,
            pinned: RefCell::new(HashMap::new()),
            transient: RefCell::new(HashMap::new()),
            next_node: Cell::new(1),
            observers: RefCell::new(HashMap::new()),
            retired: RefCell::new(Vec::new()),
            next_observer: Cell::new(1),
        }
    }

    /// Id for `node`, held until the next sweep unless it is pinned
    pub fn intern(&self, node: &Node) -> NodeId {
        let id = self.stamp(node);
        if !self.pinned.borrow().contains_key(&id) {
            self.transient
                .borrow_mut()
                .entry(id)
                .or_insert_with(|| node.clone());
        }
        NodeId(id)
    }

    /// Id for `node`, held until a matching [`WebHost::unpin`]
    pub fn pin(&self, node: &Node) -> NodeId {
        let id = self.stamp(node);
        self.transient.borrow_mut().remove(&id);
        self.pinned
            .borrow_mut()
            .entry(id)
            .or_insert_with(|| (node.clone(), 0))
            .1 += 1;
        NodeId(id)
    }

    /// Release one pin; the last one demotes the node to transient
    pub fn unpin(&self, id: NodeId) {
        let released = {
            let mut pinned = self.pinned.borrow_mut();
            match pinned.get_mut(&id.0) {
                Some((_, count)) if *count > 1 => {
                    *count -= 1;
                    None
                }
                Some(_) => pinned.remove(&id.0).map(|(node, _)| node),
                None => None,
            }
        };
        if let Some(node) = released {
            self.transient.borrow_mut().insert(id.0, node);
        }
    }

    /// Forget every node that is not pinned
    pub fn sweep(&self) {
        self.transient.borrow_mut().clear();
    }

    /// Number of nodes currently referenced by the host
    pub fn node_count(&self) -> usize {
        self.pinned.borrow().len() + self.transient.borrow().len()
    }

    /// Node currently known as `id`
    pub fn node(&self, id: NodeId) -> Option<Node> {
        if let Some((node, _)) = self.pinned.borrow().get(&id.0) {
            return Some(node.clone());
        }
        self.transient.borrow().get(&id.0).cloned()
    }

    /// Id stamped on `node`, stamping a fresh one on first sight
    fn stamp(&self, node: &Node) -> u64 {
        let key = JsValue::from_str(NODE_ID_KEY);
        if let Some(id) = js_sys::Reflect::get(node, &key).ok().and_then(|v| v.as_f64()) {
            return id as u64;
        }

        let id = self.next_node.get();
        self.next_node.set(id + 1);
        if js_sys::Reflect::set(node, &key, &JsValue::from_f64(id as f64)).is_err() {
            log::warn!("[dnd-web] cannot stamp node id {}", id);
        }
        id
    }

    fn element(&self, id: NodeId) -> Result<Element, HostError> {
        self.node(id)
            .ok_or(HostError::NodeNotFound)?
            .dyn_into::<Element>()
            .map_err(|_| HostError::NotAnElement)
    }

    fn element_at(&self, point: Vec2) -> Option<Element> {
        self.document
            .as_ref()?
            .element_from_point(point.x as f32, point.y as f32)
    }
}

impl DomHost for WebHost {
    fn has_window(&self) -> bool {
        self.window.is_some()
    }

    fn body(&self) -> Option<NodeId> {
        let body = self.document.as_ref()?.body()?;
        Some(self.intern(&body))
    }

    fn is_element(&self, node: NodeId) -> bool {
        self.node(node)
            .map(|n| n.node_type() == Node::ELEMENT_NODE)
            .unwrap_or(false)
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.node(node)?.parent_element()?;
        Some(self.intern(&parent))
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        match (self.node(ancestor), self.node(node)) {
            (Some(ancestor), Some(node)) => ancestor.contains(Some(&node)),
            _ => false,
        }
    }

    fn bounding_client_rect(&self, element: NodeId) -> Option<Rect> {
        let rect = self.element(element).ok()?.get_bounding_client_rect();
        Some(Rect::new(rect.left(), rect.top(), rect.width(), rect.height()))
    }

    fn element_from_point(&self, point: Vec2) -> Option<NodeId> {
        let hit = self.element_at(point)?;
        Some(self.intern(&hit))
    }

    fn hit_test(&self, point: Vec2, node: NodeId) -> bool {
        match (self.element_at(point), self.node(node)) {
            (Some(hit), Some(node)) => {
                let hit: &Node = hit.as_ref();
                node.contains(Some(hit))
            }
            _ => false,
        }
    }

    fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), HostError> {
        let parent = self.node(parent).ok_or(HostError::NodeNotFound)?;
        let child = self.node(child).ok_or(HostError::NodeNotFound)?;
        parent
            .append_child(&child)
            .map(|_| ())
            .map_err(|_| HostError::NotSupported)
    }

    fn hide(&self, element: NodeId) -> Result<(), HostError> {
        let element = self
            .element(element)?
            .dyn_into::<HtmlElement>()
            .map_err(|_| HostError::NotSupported)?;
        element
            .style()
            .set_property("display", "none")
            .map_err(|_| HostError::NotSupported)
    }

    fn remove_attribute(&self, element: NodeId, name: &str) -> Result<(), HostError> {
        self.element(element)?
            .remove_attribute(name)
            .map_err(|_| HostError::NotSupported)
    }

    fn set_timeout(&self, delay_ms: u32, callback: TimerCallback) -> TimerHandle {
        let Some(window) = self.window.as_ref() else {
            log::warn!("[dnd-web] no window, timer dropped");
            return TimerHandle(0);
        };

        // Freed by wasm-bindgen after it runs
        let function = Closure::once_into_js(move || callback());
        match window.set_timeout_with_callback_and_timeout_and_arguments_0(
            function.unchecked_ref(),
            delay_ms.min(i32::MAX as u32) as i32,
        ) {
            Ok(handle) => TimerHandle(handle as u64),
            Err(e) => {
                log::warn!("[dnd-web] setTimeout failed: {:?}", e);
                TimerHandle(0)
            }
        }
    }

    fn clear_timeout(&self, handle: TimerHandle) {
        if let Some(window) = self.window.as_ref() {
            window.clear_timeout_with_handle(handle.0 as i32);
        }
    }

    fn observe_child_list(
        &self,
        target: NodeId,
        mut callback: MutationCallback,
    ) -> Result<ObserverHandle, HostError> {
        let target = self.node(target).ok_or(HostError::NodeNotFound)?;
        self.retired.borrow_mut().clear();

        let closure: MutationClosure =
            Closure::wrap(Box::new(move |_records: js_sys::Array, _observer: MutationObserver| {
                callback()
            }) as Box<dyn FnMut(js_sys::Array, MutationObserver)>);
        let observer = MutationObserver::new(closure.as_ref().unchecked_ref())
            .map_err(|_| HostError::NotSupported)?;

        let init = MutationObserverInit::new();
        init.set_child_list(true);
        observer
            .observe_with_options(&target, &init)
            .map_err(|_| HostError::NotSupported)?;

        let id = self.next_observer.get();
        self.next_observer.set(id + 1);
        self.observers.borrow_mut().insert(
            id,
            ActiveObserver {
                observer,
                _closure: closure,
            },
        );
        Ok(ObserverHandle(id))
    }

    fn disconnect_observer(&self, handle: ObserverHandle) {
        let removed = self.observers.borrow_mut().remove(&handle.0);
        if let Some(active) = removed {
            active.observer.disconnect();
            // The closure may be the one running right now
            self.retired.borrow_mut().push(active);
        }
    }
}
