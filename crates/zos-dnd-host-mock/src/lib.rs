//! Mock document host for testing the Zero OS drag-and-drop backend
//!
//! This provides an in-memory implementation of the [`DomHost`] trait that can
//! be used for unit testing the backend without requiring a browser.
//!
//! The mock keeps a small element tree rooted at a body node, a manual clock
//! for timers ([`MockDom::advance_time`]) and queues child-list notifications
//! until [`MockDom::flush_mutations`] is called, the same way a browser delivers
//! `MutationObserver` records from a microtask rather than synchronously.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use zos_dnd_host::{
    DomHost, HostError, MutationCallback, NodeId, ObserverHandle, Rect, TimerCallback,
    TimerHandle, Vec2,
};

/// Default viewport used for the body element
pub const DEFAULT_VIEWPORT: Rect = Rect::new(0.0, 0.0, 1024.0, 768.0);

/// Upper bound on observer delivery rounds in a single flush
const MAX_FLUSH_ROUNDS: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NodeKind {
    Element,
    Text,
}

/// Simulated document node
struct MockNode {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    rect: Option<Rect>,
    attributes: BTreeMap<String, String>,
    hidden: bool,
}

impl MockNode {
    fn new(kind: NodeKind, rect: Option<Rect>) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            rect,
            attributes: BTreeMap::new(),
            hidden: false,
        }
    }
}

/// Pending timer
struct MockTimer {
    handle: TimerHandle,
    due_ms: u64,
    callback: TimerCallback,
}

/// Installed child-list observer
struct MockObserver {
    target: NodeId,
    /// Taken out while the callback runs
    callback: Option<MutationCallback>,
}

/// Mock document host for unit testing
///
/// Provides a simulated element tree, time, timers and child-list
/// observation for testing backend logic without a real document.
pub struct MockDom {
    /// Whether a window environment is simulated
    window: bool,
    /// Body element id
    body: NodeId,
    /// All nodes ever created (attached or not)
    nodes: RefCell<BTreeMap<NodeId, MockNode>>,
    /// Next node id to assign
    next_node: Cell<u64>,
    /// Simulated time in milliseconds
    time_ms: Cell<u64>,
    /// Pending timers in scheduling order
    timers: RefCell<Vec<MockTimer>>,
    /// Next timer/observer handle to assign
    next_handle: Cell<u64>,
    /// Installed observers
    observers: RefCell<BTreeMap<u64, MockObserver>>,
    /// Nodes whose child list changed since the last flush
    pending_mutations: RefCell<Vec<NodeId>>,
}

impl MockDom {
    /// Create a mock document with an empty body
    pub fn new() -> Self {
        let body = NodeId(1);
        let mut nodes = BTreeMap::new();
        nodes.insert(body, MockNode::new(NodeKind::Element, Some(DEFAULT_VIEWPORT)));

        Self {
            window: true,
            body,
            nodes: RefCell::new(nodes),
            next_node: Cell::new(2),
            time_ms: Cell::new(0),
            timers: RefCell::new(Vec::new()),
            next_handle: Cell::new(1),
            observers: RefCell::new(BTreeMap::new()),
            pending_mutations: RefCell::new(Vec::new()),
        }
    }

    /// Create a mock that simulates running outside a window environment
    pub fn without_window() -> Self {
        Self {
            window: false,
            ..Self::new()
        }
    }

    /// The body element
    pub fn body_id(&self) -> NodeId {
        self.body
    }

    // =========================================================================
    // Tree construction
    // =========================================================================

    /// Create an element and append it to `parent`
    pub fn create_element(&self, parent: NodeId, rect: Rect) -> NodeId {
        let id = self.insert_node(MockNode::new(NodeKind::Element, Some(rect)));
        self.attach(parent, id);
        id
    }

    /// Create an element that is not attached to the document
    pub fn create_detached_element(&self, rect: Rect) -> NodeId {
        self.insert_node(MockNode::new(NodeKind::Element, Some(rect)))
    }

    /// Create a text node and append it to `parent`
    pub fn create_text(&self, parent: NodeId) -> NodeId {
        let id = self.insert_node(MockNode::new(NodeKind::Text, None));
        self.attach(parent, id);
        id
    }

    /// Detach a node from its parent (simulates a re-render unmounting it)
    pub fn remove(&self, node: NodeId) {
        self.detach(node);
    }

    /// Replace the bounding box of an element
    pub fn set_rect(&self, node: NodeId, rect: Rect) {
        if let Some(n) = self.nodes.borrow_mut().get_mut(&node) {
            n.rect = Some(rect);
        }
    }

    /// Set an attribute on a node
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        if let Some(n) = self.nodes.borrow_mut().get_mut(&node) {
            n.attributes.insert(String::from(name), String::from(value));
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Get an attribute of a node
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes
            .borrow()
            .get(&node)
            .and_then(|n| n.attributes.get(name).cloned())
    }

    /// Whether the node has been hidden through [`DomHost::hide`]
    pub fn is_hidden(&self, node: NodeId) -> bool {
        self.nodes.borrow().get(&node).map(|n| n.hidden).unwrap_or(false)
    }

    /// Raw parent of a node
    pub fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.borrow().get(&node).and_then(|n| n.parent)
    }

    /// Children of a node in document order
    pub fn children_of(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Current simulated time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.time_ms.get()
    }

    /// Number of timers waiting to fire
    pub fn pending_timer_count(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Number of installed child-list observers
    pub fn active_observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    /// Nodes currently being observed
    pub fn observed_targets(&self) -> Vec<NodeId> {
        self.observers.borrow().values().map(|o| o.target).collect()
    }

    // =========================================================================
    // Time & mutation delivery
    // =========================================================================

    /// Advance the simulated clock, firing every timer that falls due
    ///
    /// Timers fire in due order; timers with the same due time fire in the
    /// order they were scheduled.
    pub fn advance_time(&self, ms: u64) {
        let target = self.time_ms.get() + ms;

        loop {
            let next = {
                let mut timers = self.timers.borrow_mut();
                let due = timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due_ms <= target)
                    .min_by_key(|(_, t)| t.due_ms)
                    .map(|(i, _)| i);
                due.map(|i| timers.remove(i))
            };

            match next {
                Some(timer) => {
                    self.time_ms.set(timer.due_ms.max(self.time_ms.get()));
                    (timer.callback)();
                }
                None => break,
            }
        }

        self.time_ms.set(target);
    }

    /// Deliver queued child-list notifications to their observers
    ///
    /// Returns the number of callbacks invoked.
    pub fn flush_mutations(&self) -> usize {
        let mut delivered = 0;

        for _ in 0..MAX_FLUSH_ROUNDS {
            let targets: Vec<NodeId> = self.pending_mutations.borrow_mut().drain(..).collect();
            if targets.is_empty() {
                break;
            }

            for target in targets {
                let ids: Vec<u64> = self
                    .observers
                    .borrow()
                    .iter()
                    .filter(|(_, o)| o.target == target)
                    .map(|(id, _)| *id)
                    .collect();

                for id in ids {
                    let callback = self
                        .observers
                        .borrow_mut()
                        .get_mut(&id)
                        .and_then(|o| o.callback.take());

                    if let Some(mut callback) = callback {
                        callback();
                        delivered += 1;
                        // The callback may have disconnected its own observer
                        if let Some(o) = self.observers.borrow_mut().get_mut(&id) {
                            o.callback = Some(callback);
                        }
                    }
                }
            }
        }

        delivered
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn insert_node(&self, node: MockNode) -> NodeId {
        let id = NodeId(self.next_node.get());
        self.next_node.set(id.0 + 1);
        self.nodes.borrow_mut().insert(id, node);
        id
    }

    fn next_handle(&self) -> u64 {
        let h = self.next_handle.get();
        self.next_handle.set(h + 1);
        h
    }

    fn attach(&self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let mut nodes = self.nodes.borrow_mut();
        if let Some(p) = nodes.get_mut(&parent) {
            p.children.push(child);
        }
        if let Some(c) = nodes.get_mut(&child) {
            c.parent = Some(parent);
        }
        self.pending_mutations.borrow_mut().push(parent);
    }

    fn detach(&self, child: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        let parent = match nodes.get_mut(&child).and_then(|c| c.parent.take()) {
            Some(p) => p,
            None => return,
        };
        if let Some(p) = nodes.get_mut(&parent) {
            p.children.retain(|c| *c != child);
        }
        self.pending_mutations.borrow_mut().push(parent);
    }

    /// Collect attached nodes in document (pre-)order starting at the body
    fn document_order(&self) -> Vec<NodeId> {
        let nodes = self.nodes.borrow();
        let mut order = Vec::new();
        let mut stack = vec![self.body];
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(n) = nodes.get(&id) {
                stack.extend(n.children.iter().rev().copied());
            }
        }
        order
    }
}

impl Default for MockDom {
    fn default() -> Self {
        Self::new()
    }
}

impl DomHost for MockDom {
    fn has_window(&self) -> bool {
        self.window
    }

    fn body(&self) -> Option<NodeId> {
        Some(self.body)
    }

    fn is_element(&self, node: NodeId) -> bool {
        self.nodes
            .borrow()
            .get(&node)
            .map(|n| n.kind == NodeKind::Element)
            .unwrap_or(false)
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        let nodes = self.nodes.borrow();
        let parent = nodes.get(&node)?.parent?;
        match nodes.get(&parent) {
            Some(p) if p.kind == NodeKind::Element => Some(parent),
            _ => None,
        }
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    fn bounding_client_rect(&self, element: NodeId) -> Option<Rect> {
        let nodes = self.nodes.borrow();
        let node = nodes.get(&element)?;
        if node.kind != NodeKind::Element {
            return None;
        }
        node.rect
    }

    fn element_from_point(&self, point: Vec2) -> Option<NodeId> {
        let order = self.document_order();
        let nodes = self.nodes.borrow();
        order.into_iter().rev().find(|id| {
            nodes
                .get(id)
                .filter(|n| n.kind == NodeKind::Element && !n.hidden)
                .and_then(|n| n.rect)
                .map(|r| r.contains(point))
                .unwrap_or(false)
        })
    }

    fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), HostError> {
        {
            let nodes = self.nodes.borrow();
            match nodes.get(&parent) {
                Some(p) if p.kind == NodeKind::Element => {}
                Some(_) => return Err(HostError::NotAnElement),
                None => return Err(HostError::NodeNotFound),
            }
            if !nodes.contains_key(&child) {
                return Err(HostError::NodeNotFound);
            }
        }
        self.attach(parent, child);
        Ok(())
    }

    fn hide(&self, element: NodeId) -> Result<(), HostError> {
        let mut nodes = self.nodes.borrow_mut();
        let node = nodes.get_mut(&element).ok_or(HostError::NodeNotFound)?;
        if node.kind != NodeKind::Element {
            return Err(HostError::NotAnElement);
        }
        node.hidden = true;
        Ok(())
    }

    fn remove_attribute(&self, element: NodeId, name: &str) -> Result<(), HostError> {
        let mut nodes = self.nodes.borrow_mut();
        let node = nodes.get_mut(&element).ok_or(HostError::NodeNotFound)?;
        node.attributes.remove(name);
        Ok(())
    }

    fn set_timeout(&self, delay_ms: u32, callback: TimerCallback) -> TimerHandle {
        let handle = TimerHandle(self.next_handle());
        self.timers.borrow_mut().push(MockTimer {
            handle,
            due_ms: self.time_ms.get() + u64::from(delay_ms),
            callback,
        });
        handle
    }

    fn clear_timeout(&self, handle: TimerHandle) {
        self.timers.borrow_mut().retain(|t| t.handle != handle);
    }

    fn observe_child_list(
        &self,
        target: NodeId,
        callback: MutationCallback,
    ) -> Result<ObserverHandle, HostError> {
        if !self.nodes.borrow().contains_key(&target) {
            return Err(HostError::NodeNotFound);
        }
        let id = self.next_handle();
        self.observers.borrow_mut().insert(
            id,
            MockObserver {
                target,
                callback: Some(callback),
            },
        );
        Ok(ObserverHandle(id))
    }

    fn disconnect_observer(&self, handle: ObserverHandle) {
        self.observers.borrow_mut().remove(&handle.0);
    }
}
