//! Source-node liveness observer
//!
//! A re-render can unmount the node that is being dragged. If that happens the
//! recognizer loses its element and offset queries start returning nothing, so
//! the watch relocates the node under the body, hidden, until the drag ends.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use zos_dnd_host::{DomHost, NodeId, ObserverHandle};

struct ActiveWatch {
    node: NodeId,
    observer: ObserverHandle,
}

struct WatchShared<H> {
    host: Rc<H>,
    identity_attribute: String,
    active: RefCell<Option<ActiveWatch>>,
}

/// Watches at most one dragged node for structural detachment
pub struct SourceNodeWatch<H: DomHost + 'static> {
    shared: Rc<WatchShared<H>>,
}

impl<H: DomHost + 'static> SourceNodeWatch<H> {
    /// Create an idle watch; `identity_attribute` is stripped from relocated nodes
    pub fn new(host: Rc<H>, identity_attribute: impl Into<String>) -> Self {
        Self {
            shared: Rc::new(WatchShared {
                host,
                identity_attribute: identity_attribute.into(),
                active: RefCell::new(None),
            }),
        }
    }

    /// Start watching `node`, replacing any previous watch
    ///
    /// Without a node, or for a node that already has no parent element,
    /// there is nothing to observe and the watch stays idle.
    pub fn watch(&self, node: Option<NodeId>) {
        self.unwatch();

        let Some(node) = node else {
            return;
        };
        let host = &self.shared.host;
        let Some(parent) = host.parent_element(node) else {
            return;
        };

        let weak: Weak<WatchShared<H>> = Rc::downgrade(&self.shared);
        let callback = Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.on_child_list_changed(node);
            }
        });

        match host.observe_child_list(parent, callback) {
            Ok(observer) => {
                *self.shared.active.borrow_mut() = Some(ActiveWatch { node, observer });
            }
            Err(e) => log::warn!("[dnd-liveness] cannot observe parent of {:?}: {}", node, e),
        }
    }

    /// Stop watching; safe to call when idle
    pub fn unwatch(&self) {
        self.shared.unwatch();
    }

    /// Node currently being watched
    pub fn watched_node(&self) -> Option<NodeId> {
        self.shared.active.borrow().as_ref().map(|w| w.node)
    }
}

impl<H: DomHost> WatchShared<H> {
    fn unwatch(&self) {
        let active = self.active.borrow_mut().take();
        if let Some(active) = active {
            self.host.disconnect_observer(active.observer);
        }
    }

    fn on_child_list_changed(&self, node: NodeId) {
        let current = self.active.borrow().as_ref().map(|w| w.node);
        if current != Some(node) {
            return;
        }
        if self.host.parent_element(node).is_some() {
            return;
        }

        self.resurrect(node);
        self.unwatch();
    }

    /// Park a detached node under the body so it keeps tracking the gesture
    fn resurrect(&self, node: NodeId) {
        log::debug!("[dnd-liveness] dragged node {:?} was detached, relocating", node);

        if let Err(e) = self.host.hide(node) {
            log::warn!("[dnd-liveness] cannot hide {:?}: {}", node, e);
        }
        if let Err(e) = self.host.remove_attribute(node, &self.identity_attribute) {
            log::warn!("[dnd-liveness] cannot strip {} from {:?}: {}", self.identity_attribute, node, e);
        }
        match self.host.body() {
            Some(body) => {
                if let Err(e) = self.host.append_child(body, node) {
                    log::warn!("[dnd-liveness] cannot reattach {:?}: {}", node, e);
                }
            }
            None => log::warn!("[dnd-liveness] no body to reattach {:?} to", node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zos_dnd_host::Rect;
    use zos_dnd_host_mock::MockDom;

    fn setup() -> (Rc<MockDom>, NodeId, NodeId) {
        let dom = Rc::new(MockDom::new());
        let list = dom.create_element(dom.body_id(), Rect::new(0.0, 0.0, 300.0, 300.0));
        let item = dom.create_element(list, Rect::new(0.0, 0.0, 300.0, 30.0));
        dom.set_attribute(item, "data-reactid", ".0.1.$item");
        dom.flush_mutations();
        (dom, list, item)
    }

    #[test]
    fn test_watch_observes_parent() {
        let (dom, list, item) = setup();
        let watch = SourceNodeWatch::new(dom.clone(), "data-reactid");

        watch.watch(Some(item));
        assert_eq!(watch.watched_node(), Some(item));
        assert_eq!(dom.observed_targets(), vec![list]);
    }

    #[test]
    fn test_detached_node_is_relocated() {
        let (dom, _list, item) = setup();
        let watch = SourceNodeWatch::new(dom.clone(), "data-reactid");
        watch.watch(Some(item));

        dom.remove(item);
        dom.flush_mutations();

        assert_eq!(dom.parent_of(item), Some(dom.body_id()));
        assert!(dom.is_hidden(item));
        assert_eq!(dom.attribute(item, "data-reactid"), None);
        assert_eq!(watch.watched_node(), None);
        assert_eq!(dom.active_observer_count(), 0);
    }

    #[test]
    fn test_sibling_changes_are_ignored() {
        let (dom, list, item) = setup();
        let watch = SourceNodeWatch::new(dom.clone(), "data-reactid");
        watch.watch(Some(item));

        let sibling = dom.create_element(list, Rect::new(0.0, 30.0, 300.0, 30.0));
        dom.remove(sibling);
        dom.flush_mutations();

        assert_eq!(dom.parent_of(item), Some(list));
        assert!(!dom.is_hidden(item));
        assert_eq!(watch.watched_node(), Some(item));
    }

    #[test]
    fn test_nothing_to_watch() {
        let (dom, _list, item) = setup();
        let watch = SourceNodeWatch::new(dom.clone(), "data-reactid");

        watch.watch(None);
        assert_eq!(watch.watched_node(), None);

        dom.remove(item);
        watch.watch(Some(item));
        assert_eq!(watch.watched_node(), None);
        assert_eq!(dom.active_observer_count(), 0);
    }

    #[test]
    fn test_rewatch_replaces_previous_observer() {
        let (dom, _list, item) = setup();
        let other = dom.create_element(dom.body_id(), Rect::new(0.0, 400.0, 10.0, 10.0));
        let watch = SourceNodeWatch::new(dom.clone(), "data-reactid");

        watch.watch(Some(item));
        watch.watch(Some(other));
        assert_eq!(dom.active_observer_count(), 1);
        assert_eq!(watch.watched_node(), Some(other));

        dom.remove(item);
        dom.flush_mutations();
        assert_eq!(dom.parent_of(item), None, "stale watch must not relocate");
    }

    #[test]
    fn test_unwatch_is_idempotent() {
        let (dom, _list, item) = setup();
        let watch = SourceNodeWatch::new(dom.clone(), "data-reactid");

        watch.watch(Some(item));
        watch.unwatch();
        watch.unwatch();
        assert_eq!(dom.active_observer_count(), 0);

        dom.remove(item);
        dom.flush_mutations();
        assert!(!dom.is_hidden(item));
    }
}
