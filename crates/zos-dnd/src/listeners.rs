//! Gesture listener bridge
//!
//! One recognizer entry per subject (the window or a node), each holding any
//! number of handlers per gesture phase. A single window entry drives the
//! start/move/end triad and a single body entry drives drop-target hit testing,
//! no matter how many sources and targets are connected.
//!
//! Dispatch follows the familiar DOM order: capture handlers run from the
//! root down to the target, then bubble handlers run from the target back up
//! to the root. Within one subject and stage, handlers run in registration
//! order.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use zos_dnd_host::{DomHost, NodeId};

use crate::event::{GestureEvent, GesturePhase};

/// Something gesture handlers can be attached to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Subject {
    /// The top-level window
    Window,
    /// A document node
    Node(NodeId),
}

/// Identifies one registered handler
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Handler invoked for each matching gesture event
pub type GestureHandler = Rc<dyn Fn(&GestureEvent)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Capture,
    Bubble,
}

struct Registration {
    id: ListenerId,
    phase: GesturePhase,
    stage: Stage,
    handler: GestureHandler,
}

/// Handlers attached to one subject
#[derive(Default)]
struct Recognizer {
    registrations: Vec<Registration>,
}

impl Recognizer {
    fn handlers(&self, phase: GesturePhase, stage: Stage) -> impl Iterator<Item = &GestureHandler> {
        self.registrations
            .iter()
            .filter(move |r| r.phase == phase && r.stage == stage)
            .map(|r| &r.handler)
    }
}

/// Subject-keyed table of gesture handlers
///
/// Entries are created lazily on first registration and are never evicted;
/// a subject whose handlers were all removed keeps an empty entry.
pub struct GestureListeners {
    recognizers: RefCell<HashMap<Subject, Recognizer>>,
    next_id: Cell<u64>,
}

impl Default for GestureListeners {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureListeners {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            recognizers: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
        }
    }

    /// Attach a bubble-stage handler
    pub fn add_listener(
        &self,
        subject: Subject,
        phase: GesturePhase,
        handler: impl Fn(&GestureEvent) + 'static,
    ) -> ListenerId {
        self.register(subject, phase, Stage::Bubble, Rc::new(handler))
    }

    /// Attach a capture-stage handler
    pub fn add_capture_listener(
        &self,
        subject: Subject,
        phase: GesturePhase,
        handler: impl Fn(&GestureEvent) + 'static,
    ) -> ListenerId {
        self.register(subject, phase, Stage::Capture, Rc::new(handler))
    }

    /// Detach one handler
    ///
    /// Returns `false` when the subject has no entry or the handler is not
    /// registered there for `phase`.
    pub fn remove_listener(&self, subject: Subject, phase: GesturePhase, id: ListenerId) -> bool {
        let mut recognizers = self.recognizers.borrow_mut();
        let recognizer = match recognizers.get_mut(&subject) {
            Some(r) => r,
            None => return false,
        };

        let before = recognizer.registrations.len();
        recognizer
            .registrations
            .retain(|r| !(r.id == id && r.phase == phase));
        recognizer.registrations.len() != before
    }

    /// Number of handlers (both stages) attached to a subject for a phase
    pub fn listener_count(&self, subject: Subject, phase: GesturePhase) -> usize {
        self.recognizers
            .borrow()
            .get(&subject)
            .map(|r| r.registrations.iter().filter(|reg| reg.phase == phase).count())
            .unwrap_or(0)
    }

    /// Number of subjects that ever had a handler attached
    pub fn subject_count(&self) -> usize {
        self.recognizers.borrow().len()
    }

    /// Deliver an event along `path` (root first, target last)
    ///
    /// The handler list is snapshotted before the first handler runs, so
    /// handlers may attach or detach listeners freely.
    pub fn dispatch(&self, event: &GestureEvent, path: &[Subject]) {
        let handlers: Vec<GestureHandler> = {
            let recognizers = self.recognizers.borrow();
            let capture = path
                .iter()
                .filter_map(|s| recognizers.get(s))
                .flat_map(|r| r.handlers(event.phase(), Stage::Capture));
            let bubble = path
                .iter()
                .rev()
                .filter_map(|s| recognizers.get(s))
                .flat_map(|r| r.handlers(event.phase(), Stage::Bubble));
            capture.chain(bubble).cloned().collect()
        };

        log::trace!(
            "[dnd-listeners] dispatch {} to {} handler(s) along {} subject(s)",
            event.phase().event_name(),
            handlers.len(),
            path.len()
        );

        for handler in handlers {
            handler(event);
        }
    }

    /// Build the dispatch path for an event targeted at `target`
    ///
    /// The path starts at the window and walks down the parent-element chain to
    /// the target itself. Without a target only the window is included.
    pub fn event_path<H: DomHost + ?Sized>(host: &H, target: Option<NodeId>) -> Vec<Subject> {
        let mut nodes = Vec::new();
        let mut current = target;
        while let Some(node) = current {
            nodes.push(Subject::Node(node));
            current = host.parent_element(node);
        }

        let mut path = Vec::with_capacity(nodes.len() + 1);
        path.push(Subject::Window);
        path.extend(nodes.into_iter().rev());
        path
    }

    fn register(
        &self,
        subject: Subject,
        phase: GesturePhase,
        stage: Stage,
        handler: GestureHandler,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        self.recognizers
            .borrow_mut()
            .entry(subject)
            .or_default()
            .registrations
            .push(Registration {
                id,
                phase,
                stage,
                handler,
            });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zos_dnd_host::Rect;
    use zos_dnd_host_mock::MockDom;

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str) -> impl Fn(&GestureEvent) {
        let log = log.clone();
        move |_| log.borrow_mut().push(tag)
    }

    #[test]
    fn test_fan_out_in_registration_order() {
        let listeners = GestureListeners::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        listeners.add_listener(Subject::Window, GesturePhase::Move, recorder(&log, "a"));
        listeners.add_listener(Subject::Window, GesturePhase::Move, recorder(&log, "b"));
        listeners.add_listener(Subject::Window, GesturePhase::End, recorder(&log, "end"));

        listeners.dispatch(&GestureEvent::moved(0.0, 0.0), &[Subject::Window]);
        assert_eq!(*log.borrow(), vec!["a", "b"]);
        assert_eq!(listeners.listener_count(Subject::Window, GesturePhase::Move), 2);
    }

    #[test]
    fn test_capture_then_bubble_order() {
        let listeners = GestureListeners::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let outer = Subject::Node(NodeId(10));
        let inner = Subject::Node(NodeId(11));

        listeners.add_listener(Subject::Window, GesturePhase::Start, recorder(&log, "window-bubble"));
        listeners.add_capture_listener(Subject::Window, GesturePhase::Start, recorder(&log, "window-capture"));
        listeners.add_listener(outer, GesturePhase::Start, recorder(&log, "outer"));
        listeners.add_listener(inner, GesturePhase::Start, recorder(&log, "inner"));

        listeners.dispatch(&GestureEvent::start(0.0, 0.0), &[Subject::Window, outer, inner]);
        assert_eq!(
            *log.borrow(),
            vec!["window-capture", "inner", "outer", "window-bubble"]
        );
    }

    #[test]
    fn test_remove_listener() {
        let listeners = GestureListeners::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let a = listeners.add_listener(Subject::Window, GesturePhase::Move, recorder(&log, "a"));
        listeners.add_listener(Subject::Window, GesturePhase::Move, recorder(&log, "b"));

        assert!(!listeners.remove_listener(Subject::Window, GesturePhase::Start, a));
        assert!(listeners.remove_listener(Subject::Window, GesturePhase::Move, a));
        assert!(!listeners.remove_listener(Subject::Window, GesturePhase::Move, a));

        listeners.dispatch(&GestureEvent::moved(0.0, 0.0), &[Subject::Window]);
        assert_eq!(*log.borrow(), vec!["b"]);
    }

    #[test]
    fn test_remove_from_unknown_subject_is_noop() {
        let listeners = GestureListeners::new();
        assert!(!listeners.remove_listener(
            Subject::Node(NodeId(5)),
            GesturePhase::Start,
            ListenerId(1)
        ));
        assert_eq!(listeners.subject_count(), 0);
    }

    #[test]
    fn test_entries_are_not_evicted() {
        let listeners = GestureListeners::new();
        let subject = Subject::Node(NodeId(3));
        let id = listeners.add_listener(subject, GesturePhase::Start, |_| {});

        listeners.remove_listener(subject, GesturePhase::Start, id);
        assert_eq!(listeners.listener_count(subject, GesturePhase::Start), 0);
        assert_eq!(listeners.subject_count(), 1);
    }

    #[test]
    fn test_handler_may_detach_during_dispatch() {
        let listeners = Rc::new(GestureListeners::new());
        let hits = Rc::new(Cell::new(0));

        let id_cell = Rc::new(Cell::new(None));
        let l = listeners.clone();
        let ids = id_cell.clone();
        let h = hits.clone();
        let id = listeners.add_listener(Subject::Window, GesturePhase::Move, move |_| {
            h.set(h.get() + 1);
            if let Some(id) = ids.get() {
                l.remove_listener(Subject::Window, GesturePhase::Move, id);
            }
        });
        id_cell.set(Some(id));

        listeners.dispatch(&GestureEvent::moved(0.0, 0.0), &[Subject::Window]);
        listeners.dispatch(&GestureEvent::moved(1.0, 0.0), &[Subject::Window]);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_event_path_from_host() {
        let dom = MockDom::new();
        let body = dom.body_id();
        let outer = dom.create_element(body, Rect::new(0.0, 0.0, 100.0, 100.0));
        let inner = dom.create_element(outer, Rect::new(0.0, 0.0, 10.0, 10.0));

        assert_eq!(
            GestureListeners::event_path(&dom, Some(inner)),
            vec![
                Subject::Window,
                Subject::Node(body),
                Subject::Node(outer),
                Subject::Node(inner)
            ]
        );
        assert_eq!(GestureListeners::event_path(&dom, None), vec![Subject::Window]);
    }
}
