//! Shared fixtures for the backend integration tests
//!
//! - `RecordingManager`: in-memory orchestration manager that logs every action
//! - `Harness`: mock document + backend + a pointer that dispatches like the page glue

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use zos_dnd::{
    BackendContext, BackendOptions, BeginDragOptions, DragActions, DragDropManager, DragMonitor,
    GestureBackend, GestureEvent, GestureListeners, GesturePhase, HoverOptions, NodeId,
    PointerKind, SourceId, SourceOffsetFn, Subject, TargetId, Vec2,
};
use zos_dnd_host_mock::MockDom;

/// One action received by the manager
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    BeginDrag {
        source_ids: Vec<SourceId>,
        client_offset: Vec2,
        publish_source: bool,
    },
    PublishDragSource,
    Hover {
        target_ids: Vec<TargetId>,
        client_offset: Option<Vec2>,
    },
    Drop,
    EndDrag,
}

/// Manager that records actions and tracks drag state the way a real one does
///
/// `begin_drag` picks the last candidate as the dragged source, unless
/// `refuse_drag` is set, in which case nothing starts.
#[derive(Default)]
pub struct RecordingManager {
    calls: RefCell<Vec<Call>>,
    dragging: Cell<bool>,
    dropped: Cell<bool>,
    source: RefCell<Option<SourceId>>,
    offset_fn: RefCell<Option<SourceOffsetFn>>,
    pub refuse_drag: Cell<bool>,
}

impl RecordingManager {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| matches(c)).count()
    }

    pub fn begin_drag_count(&self) -> usize {
        self.count(|c| matches!(c, Call::BeginDrag { .. }))
    }

    pub fn hover_count(&self) -> usize {
        self.count(|c| matches!(c, Call::Hover { .. }))
    }

    pub fn last_hover(&self) -> Option<(Vec<TargetId>, Option<Vec2>)> {
        self.calls.borrow().iter().rev().find_map(|c| match c {
            Call::Hover {
                target_ids,
                client_offset,
            } => Some((target_ids.clone(), *client_offset)),
            _ => None,
        })
    }

    /// Report a drop as already handled without ending the drag, the way a
    /// manager does when a target consumed the drop itself
    pub fn mark_dropped(&self) {
        self.dropped.set(true);
    }

    /// Ask the offset lookup handed over with the last `begin_drag`
    pub fn source_client_offset(&self, id: &str) -> Option<Vec2> {
        let lookup = self.offset_fn.borrow().clone()?;
        lookup(id)
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl DragActions for RecordingManager {
    fn begin_drag(&self, source_ids: Vec<SourceId>, options: BeginDragOptions) {
        self.record(Call::BeginDrag {
            source_ids: source_ids.clone(),
            client_offset: options.client_offset,
            publish_source: options.publish_source,
        });
        *self.offset_fn.borrow_mut() = Some(options.get_source_client_offset);

        if self.refuse_drag.get() {
            return;
        }
        *self.source.borrow_mut() = source_ids.last().cloned();
        self.dragging.set(true);
    }

    fn publish_drag_source(&self) {
        self.record(Call::PublishDragSource);
    }

    fn hover(&self, target_ids: Vec<TargetId>, options: HoverOptions) {
        self.record(Call::Hover {
            target_ids,
            client_offset: options.client_offset,
        });
    }

    fn drop(&self) {
        self.record(Call::Drop);
        self.dropped.set(true);
    }

    fn end_drag(&self) {
        self.record(Call::EndDrag);
        self.dragging.set(false);
        self.dropped.set(false);
        *self.source.borrow_mut() = None;
    }
}

impl DragMonitor for RecordingManager {
    fn is_dragging(&self) -> bool {
        self.dragging.get()
    }

    fn did_drop(&self) -> bool {
        self.dropped.get()
    }

    fn source_id(&self) -> Option<SourceId> {
        self.source.borrow().clone()
    }
}

/// Hands the same recording manager out as both actions and monitor
pub struct ManagerHandle(pub Rc<RecordingManager>);

impl DragDropManager for ManagerHandle {
    fn actions(&self) -> Rc<dyn DragActions> {
        self.0.clone()
    }

    fn monitor(&self) -> Rc<dyn DragMonitor> {
        self.0.clone()
    }
}

/// A set-up backend over a mock document
pub struct Harness {
    pub dom: Rc<MockDom>,
    pub manager: Rc<RecordingManager>,
    pub context: BackendContext<MockDom>,
    pub backend: GestureBackend<MockDom>,
    pointer: PointerKind,
    gesture: RefCell<Option<(Vec<Subject>, NodeId)>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_options(BackendOptions::default())
    }

    pub fn with_options(options: BackendOptions) -> Self {
        let dom = Rc::new(MockDom::new());
        let manager = RecordingManager::new();
        let context = BackendContext::new(dom.clone());
        let backend = GestureBackend::new(&ManagerHandle(manager.clone()), context.clone(), options);
        backend.setup().expect("setup");

        Self {
            dom,
            manager,
            context,
            backend,
            pointer: PointerKind::Touch,
            gesture: RefCell::new(None),
        }
    }

    pub fn with_pointer(mut self, pointer: PointerKind) -> Self {
        self.pointer = pointer;
        self
    }

    pub fn body(&self) -> NodeId {
        self.dom.body_id()
    }

    pub fn listeners(&self) -> &Rc<GestureListeners> {
        &self.context.listeners
    }

    /// Press on `target` at (x, y); path and target stay fixed until release
    pub fn press(&self, target: NodeId, x: f64, y: f64) -> GestureEvent {
        let path = GestureListeners::event_path(self.dom.as_ref(), Some(target));
        *self.gesture.borrow_mut() = Some((path, target));
        self.dispatch(GesturePhase::Start, Some(Vec2::new(x, y)))
    }

    pub fn move_to(&self, x: f64, y: f64) -> GestureEvent {
        self.dispatch(GesturePhase::Move, Some(Vec2::new(x, y)))
    }

    pub fn release(&self, x: f64, y: f64) -> GestureEvent {
        let event = self.dispatch(GesturePhase::End, Some(Vec2::new(x, y)));
        self.gesture.borrow_mut().take();
        event
    }

    /// The platform aborts the gesture in progress
    pub fn cancel(&self) -> GestureEvent {
        let event = self.dispatch(GesturePhase::Cancel, None);
        self.gesture.borrow_mut().take();
        event
    }

    /// Dispatch a raw event along the current path
    pub fn dispatch(&self, phase: GesturePhase, center: Option<Vec2>) -> GestureEvent {
        let gesture = self.gesture.borrow().clone();
        let event = GestureEvent::new(phase, self.pointer, center);
        match gesture {
            Some((path, target)) => {
                let event = event.with_target(target);
                self.context.listeners.dispatch(&event, &path);
                event
            }
            None => {
                self.context.listeners.dispatch(&event, &[Subject::Window]);
                event
            }
        }
    }
}
