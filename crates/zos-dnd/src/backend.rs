//! Drag reconciliation state machine
//!
//! Turns pan gestures into the manager's begin/hover/drop/end lifecycle:
//!
//! ```text
//!            start capture             first real movement
//!   Idle ───────────────────▶ Armed ───────────────────────▶ Dragging
//!    ▲                          │                                │
//!    └──────────── end ─────────┴───────────── end ──────────────┘
//! ```
//!
//! The backend installs six handlers on the window subject when it is set
//! up (start/move/end/cancel, some at the capture stage) plus one handler per
//! connected source (on the window) or target (on the body). Candidate ids
//! gathered by those handlers during one dispatch are consumed by the window
//! handlers of the same dispatch.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use zos_dnd_host::{DomHost, NodeId, TimerHandle, Vec2};

use crate::connection::Disconnect;
use crate::error::BackendError;
use crate::event::{GestureEvent, GesturePhase};
use crate::listeners::{GestureListeners, ListenerId, Subject};
use crate::liveness::SourceNodeWatch;
use crate::manager::{
    BeginDragOptions, DragActions, DragDropManager, DragMonitor, HoverOptions, SourceId,
    SourceOffsetFn, TargetId,
};
use crate::offset::{offset_from_gesture_event, offset_from_node};
use crate::options::BackendOptions;
use crate::registry::{DragPreviewOptions, NodeRegistry};
use crate::slot::{BackendContext, BackendSlot};

/// Where the current gesture stands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragPhase {
    /// No gesture in progress
    Idle,
    /// A gesture started; candidate sources are being collected
    Armed,
    /// The manager reports an active drag
    Dragging,
}

/// Transient per-gesture state
#[derive(Debug, Default)]
struct DragSession {
    /// `None` outside of a gesture and once handed to the manager
    candidate_source_ids: Option<Vec<SourceId>>,
    candidate_target_ids: Vec<TargetId>,
    start_client_offset: Option<Vec2>,
    pending_start: Option<TimerHandle>,
}

struct BackendInner<H: DomHost + 'static> {
    self_ref: Weak<BackendInner<H>>,
    host: Rc<H>,
    listeners: Rc<GestureListeners>,
    slot: BackendSlot,
    actions: Rc<dyn DragActions>,
    monitor: Rc<dyn DragMonitor>,
    options: BackendOptions,
    registry: Rc<RefCell<NodeRegistry>>,
    session: RefCell<DragSession>,
    watch: SourceNodeWatch<H>,
    window_listeners: RefCell<Vec<(GesturePhase, ListenerId)>>,
    is_set_up: Cell<bool>,
}

/// Gesture-driven drag-and-drop backend
pub struct GestureBackend<H: DomHost + 'static> {
    inner: Rc<BackendInner<H>>,
}

impl<H: DomHost + 'static> GestureBackend<H> {
    /// Create a backend bound to `manager`
    pub fn new(
        manager: &dyn DragDropManager,
        context: BackendContext<H>,
        options: BackendOptions,
    ) -> Self {
        let BackendContext {
            host,
            listeners,
            slot,
        } = context;
        let watch = SourceNodeWatch::new(host.clone(), options.framework_id_attribute.clone());

        let inner = Rc::new_cyclic(|self_ref| BackendInner {
            self_ref: self_ref.clone(),
            host,
            listeners,
            slot,
            actions: manager.actions(),
            monitor: manager.monitor(),
            options,
            registry: Rc::new(RefCell::new(NodeRegistry::new())),
            session: RefCell::new(DragSession::default()),
            watch,
            window_listeners: RefCell::new(Vec::new()),
            is_set_up: Cell::new(false),
        });

        Self { inner }
    }

    #[inline]
    pub fn options(&self) -> &BackendOptions {
        &self.inner.options
    }

    /// Listener table this backend registers into
    #[inline]
    pub fn listeners(&self) -> &Rc<GestureListeners> {
        &self.inner.listeners
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Install the window gesture handlers
    ///
    /// Outside a window environment this does nothing.
    ///
    /// # Returns
    /// * `Ok(())` - Handlers installed (or nothing to do)
    /// * `Err(BackendError::AlreadySetUp)` - Another backend holds the slot
    pub fn setup(&self) -> Result<(), BackendError> {
        let inner = &self.inner;
        if !inner.host.has_window() {
            return Ok(());
        }

        inner.slot.try_acquire()?;
        inner.is_set_up.set(true);

        let listeners = &inner.listeners;
        let weak = &inner.self_ref;
        let installed = vec![
            (
                GesturePhase::Start,
                listeners.add_capture_listener(
                    Subject::Window,
                    GesturePhase::Start,
                    bind(weak, |b, _| b.handle_top_move_start_capture()),
                ),
            ),
            (
                GesturePhase::Start,
                listeners.add_listener(
                    Subject::Window,
                    GesturePhase::Start,
                    bind(weak, BackendInner::handle_top_move_start),
                ),
            ),
            (
                GesturePhase::Move,
                listeners.add_capture_listener(
                    Subject::Window,
                    GesturePhase::Move,
                    bind(weak, |b, _| b.handle_top_move_capture()),
                ),
            ),
            (
                GesturePhase::Move,
                listeners.add_listener(
                    Subject::Window,
                    GesturePhase::Move,
                    bind(weak, BackendInner::handle_top_move),
                ),
            ),
            (
                GesturePhase::End,
                listeners.add_capture_listener(
                    Subject::Window,
                    GesturePhase::End,
                    bind(weak, BackendInner::handle_top_move_end_capture),
                ),
            ),
            (
                GesturePhase::Cancel,
                listeners.add_capture_listener(
                    Subject::Window,
                    GesturePhase::Cancel,
                    bind(weak, BackendInner::handle_top_move_cancel_capture),
                ),
            ),
        ];
        *inner.window_listeners.borrow_mut() = installed;

        log::debug!(
            "[dnd-backend] set up (touch delay {:?} ms, mouse delay {:?} ms)",
            inner.options.delay_touch_start,
            inner.options.delay_mouse_start
        );
        Ok(())
    }

    /// Remove the window handlers and forget all gesture state
    ///
    /// Outside a window environment this does nothing.
    pub fn teardown(&self) {
        if !self.inner.host.has_window() {
            return;
        }
        self.inner.release_environment();
        log::debug!("[dnd-backend] torn down");
    }

    /// Whether this backend currently holds the setup slot
    #[inline]
    pub fn is_set_up(&self) -> bool {
        self.inner.is_set_up.get()
    }

    // =========================================================================
    // Connections
    // =========================================================================

    /// Make `node` the drag source for `id`
    ///
    /// Source handlers share the window subject so that they run in
    /// connection order; each one only reacts to gestures that started on
    /// `node` or inside it. Nested sources are therefore collected with the
    /// most recently connected one first.
    pub fn connect_drag_source(&self, id: &str, node: NodeId) -> Disconnect {
        let inner = &self.inner;
        if let Some(previous) = inner.registry.borrow_mut().set_source(id, node) {
            if previous != node {
                log::trace!("[dnd-backend] source {} moved from {:?} to {:?}", id, previous, node);
            }
        }

        let weak = inner.self_ref.clone();
        let source_id = SourceId::from(id);
        let listener = inner
            .listeners
            .add_listener(Subject::Window, GesturePhase::Start, move |event| {
                if let Some(inner) = weak.upgrade() {
                    if inner.started_within(node, event) {
                        inner.handle_move_start(&source_id);
                    }
                }
            });

        let weak = inner.self_ref.clone();
        let listeners = inner.listeners.clone();
        let source_id = SourceId::from(id);
        Disconnect::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.registry.borrow_mut().remove_source(&source_id, node);
            }
            listeners.remove_listener(Subject::Window, GesturePhase::Start, listener);
        })
    }

    /// Make `node` the drag preview for `id`
    pub fn connect_drag_preview(
        &self,
        id: &str,
        node: NodeId,
        options: DragPreviewOptions,
    ) -> Disconnect {
        self.inner.registry.borrow_mut().set_preview(id, node, options);

        let registry = Rc::downgrade(&self.inner.registry);
        let source_id = SourceId::from(id);
        Disconnect::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.borrow_mut().remove_preview(&source_id, node);
            }
        })
    }

    /// Make `node` (and everything inside it) the drop target `id`
    ///
    /// The hit test runs from a move handler on the body so that it keeps
    /// firing while the pointer crosses several targets. Without a body there
    /// is nothing to attach to and a no-op handle is returned.
    pub fn connect_drop_target(&self, id: &str, node: NodeId) -> Disconnect {
        let inner = &self.inner;
        let Some(body) = inner.host.body() else {
            log::warn!("[dnd-backend] no body to attach drop target {} to", id);
            return Disconnect::noop();
        };

        let weak = inner.self_ref.clone();
        let target_id = TargetId::from(id);
        let listener = inner
            .listeners
            .add_listener(Subject::Node(body), GesturePhase::Move, move |event| {
                if let Some(inner) = weak.upgrade() {
                    if inner.is_over(node, event) {
                        inner.handle_move(&target_id);
                    }
                }
            });

        let listeners = inner.listeners.clone();
        Disconnect::new(move || {
            listeners.remove_listener(Subject::Node(body), GesturePhase::Move, listener);
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Client offset of the node connected for `id`, `None` once disconnected
    pub fn source_client_offset(&self, id: &str) -> Option<Vec2> {
        let node = self.inner.registry.borrow().source_node(id);
        offset_from_node(self.inner.host.as_ref(), node)
    }

    /// Node connected as the drag source for `id`
    pub fn source_node(&self, id: &str) -> Option<NodeId> {
        self.inner.registry.borrow().source_node(id)
    }

    /// Node connected as the drag preview for `id`
    pub fn preview_node(&self, id: &str) -> Option<NodeId> {
        self.inner.registry.borrow().preview_node(id)
    }

    /// Options stored with the drag preview for `id`
    pub fn preview_options(&self, id: &str) -> Option<DragPreviewOptions> {
        self.inner.registry.borrow().preview_options(id).cloned()
    }

    pub fn phase(&self) -> DragPhase {
        self.inner.phase()
    }

    /// Candidate source ids gathered for the current gesture
    pub fn candidate_source_ids(&self) -> Vec<SourceId> {
        self.inner
            .session
            .borrow()
            .candidate_source_ids
            .clone()
            .unwrap_or_default()
    }

    /// Candidate target ids gathered by the latest move
    pub fn candidate_target_ids(&self) -> Vec<TargetId> {
        self.inner.session.borrow().candidate_target_ids.clone()
    }

    /// Pointer position recorded when the gesture started
    pub fn start_client_offset(&self) -> Option<Vec2> {
        self.inner.session.borrow().start_client_offset
    }

    /// Whether a delayed start is waiting on its timer
    pub fn has_pending_start(&self) -> bool {
        self.inner.session.borrow().pending_start.is_some()
    }

    /// Node the liveness watch is currently guarding
    pub fn watched_source_node(&self) -> Option<NodeId> {
        self.inner.watch.watched_node()
    }

    // =========================================================================
    // Gesture handlers
    //
    // These are what the installed listeners call. They are public so a host
    // with its own event plumbing can drive the machine directly.
    // =========================================================================

    /// Start, capture stage: begin collecting candidate sources
    pub fn handle_top_move_start_capture(&self) {
        self.inner.handle_top_move_start_capture();
    }

    /// Start, per source: `id` is under the pointer
    pub fn handle_move_start(&self, id: &str) {
        self.inner.handle_move_start(id);
    }

    /// Start, bubble stage: record the start offset (possibly delayed)
    pub fn handle_top_move_start(&self, event: &GestureEvent) {
        self.inner.handle_top_move_start(event);
    }

    /// Move, capture stage: begin collecting candidate targets
    pub fn handle_top_move_capture(&self) {
        self.inner.handle_top_move_capture();
    }

    /// Move, per target: `id` is under the pointer
    pub fn handle_move(&self, id: &str) {
        self.inner.handle_move(id);
    }

    /// Move, bubble stage: promote and/or hover
    pub fn handle_top_move(&self, event: &GestureEvent) {
        self.inner.handle_top_move(event);
    }

    /// End, capture stage: drop and end the drag
    pub fn handle_top_move_end_capture(&self, event: &GestureEvent) {
        self.inner.handle_top_move_end_capture(event);
    }

    /// Cancel, capture stage: end the drag without dropping
    pub fn handle_top_move_cancel_capture(&self, event: &GestureEvent) {
        self.inner.handle_top_move_cancel_capture(event);
    }
}

impl<H: DomHost + 'static> BackendInner<H> {
    fn phase(&self) -> DragPhase {
        if self.monitor.is_dragging() {
            DragPhase::Dragging
        } else if self.session.borrow().candidate_source_ids.is_some() {
            DragPhase::Armed
        } else {
            DragPhase::Idle
        }
    }

    fn handle_top_move_start_capture(&self) {
        self.session.borrow_mut().candidate_source_ids = Some(Vec::new());
    }

    fn handle_move_start(&self, id: &str) {
        self.session
            .borrow_mut()
            .candidate_source_ids
            .get_or_insert_with(Vec::new)
            .insert(0, SourceId::from(id));
    }

    fn handle_top_move_start(&self, event: &GestureEvent) {
        if self.options.has_start_delay() {
            self.handle_top_move_start_delay(event);
        } else {
            self.record_start_offset(offset_from_gesture_event(event));
        }
    }

    /// Defer recording the start offset until the press has been held long enough
    fn handle_top_move_start_delay(&self, event: &GestureEvent) {
        let delay = self.options.start_delay_for(event.pointer());
        let center = offset_from_gesture_event(event);

        // An offset left over from an earlier gesture must not satisfy promotion
        // before this press has been held for the full delay.
        let previous = {
            let mut session = self.session.borrow_mut();
            session.start_client_offset = None;
            session.pending_start.take()
        };
        if let Some(handle) = previous {
            self.host.clear_timeout(handle);
        }

        let weak = self.self_ref.clone();
        let handle = self.host.set_timeout(
            delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.session.borrow_mut().pending_start = None;
                    inner.record_start_offset(center);
                }
            }),
        );
        self.session.borrow_mut().pending_start = Some(handle);
        log::trace!("[dnd-backend] start deferred by {} ms", delay);
    }

    fn record_start_offset(&self, offset: Option<Vec2>) {
        if let Some(offset) = offset {
            self.session.borrow_mut().start_client_offset = Some(offset);
        }
    }

    fn handle_top_move_capture(&self) {
        self.session.borrow_mut().candidate_target_ids.clear();
    }

    fn handle_move(&self, id: &str) {
        self.session
            .borrow_mut()
            .candidate_target_ids
            .insert(0, TargetId::from(id));
    }

    fn handle_top_move(&self, event: &GestureEvent) {
        self.cancel_pending_start();

        let Some(client_offset) = offset_from_gesture_event(event) else {
            log::trace!("[dnd-backend] move without a pointer offset ignored");
            return;
        };

        // Any movement away from the start position counts as a drag start
        if !self.monitor.is_dragging() {
            let promotion = {
                let mut session = self.session.borrow_mut();
                let start = match (session.start_client_offset, &session.candidate_source_ids) {
                    (Some(start), Some(ids)) if !ids.is_empty() && start != client_offset => {
                        Some(start)
                    }
                    _ => None,
                };
                start.and_then(|start| session.candidate_source_ids.take().map(|ids| (start, ids)))
            };

            if let Some((start, source_ids)) = promotion {
                log::debug!("[dnd-backend] begin drag of {:?} from {:?}", source_ids, start);
                self.actions.begin_drag(
                    source_ids,
                    BeginDragOptions {
                        client_offset: start,
                        get_source_client_offset: self.source_offset_fn(),
                        publish_source: false,
                    },
                );
            }
        }

        if !self.monitor.is_dragging() {
            return;
        }

        let source_node = self
            .monitor
            .source_id()
            .and_then(|id| self.registry.borrow().source_node(&id));
        self.watch.watch(source_node);
        self.actions.publish_drag_source();

        event.prevent_default();

        let target_ids = self.session.borrow().candidate_target_ids.clone();
        log::trace!("[dnd-backend] hover {:?} at {:?}", target_ids, client_offset);
        self.actions.hover(
            target_ids,
            HoverOptions {
                client_offset: Some(client_offset),
            },
        );
    }

    fn handle_top_move_end_capture(&self, event: &GestureEvent) {
        if !self.finish_drag(event) {
            return;
        }
        log::debug!("[dnd-backend] drop and end drag");
        DragActions::drop(self.actions.as_ref());
        self.actions.end_drag();
    }

    fn handle_top_move_cancel_capture(&self, event: &GestureEvent) {
        if !self.finish_drag(event) {
            return;
        }
        log::debug!("[dnd-backend] gesture cancelled, ending drag without a drop");
        self.actions.end_drag();
    }

    /// Shared release bookkeeping
    ///
    /// Returns `true` when a drag is live and still needs to be ended.
    fn finish_drag(&self, event: &GestureEvent) -> bool {
        if !self.monitor.is_dragging() || self.monitor.did_drop() {
            let pending = {
                let mut session = self.session.borrow_mut();
                session.candidate_source_ids = None;
                session.pending_start.take()
            };
            if let Some(handle) = pending {
                self.host.clear_timeout(handle);
            }
            return false;
        }

        event.prevent_default();

        self.session.borrow_mut().start_client_offset = None;
        self.watch.unwatch();
        true
    }

    fn cancel_pending_start(&self) {
        let pending = self.session.borrow_mut().pending_start.take();
        if let Some(handle) = pending {
            self.host.clear_timeout(handle);
            log::trace!("[dnd-backend] deferred start cancelled by movement");
        }
    }

    /// Whether `event` started on `node` or one of its descendants
    fn started_within(&self, node: NodeId, event: &GestureEvent) -> bool {
        match event.target() {
            Some(target) => target == node || self.host.contains(node, target),
            None => false,
        }
    }

    /// Hit test a drop target against the pointer of `event`
    fn is_over(&self, node: NodeId, event: &GestureEvent) -> bool {
        match offset_from_gesture_event(event) {
            Some(point) => self.host.hit_test(point, node),
            None => false,
        }
    }

    fn source_offset_fn(&self) -> SourceOffsetFn {
        let registry = Rc::downgrade(&self.registry);
        let host = self.host.clone();
        Rc::new(move |id: &str| {
            let registry = registry.upgrade()?;
            let node = registry.borrow().source_node(id);
            offset_from_node(host.as_ref(), node)
        })
    }

    /// Give up the slot and window handlers and drop all gesture state
    fn release_environment(&self) {
        if self.is_set_up.replace(false) {
            self.slot.release();
        }

        let installed: Vec<_> = self.window_listeners.borrow_mut().drain(..).collect();
        for (phase, id) in installed {
            self.listeners.remove_listener(Subject::Window, phase, id);
        }

        let pending = {
            let mut session = self.session.borrow_mut();
            std::mem::take(&mut *session).pending_start
        };
        if let Some(handle) = pending {
            self.host.clear_timeout(handle);
        }

        self.watch.unwatch();
    }
}

impl<H: DomHost + 'static> Drop for BackendInner<H> {
    fn drop(&mut self) {
        if self.is_set_up.get() {
            self.release_environment();
        }
    }
}

/// Wrap a backend method as a listener that holds the backend weakly
fn bind<H: DomHost + 'static>(
    weak: &Weak<BackendInner<H>>,
    handler: fn(&BackendInner<H>, &GestureEvent),
) -> impl Fn(&GestureEvent) + 'static {
    let weak = weak.clone();
    move |event| {
        if let Some(inner) = weak.upgrade() {
            handler(&inner, event);
        }
    }
}

/// Builds backends for managers handed in later
pub struct BackendFactory<H> {
    context: BackendContext<H>,
    options: BackendOptions,
}

impl<H: DomHost + 'static> BackendFactory<H> {
    /// Create a backend bound to `manager`
    pub fn create(&self, manager: &dyn DragDropManager) -> GestureBackend<H> {
        GestureBackend::new(manager, self.context.clone(), self.options.clone())
    }

    #[inline]
    pub fn options(&self) -> &BackendOptions {
        &self.options
    }
}

/// Factory that defers picking the manager
pub fn backend_factory<H: DomHost + 'static>(
    context: BackendContext<H>,
    options: BackendOptions,
) -> BackendFactory<H> {
    BackendFactory { context, options }
}
