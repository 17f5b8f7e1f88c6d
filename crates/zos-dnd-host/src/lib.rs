//! Document host abstraction for the Zero OS drag-and-drop backend
//!
//! This crate defines the [`DomHost`] trait that lets the gesture backend run
//! against different document environments by abstracting the handful of
//! operations it needs from them.
//!
//! # Host Implementations
//!
//! - **Browser**: `web-sys` elements, `setTimeout`, `MutationObserver`
//!   (see the `wasm` feature of `zos-dnd`)
//! - **Mock**: in-memory node tree with a manual clock (`zos-dnd-host-mock`)
//!
//! Nodes are referred to by opaque [`NodeId`] handles. A host is free to intern
//! its native node objects however it likes, as long as the same node always
//! maps to the same id for the lifetime of the host.

mod geometry;

pub use geometry::{Rect, Vec2};

/// Opaque handle to a document node
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

/// Handle to a pending host timer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

/// Handle to an active child-list observer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverHandle(pub u64);

/// Deferred callback run once by the host when a timer elapses
pub type TimerCallback = Box<dyn FnOnce()>;

/// Callback run by the host after the child list of an observed node changed
pub type MutationCallback = Box<dyn FnMut()>;

/// Document host trait
///
/// Implementations provide environment-specific functionality for:
/// - Environment presence (is there a window/document at all)
/// - Geometry and hit testing
/// - The few structural mutations needed to keep a dragged node alive
/// - Cancellable timers
/// - Child-list observation
///
/// All methods take `&self`; hosts are single-threaded and use interior
/// mutability. A host must never invoke a timer or mutation callback while
/// it is itself inside one of these methods, so callbacks are free to call
/// back into the host.
pub trait DomHost {
    // === Environment ===

    /// Whether a window/document environment is available
    ///
    /// When this returns `false` the backend's setup and teardown are no-ops.
    fn has_window(&self) -> bool;

    /// The document body, if the document has one
    fn body(&self) -> Option<NodeId>;

    // === Tree & Geometry ===

    /// Whether the node is an element (as opposed to text, comment, ...)
    fn is_element(&self, node: NodeId) -> bool;

    /// Parent element of the node, `None` when detached or at the root
    fn parent_element(&self, node: NodeId) -> Option<NodeId>;

    /// Inclusive descendant check, like `Node.contains()`
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool;

    /// Bounding box of an element in client coordinates
    fn bounding_client_rect(&self, element: NodeId) -> Option<Rect>;

    /// Topmost element at the given client point, like `elementFromPoint()`
    fn element_from_point(&self, point: Vec2) -> Option<NodeId>;

    /// Whether the topmost element at `point` is `node` or lies inside it
    ///
    /// Runs on every pointer move for every drop target. Hosts that hand out
    /// ids lazily should override this so the hit element does not have to
    /// cross into an id first.
    fn hit_test(&self, point: Vec2, node: NodeId) -> bool {
        match self.element_from_point(point) {
            Some(hit) => hit == node || self.contains(node, hit),
            None => false,
        }
    }

    // === Mutation ===

    /// Append `child` to `parent`, detaching it from its current parent first
    fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), HostError>;

    /// Suppress rendering of an element (`style.display = "none"`)
    fn hide(&self, element: NodeId) -> Result<(), HostError>;

    /// Remove an attribute from an element; removing a missing attribute is not an error
    fn remove_attribute(&self, element: NodeId, name: &str) -> Result<(), HostError>;

    // === Scheduling ===

    /// Run `callback` once after `delay_ms` milliseconds
    fn set_timeout(&self, delay_ms: u32, callback: TimerCallback) -> TimerHandle;

    /// Cancel a pending timer; unknown or already-fired handles are ignored
    fn clear_timeout(&self, handle: TimerHandle);

    // === Observation ===

    /// Start observing child-list changes of `target`
    ///
    /// # Returns
    /// * `Ok(ObserverHandle)` - Observer installed
    /// * `Err(HostError::NodeNotFound)` - The target is unknown to this host
    /// * `Err(HostError::NotSupported)` - The environment cannot observe mutations
    fn observe_child_list(
        &self,
        target: NodeId,
        callback: MutationCallback,
    ) -> Result<ObserverHandle, HostError>;

    /// Stop an observer; unknown handles are ignored
    fn disconnect_observer(&self, handle: ObserverHandle);
}

/// Host errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostError {
    /// Node is unknown to the host
    NodeNotFound,
    /// Node is not an element where an element was required
    NotAnElement,
    /// Operation not supported in this environment
    NotSupported,
}

impl core::fmt::Display for HostError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HostError::NodeNotFound => f.write_str("node not found"),
            HostError::NotAnElement => f.write_str("node is not an element"),
            HostError::NotSupported => f.write_str("operation not supported"),
        }
    }
}
