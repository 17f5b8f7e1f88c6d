//! Contract with the drag-and-drop orchestration manager
//!
//! The manager is the single source of truth for whether a drag is in
//! progress. The backend only feeds it actions and reads its monitor.

use std::fmt;
use std::rc::Rc;

use zos_dnd_host::Vec2;

/// Drag source identifier assigned by the manager
pub type SourceId = String;

/// Drop target identifier assigned by the manager
pub type TargetId = String;

/// Resolves the current client offset of a source's node
pub type SourceOffsetFn = Rc<dyn Fn(&str) -> Option<Vec2>>;

/// Options passed along with [`DragActions::begin_drag`]
#[derive(Clone)]
pub struct BeginDragOptions {
    /// Pointer position when the gesture started
    pub client_offset: Vec2,
    /// Lookup for the node offset of any of the candidate sources
    pub get_source_client_offset: SourceOffsetFn,
    /// Whether the source should be published immediately
    pub publish_source: bool,
}

impl fmt::Debug for BeginDragOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeginDragOptions")
            .field("client_offset", &self.client_offset)
            .field("publish_source", &self.publish_source)
            .finish_non_exhaustive()
    }
}

/// Options passed along with [`DragActions::hover`]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HoverOptions {
    /// Current pointer position
    pub client_offset: Option<Vec2>,
}

/// Actions the backend dispatches into the manager
pub trait DragActions {
    /// Begin dragging one of `source_ids` (most recently notified first)
    fn begin_drag(&self, source_ids: Vec<SourceId>, options: BeginDragOptions);

    /// Reveal the dragged source now that movement has been observed
    fn publish_drag_source(&self);

    /// Pointer is over `target_ids` (most recently notified first)
    fn hover(&self, target_ids: Vec<TargetId>, options: HoverOptions);

    /// Drop on the currently hovered target
    fn drop(&self);

    /// Finish the drag
    fn end_drag(&self);
}

/// Read-only view of the manager's drag state
pub trait DragMonitor {
    fn is_dragging(&self) -> bool;

    fn did_drop(&self) -> bool;

    /// Source the manager picked when the drag began
    fn source_id(&self) -> Option<SourceId>;
}

/// Orchestration manager handed to backend constructors
pub trait DragDropManager {
    fn actions(&self) -> Rc<dyn DragActions>;

    fn monitor(&self) -> Rc<dyn DragMonitor>;
}
