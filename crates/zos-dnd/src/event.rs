//! Gesture events as delivered by the recognizer

use std::cell::Cell;

use zos_dnd_host::{NodeId, Vec2};

/// Phase of a continuous pan gesture
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GesturePhase {
    /// Pointer went down and the recognizer started a pan (`panstart`)
    Start,
    /// Pointer moved during the pan (`pan`)
    Move,
    /// Pointer was released (`panend`)
    End,
    /// The platform took the pointer away mid-gesture (`pancancel`)
    Cancel,
}

impl GesturePhase {
    /// All phases, in gesture order
    pub const ALL: [GesturePhase; 4] = [
        GesturePhase::Start,
        GesturePhase::Move,
        GesturePhase::End,
        GesturePhase::Cancel,
    ];

    /// Recognizer event name for this phase
    pub fn event_name(self) -> &'static str {
        match self {
            GesturePhase::Start => "panstart",
            GesturePhase::Move => "pan",
            GesturePhase::End => "panend",
            GesturePhase::Cancel => "pancancel",
        }
    }

    /// Parse a recognizer event name
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name {
            "panstart" => Some(GesturePhase::Start),
            "pan" | "panmove" => Some(GesturePhase::Move),
            "panend" => Some(GesturePhase::End),
            "pancancel" => Some(GesturePhase::Cancel),
            _ => None,
        }
    }
}

/// Input modality that produced a gesture
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PointerKind {
    #[default]
    Mouse,
    Touch,
    Pen,
}

impl PointerKind {
    /// Parse a `pointerType` string; anything unknown is treated as a mouse
    pub fn from_pointer_type(kind: &str) -> Self {
        match kind {
            "touch" => PointerKind::Touch,
            "pen" => PointerKind::Pen,
            _ => PointerKind::Mouse,
        }
    }
}

/// One gesture notification
///
/// Handlers receive the event by shared reference; [`GestureEvent::prevent_default`]
/// only records the request; the host glue is responsible for suppressing the
/// native default action once dispatch returns.
#[derive(Debug)]
pub struct GestureEvent {
    phase: GesturePhase,
    pointer: PointerKind,
    center: Option<Vec2>,
    target: Option<NodeId>,
    default_prevented: Cell<bool>,
}

impl GestureEvent {
    /// Create a new event
    pub fn new(phase: GesturePhase, pointer: PointerKind, center: Option<Vec2>) -> Self {
        Self {
            phase,
            pointer,
            center,
            target: None,
            default_prevented: Cell::new(false),
        }
    }

    /// Mouse `panstart` at a point
    pub fn start(x: f64, y: f64) -> Self {
        Self::new(GesturePhase::Start, PointerKind::Mouse, Some(Vec2::new(x, y)))
    }

    /// Mouse `pan` at a point
    pub fn moved(x: f64, y: f64) -> Self {
        Self::new(GesturePhase::Move, PointerKind::Mouse, Some(Vec2::new(x, y)))
    }

    /// Mouse `panend` at a point
    pub fn end(x: f64, y: f64) -> Self {
        Self::new(GesturePhase::End, PointerKind::Mouse, Some(Vec2::new(x, y)))
    }

    /// Same event, produced by a different modality
    pub fn with_pointer(mut self, pointer: PointerKind) -> Self {
        self.pointer = pointer;
        self
    }

    /// Same event, aimed at the node the gesture started on
    pub fn with_target(mut self, target: NodeId) -> Self {
        self.target = Some(target);
        self
    }

    #[inline]
    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    #[inline]
    pub fn pointer(&self) -> PointerKind {
        self.pointer
    }

    /// Center of the pointers involved, in client coordinates
    #[inline]
    pub fn center(&self) -> Option<Vec2> {
        self.center
    }

    /// Node the gesture started on, if the host reported one
    #[inline]
    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    /// Ask the host to suppress the native default action (scrolling, selection)
    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    #[inline]
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}
