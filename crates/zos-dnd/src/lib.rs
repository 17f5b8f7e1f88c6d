//! Gesture Drag-and-Drop Backend for Zero OS
//!
//! Bridges a pan-gesture recognizer (panstart / pan / panend / pancancel) to a
//! drag-and-drop orchestration manager. Touch, mouse and pen input all arrive
//! as the same gesture stream and are turned into the manager's
//! begin / hover / drop / end lifecycle.
//!
//! ## Architecture
//!
//! - [`backend`]: Reconciliation state machine (`GestureBackend`)
//! - [`listeners`]: Subject-keyed gesture handler table with capture/bubble dispatch
//! - [`registry`]: Source and preview node registry
//! - [`liveness`]: Keeps the dragged node attached while a drag is active
//! - [`manager`]: Traits the orchestration manager implements
//! - [`event`]: Gesture events and phases
//! - [`offset`]: Client offset helpers
//! - [`options`]: Backend configuration
//!
//! The document itself is reached through [`zos_dnd_host::DomHost`], so the
//! whole machine runs against `zos-dnd-host-mock` in tests and against the
//! browser DOM with the `wasm` feature.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use zos_dnd::{BackendContext, BackendOptions, GestureBackend};
//!
//! let context = BackendContext::new(Rc::new(host));
//! let backend = GestureBackend::new(&manager, context.clone(), BackendOptions::default());
//! backend.setup()?;
//!
//! let connection = backend.connect_drag_source("source-1", node);
//! // ...
//! connection.disconnect();
//! backend.teardown();
//! ```
//!
//! ## Design Principles
//!
//! 1. **Pure Rust Core**: All drag state is pure Rust, testable without a browser
//! 2. **Injected Environment**: Host, listener table and setup slot come in through `BackendContext`
//! 3. **Manager Owns Truth**: Drag status is always read back from the manager's monitor

pub mod backend;
pub mod connection;
pub mod error;
pub mod event;
pub mod listeners;
pub mod liveness;
pub mod manager;
pub mod offset;
pub mod options;
pub mod registry;
pub mod slot;

// WASM exports (only available with "wasm" feature)
#[cfg(feature = "wasm")]
mod wasm;
#[cfg(feature = "wasm")]
pub use wasm::*;

pub use backend::{backend_factory, BackendFactory, DragPhase, GestureBackend};
pub use connection::Disconnect;
pub use error::BackendError;
pub use event::{GestureEvent, GesturePhase, PointerKind};
pub use listeners::{GestureHandler, GestureListeners, ListenerId, Subject};
pub use liveness::SourceNodeWatch;
pub use manager::{
    BeginDragOptions, DragActions, DragDropManager, DragMonitor, HoverOptions, SourceId,
    SourceOffsetFn, TargetId,
};
pub use offset::{offset_from_gesture_event, offset_from_node};
pub use options::{BackendOptions, DEFAULT_FRAMEWORK_ID_ATTRIBUTE};
pub use registry::{DragPreviewOptions, NodeRegistry};
pub use slot::{BackendContext, BackendSlot};

pub use zos_dnd_host::{DomHost, HostError, NodeId, Rect, Vec2};
