//! Setup slot and the shared environment handed to backends

use std::cell::Cell;
use std::rc::Rc;

use crate::error::BackendError;
use crate::listeners::GestureListeners;

/// Exclusive "a backend is set up" flag
///
/// Whoever creates backends owns one slot and hands clones of it to every
/// backend it builds; at most one of them can be set up at a time.
#[derive(Clone, Debug, Default)]
pub struct BackendSlot {
    active: Rc<Cell<bool>>,
}

impl BackendSlot {
    /// Create a free slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot
    pub fn try_acquire(&self) -> Result<(), BackendError> {
        if self.active.get() {
            return Err(BackendError::AlreadySetUp);
        }
        self.active.set(true);
        Ok(())
    }

    /// Free the slot
    pub fn release(&self) {
        self.active.set(false);
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

/// Environment shared by every backend built from it
///
/// Bundles the host, the gesture listener table and the setup slot so
/// they are injected together rather than living in globals.
pub struct BackendContext<H> {
    pub host: Rc<H>,
    pub listeners: Rc<GestureListeners>,
    pub slot: BackendSlot,
}

impl<H> BackendContext<H> {
    /// Create a context with a fresh listener table and slot
    pub fn new(host: Rc<H>) -> Self {
        Self {
            host,
            listeners: Rc::new(GestureListeners::new()),
            slot: BackendSlot::new(),
        }
    }
}

impl<H> Clone for BackendContext<H> {
    fn clone(&self) -> Self {
        Self {
            host: self.host.clone(),
            listeners: self.listeners.clone(),
            slot: self.slot.clone(),
        }
    }
}
