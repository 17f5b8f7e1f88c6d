//! Disconnect handles returned by the connect operations

use std::cell::RefCell;
use std::fmt;

/// Undoes one `connect_*` call
///
/// Calling [`Disconnect::disconnect`] more than once is a no-op. Dropping the
/// handle does *not* disconnect; a connection lives until it is explicitly
/// undone, matching how the component layer calls back on unmount.
pub struct Disconnect {
    action: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Disconnect {
    pub(crate) fn new(action: impl FnOnce() + 'static) -> Self {
        Self {
            action: RefCell::new(Some(Box::new(action))),
        }
    }

    /// A handle with nothing to undo
    pub fn noop() -> Self {
        Self {
            action: RefCell::new(None),
        }
    }

    /// Undo the connection
    pub fn disconnect(&self) {
        // Take first so the action may freely re-enter the backend
        let action = self.action.borrow_mut().take();
        if let Some(action) = action {
            action();
        }
    }

    /// Whether the connection is still in place
    pub fn is_connected(&self) -> bool {
        self.action.borrow().is_some()
    }
}

impl fmt::Debug for Disconnect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disconnect")
            .field("connected", &self.is_connected())
            .finish()
    }
}
