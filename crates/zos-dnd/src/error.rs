//! Error types for the drag-and-drop backend

/// Errors surfaced by backend setup and configuration.
///
/// Gesture noise (missing offsets, overlapping nodes, rapid taps) is never an
/// error; it is absorbed by the state machine.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Another backend already holds the setup slot.
    #[error("cannot have two gesture backends set up at the same time")]
    AlreadySetUp,

    /// Backend options could not be parsed.
    #[error("invalid backend options: {0}")]
    InvalidOptions(String),
}
