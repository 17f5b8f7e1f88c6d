//! Backend configuration

use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::event::PointerKind;

/// Identity attribute the component layer stamps on rendered nodes
pub const DEFAULT_FRAMEWORK_ID_ATTRIBUTE: &str = "data-reactid";

/// Options accepted at backend construction
///
/// Parsed from the same camelCase object the page passes in, e.g.
/// `{"delayTouchStart": 200}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackendOptions {
    /// Hold time in ms before a touch press may turn into a drag
    pub delay_touch_start: Option<u32>,
    /// Hold time in ms before a mouse press may turn into a drag
    pub delay_mouse_start: Option<u32>,
    /// Legacy option; accepted but not consulted by the start delay
    pub delay_drag_start: u32,
    /// Attribute stripped from a dragged node when it is relocated
    pub framework_id_attribute: String,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            delay_touch_start: None,
            delay_mouse_start: None,
            delay_drag_start: 0,
            framework_id_attribute: String::from(DEFAULT_FRAMEWORK_ID_ATTRIBUTE),
        }
    }
}

impl BackendOptions {
    /// Parse options from JSON
    pub fn from_json(json: &str) -> Result<Self, BackendError> {
        serde_json::from_str(json).map_err(|e| BackendError::InvalidOptions(e.to_string()))
    }

    /// Whether gesture starts go through the delayed path at all
    pub fn has_start_delay(&self) -> bool {
        self.delay_touch_start.unwrap_or(0) > 0 || self.delay_mouse_start.unwrap_or(0) > 0
    }

    /// Start delay for the given input modality, in milliseconds
    pub fn start_delay_for(&self, pointer: PointerKind) -> u32 {
        match pointer {
            PointerKind::Touch => self.delay_touch_start.unwrap_or(0),
            PointerKind::Mouse | PointerKind::Pen => self.delay_mouse_start.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = BackendOptions::default();
        assert!(!options.has_start_delay());
        assert_eq!(options.delay_drag_start, 0);
        assert_eq!(options.framework_id_attribute, "data-reactid");
    }

    #[test]
    fn test_from_json_partial() {
        let options = BackendOptions::from_json(r#"{"delayTouchStart":200}"#).unwrap();
        assert_eq!(options.delay_touch_start, Some(200));
        assert_eq!(options.delay_mouse_start, None);
        assert!(options.has_start_delay());
        assert_eq!(options.start_delay_for(PointerKind::Touch), 200);
        assert_eq!(options.start_delay_for(PointerKind::Mouse), 0);
        assert_eq!(options.start_delay_for(PointerKind::Pen), 0);
    }

    #[test]
    fn test_delay_drag_start_does_not_enable_delay() {
        let options = BackendOptions::from_json(r#"{"delayDragStart":500}"#).unwrap();
        assert_eq!(options.delay_drag_start, 500);
        assert!(!options.has_start_delay());
    }

    #[test]
    fn test_zero_delays_are_immediate() {
        let options =
            BackendOptions::from_json(r#"{"delayTouchStart":0,"delayMouseStart":0}"#).unwrap();
        assert!(!options.has_start_delay());
    }

    #[test]
    fn test_from_json_invalid() {
        let err = BackendOptions::from_json(r#"{"delayTouchStart":"soon"}"#).unwrap_err();
        assert!(matches!(err, BackendError::InvalidOptions(_)));
    }
}
