//! Source and preview node registry

use std::collections::HashMap;

use zos_dnd_host::NodeId;

use crate::manager::SourceId;

/// Options attached to a drag preview node
///
/// Kept exactly as the caller passed them (unknown keys and value types
/// included). The backend never reads them; interpreting them is up to
/// whoever renders the preview.
pub type DragPreviewOptions = serde_json::Value;

#[derive(Clone, Debug)]
struct PreviewRecord {
    node: NodeId,
    options: DragPreviewOptions,
}

/// Nodes currently connected as drag sources and drag previews
///
/// Each id maps to at most one node; connecting an id again replaces the
/// previous node.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    sources: HashMap<SourceId, NodeId>,
    previews: HashMap<SourceId, PreviewRecord>,
}

impl NodeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node` as the drag source for `id`, returning the node it replaced
    pub fn set_source(&mut self, id: &str, node: NodeId) -> Option<NodeId> {
        self.sources.insert(SourceId::from(id), node)
    }

    /// Unregister the source for `id` if it is still `node`
    ///
    /// A stale disconnect for a node that has since been replaced leaves the
    /// newer registration alone.
    pub fn remove_source(&mut self, id: &str, node: NodeId) -> bool {
        if self.sources.get(id) == Some(&node) {
            self.sources.remove(id);
            true
        } else {
            false
        }
    }

    /// Node connected as the drag source for `id`
    pub fn source_node(&self, id: &str) -> Option<NodeId> {
        self.sources.get(id).copied()
    }

    /// Number of connected sources
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Register a preview node and its options for `id`
    pub fn set_preview(&mut self, id: &str, node: NodeId, options: DragPreviewOptions) {
        self.previews
            .insert(SourceId::from(id), PreviewRecord { node, options });
    }

    /// Unregister the preview for `id` if it is still `node`
    pub fn remove_preview(&mut self, id: &str, node: NodeId) -> bool {
        match self.previews.get(id) {
            Some(record) if record.node == node => {
                self.previews.remove(id);
                true
            }
            _ => false,
        }
    }

    /// Node connected as the drag preview for `id`
    pub fn preview_node(&self, id: &str) -> Option<NodeId> {
        self.previews.get(id).map(|r| r.node)
    }

    /// Options stored with the drag preview for `id`
    pub fn preview_options(&self, id: &str) -> Option<&DragPreviewOptions> {
        self.previews.get(id).map(|r| &r.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_last_writer_wins() {
        let mut registry = NodeRegistry::new();

        assert_eq!(registry.set_source("s1", NodeId(1)), None);
        assert_eq!(registry.set_source("s1", NodeId(2)), Some(NodeId(1)));
        assert_eq!(registry.source_node("s1"), Some(NodeId(2)));
        assert_eq!(registry.source_count(), 1);
    }

    #[test]
    fn test_stale_remove_keeps_newer_source() {
        let mut registry = NodeRegistry::new();
        registry.set_source("s1", NodeId(1));
        registry.set_source("s1", NodeId(2));

        assert!(!registry.remove_source("s1", NodeId(1)));
        assert_eq!(registry.source_node("s1"), Some(NodeId(2)));

        assert!(registry.remove_source("s1", NodeId(2)));
        assert_eq!(registry.source_node("s1"), None);
    }

    #[test]
    fn test_preview_kept_separately() {
        let mut registry = NodeRegistry::new();
        let options = serde_json::json!({ "captureDraggingState": true });

        registry.set_source("s1", NodeId(1));
        registry.set_preview("s1", NodeId(9), options.clone());

        assert_eq!(registry.source_node("s1"), Some(NodeId(1)));
        assert_eq!(registry.preview_node("s1"), Some(NodeId(9)));
        assert_eq!(registry.preview_options("s1"), Some(&options));

        assert!(registry.remove_preview("s1", NodeId(9)));
        assert_eq!(registry.preview_node("s1"), None);
        assert_eq!(registry.preview_options("s1"), None);
        assert_eq!(registry.source_node("s1"), Some(NodeId(1)));
    }

    #[test]
    fn test_preview_options_stored_verbatim() {
        let mut registry = NodeRegistry::new();
        let options: DragPreviewOptions =
            serde_json::from_str(r#"{"anchorX":"left","offsetX":5,"offsetY":7}"#).unwrap();

        registry.set_preview("s1", NodeId(3), options);

        let stored = registry.preview_options("s1").unwrap();
        assert_eq!(stored["anchorX"], "left");
        assert_eq!(stored["offsetX"], 5);
        assert_eq!(stored["offsetY"], 7);
    }
}
