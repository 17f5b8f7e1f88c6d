//! Client offset resolution

use zos_dnd_host::{DomHost, NodeId, Vec2};

use crate::event::GestureEvent;

/// Pointer position reported by the recognizer
#[inline]
pub fn offset_from_gesture_event(event: &GestureEvent) -> Option<Vec2> {
    event.center()
}

/// Top-left corner of a node's bounding box in client coordinates
///
/// Non-element nodes (text, comments) resolve through their parent element.
/// Returns `None` when there is no node, no such element, or the host has no
/// geometry for it.
pub fn offset_from_node<H: DomHost + ?Sized>(host: &H, node: Option<NodeId>) -> Option<Vec2> {
    let node = node?;
    let element = if host.is_element(node) {
        node
    } else {
        host.parent_element(node)?
    };

    host.bounding_client_rect(element).map(|rect| rect.top_left())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{GesturePhase, PointerKind};
    use zos_dnd_host::Rect;
    use zos_dnd_host_mock::MockDom;

    #[test]
    fn test_offset_from_event_center() {
        let event = GestureEvent::start(3.0, 4.0);
        assert_eq!(offset_from_gesture_event(&event), Some(Vec2::new(3.0, 4.0)));

        let malformed = GestureEvent::new(GesturePhase::Move, PointerKind::Mouse, None);
        assert_eq!(offset_from_gesture_event(&malformed), None);
    }

    #[test]
    fn test_offset_from_element() {
        let dom = MockDom::new();
        let node = dom.create_element(dom.body_id(), Rect::new(15.0, 25.0, 40.0, 40.0));

        assert_eq!(offset_from_node(&dom, Some(node)), Some(Vec2::new(15.0, 25.0)));
    }

    #[test]
    fn test_offset_from_text_uses_parent_element() {
        let dom = MockDom::new();
        let parent = dom.create_element(dom.body_id(), Rect::new(7.0, 9.0, 40.0, 40.0));
        let text = dom.create_text(parent);

        assert_eq!(offset_from_node(&dom, Some(text)), Some(Vec2::new(7.0, 9.0)));
    }

    #[test]
    fn test_offset_from_missing_node() {
        let dom = MockDom::new();
        assert_eq!(offset_from_node(&dom, None), None);
        assert_eq!(offset_from_node(&dom, Some(NodeId(404))), None);

        let parent = dom.create_element(dom.body_id(), Rect::new(0.0, 0.0, 10.0, 10.0));
        let orphan_text = dom.create_text(parent);
        dom.remove(orphan_text);
        assert_eq!(offset_from_node(&dom, Some(orphan_text)), None);
    }
}
