//! Rectangular text-selection state
//!
//! Tracks a drag rectangle in client space: Idle -> Dragging on pointer
//! down, end point follows pointer moves, and pointer up either finalizes
//! the rectangle or degrades to a click when the pointer barely moved.
//! The extracted text is owned here until the selection is cleared.

use crate::geometry::{ClientPoint, ClientRect};

/// Selection drag state and the text extracted on completion.
#[derive(Clone, Debug, Default)]
pub struct SelectionRegion {
    /// Start point of the drag (client space).
    start: Option<ClientPoint>,
    /// Current end point of the drag.
    end: Option<ClientPoint>,
    /// Whether a drag is in progress.
    dragging: bool,
    /// Text extracted for the finalized rectangle; `Some("")` is a valid
    /// active selection with no text under it.
    text: Option<String>,
}

impl SelectionRegion {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a drag at a point. Discards any previous selection.
    pub fn start_at(&mut self, point: ClientPoint) {
        self.start = Some(point);
        self.end = Some(point);
        self.dragging = true;
        self.text = None;
    }

    /// Update the end point while dragging. Returns true when the point
    /// changed and a repaint is warranted.
    pub fn update_end(&mut self, point: ClientPoint) -> bool {
        if !self.dragging {
            return false;
        }
        if self.end == Some(point) {
            return false;
        }
        self.end = Some(point);
        true
    }

    /// End the drag, keeping the rectangle for finalization.
    pub fn finish(&mut self) {
        self.dragging = false;
    }

    /// Abort the drag (capture lost, page navigated away).
    pub fn cancel(&mut self) {
        self.clear();
    }

    /// Drop the selection entirely.
    pub fn clear(&mut self) {
        self.start = None;
        self.end = None;
        self.dragging = false;
        self.text = None;
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Whether a finalized selection is active (text may be empty).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.text.is_some()
    }

    pub fn set_text(&mut self, text: String) {
        self.text = Some(text);
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Normalized drag rectangle, while one exists.
    #[must_use]
    pub fn client_rect(&self) -> Option<ClientRect> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(ClientRect::from_corners(start, end)),
            _ => None,
        }
    }

    /// Drag-vs-click disambiguation by movement distance (never by time):
    /// true when the pointer travelled beyond `threshold` on either axis.
    #[must_use]
    pub fn moved_beyond(&self, threshold: i32) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => {
                (end.x - start.x).abs() > threshold || (end.y - start.y).abs() > threshold
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_lifecycle() {
        let mut sel = SelectionRegion::new();
        assert!(!sel.is_dragging());

        sel.start_at(ClientPoint::new(10, 10));
        assert!(sel.is_dragging());
        assert!(!sel.is_active());

        assert!(sel.update_end(ClientPoint::new(40, 30)));
        sel.finish();
        assert!(!sel.is_dragging());

        sel.set_text("lorem".into());
        assert!(sel.is_active());
        assert_eq!(sel.text(), Some("lorem"));
    }

    #[test]
    fn update_ignored_when_not_dragging() {
        let mut sel = SelectionRegion::new();
        assert!(!sel.update_end(ClientPoint::new(5, 5)));
        assert!(sel.client_rect().is_none());
    }

    #[test]
    fn rect_is_normalized_regardless_of_drag_direction() {
        let mut sel = SelectionRegion::new();
        sel.start_at(ClientPoint::new(100, 80));
        sel.update_end(ClientPoint::new(20, 160));
        assert_eq!(sel.client_rect(), Some(ClientRect::new(20, 80, 100, 160)));
    }

    #[test]
    fn movement_threshold_separates_click_from_drag() {
        let mut sel = SelectionRegion::new();
        sel.start_at(ClientPoint::new(50, 50));
        assert!(!sel.moved_beyond(2));

        sel.update_end(ClientPoint::new(55, 50));
        assert!(sel.moved_beyond(2));
    }

    #[test]
    fn empty_extraction_still_counts_as_active() {
        let mut sel = SelectionRegion::new();
        sel.start_at(ClientPoint::new(0, 0));
        sel.update_end(ClientPoint::new(10, 10));
        sel.finish();
        sel.set_text(String::new());
        assert!(sel.is_active());
        assert_eq!(sel.text(), Some(""));
    }

    #[test]
    fn cancel_discards_everything() {
        let mut sel = SelectionRegion::new();
        sel.start_at(ClientPoint::new(0, 0));
        sel.update_end(ClientPoint::new(10, 10));
        sel.cancel();
        assert!(!sel.is_dragging());
        assert!(!sel.is_active());
        assert!(sel.client_rect().is_none());
    }
}
