//! Hit-testing against page content
//!
//! Resolves a page-space point to the image object under it, traversing
//! the page-object tree with accumulated transforms. Link hit-testing is a
//! straight engine query and lives in the viewer facade; image picking is
//! pure geometry and implemented (and tested) here.

use crate::engine::{PageObject, PageObjectKind};
use crate::geometry::{PagePoint, PageRect, Transform};

/// Recursion cap for form/group nesting. Document structure bounds the
/// depth in practice; this guards malformed files.
pub const MAX_TRAVERSAL_DEPTH: usize = 32;

/// Result of a combined hit-test query. Transient, produced per query.
#[derive(Clone, Debug)]
pub enum HitTest<I> {
    /// Nothing actionable at the point.
    None,
    /// A navigable link; 0-based destination page.
    Link { page: usize },
    /// An image object, exportable via the engine handle.
    Image {
        handle: I,
        pixel_width: u32,
        pixel_height: u32,
    },
}

impl<I> HitTest<I> {
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// An image candidate with its bounds resolved to page space.
#[derive(Clone, Debug)]
pub struct ImageHit<I> {
    pub handle: I,
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Axis-aligned page-space bounds after transform accumulation.
    pub bounds: PageRect,
}

/// Convert a pixel tolerance into page units under the current view.
#[must_use]
pub fn tolerance_in_points(tolerance_px: f64, dpi_x: i32, dpi_y: i32, zoom: f64) -> f64 {
    let dpi = f64::from(dpi_x + dpi_y) / 2.0;
    tolerance_px * 72.0 / dpi / zoom
}

/// Find the image under a page-space point.
///
/// Candidates are gathered in draw order, bounds inflated by
/// `tolerance_pts` so fine clicks are forgiving. With `topmost_wins` the
/// last matching candidate (the visually frontmost) is returned, otherwise
/// the first in draw order.
#[must_use]
pub fn image_at_point<I: Clone>(
    objects: &[PageObject<I>],
    point: PagePoint,
    tolerance_pts: f64,
    topmost_wins: bool,
) -> Option<ImageHit<I>> {
    let mut candidates = Vec::new();
    collect_images(objects, &Transform::IDENTITY, 0, &mut candidates);

    let mut matches = candidates
        .into_iter()
        .filter(|hit| hit.bounds.inflated(tolerance_pts).contains(point));

    if topmost_wins { matches.last() } else { matches.next() }
}

fn collect_images<I: Clone>(
    objects: &[PageObject<I>],
    parent: &Transform,
    depth: usize,
    out: &mut Vec<ImageHit<I>>,
) {
    if depth > MAX_TRAVERSAL_DEPTH {
        return;
    }
    for object in objects {
        // Child coordinates map through the local matrix first, then the
        // parent's.
        let matrix = parent.multiply(&object.local_matrix);
        match &object.kind {
            PageObjectKind::Image {
                handle,
                pixel_width,
                pixel_height,
            } => {
                out.push(ImageHit {
                    handle: handle.clone(),
                    pixel_width: *pixel_width,
                    pixel_height: *pixel_height,
                    bounds: matrix.apply_rect(&object.bounds),
                });
            }
            PageObjectKind::Form { children } => {
                collect_images(children, &matrix, depth + 1, out);
            }
            PageObjectKind::Text | PageObjectKind::Path | PageObjectKind::Shading => {}
        }
    }
}
