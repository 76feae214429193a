//! Zoom bounds and anchor-preserving scroll math
//!
//! A zoom change with an anchor keeps one chosen screen point visually
//! fixed on the same document location: the content-space point under the
//! anchor is scaled by the page-pixel growth and the scroll offset is
//! moved so that point reappears under the anchor.

use crate::geometry::ClientPoint;

/// Minimum allowed zoom factor.
pub const MIN_FACTOR: f64 = 0.1;
/// Maximum allowed zoom factor.
pub const MAX_FACTOR: f64 = 8.0;

/// Wheel-step zoom-in multiplier.
pub const WHEEL_STEP_IN: f64 = 1.1;
/// Wheel-step zoom-out multiplier.
pub const WHEEL_STEP_OUT: f64 = 0.9;

/// Clamp a requested factor into the valid range, mapping NaN/Inf to 1.0.
#[must_use]
pub fn clamp_factor(factor: f64) -> f64 {
    if factor.is_finite() {
        factor.clamp(MIN_FACTOR, MAX_FACTOR)
    } else {
        1.0
    }
}

/// New scroll offset that keeps `anchor` over the same content point.
///
/// `anchor` is measured relative to the content origin. The scale ratio is
/// derived from the realized page-pixel sizes so rounding in the pixel
/// derivation cannot make the anchor drift; the zoom ratio is only a
/// fallback for a zero-sized page.
#[must_use]
pub fn anchored_scroll(
    old_scroll: (i32, i32),
    anchor: ClientPoint,
    old_page_px: (i32, i32),
    new_page_px: (i32, i32),
    old_zoom: f64,
    new_zoom: f64,
) -> (i32, i32) {
    let scale_x = if old_page_px.0 > 0 {
        f64::from(new_page_px.0) / f64::from(old_page_px.0)
    } else {
        new_zoom / old_zoom
    };
    let scale_y = if old_page_px.1 > 0 {
        f64::from(new_page_px.1) / f64::from(old_page_px.1)
    } else {
        new_zoom / old_zoom
    };

    let content_x = f64::from(old_scroll.0 + anchor.x);
    let content_y = f64::from(old_scroll.1 + anchor.y);
    (
        (content_x * scale_x - f64::from(anchor.x)).round() as i32,
        (content_y * scale_y - f64::from(anchor.y)).round() as i32,
    )
}
