//! Viewport state machine
//!
//! Owns zoom, scroll, DPI and the derived page-pixel size, and reconciles
//! them through a command/effect reducer: every mutation goes through
//! [`ViewportState::apply`], which re-establishes the invariants (clamped
//! scroll, bounded zoom, derived pixels) and reports what the shell has to
//! do next. Out-of-range requests are silently corrected, never errors.

use crate::engine::PageSizePts;
use crate::geometry::{ClientPoint, ViewParams};

use super::zoom;

/// Pixel size of the drawable region: the window client area minus
/// reserved chrome. Recomputed on resize and DPI changes, never persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContentGeometry {
    pub viewport_width: i32,
    pub viewport_height: i32,
}

impl ContentGeometry {
    #[must_use]
    pub const fn new(viewport_width: i32, viewport_height: i32) -> Self {
        Self {
            viewport_width,
            viewport_height,
        }
    }
}

/// Current viewport state for an open document.
#[derive(Clone, Debug)]
pub struct ViewportState {
    /// Current page (0-indexed).
    pub page_index: usize,
    /// Total page count.
    pub page_count: usize,
    /// Point size of the current page; pages may have heterogeneous sizes.
    pub page_size: PageSizePts,
    pub dpi_x: i32,
    pub dpi_y: i32,
    /// Zoom factor, held within [`zoom::MIN_FACTOR`, `zoom::MAX_FACTOR`].
    pub zoom: f64,
    pub scroll_x: i32,
    pub scroll_y: i32,
    /// Derived: `points * (dpi/72) * zoom`, rounded, at least 1.
    pub page_px_width: i32,
    pub page_px_height: i32,
    /// Offset of the document area within client space (sidebar chrome).
    pub content_origin_x: i32,
    pub content_origin_y: i32,
}

/// Commands that mutate viewport state.
#[derive(Clone, Copy, Debug)]
pub enum ViewportCmd {
    /// Set an absolute zoom factor, optionally keeping an anchor point
    /// (relative to the content origin) visually fixed.
    SetZoom {
        zoom: f64,
        anchor: Option<ClientPoint>,
    },
    /// Switch to a page. The caller resolves the page's point size first,
    /// so a failed size query never reaches the reducer.
    SetPage { index: usize, size: PageSizePts },
    ScrollBy { dx: i32, dy: i32 },
    ScrollTo { x: i32, y: i32 },
    Resize { width: i32, height: i32 },
    DpiChanged { dpi_x: i32, dpi_y: i32 },
    SetContentOrigin { x: i32, y: i32 },
}

/// Effects produced by state changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// The visible raster is stale.
    Repaint,
    /// Page/zoom status shown to the user changed.
    StatusChanged,
    /// Any active selection no longer refers to visible content.
    SelectionCleared,
}

impl ViewportState {
    /// State for a freshly opened document: first page, zoom 1.0, origin
    /// scroll.
    #[must_use]
    pub fn new(page_count: usize, first_page_size: PageSizePts, dpi_x: i32, dpi_y: i32) -> Self {
        let mut state = Self {
            page_index: 0,
            page_count,
            page_size: first_page_size,
            dpi_x,
            dpi_y,
            zoom: 1.0,
            scroll_x: 0,
            scroll_y: 0,
            page_px_width: 0,
            page_px_height: 0,
            content_origin_x: 0,
            content_origin_y: 0,
        };
        state.recalc_page_pixels();
        state
    }

    /// Apply a command and return resulting effects.
    #[must_use]
    pub fn apply(&mut self, geometry: &mut ContentGeometry, cmd: ViewportCmd) -> Vec<Effect> {
        match cmd {
            ViewportCmd::SetZoom { zoom: factor, anchor } => {
                let clamped = zoom::clamp_factor(factor);
                if (self.zoom - clamped).abs() < f64::EPSILON {
                    return vec![];
                }

                let old_zoom = self.zoom;
                let old_page_px = (self.page_px_width, self.page_px_height);
                let old_scroll = (self.scroll_x, self.scroll_y);

                self.zoom = clamped;
                self.recalc_page_pixels();

                if let Some(anchor) = anchor {
                    let (sx, sy) = zoom::anchored_scroll(
                        old_scroll,
                        anchor,
                        old_page_px,
                        (self.page_px_width, self.page_px_height),
                        old_zoom,
                        self.zoom,
                    );
                    self.scroll_x = sx;
                    self.scroll_y = sy;
                }
                self.clamp_scroll(geometry);
                vec![Effect::Repaint, Effect::StatusChanged]
            }

            ViewportCmd::SetPage { index, size } => {
                let clamped = index.min(self.page_count.saturating_sub(1));
                if clamped == self.page_index && size == self.page_size {
                    return vec![];
                }
                self.page_index = clamped;
                self.page_size = size;
                self.scroll_x = 0;
                self.scroll_y = 0;
                self.recalc_page_pixels();
                self.clamp_scroll(geometry);
                vec![Effect::SelectionCleared, Effect::Repaint, Effect::StatusChanged]
            }

            ViewportCmd::ScrollBy { dx, dy } => {
                self.scroll_to(geometry, self.scroll_x + dx, self.scroll_y + dy)
            }

            ViewportCmd::ScrollTo { x, y } => self.scroll_to(geometry, x, y),

            ViewportCmd::Resize { width, height } => {
                let next = ContentGeometry::new(width.max(0), height.max(0));
                if *geometry == next {
                    return vec![];
                }
                *geometry = next;
                self.clamp_scroll(geometry);
                vec![Effect::Repaint, Effect::StatusChanged]
            }

            ViewportCmd::DpiChanged { dpi_x, dpi_y } => {
                if dpi_x <= 0 || dpi_y <= 0 || (dpi_x, dpi_y) == (self.dpi_x, self.dpi_y) {
                    return vec![];
                }
                self.dpi_x = dpi_x;
                self.dpi_y = dpi_y;
                self.recalc_page_pixels();
                self.clamp_scroll(geometry);
                vec![Effect::Repaint, Effect::StatusChanged]
            }

            ViewportCmd::SetContentOrigin { x, y } => {
                let next = (x.max(0), y.max(0));
                if next == (self.content_origin_x, self.content_origin_y) {
                    return vec![];
                }
                self.content_origin_x = next.0;
                self.content_origin_y = next.1;
                vec![Effect::Repaint]
            }
        }
    }

    fn scroll_to(&mut self, geometry: &ContentGeometry, x: i32, y: i32) -> Vec<Effect> {
        let before = (self.scroll_x, self.scroll_y);
        self.scroll_x = x;
        self.scroll_y = y;
        self.clamp_scroll(geometry);
        if (self.scroll_x, self.scroll_y) == before {
            vec![]
        } else {
            vec![Effect::Repaint]
        }
    }

    /// Re-derive the page pixel size from point size, DPI and zoom.
    pub fn recalc_page_pixels(&mut self) {
        self.page_px_width =
            ((self.page_size.width / 72.0 * f64::from(self.dpi_x) * self.zoom).round() as i32).max(1);
        self.page_px_height =
            ((self.page_size.height / 72.0 * f64::from(self.dpi_y) * self.zoom).round() as i32)
                .max(1);
    }

    /// Enforce `0 <= scroll <= max(0, page_px - viewport)` per axis.
    ///
    /// Idempotent; called after every mutation that can move scroll out of
    /// range.
    pub fn clamp_scroll(&mut self, geometry: &ContentGeometry) {
        let max_x = (self.page_px_width - geometry.viewport_width).max(0);
        let max_y = (self.page_px_height - geometry.viewport_height).max(0);
        self.scroll_x = self.scroll_x.clamp(0, max_x);
        self.scroll_y = self.scroll_y.clamp(0, max_y);
    }

    /// Snapshot of the presentation parameters for coordinate conversion.
    #[must_use]
    pub fn view_params(&self) -> ViewParams {
        ViewParams {
            zoom: self.zoom,
            dpi_x: self.dpi_x,
            dpi_y: self.dpi_y,
            scroll_x: self.scroll_x,
            scroll_y: self.scroll_y,
            origin_x: self.content_origin_x,
            origin_y: self.content_origin_y,
        }
    }
}
