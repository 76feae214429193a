//! Render scheduling for the visible region
//!
//! Asks the engine to paint only the part of the page the viewport shows:
//! the raster starts at (-scroll_x, -scroll_y) into a viewport-sized
//! buffer, so memory stays proportional to the viewport regardless of zoom
//! or page size. Timing and buffer-size deltas are sampled around each
//! engine call for diagnostics; sampling never blocks or alters the
//! rendering outcome.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use lru::LruCache;

use crate::engine::{EngineFault, FrameBuffer, RegionRequest, RenderEngine, RenderFlags};

use super::state::{ContentGeometry, ViewportState};

/// Default number of cached frames.
pub const DEFAULT_FRAME_CACHE_SIZE: usize = 8;

/// Timing/memory observations around one render call.
#[derive(Clone, Copy, Debug)]
pub struct RenderStats {
    pub elapsed: Duration,
    /// Size of the produced buffer.
    pub buffer_bytes: usize,
    /// Change in buffer footprint versus the previous render.
    pub bytes_delta: i64,
    /// Whether the frame was served from cache.
    pub cached: bool,
}

/// Cache key covering every raster-relevant part of the viewport state.
///
/// Zoom is stored in millionths for stable hashing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct FrameKey {
    page: usize,
    scroll_x: i32,
    scroll_y: i32,
    zoom_millionths: u32,
    dpi_x: i32,
    dpi_y: i32,
    out_width: i32,
    out_height: i32,
}

impl FrameKey {
    fn from_state(state: &ViewportState, geometry: &ContentGeometry) -> Self {
        Self {
            page: state.page_index,
            scroll_x: state.scroll_x,
            scroll_y: state.scroll_y,
            zoom_millionths: (state.zoom * 1_000_000.0) as u32,
            dpi_x: state.dpi_x,
            dpi_y: state.dpi_y,
            out_width: geometry.viewport_width,
            out_height: geometry.viewport_height,
        }
    }
}

/// Requests visible-region rasters and keeps the most recent ones around.
pub struct RenderScheduler {
    cache: LruCache<FrameKey, Arc<FrameBuffer>>,
    flags: RenderFlags,
    last_buffer_bytes: usize,
}

impl RenderScheduler {
    #[must_use]
    pub fn new(cache_size: usize) -> Self {
        Self {
            cache: LruCache::new(
                NonZeroUsize::new(cache_size)
                    .unwrap_or_else(|| NonZeroUsize::new(DEFAULT_FRAME_CACHE_SIZE).expect("non-zero")),
            ),
            flags: RenderFlags::default(),
            last_buffer_bytes: 0,
        }
    }

    /// Build the region request for the current viewport state.
    #[must_use]
    pub fn visible_region(state: &ViewportState, geometry: &ContentGeometry, flags: RenderFlags) -> RegionRequest {
        RegionRequest {
            offset_x: -state.scroll_x,
            offset_y: -state.scroll_y,
            page_px_width: state.page_px_width,
            page_px_height: state.page_px_height,
            out_width: geometry.viewport_width.max(1),
            out_height: geometry.viewport_height.max(1),
            flags,
        }
    }

    /// Render the visible region of the current page.
    ///
    /// Identical state renders are served from cache, which also makes a
    /// caller-side retry after a transient failure cheap.
    pub fn render_visible<E: RenderEngine>(
        &mut self,
        engine: &E,
        doc: &E::Doc,
        state: &ViewportState,
        geometry: &ContentGeometry,
    ) -> Result<(Arc<FrameBuffer>, RenderStats), EngineFault> {
        let key = FrameKey::from_state(state, geometry);
        if let Some(frame) = self.cache.get(&key) {
            let stats = RenderStats {
                elapsed: Duration::ZERO,
                buffer_bytes: frame.data.len(),
                bytes_delta: 0,
                cached: true,
            };
            return Ok((Arc::clone(frame), stats));
        }

        let request = Self::visible_region(state, geometry, self.flags);
        let started = Instant::now();
        let frame = engine.render_region(doc, state.page_index, &request)?;
        let elapsed = started.elapsed();

        let buffer_bytes = frame.data.len();
        let bytes_delta = buffer_bytes as i64 - self.last_buffer_bytes as i64;
        self.last_buffer_bytes = buffer_bytes;

        debug!(
            "rendered page {} region {}x{} at zoom {:.2} in {:.1}ms ({} KiB, delta {} KiB)",
            state.page_index + 1,
            request.out_width,
            request.out_height,
            state.zoom,
            elapsed.as_secs_f64() * 1000.0,
            buffer_bytes / 1024,
            bytes_delta / 1024,
        );

        let frame = Arc::new(frame);
        self.cache.put(key, Arc::clone(&frame));
        Ok((
            frame,
            RenderStats {
                elapsed,
                buffer_bytes,
                bytes_delta,
                cached: false,
            },
        ))
    }

    /// Drop every cached frame; used on document switch and close.
    pub fn invalidate(&mut self) {
        self.cache.clear();
        self.last_buffer_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PageSizePts;

    fn letter_state() -> (ViewportState, ContentGeometry) {
        (
            ViewportState::new(3, PageSizePts::new(612.0, 792.0), 96, 96),
            ContentGeometry::new(800, 600),
        )
    }

    #[test]
    fn visible_region_is_viewport_sized_with_scroll_offsets() {
        let (mut state, geo) = letter_state();
        state.scroll_x = 40;
        state.scroll_y = 250;
        let request = RenderScheduler::visible_region(&state, &geo, RenderFlags::default());
        assert_eq!(request.offset_x, -40);
        assert_eq!(request.offset_y, -250);
        assert_eq!(request.out_width, 800);
        assert_eq!(request.out_height, 600);
        assert_eq!(request.page_px_width, 816);
        assert_eq!(request.page_px_height, 1056);
    }

    #[test]
    fn output_never_grows_with_zoom() {
        let (mut state, mut geo) = letter_state();
        let _ = state.apply(
            &mut geo,
            super::super::state::ViewportCmd::SetZoom {
                zoom: 8.0,
                anchor: None,
            },
        );
        let request = RenderScheduler::visible_region(&state, &geo, RenderFlags::default());
        assert_eq!(request.out_width, 800);
        assert_eq!(request.out_height, 600);
        assert!(request.page_px_width > 6000);
    }

    #[test]
    fn degenerate_viewport_requests_at_least_one_pixel() {
        let (state, _) = letter_state();
        let geo = ContentGeometry::new(0, 0);
        let request = RenderScheduler::visible_region(&state, &geo, RenderFlags::default());
        assert_eq!(request.out_width, 1);
        assert_eq!(request.out_height, 1);
    }
}
