//! Viewer facade exposed to the surrounding UI shell
//!
//! Single-threaded and event-driven: every operation is a synchronous
//! request invoked from an input-event handler, so a hit-test always
//! observes the viewport state exactly as the last render left it. The
//! `ViewportState`/`ContentGeometry` pair is owned here and borrowed
//! read-only by the other components during one event-handling pass.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::warn;

use crate::config::ViewerConfig;
use crate::engine::{EngineFault, FrameBuffer, RegionRequest, RenderEngine, RenderFlags};
use crate::export::{self, ExportError, ExportFormat};
use crate::geometry::{ClientPoint, ClientRect, PageRect};

use super::hittest::{self, HitTest};
use super::render::{RenderScheduler, RenderStats};
use super::selection::SelectionRegion;
use super::state::{ContentGeometry, Effect, ViewportCmd, ViewportState};
use super::zoom;

/// Errors surfaced to the shell.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("no document loaded")]
    NoDocument,

    #[error(transparent)]
    Engine(#[from] EngineFault),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("clipboard: {0}")]
    Clipboard(String),
}

/// Modifier keys relevant to pointer handling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Pan modifier: held, a primary-button drag pans instead of selecting,
    /// and the wheel zooms instead of scrolling.
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { ctrl: false };
    pub const CTRL: Modifiers = Modifiers { ctrl: true };
}

/// Notable outcomes of pointer handling, for the shell to react to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewerEvent {
    /// A link click navigated to a page.
    NavigatedTo { page: usize },
    /// A drag finished and selection text is available (possibly empty).
    SelectionChanged,
}

/// Status-bar projection of the current state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewerStatus {
    /// Current page, 0-indexed.
    pub page_index: usize,
    pub page_count: usize,
    pub zoom: f64,
}

/// A rendered visible region plus the sampling taken around it.
#[derive(Clone, Debug)]
pub struct RenderedFrame {
    pub frame: Arc<FrameBuffer>,
    pub stats: RenderStats,
}

/// Per-document state, torn down as one unit when the document closes.
struct OpenDoc<E: RenderEngine> {
    path: PathBuf,
    handle: E::Doc,
    viewport: ViewportState,
    selection: SelectionRegion,
}

/// The viewer shell core.
///
/// Owns the engine handle and all viewport/selection state; the UI shell
/// forwards input events and repaints when [`Viewer::needs_repaint`] says
/// so.
pub struct Viewer<E: RenderEngine> {
    engine: E,
    config: ViewerConfig,
    geometry: ContentGeometry,
    doc: Option<OpenDoc<E>>,
    scheduler: RenderScheduler,
    /// Device DPI; survives document switches.
    dpi: (i32, i32),
    /// Reserved chrome offset of the content area (sidebar width, top bar).
    content_origin: (i32, i32),
    /// Last pan position while a pan drag is active.
    pan_anchor: Option<ClientPoint>,
    needs_repaint: bool,
    status_dirty: bool,
}

impl<E: RenderEngine> Viewer<E> {
    #[must_use]
    pub fn new(engine: E, config: ViewerConfig) -> Self {
        let scheduler = RenderScheduler::new(config.frame_cache_size);
        Self {
            engine,
            config,
            geometry: ContentGeometry::default(),
            doc: None,
            scheduler,
            dpi: (96, 96),
            content_origin: (0, 0),
            pan_anchor: None,
            needs_repaint: false,
            status_dirty: false,
        }
    }

    // ---- document lifecycle ----------------------------------------------

    /// Open a document, replacing any current one.
    ///
    /// The new document is loaded and probed first; only then is the old
    /// one fully torn down, so a failed open leaves the prior state
    /// untouched while a successful one never leaves stale handles behind.
    pub fn open_document(&mut self, path: &Path) -> Result<(), ViewerError> {
        let handle = self.engine.load_document(path)?;

        let page_count = self.engine.page_count(&handle);
        if page_count == 0 {
            self.close_handle(handle);
            return Err(EngineFault::corrupt("document has no pages").into());
        }
        let first_size = match self.engine.page_size_points(&handle, 0) {
            Ok(size) => size,
            Err(fault) => {
                self.close_handle(handle);
                return Err(fault.into());
            }
        };

        if let Some(old) = self.doc.take() {
            self.close_handle(old.handle);
        }
        self.scheduler.invalidate();
        self.pan_anchor = None;

        let mut viewport = ViewportState::new(page_count, first_size, self.dpi.0, self.dpi.1);
        viewport.content_origin_x = self.content_origin.0;
        viewport.content_origin_y = self.content_origin.1;
        viewport.clamp_scroll(&self.geometry);

        self.doc = Some(OpenDoc {
            path: path.to_path_buf(),
            handle,
            viewport,
            selection: SelectionRegion::new(),
        });
        self.needs_repaint = true;
        self.status_dirty = true;
        Ok(())
    }

    /// Close the current document and reset all per-document state.
    pub fn close_document(&mut self) {
        if let Some(doc) = self.doc.take() {
            self.close_handle(doc.handle);
        }
        self.scheduler.invalidate();
        self.pan_anchor = None;
        self.needs_repaint = true;
        self.status_dirty = true;
    }

    fn close_handle(&mut self, handle: E::Doc) {
        // Engine teardown is assumed fallible; a failure must not corrupt
        // shell state.
        if let Err(fault) = self.engine.close_document(handle) {
            warn!("engine teardown failed: {fault}");
        }
    }

    #[must_use]
    pub fn has_document(&self) -> bool {
        self.doc.is_some()
    }

    #[must_use]
    pub fn document_path(&self) -> Option<&Path> {
        self.doc.as_ref().map(|doc| doc.path.as_path())
    }

    // ---- navigation ------------------------------------------------------

    /// Switch to a page (0-indexed, silently clamped to the valid range).
    ///
    /// An engine failure while probing the new page's size leaves the
    /// viewport on the previous page.
    pub fn set_page(&mut self, index: usize) -> Result<(), ViewerError> {
        let Some(doc) = self.doc.as_mut() else {
            return Err(ViewerError::NoDocument);
        };
        let clamped = index.min(doc.viewport.page_count.saturating_sub(1));
        let size = self.engine.page_size_points(&doc.handle, clamped)?;
        let effects = doc
            .viewport
            .apply(&mut self.geometry, ViewportCmd::SetPage { index: clamped, size });
        self.process_effects(effects);
        Ok(())
    }

    pub fn next_page(&mut self) -> Result<(), ViewerError> {
        let current = self.current_page().ok_or(ViewerError::NoDocument)?;
        self.set_page(current.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> Result<(), ViewerError> {
        let current = self.current_page().ok_or(ViewerError::NoDocument)?;
        self.set_page(current.saturating_sub(1))
    }

    pub fn first_page(&mut self) -> Result<(), ViewerError> {
        self.set_page(0)
    }

    pub fn last_page(&mut self) -> Result<(), ViewerError> {
        let count = self.page_count().ok_or(ViewerError::NoDocument)?;
        self.set_page(count.saturating_sub(1))
    }

    #[must_use]
    pub fn current_page(&self) -> Option<usize> {
        self.doc.as_ref().map(|doc| doc.viewport.page_index)
    }

    #[must_use]
    pub fn page_count(&self) -> Option<usize> {
        self.doc.as_ref().map(|doc| doc.viewport.page_count)
    }

    // ---- zoom and scroll -------------------------------------------------

    /// Set an absolute zoom factor; with an anchor the anchored client
    /// point stays over the same document location.
    pub fn zoom(&mut self, factor: f64, anchor: Option<ClientPoint>) {
        let Some(doc) = self.doc.as_mut() else { return };
        // The anchored-scroll math runs in content space.
        let anchor = anchor.map(|point| {
            ClientPoint::new(
                point.x - doc.viewport.content_origin_x,
                point.y - doc.viewport.content_origin_y,
            )
        });
        let effects = doc
            .viewport
            .apply(&mut self.geometry, ViewportCmd::SetZoom { zoom: factor, anchor });
        self.process_effects(effects);
    }

    pub fn zoom_in_at(&mut self, anchor: ClientPoint) {
        if let Some(current) = self.zoom_factor() {
            self.zoom(current * zoom::WHEEL_STEP_IN, Some(anchor));
        }
    }

    pub fn zoom_out_at(&mut self, anchor: ClientPoint) {
        if let Some(current) = self.zoom_factor() {
            self.zoom(current * zoom::WHEEL_STEP_OUT, Some(anchor));
        }
    }

    #[must_use]
    pub fn zoom_factor(&self) -> Option<f64> {
        self.doc.as_ref().map(|doc| doc.viewport.zoom)
    }

    pub fn scroll_by(&mut self, dx: i32, dy: i32) {
        let Some(doc) = self.doc.as_mut() else { return };
        let effects = doc
            .viewport
            .apply(&mut self.geometry, ViewportCmd::ScrollBy { dx, dy });
        self.process_effects(effects);
    }

    // ---- window geometry -------------------------------------------------

    /// Content-area resize (window client area minus chrome).
    pub fn on_resize(&mut self, width: i32, height: i32) {
        if let Some(doc) = self.doc.as_mut() {
            let effects = doc
                .viewport
                .apply(&mut self.geometry, ViewportCmd::Resize { width, height });
            self.process_effects(effects);
        } else {
            self.geometry = ContentGeometry::new(width.max(0), height.max(0));
        }
    }

    pub fn on_dpi_changed(&mut self, dpi_x: i32, dpi_y: i32) {
        if dpi_x <= 0 || dpi_y <= 0 {
            return;
        }
        self.dpi = (dpi_x, dpi_y);
        if let Some(doc) = self.doc.as_mut() {
            let effects = doc
                .viewport
                .apply(&mut self.geometry, ViewportCmd::DpiChanged { dpi_x, dpi_y });
            self.process_effects(effects);
        }
    }

    /// Reserve sidebar width (and top chrome) at the content origin.
    pub fn set_content_origin(&mut self, x: i32, y: i32) {
        self.content_origin = (x.max(0), y.max(0));
        if let Some(doc) = self.doc.as_mut() {
            let effects = doc
                .viewport
                .apply(&mut self.geometry, ViewportCmd::SetContentOrigin { x, y });
            self.process_effects(effects);
        }
    }

    /// Fold reducer effects into shell-visible flags.
    fn process_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Repaint => self.needs_repaint = true,
                Effect::StatusChanged => self.status_dirty = true,
                Effect::SelectionCleared => {
                    if let Some(doc) = self.doc.as_mut() {
                        doc.selection.clear();
                    }
                }
            }
        }
    }

    #[must_use]
    pub fn viewport(&self) -> Option<&ViewportState> {
        self.doc.as_ref().map(|doc| &doc.viewport)
    }

    #[must_use]
    pub fn geometry(&self) -> &ContentGeometry {
        &self.geometry
    }

    // ---- pointer input ---------------------------------------------------

    pub fn handle_pointer_down(&mut self, point: ClientPoint, mods: Modifiers) {
        if self.doc.is_none() {
            return;
        }
        if mods.ctrl {
            self.pan_anchor = Some(point);
            return;
        }
        if let Some(doc) = self.doc.as_mut() {
            doc.selection.start_at(point);
            self.needs_repaint = true;
        }
    }

    pub fn handle_pointer_move(&mut self, point: ClientPoint, mods: Modifiers) {
        if let Some(last) = self.pan_anchor {
            // Panning requires the modifier to stay held.
            if !mods.ctrl {
                return;
            }
            let (dx, dy) = (point.x - last.x, point.y - last.y);
            self.pan_anchor = Some(point);
            // Content follows the pointer, so scroll moves the other way.
            self.scroll_by(-dx, -dy);
            return;
        }
        if let Some(doc) = self.doc.as_mut() {
            if doc.selection.is_dragging() && doc.selection.update_end(point) {
                self.needs_repaint = true;
            }
        }
    }

    pub fn handle_pointer_up(&mut self, point: ClientPoint) -> Option<ViewerEvent> {
        if self.pan_anchor.take().is_some() {
            return None;
        }

        let dragged = {
            let doc = self.doc.as_mut()?;
            if !doc.selection.is_dragging() {
                return None;
            }
            doc.selection.update_end(point);
            doc.selection.finish();
            doc.selection.moved_beyond(self.config.drag_threshold_px)
        };

        if dragged {
            self.finalize_selection();
            Some(ViewerEvent::SelectionChanged)
        } else {
            // No real drag: treat as a click and try link navigation.
            if let Some(doc) = self.doc.as_mut() {
                doc.selection.clear();
            }
            self.needs_repaint = true;
            self.navigate_link_at(point)
        }
    }

    /// Pointer capture lost: abort any in-flight gesture.
    pub fn handle_pointer_cancel(&mut self) {
        self.pan_anchor = None;
        if let Some(doc) = self.doc.as_mut() {
            if doc.selection.is_dragging() {
                doc.selection.cancel();
                self.needs_repaint = true;
            }
        }
    }

    /// Wheel input: plain wheel scrolls, with the pan modifier it zooms
    /// anchored at the cursor.
    pub fn handle_wheel(&mut self, delta: i32, point: ClientPoint, mods: Modifiers) {
        if mods.ctrl {
            if delta > 0 {
                self.zoom_in_at(point);
            } else if delta < 0 {
                self.zoom_out_at(point);
            }
        } else if delta != 0 {
            let step = self.config.scroll_step_px;
            self.scroll_by(0, if delta > 0 { -step } else { step });
        }
    }

    fn finalize_selection(&mut self) {
        let Some(doc) = self.doc.as_mut() else { return };
        let Some(rect) = doc.selection.client_rect() else {
            doc.selection.clear();
            return;
        };

        let content_area = ClientRect::new(
            doc.viewport.content_origin_x,
            doc.viewport.content_origin_y,
            doc.viewport.content_origin_x + self.geometry.viewport_width,
            doc.viewport.content_origin_y + self.geometry.viewport_height,
        );
        let Some(rect) = rect.intersect(&content_area) else {
            doc.selection.clear();
            self.needs_repaint = true;
            return;
        };

        let params = doc.viewport.view_params();
        let height = doc.viewport.page_size.height;
        let a = params.client_to_page(rect.top_left(), height);
        let b = params.client_to_page(rect.bottom_right(), height);
        let region = PageRect::from_corners(a, b);

        match self
            .engine
            .bounded_text(&doc.handle, doc.viewport.page_index, region)
        {
            Ok(text) => doc.selection.set_text(text),
            Err(fault) => {
                warn!("bounded text extraction failed: {fault}");
                doc.selection.set_text(String::new());
            }
        }
        self.needs_repaint = true;
    }

    fn navigate_link_at(&mut self, point: ClientPoint) -> Option<ViewerEvent> {
        let target = {
            let doc = self.doc.as_ref()?;
            let params = doc.viewport.view_params();
            let page_point = params.client_to_page(point, doc.viewport.page_size.height);
            let link = match self
                .engine
                .link_at_point(&doc.handle, doc.viewport.page_index, page_point)
            {
                Ok(Some(link)) => link,
                Ok(None) => return None,
                Err(fault) => {
                    warn!("link hit-test failed: {fault}");
                    return None;
                }
            };
            self.engine.resolve_link_dest(&doc.handle, &link)?
        };

        match self.set_page(target) {
            Ok(()) => Some(ViewerEvent::NavigatedTo { page: target }),
            Err(error) => {
                warn!("link navigation to page {target} failed: {error}");
                None
            }
        }
    }

    // ---- hit-testing -----------------------------------------------------

    /// Resolve a client point to a link target, an image, or nothing.
    pub fn hit_test(&self, point: ClientPoint) -> Result<HitTest<E::Image>, ViewerError> {
        let Some(doc) = self.doc.as_ref() else {
            return Ok(HitTest::None);
        };
        let params = doc.viewport.view_params();
        let page_point = params.client_to_page(point, doc.viewport.page_size.height);
        let page = doc.viewport.page_index;

        if let Some(link) = self.engine.link_at_point(&doc.handle, page, page_point)? {
            if let Some(target) = self.engine.resolve_link_dest(&doc.handle, &link) {
                return Ok(HitTest::Link { page: target });
            }
        }

        let objects = self.engine.page_objects(&doc.handle, page)?;
        let tolerance = hittest::tolerance_in_points(
            self.config.image_hit_tolerance_px,
            doc.viewport.dpi_x,
            doc.viewport.dpi_y,
            doc.viewport.zoom,
        );
        if let Some(hit) =
            hittest::image_at_point(&objects, page_point, tolerance, self.config.topmost_image_wins)
        {
            return Ok(HitTest::Image {
                handle: hit.handle,
                pixel_width: hit.pixel_width,
                pixel_height: hit.pixel_height,
            });
        }
        Ok(HitTest::None)
    }

    // ---- rendering -------------------------------------------------------

    /// Render the visible region of the current page. `Ok(None)` when no
    /// document is open.
    pub fn render(&mut self) -> Result<Option<RenderedFrame>, ViewerError> {
        let Some(doc) = self.doc.as_ref() else {
            return Ok(None);
        };
        let (frame, stats) =
            self.scheduler
                .render_visible(&self.engine, &doc.handle, &doc.viewport, &self.geometry)?;
        self.needs_repaint = false;
        Ok(Some(RenderedFrame { frame, stats }))
    }

    #[must_use]
    pub fn needs_repaint(&self) -> bool {
        self.needs_repaint
    }

    /// Status changed since the last call?
    pub fn take_status_changed(&mut self) -> bool {
        std::mem::take(&mut self.status_dirty)
    }

    #[must_use]
    pub fn status(&self) -> Option<ViewerStatus> {
        self.doc.as_ref().map(|doc| ViewerStatus {
            page_index: doc.viewport.page_index,
            page_count: doc.viewport.page_count,
            zoom: doc.viewport.zoom,
        })
    }

    // ---- selection and clipboard -----------------------------------------

    #[must_use]
    pub fn selected_text(&self) -> Option<&str> {
        self.doc.as_ref().and_then(|doc| doc.selection.text())
    }

    #[must_use]
    pub fn selection(&self) -> Option<&SelectionRegion> {
        self.doc.as_ref().map(|doc| &doc.selection)
    }

    pub fn clear_selection(&mut self) {
        if let Some(doc) = self.doc.as_mut() {
            doc.selection.clear();
            self.needs_repaint = true;
        }
    }

    /// Copy the selection to the system clipboard. Empty or missing
    /// selection is a no-op; returns whether anything was copied.
    pub fn copy_selection_to_clipboard(&self) -> Result<bool, ViewerError> {
        let Some(text) = self.selected_text().filter(|text| !text.is_empty()) else {
            return Ok(false);
        };
        let mut clipboard =
            arboard::Clipboard::new().map_err(|error| ViewerError::Clipboard(error.to_string()))?;
        clipboard
            .set_text(text.to_owned())
            .map_err(|error| ViewerError::Clipboard(error.to_string()))?;
        Ok(true)
    }

    // ---- export ----------------------------------------------------------

    /// Export the image under a client point; `Ok(None)` when nothing is
    /// there. The container follows the image's original filter (JPEG for
    /// DCT-encoded sources, PNG otherwise).
    pub fn export_image_at(
        &self,
        point: ClientPoint,
        out_path: &Path,
    ) -> Result<Option<ExportFormat>, ViewerError> {
        let Some(doc) = self.doc.as_ref() else {
            return Err(ViewerError::NoDocument);
        };
        let params = doc.viewport.view_params();
        let page_point = params.client_to_page(point, doc.viewport.page_size.height);
        let page = doc.viewport.page_index;

        let objects = self.engine.page_objects(&doc.handle, page)?;
        let tolerance = hittest::tolerance_in_points(
            self.config.image_hit_tolerance_px,
            doc.viewport.dpi_x,
            doc.viewport.dpi_y,
            doc.viewport.zoom,
        );
        let Some(hit) =
            hittest::image_at_point(&objects, page_point, tolerance, self.config.topmost_image_wins)
        else {
            return Ok(None);
        };

        let pixels = self.engine.extract_image_pixels(&doc.handle, page, &hit.handle)?;
        let format = export::save_image(out_path, &pixels, self.config.jpeg_quality)?;
        Ok(Some(format))
    }

    /// Export the whole current page as PNG at its current pixel size.
    pub fn export_current_page_png(&self, out_path: &Path) -> Result<(), ViewerError> {
        let Some(doc) = self.doc.as_ref() else {
            return Err(ViewerError::NoDocument);
        };
        let request = RegionRequest {
            offset_x: 0,
            offset_y: 0,
            page_px_width: doc.viewport.page_px_width,
            page_px_height: doc.viewport.page_px_height,
            out_width: doc.viewport.page_px_width,
            out_height: doc.viewport.page_px_height,
            flags: RenderFlags::default(),
        };
        let frame = self
            .engine
            .render_region(&doc.handle, doc.viewport.page_index, &request)?;
        export::save_frame_png(out_path, &frame)?;
        Ok(())
    }

    #[must_use]
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: RenderEngine> Drop for Viewer<E> {
    fn drop(&mut self) {
        if let Some(doc) = self.doc.take() {
            self.close_handle(doc.handle);
        }
    }
}
