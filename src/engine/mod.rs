//! Rendering-engine capability seam
//!
//! The rasterization engine (page decoding, glyph shaping, rasterization)
//! is an external collaborator. [`RenderEngine`] captures exactly the
//! capabilities the viewer consumes; the MuPDF adapter lives in
//! [`mupdf_backend`] behind the `pdf` feature, and tests drive the core
//! through an in-memory implementation.

use std::path::{Path, PathBuf};

use crate::geometry::{PagePoint, PageRect, Transform};

#[cfg(feature = "pdf")]
pub mod mupdf_backend;

#[cfg(feature = "pdf")]
pub use mupdf_backend::MupdfEngine;

/// Page dimensions in PDF points (1/72 inch).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PageSizePts {
    pub width: f64,
    pub height: f64,
}

impl PageSizePts {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Pixel layout of an engine-produced buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Bgra8,
    Rgba8,
    Rgb8,
    Gray8,
}

impl PixelFormat {
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgra8 | Self::Rgba8 => 4,
            Self::Rgb8 => 3,
            Self::Gray8 => 1,
        }
    }
}

/// A rasterized buffer returned by the engine.
#[derive(Clone)]
pub struct FrameBuffer {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub format: PixelFormat,
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Render flags passed through to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderFlags {
    /// Paint annotations on top of page content.
    pub annotations: bool,
    /// Allow subpixel text optimizations where the engine supports them.
    pub lcd_text: bool,
}

impl Default for RenderFlags {
    fn default() -> Self {
        Self {
            annotations: true,
            lcd_text: true,
        }
    }
}

/// One region-rasterization request.
///
/// The engine paints the page, scaled to `page_px_width`/`page_px_height`,
/// starting at (`offset_x`, `offset_y`) into a buffer of
/// `out_width` x `out_height` pixels. A negative offset therefore scrolls
/// the page up/left within the output window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionRequest {
    pub offset_x: i32,
    pub offset_y: i32,
    pub page_px_width: i32,
    pub page_px_height: i32,
    pub out_width: i32,
    pub out_height: i32,
    pub flags: RenderFlags,
}

/// Hint describing how an image stream was originally encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFilter {
    /// DCT (JPEG) encoded; export keeps the JPEG container.
    Dct,
    /// JPEG 2000.
    Jpx,
    /// Deflate or other lossless filter.
    Flate,
}

/// Decoded pixels of one image object, with enough metadata to re-encode.
#[derive(Clone, Debug)]
pub struct ImagePixels {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub format: PixelFormat,
    /// Original stream filter, when the engine can tell.
    pub filter: Option<ImageFilter>,
}

/// One drawable object on a page.
///
/// `bounds` are in the object's local space; `local_matrix` maps them into
/// the parent's space. Form objects nest their children, which compose
/// their own matrices on top.
#[derive(Clone, Debug)]
pub struct PageObject<I> {
    pub kind: PageObjectKind<I>,
    pub local_matrix: Transform,
    pub bounds: PageRect,
}

/// Discriminated page-object payloads; the hit-test engine only consumes
/// the `{kind, bounds, local_matrix}` projection.
#[derive(Clone, Debug)]
pub enum PageObjectKind<I> {
    Text,
    Path,
    Image {
        handle: I,
        pixel_width: u32,
        pixel_height: u32,
    },
    Shading,
    Form { children: Vec<PageObject<I>> },
}

/// Errors from the rendering engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineFault {
    #[error("document not found: {0}")]
    NotFound(PathBuf),

    #[error("document is encrypted")]
    Encrypted,

    #[error("document is corrupt: {detail}")]
    Corrupt { detail: String },

    #[error("page {page} out of range (document has {count})")]
    PageOutOfRange { page: usize, count: usize },

    #[error("engine: {detail}")]
    Engine { detail: String },
}

impl EngineFault {
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine { detail: msg.into() }
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt { detail: msg.into() }
    }
}

/// Capability set consumed from the rendering engine.
///
/// All calls are synchronous and bounded; the viewer invokes them from its
/// event-handling pass and never retries on its own.
pub trait RenderEngine {
    /// Opaque open-document handle.
    type Doc;
    /// Opaque link handle produced by [`Self::link_at_point`].
    type Link;
    /// Opaque image-object handle, usable for pixel extraction.
    type Image: Clone;

    fn load_document(&self, path: &Path) -> Result<Self::Doc, EngineFault>;

    /// Release a document. Teardown is assumed fallible; callers must not
    /// let a failure here corrupt their own state.
    fn close_document(&self, doc: Self::Doc) -> Result<(), EngineFault>;

    fn page_count(&self, doc: &Self::Doc) -> usize;

    fn page_size_points(&self, doc: &Self::Doc, page: usize) -> Result<PageSizePts, EngineFault>;

    fn render_region(
        &self,
        doc: &Self::Doc,
        page: usize,
        request: &RegionRequest,
    ) -> Result<FrameBuffer, EngineFault>;

    /// Link whose active area contains the given page-space point.
    fn link_at_point(
        &self,
        doc: &Self::Doc,
        page: usize,
        point: PagePoint,
    ) -> Result<Option<Self::Link>, EngineFault>;

    /// Resolve a link to its 0-based destination page, via its direct
    /// destination or its action's destination. `None` for external links.
    fn resolve_link_dest(&self, doc: &Self::Doc, link: &Self::Link) -> Option<usize>;

    /// Drawable objects of a page in draw order, nested for form objects.
    fn page_objects(
        &self,
        doc: &Self::Doc,
        page: usize,
    ) -> Result<Vec<PageObject<Self::Image>>, EngineFault>;

    /// Text content within a page-space rectangle; empty when the region
    /// holds no text.
    fn bounded_text(
        &self,
        doc: &Self::Doc,
        page: usize,
        rect: PageRect,
    ) -> Result<String, EngineFault>;

    fn extract_image_pixels(
        &self,
        doc: &Self::Doc,
        page: usize,
        image: &Self::Image,
    ) -> Result<ImagePixels, EngineFault>;
}
