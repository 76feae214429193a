//! In-memory rendering engine for tests
//!
//! Implements [`RenderEngine`] over scripted page data so the viewer core
//! can be driven without a PDF engine. Records every region request and
//! exposes failure knobs for the error-handling paths.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;

use crate::engine::{
    EngineFault, FrameBuffer, ImagePixels, PageObject, PageObjectKind, PageSizePts, PixelFormat,
    RegionRequest, RenderEngine,
};
use crate::geometry::{PagePoint, PageRect, Transform};

/// A link annotation on a fake page.
#[derive(Clone, Debug)]
pub struct FakeLink {
    pub rect: PageRect,
    /// 0-based destination page; `None` models an external link.
    pub dest: Option<usize>,
}

/// Scripted content of one page.
#[derive(Clone, Debug, Default)]
pub struct FakePage {
    pub size: PageSizePts,
    pub links: Vec<FakeLink>,
    pub objects: Vec<PageObject<u32>>,
    /// Text runs by their anchor point; bounded text returns the runs whose
    /// anchor falls inside the query rectangle, in insertion order.
    pub texts: Vec<(PagePoint, String)>,
}

impl FakePage {
    /// US-letter page, 612x792 points.
    #[must_use]
    pub fn letter() -> Self {
        Self {
            size: PageSizePts::new(612.0, 792.0),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_size(width: f64, height: f64) -> Self {
        Self {
            size: PageSizePts::new(width, height),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn link(mut self, rect: PageRect, dest: usize) -> Self {
        self.links.push(FakeLink {
            rect,
            dest: Some(dest),
        });
        self
    }

    #[must_use]
    pub fn image(mut self, handle: u32, bounds: PageRect) -> Self {
        self.objects.push(image_object(handle, bounds));
        self
    }

    #[must_use]
    pub fn object(mut self, object: PageObject<u32>) -> Self {
        self.objects.push(object);
        self
    }

    #[must_use]
    pub fn text(mut self, at: PagePoint, content: &str) -> Self {
        self.texts.push((at, content.to_owned()));
        self
    }
}

/// Build an image page object with identity local matrix.
#[must_use]
pub fn image_object(handle: u32, bounds: PageRect) -> PageObject<u32> {
    PageObject {
        kind: PageObjectKind::Image {
            handle,
            pixel_width: 64,
            pixel_height: 64,
        },
        local_matrix: Transform::IDENTITY,
        bounds,
    }
}

/// Build a form object wrapping children behind a local matrix.
#[must_use]
pub fn form_object(children: Vec<PageObject<u32>>, local_matrix: Transform) -> PageObject<u32> {
    let bounds = PageRect::new(0.0, 0.0, 0.0, 0.0);
    PageObject {
        kind: PageObjectKind::Form { children },
        local_matrix,
        bounds,
    }
}

/// Scriptable in-memory engine.
#[derive(Default)]
pub struct FakeEngine {
    pub pages: Vec<FakePage>,
    /// Pixel payloads per image handle; missing handles synthesize a small
    /// RGB buffer.
    pub images: HashMap<u32, ImagePixels>,
    /// Every region request seen, in order.
    pub render_log: RefCell<Vec<RegionRequest>>,
    /// Fail the next `load_document`.
    pub fail_load: Cell<bool>,
    /// Fail `page_size_points` for this page index.
    pub fail_page_size_for: Cell<Option<usize>>,
    /// Make `close_document` report a fault (teardown guard path).
    pub fail_close: Cell<bool>,
    /// Number of documents closed so far.
    pub closed_docs: Cell<usize>,
    next_doc: Cell<u64>,
}

impl FakeEngine {
    #[must_use]
    pub fn new(pages: Vec<FakePage>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn single_page(page: FakePage) -> Self {
        Self::new(vec![page])
    }

    #[must_use]
    pub fn render_count(&self) -> usize {
        self.render_log.borrow().len()
    }

    #[must_use]
    pub fn last_request(&self) -> Option<RegionRequest> {
        self.render_log.borrow().last().copied()
    }

    fn page(&self, page: usize) -> Result<&FakePage, EngineFault> {
        self.pages.get(page).ok_or(EngineFault::PageOutOfRange {
            page,
            count: self.pages.len(),
        })
    }
}

impl RenderEngine for FakeEngine {
    type Doc = u64;
    type Link = FakeLink;
    type Image = u32;

    fn load_document(&self, path: &Path) -> Result<Self::Doc, EngineFault> {
        if self.fail_load.get() {
            return Err(EngineFault::NotFound(path.to_path_buf()));
        }
        let id = self.next_doc.get();
        self.next_doc.set(id + 1);
        Ok(id)
    }

    fn close_document(&self, _doc: Self::Doc) -> Result<(), EngineFault> {
        self.closed_docs.set(self.closed_docs.get() + 1);
        if self.fail_close.get() {
            return Err(EngineFault::engine("teardown fault"));
        }
        Ok(())
    }

    fn page_count(&self, _doc: &Self::Doc) -> usize {
        self.pages.len()
    }

    fn page_size_points(&self, _doc: &Self::Doc, page: usize) -> Result<PageSizePts, EngineFault> {
        if self.fail_page_size_for.get() == Some(page) {
            return Err(EngineFault::engine("page load failed"));
        }
        Ok(self.page(page)?.size)
    }

    fn render_region(
        &self,
        _doc: &Self::Doc,
        page: usize,
        request: &RegionRequest,
    ) -> Result<FrameBuffer, EngineFault> {
        self.page(page)?;
        self.render_log.borrow_mut().push(*request);
        let width = request.out_width.max(1) as u32;
        let height = request.out_height.max(1) as u32;
        let stride = width as usize * 4;
        Ok(FrameBuffer {
            data: vec![0xff; stride * height as usize],
            width,
            height,
            stride,
            format: PixelFormat::Bgra8,
        })
    }

    fn link_at_point(
        &self,
        _doc: &Self::Doc,
        page: usize,
        point: PagePoint,
    ) -> Result<Option<Self::Link>, EngineFault> {
        Ok(self
            .page(page)?
            .links
            .iter()
            .find(|link| link.rect.contains(point))
            .cloned())
    }

    fn resolve_link_dest(&self, _doc: &Self::Doc, link: &Self::Link) -> Option<usize> {
        link.dest
    }

    fn page_objects(
        &self,
        _doc: &Self::Doc,
        page: usize,
    ) -> Result<Vec<PageObject<Self::Image>>, EngineFault> {
        Ok(self.page(page)?.objects.clone())
    }

    fn bounded_text(
        &self,
        _doc: &Self::Doc,
        page: usize,
        rect: PageRect,
    ) -> Result<String, EngineFault> {
        let runs: Vec<&str> = self
            .page(page)?
            .texts
            .iter()
            .filter(|(at, _)| rect.contains(*at))
            .map(|(_, content)| content.as_str())
            .collect();
        Ok(runs.join(" "))
    }

    fn extract_image_pixels(
        &self,
        _doc: &Self::Doc,
        _page: usize,
        image: &Self::Image,
    ) -> Result<ImagePixels, EngineFault> {
        if let Some(pixels) = self.images.get(image) {
            return Ok(pixels.clone());
        }
        Ok(ImagePixels {
            data: vec![0x80; 4 * 4 * 3],
            width: 4,
            height: 4,
            stride: 12,
            format: PixelFormat::Rgb8,
            filter: None,
        })
    }
}
