//! MuPDF-backed rendering engine
//!
//! Adapts the [`RenderEngine`] capability set onto the `mupdf` crate.
//! MuPDF page space is Y-down with the origin at the top-left, so page
//! coordinates flip through the page height at this boundary; everything
//! above the seam stays in PDF user space (Y-up).
//!
//! MuPDF exposes image content through its structured-text pass rather
//! than a page-object tree, so `page_objects` yields a flat draw-ordered
//! list with identity local matrices and bounds already resolved to page
//! space. Image pixels are recovered by re-rasterizing the image's region
//! at a fixed export scale.

use std::path::Path;

use mupdf::text_page::TextBlockType;
use mupdf::{Colorspace, Device, Document, IRect, Matrix, Page, Pixmap, TextPageFlags};

use crate::geometry::{PagePoint, PageRect, Transform};

use super::{
    EngineFault, FrameBuffer, ImagePixels, PageObject, PageObjectKind, PageSizePts, PixelFormat,
    RegionRequest, RenderEngine,
};

/// Rasterization scale for image-region extraction (144 dpi).
const EXPORT_SCALE: f32 = 2.0;

fn fault(error: mupdf::error::Error) -> EngineFault {
    EngineFault::engine(error.to_string())
}

/// Engine adapter over MuPDF.
#[derive(Default)]
pub struct MupdfEngine;

impl MupdfEngine {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// An open MuPDF document.
pub struct MupdfDocument {
    doc: Document,
    page_count: usize,
}

/// A resolved link; MuPDF hands out destinations directly, so resolution
/// happens at hit time.
#[derive(Clone, Debug)]
pub struct MupdfLink {
    dest_page: Option<usize>,
}

/// Image-object handle: the image's bounds in MuPDF page space (Y-down).
#[derive(Clone, Debug)]
pub struct MupdfImage {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
}

impl MupdfDocument {
    fn load_page(&self, page: usize) -> Result<Page, EngineFault> {
        if page >= self.page_count {
            return Err(EngineFault::PageOutOfRange {
                page,
                count: self.page_count,
            });
        }
        self.doc.load_page(page as i32).map_err(fault)
    }
}

fn page_extent(page: &Page) -> Result<(f32, f32), EngineFault> {
    let bounds = page.bounds().map_err(fault)?;
    let width = bounds.x1 - bounds.x0;
    let height = bounds.y1 - bounds.y0;
    if width <= 0.0 || height <= 0.0 {
        return Err(EngineFault::corrupt("page has a degenerate media box"));
    }
    Ok((width, height))
}

/// Rasterize a page through `ctm` into a white-cleared RGB pixmap of
/// `out_width` x `out_height` device pixels.
fn rasterize(
    page: &Page,
    ctm: &Matrix,
    out_width: i32,
    out_height: i32,
    annotations: bool,
) -> Result<FrameBuffer, EngineFault> {
    let rgb = Colorspace::device_rgb();
    let clip = IRect::new(0, 0, out_width.max(1), out_height.max(1));
    let mut pixmap = Pixmap::new_with_rect(&rgb, clip, false).map_err(fault)?;
    pixmap.clear_with(0xff).map_err(fault)?;

    {
        let device = Device::from_pixmap(&pixmap).map_err(fault)?;
        if annotations {
            page.run(&device, ctm).map_err(fault)?;
        } else {
            page.run_contents(&device, ctm).map_err(fault)?;
        }
    }

    Ok(FrameBuffer {
        data: pixmap.samples().to_vec(),
        width: pixmap.width(),
        height: pixmap.height(),
        stride: pixmap.stride() as usize,
        format: PixelFormat::Rgb8,
    })
}

impl RenderEngine for MupdfEngine {
    type Doc = MupdfDocument;
    type Link = MupdfLink;
    type Image = MupdfImage;

    fn load_document(&self, path: &Path) -> Result<Self::Doc, EngineFault> {
        if !path.exists() {
            return Err(EngineFault::NotFound(path.to_path_buf()));
        }
        let doc = Document::open(path.to_string_lossy().as_ref())
            .map_err(|error| EngineFault::corrupt(error.to_string()))?;
        if doc.needs_password().map_err(fault)? {
            return Err(EngineFault::Encrypted);
        }
        let page_count = doc.page_count().map_err(fault)? as usize;
        Ok(MupdfDocument { doc, page_count })
    }

    fn close_document(&self, doc: Self::Doc) -> Result<(), EngineFault> {
        drop(doc);
        Ok(())
    }

    fn page_count(&self, doc: &Self::Doc) -> usize {
        doc.page_count
    }

    fn page_size_points(&self, doc: &Self::Doc, page: usize) -> Result<PageSizePts, EngineFault> {
        let page = doc.load_page(page)?;
        let (width, height) = page_extent(&page)?;
        Ok(PageSizePts::new(f64::from(width), f64::from(height)))
    }

    fn render_region(
        &self,
        doc: &Self::Doc,
        page: usize,
        request: &RegionRequest,
    ) -> Result<FrameBuffer, EngineFault> {
        let page = doc.load_page(page)?;
        let (width_pt, height_pt) = page_extent(&page)?;

        let sx = request.page_px_width.max(1) as f32 / width_pt;
        let sy = request.page_px_height.max(1) as f32 / height_pt;
        let ctm = Matrix::new(
            sx,
            0.0,
            0.0,
            sy,
            request.offset_x as f32,
            request.offset_y as f32,
        );
        rasterize(
            &page,
            &ctm,
            request.out_width,
            request.out_height,
            request.flags.annotations,
        )
    }

    fn link_at_point(
        &self,
        doc: &Self::Doc,
        page: usize,
        point: PagePoint,
    ) -> Result<Option<Self::Link>, EngineFault> {
        let page = doc.load_page(page)?;
        let (_, height_pt) = page_extent(&page)?;

        let x = point.x as f32;
        let y = height_pt - point.y as f32;
        for link in page.links().map_err(fault)? {
            let bounds = link.bounds;
            if x >= bounds.x0 && x <= bounds.x1 && y >= bounds.y0 && y <= bounds.y1 {
                let dest_page = link.dest.map(|dest| dest.loc.page_number as usize);
                return Ok(Some(MupdfLink { dest_page }));
            }
        }
        Ok(None)
    }

    fn resolve_link_dest(&self, _doc: &Self::Doc, link: &Self::Link) -> Option<usize> {
        link.dest_page
    }

    fn page_objects(
        &self,
        doc: &Self::Doc,
        page: usize,
    ) -> Result<Vec<PageObject<Self::Image>>, EngineFault> {
        let page = doc.load_page(page)?;
        let (_, height_pt) = page_extent(&page)?;

        let flags = TextPageFlags::PRESERVE_IMAGES | TextPageFlags::ACCURATE_BBOXES;
        let text_page = page.to_text_page(flags).map_err(fault)?;

        let mut objects = Vec::new();
        for block in text_page.blocks() {
            let bbox = block.bounds();
            let bounds = PageRect::new(
                f64::from(bbox.x0),
                f64::from(height_pt - bbox.y1),
                f64::from(bbox.x1),
                f64::from(height_pt - bbox.y0),
            );
            let kind = if block.r#type() == TextBlockType::Image {
                let pixel_width = (((bbox.x1 - bbox.x0) * EXPORT_SCALE).round().max(1.0)) as u32;
                let pixel_height = (((bbox.y1 - bbox.y0) * EXPORT_SCALE).round().max(1.0)) as u32;
                PageObjectKind::Image {
                    handle: MupdfImage {
                        x0: bbox.x0,
                        y0: bbox.y0,
                        x1: bbox.x1,
                        y1: bbox.y1,
                    },
                    pixel_width,
                    pixel_height,
                }
            } else {
                PageObjectKind::Text
            };
            objects.push(PageObject {
                kind,
                local_matrix: Transform::IDENTITY,
                bounds,
            });
        }
        Ok(objects)
    }

    fn bounded_text(
        &self,
        doc: &Self::Doc,
        page: usize,
        rect: PageRect,
    ) -> Result<String, EngineFault> {
        let page = doc.load_page(page)?;
        let (_, height_pt) = page_extent(&page)?;

        // Query bounds in MuPDF's Y-down page space.
        let min_y = height_pt - rect.top as f32;
        let max_y = height_pt - rect.bottom as f32;
        let start_x = rect.left as f32;
        let end_x = rect.right as f32;

        let text_page = page.to_text_page(TextPageFlags::empty()).map_err(fault)?;
        let mut selected: Vec<(f32, String)> = Vec::new();

        for block in text_page.blocks() {
            if block.r#type() != TextBlockType::Text {
                continue;
            }
            for line in block.lines() {
                let bbox = line.bounds();
                if bbox.y1 < min_y || bbox.y0 > max_y {
                    continue;
                }
                let is_first_line = bbox.y0 <= min_y && bbox.y1 >= min_y;
                let is_last_line = bbox.y0 <= max_y && bbox.y1 >= max_y;

                let mut line_text = String::new();
                let mut line_y = bbox.y0;
                for ch in line.chars() {
                    let origin = ch.origin();
                    line_y = origin.y;
                    let include = if is_first_line && is_last_line {
                        origin.x >= start_x && origin.x <= end_x
                    } else if is_first_line {
                        origin.x >= start_x
                    } else if is_last_line {
                        origin.x <= end_x
                    } else {
                        true
                    };
                    if include {
                        if let Some(c) = ch.char() {
                            line_text.push(c);
                        }
                    }
                }
                if !line_text.is_empty() {
                    selected.push((line_y, line_text));
                }
            }
        }

        selected.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut text = String::new();
        for (_, line) in selected {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&line);
        }
        Ok(text.trim().to_string())
    }

    fn extract_image_pixels(
        &self,
        doc: &Self::Doc,
        page: usize,
        image: &Self::Image,
    ) -> Result<ImagePixels, EngineFault> {
        let page = doc.load_page(page)?;

        let out_width = (((image.x1 - image.x0) * EXPORT_SCALE).ceil().max(1.0)) as i32;
        let out_height = (((image.y1 - image.y0) * EXPORT_SCALE).ceil().max(1.0)) as i32;
        let ctm = Matrix::new(
            EXPORT_SCALE,
            0.0,
            0.0,
            EXPORT_SCALE,
            -image.x0 * EXPORT_SCALE,
            -image.y0 * EXPORT_SCALE,
        );

        let frame = rasterize(&page, &ctm, out_width, out_height, false)?;
        Ok(ImagePixels {
            data: frame.data,
            width: frame.width,
            height: frame.height,
            stride: frame.stride,
            format: frame.format,
            // Structured text does not surface the stream filter; exports
            // default to PNG.
            filter: None,
        })
    }
}
