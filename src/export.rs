//! Image and page export
//!
//! Normalizes engine buffers (BGRA, RGB, grayscale, arbitrary stride) into
//! RGBA and writes PNG or JPEG containers. The container follows the image
//! object's original stream filter: DCT-encoded sources stay JPEG, with a
//! PNG fallback when the JPEG encoder rejects the data.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use log::warn;

use crate::engine::{FrameBuffer, ImageFilter, ImagePixels, PixelFormat};

/// Container written by an export.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Jpeg,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("export io: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encode: {0}")]
    Encode(#[from] image::ImageError),

    #[error("pixel buffer does not match its declared geometry")]
    BadBuffer,
}

/// Pick the output container for an image object's pixels.
#[must_use]
pub fn container_for(pixels: &ImagePixels) -> ExportFormat {
    match pixels.filter {
        Some(ImageFilter::Dct) => ExportFormat::Jpeg,
        _ => ExportFormat::Png,
    }
}

/// Convert an engine buffer into RGBA, honoring stride and pixel layout.
pub fn buffer_to_rgba(
    data: &[u8],
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
) -> Result<RgbaImage, ExportError> {
    let width_usize = width as usize;
    let height_usize = height as usize;
    let bpp = format.bytes_per_pixel();
    let row_bytes = width_usize * bpp;
    if row_bytes > stride || data.len() < stride.saturating_mul(height_usize.saturating_sub(1)) + row_bytes
    {
        return Err(ExportError::BadBuffer);
    }

    let mut out = Vec::with_capacity(width_usize * height_usize * 4);
    for y in 0..height_usize {
        let row = &data[y * stride..y * stride + row_bytes];
        match format {
            PixelFormat::Rgba8 => out.extend_from_slice(row),
            PixelFormat::Bgra8 => {
                for px in row.chunks_exact(4) {
                    out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
                }
            }
            PixelFormat::Rgb8 => {
                for px in row.chunks_exact(3) {
                    out.extend_from_slice(&[px[0], px[1], px[2], 255]);
                }
            }
            PixelFormat::Gray8 => {
                for &value in row {
                    out.extend_from_slice(&[value, value, value, 255]);
                }
            }
        }
    }

    RgbaImage::from_raw(width, height, out).ok_or(ExportError::BadBuffer)
}

/// Save image-object pixels, choosing the container by filter hint.
///
/// Returns the container actually written (a failed JPEG encode falls back
/// to PNG next to the requested path).
pub fn save_image(
    path: &Path,
    pixels: &ImagePixels,
    jpeg_quality: u8,
) -> Result<ExportFormat, ExportError> {
    let rgba = buffer_to_rgba(
        &pixels.data,
        pixels.width,
        pixels.height,
        pixels.stride,
        pixels.format,
    )?;

    match container_for(pixels) {
        ExportFormat::Jpeg => match save_jpeg(path, &rgba, jpeg_quality) {
            Ok(()) => Ok(ExportFormat::Jpeg),
            Err(error) => {
                warn!("JPEG export failed ({error}), falling back to PNG");
                let fallback = path.with_extension("png");
                save_png(&fallback, &rgba)?;
                Ok(ExportFormat::Png)
            }
        },
        ExportFormat::Png => {
            save_png(path, &rgba)?;
            Ok(ExportFormat::Png)
        }
    }
}

/// Save a rendered frame (page or visible region) as PNG.
pub fn save_frame_png(path: &Path, frame: &FrameBuffer) -> Result<(), ExportError> {
    let rgba = buffer_to_rgba(
        &frame.data,
        frame.width,
        frame.height,
        frame.stride,
        frame.format,
    )?;
    save_png(path, &rgba)
}

fn save_png(path: &Path, rgba: &RgbaImage) -> Result<(), ExportError> {
    rgba.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

fn save_jpeg(path: &Path, rgba: &RgbaImage, quality: u8) -> Result<(), ExportError> {
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgba8(rgba.clone()).into_rgb8();
    let file = File::create(path)?;
    let mut encoder = JpegEncoder::new_with_quality(BufWriter::new(file), quality.clamp(1, 100));
    encoder.encode_image(&rgb)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixels(format: PixelFormat, filter: Option<ImageFilter>) -> ImagePixels {
        let bpp = format.bytes_per_pixel();
        ImagePixels {
            data: vec![100; 2 * 2 * bpp],
            width: 2,
            height: 2,
            stride: 2 * bpp,
            format,
            filter,
        }
    }

    #[test]
    fn dct_sources_prefer_jpeg() {
        assert_eq!(
            container_for(&pixels(PixelFormat::Rgb8, Some(ImageFilter::Dct))),
            ExportFormat::Jpeg
        );
        assert_eq!(
            container_for(&pixels(PixelFormat::Rgb8, Some(ImageFilter::Flate))),
            ExportFormat::Png
        );
        assert_eq!(container_for(&pixels(PixelFormat::Rgb8, None)), ExportFormat::Png);
    }

    #[test]
    fn bgra_channels_swap_into_rgba() {
        let data = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let rgba = buffer_to_rgba(&data, 2, 1, 8, PixelFormat::Bgra8).unwrap();
        assert_eq!(rgba.get_pixel(0, 0).0, [3, 2, 1, 4]);
        assert_eq!(rgba.get_pixel(1, 0).0, [7, 6, 5, 8]);
    }

    #[test]
    fn gray_expands_to_opaque_rgba() {
        let data = vec![9, 200];
        let rgba = buffer_to_rgba(&data, 2, 1, 2, PixelFormat::Gray8).unwrap();
        assert_eq!(rgba.get_pixel(0, 0).0, [9, 9, 9, 255]);
        assert_eq!(rgba.get_pixel(1, 0).0, [200, 200, 200, 255]);
    }

    #[test]
    fn stride_padding_is_skipped() {
        // 1 px rows of RGB with 5 bytes of stride (2 bytes padding).
        let data = vec![10, 20, 30, 0, 0, 40, 50, 60, 0, 0];
        let rgba = buffer_to_rgba(&data, 1, 2, 5, PixelFormat::Rgb8).unwrap();
        assert_eq!(rgba.get_pixel(0, 0).0, [10, 20, 30, 255]);
        assert_eq!(rgba.get_pixel(0, 1).0, [40, 50, 60, 255]);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let data = vec![0; 5];
        assert!(matches!(
            buffer_to_rgba(&data, 2, 2, 8, PixelFormat::Bgra8),
            Err(ExportError::BadBuffer)
        ));
    }

    #[test]
    fn writes_png_and_jpeg_files() {
        let dir = tempfile::tempdir().unwrap();

        let png_target = dir.path().join("image.png");
        let written = save_image(&png_target, &pixels(PixelFormat::Rgb8, None), 90).unwrap();
        assert_eq!(written, ExportFormat::Png);
        assert!(png_target.exists());

        let jpeg_target = dir.path().join("image.jpg");
        let written = save_image(
            &jpeg_target,
            &pixels(PixelFormat::Rgb8, Some(ImageFilter::Dct)),
            90,
        )
        .unwrap();
        assert_eq!(written, ExportFormat::Jpeg);
        assert!(jpeg_target.exists());
    }
}
