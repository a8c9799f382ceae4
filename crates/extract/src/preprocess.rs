use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("failed to load image: {0}")]
    Load(#[from] image::ImageError),
    #[error("failed to encode processed image: {0}")]
    Encode(String),
}

// An A4 page at 200 DPI is ~2340 px on the long edge. Scans below the
// lower bound are upscaled once; oversized scans are capped to keep OCR
// memory bounded. One pass, no resolution retries.
const MIN_LONG_EDGE: u32 = 1700;
const MAX_LONG_EDGE: u32 = 2800;

/// Process raw image bytes (JPEG / PNG / …) and return normalized PNG
/// bytes ready for OCR.
pub fn prepare_for_ocr_from_bytes(data: &[u8]) -> Result<Vec<u8>, PreprocessError> {
    let img = image::load_from_memory(data)?;
    encode_as_png(normalize(img))
}

/// Process an already-decoded image.
pub fn prepare_for_ocr(img: DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    encode_as_png(normalize(img))
}

/// Grayscale + contrast stretch + one deterministic resize into the
/// target DPI band.
fn normalize(img: DynamicImage) -> DynamicImage {
    let long_edge = img.width().max(img.height());
    let img = if long_edge > MAX_LONG_EDGE {
        img.resize(MAX_LONG_EDGE, MAX_LONG_EDGE, image::imageops::FilterType::Lanczos3)
    } else if long_edge < MIN_LONG_EDGE {
        let scale = MIN_LONG_EDGE as f32 / long_edge as f32;
        img.resize(
            (img.width() as f32 * scale) as u32,
            (img.height() as f32 * scale) as u32,
            image::imageops::FilterType::Lanczos3,
        )
    } else {
        img
    };

    let gray: GrayImage = img.to_luma8();

    let (min_px, max_px) = gray
        .pixels()
        .fold((255u8, 0u8), |(mn, mx), p| (mn.min(p[0]), mx.max(p[0])));

    if max_px == min_px {
        // Uniform image — nothing to stretch.
        return DynamicImage::ImageLuma8(gray);
    }

    let range = (max_px - min_px) as u32;
    let stretched: GrayImage = ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let p = gray.get_pixel(x, y)[0];
        let v = ((p - min_px) as u32 * 255 / range) as u8;
        Luma([v])
    });

    DynamicImage::ImageLuma8(stretched)
}

fn encode_as_png(img: DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}
