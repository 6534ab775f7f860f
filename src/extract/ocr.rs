//! OCR engine seam.
//!
//! Production OCR shells out to tesseract via `rusty-tesseract`. The trait
//! exists so extraction logic can be tested without a tesseract install.

use image::DynamicImage;

/// Minimum width/height for an embedded image to be worth OCR'ing.
/// Anything smaller is treated as decorative (icons, bullets, rules).
pub const MIN_EMBEDDED_IMAGE_DIM: u32 = 50;

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("ocr failed: {0}")]
    Failed(String),
}

pub trait OcrEngine: Send + Sync {
    /// Recognized text, trimmed. Empty string means OCR ran and found
    /// nothing; an error means it could not run at all.
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

/// Tesseract-backed OCR. Requires the `tesseract` binary on PATH.
pub struct TesseractOcr {
    lang: String,
}

impl TesseractOcr {
    pub fn new() -> Self {
        Self {
            lang: "eng".to_string(),
        }
    }

    pub fn with_lang(lang: &str) -> Self {
        Self {
            lang: lang.to_string(),
        }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let img = rusty_tesseract::Image::from_dynamic_image(image)
            .map_err(|e| OcrError::Failed(e.to_string()))?;
        let args = rusty_tesseract::Args {
            lang: self.lang.clone(),
            // Assume a uniform block of text; works better than the default
            // full-page segmentation on screenshots and document scans.
            psm: Some(6),
            ..rusty_tesseract::Args::default()
        };
        let text = rusty_tesseract::image_to_string(&img, &args)
            .map_err(|e| OcrError::Failed(e.to_string()))?;
        Ok(text.trim().to_string())
    }
}

/// Embedded-asset filter: skip images below the decorative threshold.
pub fn is_decorative(image: &DynamicImage) -> bool {
    image.width() < MIN_EMBEDDED_IMAGE_DIM || image.height() < MIN_EMBEDDED_IMAGE_DIM
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    #[test]
    fn small_images_are_decorative() {
        let small = DynamicImage::ImageRgb8(RgbImage::new(49, 200));
        let narrow = DynamicImage::ImageRgb8(RgbImage::new(200, 10));
        let ok = DynamicImage::ImageRgb8(RgbImage::new(50, 50));
        assert!(is_decorative(&small));
        assert!(is_decorative(&narrow));
        assert!(!is_decorative(&ok));
    }
}
