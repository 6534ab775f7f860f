//! Direct OCR of image uploads.
//!
//! Unlike embedded document assets, a directly-shared image is always
//! worth an OCR pass regardless of its dimensions.

use std::path::Path;

use crate::extract::ocr::OcrEngine;
use crate::extract::{ExtractError, ExtractedContent, ExtractionMethod};

pub fn extract(path: &Path, ocr: &dyn OcrEngine) -> Result<ExtractedContent, ExtractError> {
    let img = image::open(path)?;
    match ocr.recognize(&img) {
        Ok(recognized) if !recognized.trim().is_empty() => Ok(ExtractedContent {
            text: recognized.trim().to_string(),
            method: ExtractionMethod::ImageOcr,
        }),
        Ok(_) => Ok(ExtractedContent {
            text: String::new(),
            method: ExtractionMethod::NoText,
        }),
        Err(e) => {
            log::error!("ocr failed for {}: {}", path.display(), e);
            Ok(ExtractedContent {
                text: String::new(),
                method: ExtractionMethod::Error,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    use crate::extract::ocr::OcrError;
    use crate::extract::tests::NoopOcr;

    struct FixedOcr(&'static str);

    impl OcrEngine for FixedOcr {
        fn recognize(&self, _image: &DynamicImage) -> Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingOcr;

    impl OcrEngine for FailingOcr {
        fn recognize(&self, _image: &DynamicImage) -> Result<String, OcrError> {
            Err(OcrError::Failed("tesseract not installed".to_string()))
        }
    }

    fn sample_png(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("shot.png");
        DynamicImage::ImageRgb8(RgbImage::new(64, 64))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn recognized_text_is_trimmed_and_labeled() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_png(dir.path());
        let content = extract(&path, &FixedOcr("  error: connection refused  ")).unwrap();
        assert_eq!(content.text, "error: connection refused");
        assert_eq!(content.method, ExtractionMethod::ImageOcr);
    }

    #[test]
    fn blank_image_yields_no_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_png(dir.path());
        let content = extract(&path, &NoopOcr).unwrap();
        assert!(!content.has_text());
        assert_eq!(content.method, ExtractionMethod::NoText);
    }

    #[test]
    fn ocr_failure_is_recorded_not_propagated() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_png(dir.path());
        let content = extract(&path, &FailingOcr).unwrap();
        assert_eq!(content.method, ExtractionMethod::Error);
    }
}
