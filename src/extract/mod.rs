//! Content extraction for indexed files.
//!
//! Each supported format family has its own submodule; `Extractor` picks
//! the strategy from the declared MIME type and never panics on malformed
//! input. Extraction failures come back as an `ExtractedContent` tagged
//! `error` so the indexer can record the attempt and move on.

pub mod ocr;
pub mod office;
pub mod pdf;
pub mod raster;
pub mod sheet;
pub mod text;

use std::path::Path;

use crate::extract::ocr::{OcrEngine, OcrError};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf error: {0}")]
    Pdf(String),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("spreadsheet error: {0}")]
    Sheet(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Ocr(#[from] OcrError),
}

/// Which text engine produced the PDF body text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfTextEngine {
    PdfExtract,
    Lopdf,
}

/// Character decoding that succeeded for a plain-text file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16,
    Latin1,
}

/// How the content was obtained. Rendered into the store as a short label
/// so the dashboard can show per-method coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    /// Unsupported type, or nothing was attempted.
    None,
    /// OCR ran but recognized nothing.
    NoText,
    /// Extraction was attempted and failed.
    Error,
    PdfText { engine: PdfTextEngine, ocr: bool },
    /// Neither PDF text engine found anything; OCR of embedded images did.
    PdfOcrOnly,
    Docx { ocr: bool },
    Pptx { ocr: bool },
    Spreadsheet,
    Text(TextEncoding),
    ImageOcr,
}

impl ExtractionMethod {
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::NoText => "no-text",
            Self::Error => "error",
            Self::PdfText { engine: PdfTextEngine::PdfExtract, ocr: false } => "pdf-extract",
            Self::PdfText { engine: PdfTextEngine::PdfExtract, ocr: true } => "pdf-extract+ocr",
            Self::PdfText { engine: PdfTextEngine::Lopdf, ocr: false } => "lopdf",
            Self::PdfText { engine: PdfTextEngine::Lopdf, ocr: true } => "lopdf+ocr",
            Self::PdfOcrOnly => "pdf-ocr",
            Self::Docx { ocr: false } => "docx",
            Self::Docx { ocr: true } => "docx+ocr",
            Self::Pptx { ocr: false } => "pptx",
            Self::Pptx { ocr: true } => "pptx+ocr",
            Self::Spreadsheet => "spreadsheet",
            Self::Text(TextEncoding::Utf8) => "text-utf-8",
            Self::Text(TextEncoding::Utf16) => "text-utf-16",
            Self::Text(TextEncoding::Latin1) => "text-latin-1",
            Self::ImageOcr => "tesseract-ocr",
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Extraction result. `text` may be empty; the indexer decides whether an
/// empty body is worth persisting.
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    pub text: String,
    pub method: ExtractionMethod,
}

impl ExtractedContent {
    pub fn none() -> Self {
        Self {
            text: String::new(),
            method: ExtractionMethod::None,
        }
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Format family for a declared MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Pdf,
    WordDocument,
    Presentation,
    Spreadsheet,
    PlainText,
    RasterImage,
    Unsupported,
}

/// Pure MIME dispatch; parameters (`; charset=...`) are ignored.
pub fn strategy_for(mime: &str) -> Strategy {
    let mime = mime
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "application/pdf" => Strategy::Pdf,
        "application/msword"
        | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
            Strategy::WordDocument
        }
        "application/vnd.ms-powerpoint"
        | "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
            Strategy::Presentation
        }
        "application/vnd.ms-excel"
        | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
            Strategy::Spreadsheet
        }
        "application/json" | "application/xml" | "application/javascript" | "text/csv" => {
            Strategy::PlainText
        }
        "image/jpeg" | "image/jpg" | "image/png" | "image/gif" | "image/bmp" | "image/tiff"
        | "image/webp" => Strategy::RasterImage,
        m if m.starts_with("text/") => Strategy::PlainText,
        _ => Strategy::Unsupported,
    }
}

pub struct Extractor {
    ocr: Box<dyn OcrEngine>,
}

impl Extractor {
    pub fn new(ocr: Box<dyn OcrEngine>) -> Self {
        Self { ocr }
    }

    /// Extract text from a local file according to its declared MIME type.
    /// Never fails: unsupported types yield `none`, broken files `error`.
    pub fn extract(&self, path: &Path, mime: &str) -> ExtractedContent {
        let result = match strategy_for(mime) {
            Strategy::Pdf => pdf::extract(path, self.ocr.as_ref()),
            Strategy::WordDocument => office::extract_docx(path, self.ocr.as_ref()),
            Strategy::Presentation => office::extract_pptx(path, self.ocr.as_ref()),
            Strategy::Spreadsheet => sheet::extract(path),
            Strategy::PlainText => text::extract(path),
            Strategy::RasterImage => raster::extract(path, self.ocr.as_ref()),
            Strategy::Unsupported => {
                log::debug!("unsupported mime type {:?} for {}", mime, path.display());
                return ExtractedContent::none();
            }
        };
        match result {
            Ok(content) => content,
            Err(e) => {
                log::error!("extracting {} ({}): {}", path.display(), mime, e);
                ExtractedContent {
                    text: String::new(),
                    method: ExtractionMethod::Error,
                }
            }
        }
    }
}
