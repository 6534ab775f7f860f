//! PDF text extraction with a two-engine ladder and an OCR fallback.
//!
//! `pdf-extract` handles most text-layer PDFs; `lopdf` page-by-page
//! extraction catches some files the first engine rejects. When the text
//! layer yields less than `OCR_FALLBACK_THRESHOLD` characters the PDF is
//! assumed to be scanned and its embedded JPEG images go through OCR.

use std::path::Path;

use image::DynamicImage;
use lopdf::{Dictionary, Document, Object, Stream};

use crate::extract::ocr::{is_decorative, OcrEngine};
use crate::extract::{ExtractError, ExtractedContent, ExtractionMethod, PdfTextEngine};

/// Page bound for both lopdf text extraction and the OCR sweep.
pub const PDF_PAGE_LIMIT: usize = 50;

/// Below this many characters of text-layer output, run the OCR sweep.
pub const OCR_FALLBACK_THRESHOLD: usize = 100;

pub fn extract(path: &Path, ocr: &dyn OcrEngine) -> Result<ExtractedContent, ExtractError> {
    let bytes = std::fs::read(path)?;

    let mut text = String::new();
    let mut engine: Option<PdfTextEngine> = None;
    let mut parsed_by_any = false;

    match pdf_extract::extract_text_from_mem(&bytes) {
        Ok(extracted) => {
            parsed_by_any = true;
            if !extracted.trim().is_empty() {
                text = extracted;
                engine = Some(PdfTextEngine::PdfExtract);
            }
        }
        Err(e) => log::warn!("pdf-extract failed for {}: {}", path.display(), e),
    }

    let doc = match Document::load_mem(&bytes) {
        Ok(doc) => {
            parsed_by_any = true;
            Some(doc)
        }
        Err(e) => {
            log::warn!("lopdf failed to parse {}: {}", path.display(), e);
            None
        }
    };

    if text.trim().is_empty() {
        if let Some(doc) = doc.as_ref() {
            let fallback = pages_text(doc);
            if !fallback.trim().is_empty() {
                text = fallback;
                engine = Some(PdfTextEngine::Lopdf);
            }
        }
    }

    let mut ocr_used = false;
    if needs_ocr_sweep(&text) {
        if let Some(doc) = doc.as_ref() {
            let recognized = ocr_embedded_images(doc, ocr);
            if !recognized.trim().is_empty() {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&recognized);
                ocr_used = true;
            }
        }
    }

    let method = match (engine, ocr_used) {
        (Some(engine), ocr) => ExtractionMethod::PdfText { engine, ocr },
        (None, true) => ExtractionMethod::PdfOcrOnly,
        // A text-bearing parse that found nothing is a scanned or empty
        // PDF; a file neither engine could parse is broken.
        (None, false) if parsed_by_any => ExtractionMethod::None,
        (None, false) => ExtractionMethod::Error,
    };
    Ok(ExtractedContent { text, method })
}

/// Scanned-PDF heuristic: a real text layer produces well over
/// `OCR_FALLBACK_THRESHOLD` characters; less than that means the text is
/// likely trapped in images.
fn needs_ocr_sweep(text: &str) -> bool {
    text.trim().chars().count() < OCR_FALLBACK_THRESHOLD
}

/// Page-by-page text via lopdf, bounded by `PDF_PAGE_LIMIT`. A page that
/// fails to decode is skipped, not fatal.
fn pages_text(doc: &Document) -> String {
    let mut out = String::new();
    for (page_num, _object_id) in doc.get_pages().into_iter().take(PDF_PAGE_LIMIT) {
        match doc.extract_text(&[page_num]) {
            Ok(page) => {
                out.push_str(&page);
                out.push('\n');
            }
            Err(e) => log::debug!("page {} text extraction failed: {}", page_num, e),
        }
    }
    out
}

/// OCR every embedded image XObject, skipping decorative-sized ones.
/// Only DCTDecode (JPEG) streams are decoded; other filters (CCITT,
/// JBIG2, raw) are rare in chat uploads and are skipped.
fn ocr_embedded_images(doc: &Document, ocr: &dyn OcrEngine) -> String {
    let mut out = String::new();
    for (page_index, (_page_num, page_id)) in
        doc.get_pages().into_iter().enumerate().take(PDF_PAGE_LIMIT)
    {
        let (direct, referenced) = doc.get_page_resources(page_id);
        let mut resource_dicts: Vec<&Dictionary> = direct.into_iter().collect();
        for id in referenced {
            if let Ok(Object::Dictionary(dict)) = doc.get_object(id) {
                resource_dicts.push(dict);
            }
        }

        let mut image_index = 0usize;
        for resources in resource_dicts {
            let Ok(xobjects) = resources.get(b"XObject").and_then(Object::as_dict) else {
                continue;
            };
            for (_name, value) in xobjects.iter() {
                let Some(stream) = resolve_stream(doc, value) else {
                    continue;
                };
                if !is_image_stream(stream) {
                    continue;
                }
                image_index += 1;
                let Some(img) = decode_jpeg_stream(stream) else {
                    continue;
                };
                if is_decorative(&img) {
                    continue;
                }
                match ocr.recognize(&img) {
                    Ok(recognized) if !recognized.trim().is_empty() => {
                        out.push_str(&format!(
                            "[Image {}-{}]: {}\n",
                            page_index + 1,
                            image_index,
                            recognized.trim()
                        ));
                    }
                    Ok(_) => {}
                    Err(e) => log::warn!(
                        "ocr failed for image {} on page {}: {}",
                        image_index,
                        page_index + 1,
                        e
                    ),
                }
            }
        }
    }
    out
}

fn resolve_stream<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Stream> {
    let resolved = match object {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    match resolved {
        Object::Stream(stream) => Some(stream),
        _ => None,
    }
}

fn is_image_stream(stream: &Stream) -> bool {
    stream
        .dict
        .get(b"Subtype")
        .and_then(Object::as_name)
        .map(|name| name == b"Image".as_slice())
        .unwrap_or(false)
}

fn decode_jpeg_stream(stream: &Stream) -> Option<DynamicImage> {
    if !has_dct_filter(&stream.dict) {
        return None;
    }
    image::load_from_memory(&stream.content).ok()
}

fn has_dct_filter(dict: &Dictionary) -> bool {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => name.as_slice() == b"DCTDecode",
        Ok(Object::Array(filters)) => filters.iter().any(|f| {
            matches!(f, Object::Name(name) if name.as_slice() == b"DCTDecode")
        }),
        _ => false,
    }
}
