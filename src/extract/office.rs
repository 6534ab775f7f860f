//! DOCX and PPTX extraction.
//!
//! Both formats are zip archives of XML parts. Text lives in `t` runs
//! (`w:t` for Word, `a:t` for PowerPoint); paragraphs close with a `p`
//! element. Embedded media under `word/media/` / `ppt/media/` goes
//! through OCR so screenshots pasted into documents stay searchable.

use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use crate::extract::ocr::{is_decorative, OcrEngine};
use crate::extract::{ExtractError, ExtractedContent, ExtractionMethod};

/// Decks beyond this many slides are cut off.
pub const SLIDE_LIMIT: usize = 100;

pub fn extract_docx(path: &Path, ocr: &dyn OcrEngine) -> Result<ExtractedContent, ExtractError> {
    let file = std::fs::File::open(path)?;
    let mut archive = ZipArchive::new(file)?;

    let mut text = String::new();
    match read_entry(&mut archive, "word/document.xml") {
        Some(xml) => text = text_runs(&xml),
        None => log::warn!("{} has no word/document.xml", path.display()),
    }

    let recognized = ocr_media(&mut archive, "word/media/", ocr);
    let ocr_used = !recognized.trim().is_empty();
    if ocr_used {
        text.push_str(&recognized);
    }

    Ok(ExtractedContent {
        text,
        method: ExtractionMethod::Docx { ocr: ocr_used },
    })
}

pub fn extract_pptx(path: &Path, ocr: &dyn OcrEngine) -> Result<ExtractedContent, ExtractError> {
    let file = std::fs::File::open(path)?;
    let mut archive = ZipArchive::new(file)?;

    let mut slides: Vec<(usize, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
        .collect();
    slides.sort();

    let mut text = String::new();
    for (number, name) in slides.into_iter().take(SLIDE_LIMIT) {
        if let Some(xml) = read_entry(&mut archive, &name) {
            text.push_str(&format!("Slide {}:\n", number));
            text.push_str(&text_runs(&xml));
            text.push('\n');
        }
    }

    let recognized = ocr_media(&mut archive, "ppt/media/", ocr);
    let ocr_used = !recognized.trim().is_empty();
    if ocr_used {
        text.push_str(&recognized);
    }

    Ok(ExtractedContent {
        text,
        method: ExtractionMethod::Pptx { ocr: ocr_used },
    })
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Option<String> {
    let mut entry = archive.by_name(name).ok()?;
    let mut content = String::new();
    entry.read_to_string(&mut content).ok()?;
    Some(content)
}

/// `ppt/slides/slide12.xml` -> `Some(12)`.
fn slide_number(name: &str) -> Option<usize> {
    name.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Collect the character data of every `t` element, one line per closed
/// `p` element. Namespace prefixes are ignored so the same walk serves
/// both `w:` and `a:` vocabularies.
fn text_runs(xml: &str) -> String {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text_run = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text_run += 1,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = in_text_run.saturating_sub(1),
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run > 0 => {
                if let Ok(fragment) = t.unescape() {
                    out.push_str(&fragment);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("xml parse stopped early: {}", e);
                break;
            }
            Ok(_) => {}
        }
    }
    out
}

/// OCR image entries under the given media prefix, in name order for
/// stable output. Undecodable or decorative-sized entries are skipped.
fn ocr_media<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    prefix: &str,
    ocr: &dyn OcrEngine,
) -> String {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|name| name.starts_with(prefix) && has_image_extension(name))
        .map(String::from)
        .collect();
    names.sort();

    let mut out = String::new();
    for (index, name) in names.iter().enumerate() {
        let mut data = Vec::new();
        {
            let Ok(mut entry) = archive.by_name(name) else {
                continue;
            };
            if entry.read_to_end(&mut data).is_err() {
                continue;
            }
        }
        let Ok(img) = image::load_from_memory(&data) else {
            continue;
        };
        if is_decorative(&img) {
            continue;
        }
        match ocr.recognize(&img) {
            Ok(recognized) if !recognized.trim().is_empty() => {
                out.push_str(&format!("[Image {}]: {}\n", index + 1, recognized.trim()));
            }
            Ok(_) => {}
            Err(e) => log::warn!("ocr failed for {}: {}", name, e),
        }
    }
    out
}

fn has_image_extension(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    ["png", "jpg", "jpeg", "gif", "bmp", "tiff"]
        .iter()
        .any(|ext| lower.ends_with(&format!(".{ext}")))
}
