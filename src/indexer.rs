//! Content indexing driver: downloads indexed files and runs extraction.
//!
//! Files live on the chat platform's CDN; each one is fetched to a temp
//! file, pushed through `Extractor`, and the resulting text stored in
//! `file_content`. Only non-empty text is persisted, so re-runs retry
//! files whose extraction previously came up empty.

use std::path::Path;
use std::time::Duration;

use crate::db::{Database, StoreError};
use crate::extract::{strategy_for, ExtractionMethod, Extractor, Strategy};
use crate::records::{ContentRunStats, ContentStats, IndexedFile};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("download error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// What happened to a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// Extracted text was stored.
    Stored,
    /// Content already present; nothing was done.
    AlreadyIndexed,
    /// Unsupported type, or extraction found no text.
    Skipped,
    /// Download or extraction failed.
    Failed,
}

pub struct ContentIndexer {
    db: Database,
    extractor: Extractor,
    client: reqwest::blocking::Client,
}

impl ContentIndexer {
    pub fn new(db: Database, extractor: Extractor) -> Result<Self, IndexError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()?;
        Ok(Self {
            db,
            extractor,
            client,
        })
    }

    /// Download and extract a single file.
    pub fn index_file(&self, file: &IndexedFile) -> Result<IndexOutcome, IndexError> {
        if self.db.has_content(file.id)? {
            return Ok(IndexOutcome::AlreadyIndexed);
        }
        let Some(mime) = resolve_mime(file) else {
            log::debug!("no mime type for {}, skipping", file.filename);
            return Ok(IndexOutcome::Skipped);
        };
        if strategy_for(&mime) == Strategy::Unsupported {
            log::debug!("unsupported type {} for {}, skipping", mime, file.filename);
            return Ok(IndexOutcome::Skipped);
        }

        let (tmp, size_bytes) = self.download(&file.file_url, &file.filename)?;
        self.index_local_file(file, tmp.path(), &mime, size_bytes)
    }

    /// Extraction and persistence for an already-local file. Split out of
    /// `index_file` so tests can bypass the network.
    pub fn index_local_file(
        &self,
        file: &IndexedFile,
        path: &Path,
        mime: &str,
        size_bytes: i64,
    ) -> Result<IndexOutcome, IndexError> {
        let content = self.extractor.extract(path, mime);
        if content.method == ExtractionMethod::Error {
            return Ok(IndexOutcome::Failed);
        }
        if !content.has_text() {
            log::debug!(
                "no text in {} (method {})",
                file.filename,
                content.method
            );
            return Ok(IndexOutcome::Skipped);
        }
        self.db.upsert_file_content(
            file.id,
            &content.text,
            content.method.label(),
            size_bytes,
        )?;
        log::info!(
            "indexed content for {} ({} chars, {})",
            file.filename,
            content.text.chars().count(),
            content.method
        );
        Ok(IndexOutcome::Stored)
    }

    /// Run extraction for every file that has no stored content, newest
    /// first. Per-file failures are counted, never fatal to the run.
    pub fn index_all_missing(&self) -> Result<ContentRunStats, IndexError> {
        let pending = self.db.files_missing_content()?;
        let mut stats = ContentRunStats {
            total: pending.len(),
            ..ContentRunStats::default()
        };

        for file in &pending {
            match self.index_file(file) {
                Ok(IndexOutcome::Stored) => stats.stored += 1,
                Ok(IndexOutcome::Skipped) | Ok(IndexOutcome::AlreadyIndexed) => {
                    stats.skipped += 1
                }
                Ok(IndexOutcome::Failed) => stats.failed += 1,
                Err(e) => {
                    log::error!("indexing {}: {}", file.filename, e);
                    stats.failed += 1;
                }
            }
        }

        log::info!(
            "content run: {} stored, {} skipped, {} failed of {}",
            stats.stored,
            stats.skipped,
            stats.failed,
            stats.total
        );
        Ok(stats)
    }

    pub fn content_stats(&self) -> Result<ContentStats, StoreError> {
        self.db.content_stats()
    }

    fn download(&self, url: &str, filename: &str) -> Result<(tempfile::NamedTempFile, i64), IndexError> {
        // Keep the original extension: spreadsheet and image decoding
        // sniff format from it.
        let suffix = Path::new(filename)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let mut tmp = tempfile::Builder::new()
            .prefix("chatdex-")
            .suffix(&suffix)
            .tempfile()?;
        let mut response = self.client.get(url).send()?.error_for_status()?;
        let written = response.copy_to(tmp.as_file_mut())?;
        Ok((tmp, written as i64))
    }
}

/// Declared MIME type first, extension sniff as fallback.
fn resolve_mime(file: &IndexedFile) -> Option<String> {
    if let Some(declared) = &file.file_type {
        if !declared.trim().is_empty() {
            return Some(declared.clone());
        }
    }
    mime_from_extension(&file.filename).map(String::from)
}

fn mime_from_extension(filename: &str) -> Option<&'static str> {
    let ext = Path::new(filename).extension()?.to_string_lossy().to_lowercase();
    let mime = match ext.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "csv" => "text/csv",
        "json" => "application/json",
        "md" | "markdown" => "text/markdown",
        "txt" | "log" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        _ => return None,
    };
    Some(mime)
}
