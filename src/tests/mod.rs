
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use image::DynamicImage;

use crate::db::Database;
use crate::extract::ocr::{OcrEngine, OcrError};
use crate::records::{NewFile, NewLink};
use crate::search::embedder::EmbedError;
use crate::search::Embedder;

/// Deterministic embedder: one dimension per marker word plus a constant
/// dimension so no vector is ever zero. Texts sharing marker words come
/// out cosine-similar; unrelated texts do not.
pub struct KeywordEmbedder;

const MARKERS: [&str; 4] = ["budget", "kitten", "deploy", "report"];

impl Embedder for KeywordEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = MARKERS
            .iter()
            .map(|word| lower.matches(word).count() as f32)
            .collect();
        vector.push(0.1);
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        "keyword-stub"
    }
}

pub fn keyword_embedder() -> Arc<dyn Embedder> {
    Arc::new(KeywordEmbedder)
}

pub struct NoopOcr;

impl OcrEngine for NoopOcr {
    fn recognize(&self, _image: &DynamicImage) -> Result<String, OcrError> {
        Ok(String::new())
    }
}

pub fn fresh_db() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.init_schema().unwrap();
    db
}

pub fn file_named(message_id: &str, filename: &str, message: &str) -> NewFile {
    NewFile {
        message_id: message_id.to_string(),
        channel_id: "c1".to_string(),
        channel_name: Some("general".to_string()),
        guild_id: Some("g1".to_string()),
        guild_name: Some("engineering".to_string()),
        author_id: "u1".to_string(),
        author_name: Some("alice".to_string()),
        filename: filename.to_string(),
        file_url: format!("https://cdn.example/{filename}"),
        file_size: Some(1024),
        file_type: Some("text/plain".to_string()),
        message_content: Some(message.to_string()),
        timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
    }
}

pub fn link_named(message_id: &str, url: &str, message: &str) -> NewLink {
    NewLink {
        message_id: message_id.to_string(),
        channel_id: "c1".to_string(),
        channel_name: Some("general".to_string()),
        guild_id: Some("g1".to_string()),
        guild_name: Some("engineering".to_string()),
        author_id: "u2".to_string(),
        author_name: Some("bob".to_string()),
        link_url: url.to_string(),
        link_domain: url::Url::parse(url)
            .ok()
            .and_then(|u| u.domain().map(String::from)),
        message_content: Some(message.to_string()),
        timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
    }
}
