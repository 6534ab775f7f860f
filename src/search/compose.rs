//! Embedding text construction.
//!
//! The exact string that gets embedded matters: stored embeddings are only
//! comparable to query embeddings if every regeneration produces the same
//! text for the same row. Fragments are labeled, only present fields are
//! included, field order is fixed, and fragments are joined by single spaces.

use crate::records::{IndexedFile, IndexedLink};

/// `"Filename: .. Type: .. Author: .. Channel: .. Message: .."`
pub fn file_embedding_text(file: &IndexedFile) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(5);
    push_fragment(&mut parts, "Filename", Some(&file.filename));
    push_fragment(&mut parts, "Type", file.file_type.as_deref());
    push_fragment(&mut parts, "Author", file.author_name.as_deref());
    push_fragment(&mut parts, "Channel", file.channel_name.as_deref());
    push_fragment(&mut parts, "Message", file.message_content.as_deref());
    parts.join(" ")
}

/// `"URL: .. Domain: .. Author: .. Channel: .. Message: .."`
pub fn link_embedding_text(link: &IndexedLink) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(5);
    push_fragment(&mut parts, "URL", Some(&link.link_url));
    push_fragment(&mut parts, "Domain", link.link_domain.as_deref());
    push_fragment(&mut parts, "Author", link.author_name.as_deref());
    push_fragment(&mut parts, "Channel", link.channel_name.as_deref());
    push_fragment(&mut parts, "Message", link.message_content.as_deref());
    parts.join(" ")
}

fn push_fragment(parts: &mut Vec<String>, label: &str, value: Option<&str>) {
    if let Some(value) = value {
        if !value.is_empty() {
            parts.push(format!("{}: {}", label, value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_file() -> IndexedFile {
        IndexedFile {
            id: 1,
            message_id: "m1".to_string(),
            channel_id: "c1".to_string(),
            channel_name: Some("general".to_string()),
            guild_id: None,
            guild_name: None,
            author_id: "u1".to_string(),
            author_name: Some("alice".to_string()),
            filename: "report.pdf".to_string(),
            file_url: "https://cdn/report.pdf".to_string(),
            file_size: None,
            file_type: Some("application/pdf".to_string()),
            message_content: Some("see attached".to_string()),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            indexed_at: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn file_text_exact_format() {
        assert_eq!(
            file_embedding_text(&sample_file()),
            "Filename: report.pdf Type: application/pdf Author: alice Channel: general Message: see attached"
        );
    }

    #[test]
    fn absent_fields_are_omitted() {
        let mut file = sample_file();
        file.file_type = None;
        file.message_content = None;
        assert_eq!(
            file_embedding_text(&file),
            "Filename: report.pdf Author: alice Channel: general"
        );
    }

    #[test]
    fn empty_fields_are_omitted() {
        let mut file = sample_file();
        file.author_name = Some(String::new());
        assert_eq!(
            file_embedding_text(&file),
            "Filename: report.pdf Type: application/pdf Channel: general Message: see attached"
        );
    }

    #[test]
    fn link_text_exact_format() {
        let link = IndexedLink {
            id: 1,
            message_id: "m1".to_string(),
            channel_id: "c1".to_string(),
            channel_name: Some("general".to_string()),
            guild_id: None,
            guild_name: None,
            author_id: "u1".to_string(),
            author_name: Some("bob".to_string()),
            link_url: "https://example.com/post".to_string(),
            link_domain: Some("example.com".to_string()),
            message_content: Some("worth reading".to_string()),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            indexed_at: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        };
        assert_eq!(
            link_embedding_text(&link),
            "URL: https://example.com/post Domain: example.com Author: bob Channel: general Message: worth reading"
        );
    }
}
