use serde::{Deserialize, Serialize};

pub const MAX_NOTE_CHARS: usize = 400;
pub const DEFAULT_TOP_K: usize = 3;

/// Page separator in page-structured text documents (`pdftotext` output).
pub const PAGE_BREAK: char = '\u{000C}';

/// A short excerpt of the reference document, newline-free and length-capped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetrievedNote(String);

impl RetrievedNote {
    /// Builds a note from raw page text. Whitespace-only pages yield `None`.
    pub fn from_page(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let flattened = trimmed.replace("\r\n", " ").replace(['\n', '\r'], " ");
        Some(Self(flattened.chars().take(MAX_NOTE_CHARS).collect()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Splits a document into pages and keeps notes from the first `k` of them, in page order.
pub fn notes_from_document(document: &str, k: usize) -> Vec<RetrievedNote> {
    document.split(PAGE_BREAK).take(k).filter_map(RetrievedNote::from_page).collect()
}
