use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use fieldcast_core::config::KnowledgeConfig;
use fieldcast_core::domain::knowledge::notes_from_document;
use fieldcast_core::{Degradable, IntegrationError, KnowledgeRetriever, RetrievedNote};
use lopdf::Document;
use tracing::trace;

const PDF_MAGIC: &[u8] = b"%PDF";

/// Reads leading pages of the reference document.
///
/// PDFs are read page by page. Anything else is treated as UTF-8 text with
/// form-feed page breaks, the shape `pdftotext` produces.
pub struct PagedDocumentRetriever {
    path: PathBuf,
    timeout: Duration,
}

impl PagedDocumentRetriever {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self { path: path.into(), timeout }
    }

    pub fn from_config(config: &KnowledgeConfig) -> Self {
        Self::new(config.document_path.clone(), Duration::from_secs(config.timeout_secs))
    }

    pub async fn read_notes(&self, k: usize) -> Result<Vec<RetrievedNote>, IntegrationError> {
        let bytes = tokio::time::timeout(self.timeout, tokio::fs::read(&self.path))
            .await
            .map_err(|_| IntegrationError::Timeout { secs: self.timeout.as_secs() })?
            .map_err(|error| match error.kind() {
                ErrorKind::NotFound => IntegrationError::Transport(format!(
                    "reference document `{}` does not exist",
                    self.path.display()
                )),
                _ => IntegrationError::Transport(format!(
                    "could not read reference document `{}`: {error}",
                    self.path.display()
                )),
            })?;

        if bytes.starts_with(PDF_MAGIC) {
            return pdf_notes(&bytes, k);
        }

        let text = String::from_utf8(bytes)
            .map_err(|_| IntegrationError::Unsupported("document is not UTF-8 text".to_string()))?;

        Ok(notes_from_document(&text, k))
    }
}

/// A page whose text cannot be extracted counts as blank.
fn pdf_notes(bytes: &[u8], k: usize) -> Result<Vec<RetrievedNote>, IntegrationError> {
    let document = Document::load_mem(bytes)
        .map_err(|error| IntegrationError::Malformed(format!("unreadable PDF: {error}")))?;

    Ok(document
        .get_pages()
        .into_keys()
        .take(k)
        .filter_map(|page| document.extract_text(&[page]).ok())
        .filter_map(|text| RetrievedNote::from_page(&text))
        .collect())
}

#[async_trait]
impl KnowledgeRetriever for PagedDocumentRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Degradable<Vec<RetrievedNote>> {
        trace!(event_name = "advisory.knowledge.query", query, k, "retrieving reference notes");
        Degradable::from_result(self.read_notes(k).await)
    }
}
