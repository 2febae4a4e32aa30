//! The FULL_TEXT robot: extract, clean, produce.

use std::sync::Arc;

use async_trait::async_trait;
use pdf2search_core::{clean_text, Document, EnhancementType};
use serde_json::json;

use crate::extract::Extractor;
use crate::runtime::{HandlerOutcome, Robot};

pub const ROBOT_ID: &str = "pdf-extractor";

/// Produces `{text, raw_length, cleaned_length}` from the document's
/// PDF. Empty output before or after cleaning is a failure, not a
/// discard: an unreadable PDF is worth an operator's attention.
pub struct PdfExtractorRobot {
    extractor: Arc<dyn Extractor>,
}

impl PdfExtractorRobot {
    pub fn new(extractor: Arc<dyn Extractor>) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl Robot for PdfExtractorRobot {
    fn id(&self) -> &str {
        ROBOT_ID
    }

    fn enhancement_type(&self) -> EnhancementType {
        EnhancementType::FullText
    }

    async fn handle(&self, document: &Document) -> HandlerOutcome {
        let raw = match self.extractor.extract(&document.file_path).await {
            Ok(raw) => raw,
            Err(e) => return HandlerOutcome::Fail(e.to_string()),
        };
        if raw.trim().is_empty() {
            return HandlerOutcome::Fail("empty text extracted".to_string());
        }

        let cleaned = clean_text(&raw);
        if cleaned.trim().is_empty() {
            return HandlerOutcome::Fail("empty text after cleaning".to_string());
        }

        HandlerOutcome::Produced(json!({
            "text": cleaned,
            "raw_length": raw.chars().count(),
            "cleaned_length": cleaned.chars().count(),
        }))
    }
}
