//! Per-document projection from catalog + artifacts into the index.

use pdf2search_core::{latest_enhancement, metadata_content, Document, Enhancement, EnhancementType};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::Result;
use crate::index::IndexManager;

/// The indexed view of one document. Missing metadata serializes as
/// null (never empty string) so term filters behave correctly;
/// `full_text` falls back to the empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexedPaper {
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub authors: Vec<String>,
    pub keywords: Vec<String>,
    pub venue: Option<String>,
    pub year: Option<i64>,
    pub tags: Vec<String>,
    pub item_type: Option<String>,
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folders: Option<Vec<String>>,
    pub file_path: String,
    pub full_text: String,
}

fn string_field(metadata: Option<&Value>, key: &str) -> Option<String> {
    metadata?
        .get(key)?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_list(metadata: Option<&Value>, key: &str) -> Vec<String> {
    metadata
        .and_then(|m| m.get(key))
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Build the indexable view of one document from its accumulated
/// artifacts. Full text comes from the latest FULL_TEXT artifact; the
/// bibliographic fields from the latest PAPERPILE_METADATA artifact.
pub fn project(document: &Document, enhancements: &[Enhancement]) -> IndexedPaper {
    let full_text = latest_enhancement(enhancements, EnhancementType::FullText)
        .and_then(|e| e.content.get("text"))
        .and_then(|t| t.as_str())
        .unwrap_or_default()
        .to_string();

    let metadata = metadata_content(enhancements);

    let folders = {
        let list = string_list(metadata, "folders");
        if list.is_empty() {
            None
        } else {
            Some(list)
        }
    };

    IndexedPaper {
        title: string_field(metadata, "title"),
        abstract_text: string_field(metadata, "abstract"),
        authors: string_list(metadata, "authors"),
        keywords: string_list(metadata, "keywords"),
        venue: string_field(metadata, "venue"),
        year: metadata
            .and_then(|m| m.get("year"))
            .and_then(|y| y.as_i64()),
        tags: string_list(metadata, "tags"),
        item_type: string_field(metadata, "item_type"),
        doi: string_field(metadata, "doi"),
        arxiv_id: string_field(metadata, "arxiv_id"),
        folders,
        file_path: document.file_path.to_string_lossy().into_owned(),
        full_text,
    }
}

impl IndexManager {
    /// Bulk-index documents with their artifacts into the alias.
    /// Per-document failures are logged and skipped, never raised.
    /// Returns the count successfully indexed.
    pub async fn bulk_index(
        &self,
        items: &[(Document, Vec<Enhancement>)],
    ) -> Result<usize> {
        if items.is_empty() {
            return Ok(0);
        }

        let mut ndjson = String::new();
        for (document, enhancements) in items {
            let action = serde_json::json!({
                "index": {"_index": self.alias(), "_id": document.id}
            });
            let source = project(document, enhancements);
            ndjson.push_str(&action.to_string());
            ndjson.push('\n');
            ndjson.push_str(&serde_json::to_string(&source).expect("projection serializes"));
            ndjson.push('\n');
        }

        let body = self.client().post_ndjson("/_bulk", ndjson).await?.into_body()?;

        let mut indexed = 0;
        let mut failed = 0;
        if let Some(item_results) = body.get("items").and_then(|i| i.as_array()) {
            for item in item_results {
                let status = item
                    .get("index")
                    .and_then(|op| op.get("status"))
                    .and_then(|s| s.as_u64())
                    .unwrap_or(0);
                if (200..300).contains(&status) {
                    indexed += 1;
                } else {
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            warn!(failed, "bulk index had errors");
        }
        info!(indexed, "bulk indexed documents");
        Ok(indexed)
    }

    /// Project documents into the alias: ensure the alias exists,
    /// bulk-index, then refresh for immediate searchability.
    pub async fn sync_documents(
        &self,
        items: &[(Document, Vec<Enhancement>)],
    ) -> Result<usize> {
        self.initialize().await?;
        if items.is_empty() {
            return Ok(0);
        }
        let indexed = self.bulk_index(items).await?;
        self.refresh().await?;
        Ok(indexed)
    }
}
