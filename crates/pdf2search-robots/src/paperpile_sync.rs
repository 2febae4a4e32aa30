//! The PAPERPILE_METADATA robot: manifest lookup, produce or discard.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use pdf2search_core::{Document, EnhancementType};
use tracing::{debug, info};

use crate::manifest::{load_manifest, lookup_manifest, ManifestError, ManifestRow};
use crate::runtime::{HandlerOutcome, Robot};

pub const ROBOT_ID: &str = "paperpile-sync";

/// Matches catalog documents against a Paperpile manifest loaded once
/// at startup. A document absent from the manifest is a discard, not a
/// failure.
pub struct PaperpileSyncRobot {
    manifest: HashMap<String, ManifestRow>,
}

impl PaperpileSyncRobot {
    pub fn new(manifest: HashMap<String, ManifestRow>) -> Self {
        Self { manifest }
    }

    pub fn from_manifest_file(path: &Path) -> Result<Self, ManifestError> {
        info!(manifest = %path.display(), "loading manifest");
        let manifest = load_manifest(path)?;
        info!(entries = manifest.len(), "manifest loaded");
        Ok(Self::new(manifest))
    }
}

#[async_trait]
impl Robot for PaperpileSyncRobot {
    fn id(&self) -> &str {
        ROBOT_ID
    }

    fn enhancement_type(&self) -> EnhancementType {
        EnhancementType::PaperpileMetadata
    }

    async fn handle(&self, document: &Document) -> HandlerOutcome {
        match lookup_manifest(document.file_name(), &self.manifest) {
            Some(row) => {
                debug!(file = document.file_name(), "manifest hit");
                match serde_json::to_value(row) {
                    Ok(content) => HandlerOutcome::Produced(content),
                    Err(e) => HandlerOutcome::Fail(format!("manifest row not serializable: {e}")),
                }
            }
            None => {
                debug!(file = document.file_name(), "no manifest entry");
                HandlerOutcome::Discard("No manifest entry found".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;

    fn doc(name: &str) -> Document {
        Document {
            id: 7,
            file_path: PathBuf::from(format!("/papers/processing/{name}")),
            created_at: Utc::now(),
        }
    }

    fn robot_with(rows: &[(&str, &str)]) -> PaperpileSyncRobot {
        let manifest = rows
            .iter()
            .map(|(key, title)| {
                (
                    key.to_string(),
                    ManifestRow {
                        file_name: key.to_string(),
                        title: Some(title.to_string()),
                        year: Some(2024),
                        tags: vec!["tag1".to_string(), "tag2".to_string()],
                        ..ManifestRow::default()
                    },
                )
            })
            .collect();
        PaperpileSyncRobot::new(manifest)
    }

    #[tokio::test]
    async fn test_hit_produces_full_record() {
        let robot = robot_with(&[("test paper 2024.pdf", "A Test Paper")]);
        let outcome = robot.handle(&doc("Test Paper 2024.pdf")).await;
        let HandlerOutcome::Produced(content) = outcome else {
            panic!("expected Produced, got {outcome:?}");
        };
        assert_eq!(content["title"], "A Test Paper");
        assert_eq!(content["year"], 2024);
        assert_eq!(content["tags"][0], "tag1");
        // Absent optional fields serialize as null, not empty string.
        assert!(content["abstract"].is_null());
        assert!(content["doi"].is_null());
    }

    #[tokio::test]
    async fn test_duplicate_suffix_falls_back() {
        let robot = robot_with(&[("paper.pdf", "Original")]);
        let outcome = robot.handle(&doc("paper(1).pdf")).await;
        let HandlerOutcome::Produced(content) = outcome else {
            panic!("expected Produced, got {outcome:?}");
        };
        assert_eq!(content["title"], "Original");
    }

    #[tokio::test]
    async fn test_miss_discards() {
        let robot = robot_with(&[]);
        assert_eq!(
            robot.handle(&doc("unknown.pdf")).await,
            HandlerOutcome::Discard("No manifest entry found".to_string())
        );
    }

    #[test]
    fn test_robot_identity() {
        let robot = robot_with(&[]);
        assert_eq!(robot.id(), "paperpile-sync");
        assert_eq!(robot.enhancement_type(), EnhancementType::PaperpileMetadata);
    }
}
