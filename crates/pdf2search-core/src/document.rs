//! Catalog documents, enhancement artifacts, and pending work units.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::status::PendingStatus;

/// Kinds of derived artifacts a robot can attach to a document.
///
/// Closed set; extending it means adding a variant here and a robot
/// that produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnhancementType {
    #[serde(rename = "FULL_TEXT")]
    FullText,
    #[serde(rename = "PAPERPILE_METADATA")]
    PaperpileMetadata,
}

impl EnhancementType {
    pub fn as_str(self) -> &'static str {
        match self {
            EnhancementType::FullText => "FULL_TEXT",
            EnhancementType::PaperpileMetadata => "PAPERPILE_METADATA",
        }
    }
}

impl fmt::Display for EnhancementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnhancementType {
    type Err = UnknownEnhancementType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FULL_TEXT" => Ok(EnhancementType::FullText),
            "PAPERPILE_METADATA" => Ok(EnhancementType::PaperpileMetadata),
            other => Err(UnknownEnhancementType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown enhancement type: {0:?}")]
pub struct UnknownEnhancementType(pub String);

/// An immutable registration of a source file in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: i32,
    pub file_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Final path component, used for manifest lookups.
    pub fn file_name(&self) -> &str {
        self.file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// A typed, upsertable artifact produced by one robot for one document.
///
/// `(document_id, enhancement_type, robot_id)` is unique; re-producing
/// the same key overwrites `content` and refreshes `created_at`.
#[derive(Debug, Clone)]
pub struct Enhancement {
    pub id: i32,
    pub document_id: i32,
    pub enhancement_type: EnhancementType,
    pub content: Value,
    pub robot_id: String,
    pub created_at: DateTime<Utc>,
}

/// One unit of work in the queue; at most one live row per
/// `(document_id, enhancement_type)`.
#[derive(Debug, Clone)]
pub struct PendingEnhancement {
    pub id: i32,
    pub document_id: i32,
    pub enhancement_type: EnhancementType,
    pub status: PendingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub attempts: i32,
    pub last_error: Option<String>,
}

/// The most recently produced artifact of `ty`, ties broken by id.
pub fn latest_enhancement(
    enhancements: &[Enhancement],
    ty: EnhancementType,
) -> Option<&Enhancement> {
    enhancements
        .iter()
        .filter(|e| e.enhancement_type == ty)
        .max_by_key(|e| (e.created_at, e.id))
}

/// Content of the latest metadata artifact, if any.
pub fn metadata_content(enhancements: &[Enhancement]) -> Option<&Value> {
    latest_enhancement(enhancements, EnhancementType::PaperpileMetadata).map(|e| &e.content)
}
