//! Paperpile CSV manifest loading.
//!
//! Two dialects are accepted: the normalized export
//! (`file_name,title,venue,year,tags`) and the full Paperpile export
//! (`Title,Abstract,Authors,...,Attachments`), where the file name is
//! recovered from the first attachment path.

use std::collections::HashMap;
use std::path::Path;

use csv::StringRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("malformed manifest row: {0}")]
    Row(#[from] csv::Error),
}

/// One bibliographic record from the manifest. Serialized verbatim as
/// the PAPERPILE_METADATA artifact content.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ManifestRow {
    pub file_name: String,
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub authors: Vec<String>,
    pub keywords: Vec<String>,
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    pub item_type: Option<String>,
    pub venue: Option<String>,
    pub year: Option<i32>,
    pub tags: Vec<String>,
    pub folders: Vec<String>,
}

/// Comma-separated author list, trimmed, empties dropped.
pub fn parse_authors(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keywords are `;`-separated, falling back to commas when the field
/// contains no semicolons.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    let sep = if raw.contains(';') { ';' } else { ',' };
    raw.split(sep)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_semicolon_list(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// File name of the first attachment in a `;`-separated Paperpile
/// attachment list.
pub fn extract_filename_from_attachments(raw: Option<&str>) -> Option<String> {
    let first = raw?.split(';').next()?.trim();
    if first.is_empty() {
        return None;
    }
    let name = first.rsplit('/').next().unwrap_or(first);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

static DUPLICATE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\d+\)").expect("valid regex"));

/// Look up a document's file name, falling back to a key with any
/// parenthesized duplicate suffix (`(1)`, `(12)`) removed. The
/// fallback only collapses double spaces produced by the removal; a
/// name like `paper (1).pdf` leaves `paper .pdf` behind and stays a
/// miss.
pub fn lookup_manifest<'a>(
    file_name: &str,
    manifest: &'a HashMap<String, ManifestRow>,
) -> Option<&'a ManifestRow> {
    let key = file_name.to_lowercase();
    if let Some(row) = manifest.get(&key) {
        return Some(row);
    }
    if DUPLICATE_SUFFIX.is_match(&key) {
        let alt = DUPLICATE_SUFFIX
            .replace_all(&key, "")
            .replace("  ", " ")
            .trim()
            .to_string();
        return manifest.get(&alt);
    }
    None
}

struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn new(headers: &StringRecord) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_string(), i))
            .collect();
        Self { index }
    }

    fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    fn get<'a>(&self, record: &'a StringRecord, name: &str) -> &'a str {
        self.index
            .get(name)
            .and_then(|&i| record.get(i))
            .unwrap_or("")
            .trim()
    }

    fn get_opt(&self, record: &StringRecord, name: &str) -> Option<String> {
        let value = self.get(record, name);
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}

fn row_from_normalized(cols: &Columns, record: &StringRecord) -> Option<ManifestRow> {
    let file_name = cols.get(record, "file_name");
    if file_name.is_empty() {
        return None;
    }
    Some(ManifestRow {
        file_name: file_name.to_string(),
        title: cols.get_opt(record, "title"),
        venue: cols.get_opt(record, "venue"),
        year: cols.get(record, "year").parse().ok(),
        tags: parse_semicolon_list(cols.get(record, "tags")),
        ..ManifestRow::default()
    })
}

fn row_from_full_export(cols: &Columns, record: &StringRecord) -> Option<ManifestRow> {
    let attachments = cols.get_opt(record, "Attachments");
    let file_name = extract_filename_from_attachments(attachments.as_deref())?;

    // Journal articles carry the venue in `Journal`; conference papers
    // in `Proceedings title`.
    let venue = cols
        .get_opt(record, "Journal")
        .or_else(|| cols.get_opt(record, "Proceedings title"));

    Some(ManifestRow {
        file_name,
        title: cols.get_opt(record, "Title"),
        abstract_text: cols.get_opt(record, "Abstract"),
        authors: parse_authors(cols.get(record, "Authors")),
        keywords: parse_keywords(cols.get(record, "Keywords")),
        doi: cols.get_opt(record, "DOI"),
        arxiv_id: cols.get_opt(record, "Arxiv ID"),
        item_type: cols.get_opt(record, "Item type"),
        venue,
        year: cols.get(record, "Publication year").parse().ok(),
        tags: parse_semicolon_list(cols.get(record, "Labels filed in")),
        folders: parse_semicolon_list(cols.get(record, "Folders filed in")),
    })
}

/// Load the manifest into a lookup map keyed by lower-cased file name.
pub fn load_manifest(path: &Path) -> Result<HashMap<String, ManifestRow>, ManifestError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|source| ManifestError::Read {
            path: path.display().to_string(),
            source,
        })?;

    let headers = reader.headers()?.clone();
    let cols = Columns::new(&headers);
    let normalized = cols.has("file_name");

    let mut manifest = HashMap::new();
    for record in reader.records() {
        let record = record?;
        let row = if normalized {
            row_from_normalized(&cols, &record)
        } else {
            row_from_full_export(&cols, &record)
        };
        if let Some(row) = row {
            manifest.insert(row.file_name.to_lowercase(), row);
        }
    }
    Ok(manifest)
}
