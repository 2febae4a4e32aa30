//! The current index mapping, applied to every new physical index.

use serde_json::{json, Value};

/// Settings + mappings for a new versioned index.
///
/// Scalar metadata fields are keywords so term filters and
/// aggregations work exactly; `title` and `authors` carry a `raw`
/// keyword sub-field for exact matching alongside full-text search.
pub fn index_mapping() -> Value {
    json!({
        "settings": {},
        "mappings": {
            "properties": {
                "title": {
                    "type": "text",
                    "fields": {"raw": {"type": "keyword"}}
                },
                "abstract": {"type": "text"},
                "authors": {
                    "type": "text",
                    "fields": {"raw": {"type": "keyword"}}
                },
                "keywords": {"type": "keyword"},
                "venue": {"type": "keyword"},
                "year": {"type": "integer"},
                "tags": {"type": "keyword"},
                "item_type": {"type": "keyword"},
                "doi": {"type": "keyword"},
                "arxiv_id": {"type": "keyword"},
                "folders": {"type": "keyword"},
                "file_path": {"type": "keyword"},
                "full_text": {"type": "text"}
            }
        }
    })
}
