//! Query building and the search surface.
//!
//! All queries run against the alias. Quoted substrings of the query
//! become phrase predicates combined conjunctively with the unquoted
//! remainder.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::str::FromStr;

use crate::error::Result;
use crate::index::IndexManager;

/// Boosted fields for multi-match queries. Structured metadata
/// outranks full text so a title hit is not drowned by body noise.
pub const SEARCH_FIELDS: [&str; 5] = [
    "title^4",
    "abstract^3",
    "keywords^3",
    "authors^2",
    "full_text",
];

static PHRASES: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)""#).expect("valid regex"));

/// Split a query into unquoted terms and quoted phrases.
fn parse_query_parts(query: &str) -> (Vec<String>, Vec<String>) {
    let phrases: Vec<String> = PHRASES
        .captures_iter(query)
        .map(|c| c[1].to_string())
        .collect();
    let remaining = PHRASES.replace_all(query, "");
    let terms: Vec<String> = remaining
        .split_whitespace()
        .map(str::to_string)
        .collect();
    (terms, phrases)
}

fn multi_match(query: &str, phrase: bool) -> Value {
    if phrase {
        json!({
            "multi_match": {
                "query": query,
                "fields": SEARCH_FIELDS,
                "type": "phrase",
            }
        })
    } else {
        json!({
            "multi_match": {
                "query": query,
                "fields": SEARCH_FIELDS,
            }
        })
    }
}

/// The query clause for a user query string: plain multi-match,
/// phrase multi-match, or a bool/must combination of both.
fn build_query_clause(query: &str) -> Value {
    let (terms, phrases) = parse_query_parts(query);

    if phrases.is_empty() && !terms.is_empty() {
        return multi_match(&terms.join(" "), false);
    }
    if terms.is_empty() && phrases.len() == 1 {
        return multi_match(&phrases[0], true);
    }

    let mut must: Vec<Value> = Vec::new();
    if !terms.is_empty() {
        must.push(multi_match(&terms.join(" "), false));
    }
    for phrase in &phrases {
        must.push(multi_match(phrase, true));
    }
    json!({"bool": {"must": must}})
}

/// Conjunctive filter predicates. Year bounds are inclusive and
/// open-ended on either side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilters {
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    pub tag: Option<String>,
    pub folder: Option<String>,
}

impl SearchFilters {
    fn clauses(&self) -> Vec<Value> {
        let mut filters = Vec::new();
        if self.year_from.is_some() || self.year_to.is_some() {
            filters.push(json!({
                "range": {
                    "year": {
                        "gte": self.year_from.unwrap_or(0),
                        "lte": self.year_to.unwrap_or(9999),
                    }
                }
            }));
        }
        if let Some(tag) = &self.tag {
            filters.push(json!({"term": {"tags": tag}}));
        }
        if let Some(folder) = &self.folder {
            filters.push(json!({"term": {"folders": folder}}));
        }
        filters
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Relevance,
    YearAsc,
    YearDesc,
}

impl SortOrder {
    fn clause(self) -> Option<Value> {
        match self {
            SortOrder::Relevance => None,
            SortOrder::YearAsc => Some(json!([{"year": {"order": "asc", "missing": "_last"}}])),
            SortOrder::YearDesc => Some(json!([{"year": {"order": "desc", "missing": "_last"}}])),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "relevance" => Ok(SortOrder::Relevance),
            "year-asc" => Ok(SortOrder::YearAsc),
            "year-desc" => Ok(SortOrder::YearDesc),
            other => Err(format!(
                "unknown sort order {other:?} (expected relevance, year-asc, or year-desc)"
            )),
        }
    }
}

/// Display controls for context search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub size: usize,
    pub fragments: usize,
    pub fragment_size: usize,
    pub sort: SortOrder,
    /// Highlight this instead of the search query when set.
    pub highlight: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            size: 10,
            fragments: 3,
            fragment_size: 150,
            sort: SortOrder::Relevance,
            highlight: None,
        }
    }
}

/// One search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: Option<String>,
    pub score: Option<f64>,
    pub source: Value,
    pub highlights: Vec<String>,
}

/// One venue aggregation bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueBucket {
    pub venue: String,
    pub count: u64,
}

fn bool_query(query: &str, filters: &SearchFilters) -> Value {
    let must = if query.trim().is_empty() {
        vec![json!({"match_all": {}})]
    } else {
        vec![build_query_clause(query)]
    };
    json!({
        "bool": {
            "must": must,
            "filter": filters.clauses(),
        }
    })
}

fn search_body(query: &str, filters: &SearchFilters, size: usize) -> Value {
    json!({
        "query": bool_query(query, filters),
        "size": size,
    })
}

fn context_body(query: &str, filters: &SearchFilters, options: &SearchOptions) -> Value {
    let mut highlight = json!({
        "fields": {
            "full_text": {
                "fragment_size": options.fragment_size,
                "number_of_fragments": options.fragments,
                "pre_tags": [">>>"],
                "post_tags": ["<<<"],
            }
        }
    });
    if let Some(term) = &options.highlight {
        highlight["highlight_query"] = json!({"match": {"full_text": term}});
    }

    let mut body = json!({
        "query": bool_query(query, filters),
        "highlight": highlight,
        "size": options.size,
    });
    if let Some(sort) = options.sort.clause() {
        body["sort"] = sort;
    }
    body
}

fn venues_body(query: Option<&str>, filters: &SearchFilters, size: usize) -> Value {
    json!({
        "size": 0,
        "query": bool_query(query.unwrap_or(""), filters),
        "aggs": {
            "venues": {"terms": {"field": "venue", "size": size}}
        },
    })
}

fn parse_hits(body: &Value) -> Vec<SearchHit> {
    body["hits"]["hits"]
        .as_array()
        .map(|hits| {
            hits.iter()
                .map(|hit| SearchHit {
                    id: hit["_id"].as_str().map(str::to_string),
                    score: hit["_score"].as_f64(),
                    source: hit["_source"].clone(),
                    highlights: hit["highlight"]["full_text"]
                        .as_array()
                        .map(|fragments| {
                            fragments
                                .iter()
                                .filter_map(|f| f.as_str())
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default()
}

impl IndexManager {
    /// Free-text search with filters, by relevance.
    pub async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        size: usize,
    ) -> Result<Vec<SearchHit>> {
        let body = search_body(query, filters, size);
        let response = self
            .client()
            .post(&format!("/{}/_search", self.alias()), Some(&body))
            .await?
            .into_body()?;
        Ok(parse_hits(&response))
    }

    /// Count documents matching the query and filters.
    pub async fn count(&self, query: &str, filters: &SearchFilters) -> Result<u64> {
        let body = json!({"query": bool_query(query, filters)});
        let response = self
            .client()
            .post(&format!("/{}/_count", self.alias()), Some(&body))
            .await?
            .into_body()?;
        Ok(response["count"].as_u64().unwrap_or(0))
    }

    /// Search with highlighted context fragments from `full_text`,
    /// delimited by `>>>`/`<<<`.
    pub async fn search_with_context(
        &self,
        query: &str,
        filters: &SearchFilters,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>> {
        let body = context_body(query, filters, options);
        let response = self
            .client()
            .post(&format!("/{}/_search", self.alias()), Some(&body))
            .await?
            .into_body()?;
        Ok(parse_hits(&response))
    }

    /// Top venues by document count, optionally restricted by query
    /// and filters.
    pub async fn aggregate_venues(
        &self,
        query: Option<&str>,
        filters: &SearchFilters,
        size: usize,
    ) -> Result<Vec<VenueBucket>> {
        let body = venues_body(query, filters, size);
        let response = self
            .client()
            .post(&format!("/{}/_search", self.alias()), Some(&body))
            .await?
            .into_body()?;
        let buckets = response["aggregations"]["venues"]["buckets"]
            .as_array()
            .map(|buckets| {
                buckets
                    .iter()
                    .filter_map(|b| {
                        Some(VenueBucket {
                            venue: b["key"].as_str()?.to_string(),
                            count: b["doc_count"].as_u64().unwrap_or(0),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(buckets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_terms() {
        let (terms, phrases) = parse_query_parts("hello world");
        assert_eq!(terms, vec!["hello", "world"]);
        assert!(phrases.is_empty());
    }

    #[test]
    fn test_parse_single_phrase() {
        let (terms, phrases) = parse_query_parts("\"hello world\"");
        assert!(terms.is_empty());
        assert_eq!(phrases, vec!["hello world"]);
    }

    #[test]
    fn test_parse_mixed_terms_and_phrase() {
        let (terms, phrases) = parse_query_parts("foo \"hello world\" bar");
        assert_eq!(terms, vec!["foo", "bar"]);
        assert_eq!(phrases, vec!["hello world"]);
    }

    #[test]
    fn test_parse_multiple_phrases() {
        let (terms, phrases) = parse_query_parts("\"phrase one\" \"phrase two\"");
        assert!(terms.is_empty());
        assert_eq!(phrases, vec!["phrase one", "phrase two"]);
    }

    #[test]
    fn test_parse_empty_query() {
        let (terms, phrases) = parse_query_parts("");
        assert!(terms.is_empty());
        assert!(phrases.is_empty());
    }

    #[test]
    fn test_simple_query_uses_multi_match() {
        let clause = build_query_clause("chunking");
        assert_eq!(
            clause,
            json!({
                "multi_match": {
                    "query": "chunking",
                    "fields": SEARCH_FIELDS,
                }
            })
        );
    }

    #[test]
    fn test_phrase_query_uses_phrase_type() {
        let clause = build_query_clause("\"content-defined chunking\"");
        assert_eq!(
            clause,
            json!({
                "multi_match": {
                    "query": "content-defined chunking",
                    "fields": SEARCH_FIELDS,
                    "type": "phrase",
                }
            })
        );
    }

    #[test]
    fn test_mixed_query_uses_bool_must() {
        let clause = build_query_clause("dedup \"message-locked encryption\"");
        let must = clause["bool"]["must"].as_array().unwrap();
        assert_eq!(must.len(), 2);
        assert_eq!(must[0]["multi_match"]["query"], "dedup");
        assert!(must[0]["multi_match"].get("type").is_none());
        assert_eq!(must[1]["multi_match"]["query"], "message-locked encryption");
        assert_eq!(must[1]["multi_match"]["type"], "phrase");
    }

    #[test]
    fn test_empty_query_uses_match_all() {
        let body = search_body(
            "",
            &SearchFilters {
                tag: Some("Dedup".to_string()),
                ..SearchFilters::default()
            },
            10,
        );
        assert_eq!(body["query"]["bool"]["must"], json!([{"match_all": {}}]));
    }

    #[test]
    fn test_year_filter_open_ended() {
        let filters = SearchFilters {
            year_from: Some(2020),
            ..SearchFilters::default()
        };
        assert_eq!(
            filters.clauses(),
            vec![json!({"range": {"year": {"gte": 2020, "lte": 9999}}})]
        );

        let filters = SearchFilters {
            year_to: Some(2023),
            ..SearchFilters::default()
        };
        assert_eq!(
            filters.clauses(),
            vec![json!({"range": {"year": {"gte": 0, "lte": 2023}}})]
        );
    }

    #[test]
    fn test_filters_combine_conjunctively() {
        let filters = SearchFilters {
            year_from: Some(2020),
            year_to: Some(2023),
            tag: Some("Dedup".to_string()),
            folder: Some("Thesis".to_string()),
        };
        let clauses = filters.clauses();
        assert_eq!(clauses.len(), 3);
        assert!(clauses.contains(&json!({"range": {"year": {"gte": 2020, "lte": 2023}}})));
        assert!(clauses.contains(&json!({"term": {"tags": "Dedup"}})));
        assert!(clauses.contains(&json!({"term": {"folders": "Thesis"}})));
    }

    #[test]
    fn test_no_filters_is_empty() {
        assert!(SearchFilters::default().clauses().is_empty());
    }

    #[test]
    fn test_sort_clauses() {
        assert!(SortOrder::Relevance.clause().is_none());
        assert_eq!(
            SortOrder::YearDesc.clause().unwrap(),
            json!([{"year": {"order": "desc", "missing": "_last"}}])
        );
        assert_eq!(
            SortOrder::YearAsc.clause().unwrap(),
            json!([{"year": {"order": "asc", "missing": "_last"}}])
        );
    }

    #[test]
    fn test_sort_order_from_str() {
        assert_eq!("relevance".parse::<SortOrder>().unwrap(), SortOrder::Relevance);
        assert_eq!("year-asc".parse::<SortOrder>().unwrap(), SortOrder::YearAsc);
        assert_eq!("year-desc".parse::<SortOrder>().unwrap(), SortOrder::YearDesc);
        assert!("newest".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_context_body_highlight_config() {
        let body = context_body("query", &SearchFilters::default(), &SearchOptions::default());
        let highlight = &body["highlight"]["fields"]["full_text"];
        assert_eq!(highlight["fragment_size"], 150);
        assert_eq!(highlight["number_of_fragments"], 3);
        assert_eq!(highlight["pre_tags"], json!([">>>"]));
        assert_eq!(highlight["post_tags"], json!(["<<<"]));
        assert!(body["highlight"].get("highlight_query").is_none());
        assert!(body.get("sort").is_none());
    }

    #[test]
    fn test_context_body_custom_highlight_and_sort() {
        let options = SearchOptions {
            highlight: Some("chunking".to_string()),
            sort: SortOrder::YearDesc,
            ..SearchOptions::default()
        };
        let body = context_body("query", &SearchFilters::default(), &options);
        assert_eq!(
            body["highlight"]["highlight_query"],
            json!({"match": {"full_text": "chunking"}})
        );
        assert_eq!(body["sort"][0]["year"]["order"], "desc");
    }

    #[test]
    fn test_venues_body_returns_no_documents() {
        let body = venues_body(Some("dedup"), &SearchFilters::default(), 20);
        assert_eq!(body["size"], 0);
        assert_eq!(body["aggs"]["venues"]["terms"]["field"], "venue");
        assert_eq!(body["aggs"]["venues"]["terms"]["size"], 20);
    }

    #[test]
    fn test_parse_hits() {
        let body = json!({
            "hits": {"hits": [
                {
                    "_id": "1",
                    "_score": 2.5,
                    "_source": {"title": "A"},
                    "highlight": {"full_text": [">>>match<<< context"]}
                },
                {"_id": "2", "_score": null, "_source": {"title": "B"}}
            ]}
        });
        let hits = parse_hits(&body);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id.as_deref(), Some("1"));
        assert_eq!(hits[0].score, Some(2.5));
        assert_eq!(hits[0].highlights, vec![">>>match<<< context"]);
        assert!(hits[1].highlights.is_empty());
        assert!(hits[1].score.is_none());
    }
}
