//! Protocol tests for the versioned-index manager against a mock
//! Elasticsearch.

use httpmock::prelude::*;
use httpmock::Method::HEAD;
use pdf2search_core::{Document, Enhancement, EnhancementType};
use pdf2search_search::{EsClient, IndexManager, SearchError, SearchFilters};
use serde_json::json;

const ALIAS: &str = "test_papers";

fn manager(server: &MockServer) -> IndexManager {
    IndexManager::new(EsClient::new(&server.base_url()).unwrap(), ALIAS)
}

fn alias_response(index: &str) -> serde_json::Value {
    json!({index: {"aliases": {ALIAS: {}}}})
}

#[tokio::test]
async fn test_current_index_resolves_alias() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/_alias/{ALIAS}"));
        then.status(200).json_body(alias_response("test_papers_v1"));
    });

    let current = manager(&server).current_index().await.unwrap();
    assert_eq!(current.as_deref(), Some("test_papers_v1"));
}

#[tokio::test]
async fn test_current_index_none_when_alias_missing() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/_alias/{ALIAS}"));
        then.status(404).json_body(json!({"error": "alias missing"}));
    });

    assert!(manager(&server).current_index().await.unwrap().is_none());
}

#[tokio::test]
async fn test_initialize_creates_v1_and_alias() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/_alias/{ALIAS}"));
        then.status(404).json_body(json!({"error": "missing"}));
    });
    let create = server.mock(|when, then| {
        when.method(PUT)
            .path("/test_papers_v1")
            .json_body_partial(r#"{"mappings": {"properties": {"full_text": {"type": "text"}}}}"#);
        then.status(200).json_body(json!({"acknowledged": true}));
    });
    let put_alias = server.mock(|when, then| {
        when.method(PUT).path(format!("/test_papers_v1/_alias/{ALIAS}"));
        then.status(200).json_body(json!({"acknowledged": true}));
    });

    let index = manager(&server).initialize().await.unwrap();
    assert_eq!(index, "test_papers_v1");
    create.assert();
    put_alias.assert();
}

#[tokio::test]
async fn test_initialize_returns_existing_index() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/_alias/{ALIAS}"));
        then.status(200).json_body(alias_response("test_papers_v3"));
    });
    let create = server.mock(|when, then| {
        when.method(PUT).path("/test_papers_v1");
        then.status(200);
    });

    let index = manager(&server).initialize().await.unwrap();
    assert_eq!(index, "test_papers_v3");
    assert_eq!(create.hits(), 0);
}

#[tokio::test]
async fn test_migrate_creates_next_version_and_swaps_atomically() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/_alias/{ALIAS}"));
        then.status(200).json_body(alias_response("test_papers_v1"));
    });
    let create = server.mock(|when, then| {
        when.method(PUT).path("/test_papers_v2");
        then.status(200).json_body(json!({"acknowledged": true}));
    });
    let reindex = server.mock(|when, then| {
        when.method(POST)
            .path("/_reindex")
            .query_param("wait_for_completion", "true")
            .json_body(json!({
                "source": {"index": "test_papers_v1"},
                "dest": {"index": "test_papers_v2"},
            }));
        then.status(200).json_body(json!({"total": 100, "took": 500}));
    });
    let swap = server.mock(|when, then| {
        when.method(POST).path("/_aliases").json_body(json!({
            "actions": [
                {"remove": {"index": "test_papers_v1", "alias": ALIAS}},
                {"add": {"index": "test_papers_v2", "alias": ALIAS}},
            ]
        }));
        then.status(200).json_body(json!({"acknowledged": true}));
    });
    let block = server.mock(|when, then| {
        when.method(PUT).path("/test_papers_v1/_block/write");
        then.status(200).json_body(json!({"acknowledged": true}));
    });

    let index = manager(&server).migrate().await.unwrap();
    assert_eq!(index, "test_papers_v2");
    create.assert();
    reindex.assert();
    swap.assert();
    block.assert();
}

#[tokio::test]
async fn test_migrate_initializes_when_no_alias() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/_alias/{ALIAS}"));
        then.status(404).json_body(json!({"error": "missing"}));
    });
    let create = server.mock(|when, then| {
        when.method(PUT).path("/test_papers_v1");
        then.status(200).json_body(json!({"acknowledged": true}));
    });
    server.mock(|when, then| {
        when.method(PUT).path(format!("/test_papers_v1/_alias/{ALIAS}"));
        then.status(200).json_body(json!({"acknowledged": true}));
    });
    let reindex = server.mock(|when, then| {
        when.method(POST).path("/_reindex");
        then.status(200);
    });

    let index = manager(&server).migrate().await.unwrap();
    assert_eq!(index, "test_papers_v1");
    create.assert();
    assert_eq!(reindex.hits(), 0);
}

#[tokio::test]
async fn test_migrate_from_v2_to_v3() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/_alias/{ALIAS}"));
        then.status(200).json_body(alias_response("test_papers_v2"));
    });
    let create = server.mock(|when, then| {
        when.method(PUT).path("/test_papers_v3");
        then.status(200).json_body(json!({"acknowledged": true}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/_reindex");
        then.status(200).json_body(json!({"total": 500, "took": 1000}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/_aliases");
        then.status(200).json_body(json!({"acknowledged": true}));
    });
    server.mock(|when, then| {
        when.method(PUT).path("/test_papers_v2/_block/write");
        then.status(200).json_body(json!({"acknowledged": true}));
    });

    let index = manager(&server).migrate().await.unwrap();
    assert_eq!(index, "test_papers_v3");
    create.assert();
}

#[tokio::test]
async fn test_rollback_swaps_back_and_unblocks() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/_alias/{ALIAS}"));
        then.status(200).json_body(alias_response("test_papers_v2"));
    });
    server.mock(|when, then| {
        when.method(HEAD).path("/test_papers_v1");
        then.status(200);
    });
    let unblock = server.mock(|when, then| {
        when.method(PUT)
            .path("/test_papers_v1/_settings")
            .json_body(json!({"index.blocks.write": false}));
        then.status(200).json_body(json!({"acknowledged": true}));
    });
    let swap = server.mock(|when, then| {
        when.method(POST).path("/_aliases").json_body(json!({
            "actions": [
                {"remove": {"index": "test_papers_v2", "alias": ALIAS}},
                {"add": {"index": "test_papers_v1", "alias": ALIAS}},
            ]
        }));
        then.status(200).json_body(json!({"acknowledged": true}));
    });

    let index = manager(&server).rollback().await.unwrap();
    assert_eq!(index, "test_papers_v1");
    unblock.assert();
    swap.assert();
}

#[tokio::test]
async fn test_rollback_fails_without_alias() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/_alias/{ALIAS}"));
        then.status(404).json_body(json!({"error": "missing"}));
    });

    let err = manager(&server).rollback().await.unwrap_err();
    assert!(matches!(err, SearchError::NoIndex { .. }));
}

#[tokio::test]
async fn test_rollback_fails_at_v1() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/_alias/{ALIAS}"));
        then.status(200).json_body(alias_response("test_papers_v1"));
    });

    let err = manager(&server).rollback().await.unwrap_err();
    assert!(matches!(err, SearchError::CannotRollbackPastV1 { .. }));
}

#[tokio::test]
async fn test_rollback_fails_when_previous_deleted() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/_alias/{ALIAS}"));
        then.status(200).json_body(alias_response("test_papers_v3"));
    });
    server.mock(|when, then| {
        when.method(HEAD).path("/test_papers_v2");
        then.status(404);
    });

    let err = manager(&server).rollback().await.unwrap_err();
    match err {
        SearchError::PreviousIndexMissing { index } => assert_eq!(index, "test_papers_v2"),
        other => panic!("expected PreviousIndexMissing, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cleanup_deletes_old_versions_keeping_latest() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/_alias/{ALIAS}"));
        then.status(200).json_body(alias_response("test_papers_v5"));
    });
    // v1 already gone; tolerated and not reported as deleted.
    server.mock(|when, then| {
        when.method(DELETE).path("/test_papers_v1");
        then.status(404).json_body(json!({"error": "missing"}));
    });
    let delete_v2 = server.mock(|when, then| {
        when.method(DELETE).path("/test_papers_v2");
        then.status(200).json_body(json!({"acknowledged": true}));
    });
    let delete_v3 = server.mock(|when, then| {
        when.method(DELETE).path("/test_papers_v3");
        then.status(200).json_body(json!({"acknowledged": true}));
    });

    let deleted = manager(&server).delete_old_versions(2).await.unwrap();
    assert_eq!(deleted, vec!["test_papers_v2", "test_papers_v3"]);
    delete_v2.assert();
    delete_v3.assert();
}

#[tokio::test]
async fn test_cleanup_noop_without_alias_or_older_versions() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/_alias/{ALIAS}"));
        then.status(404).json_body(json!({"error": "missing"}));
    });
    assert!(manager(&server).delete_old_versions(2).await.unwrap().is_empty());

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/_alias/{ALIAS}"));
        then.status(200).json_body(alias_response("test_papers_v2"));
    });
    assert!(manager(&server).delete_old_versions(2).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_status_reports_versions_and_count() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/_alias/{ALIAS}"));
        then.status(200).json_body(alias_response("test_papers_v2"));
    });
    server.mock(|when, then| {
        when.method(GET).path(format!("/{ALIAS}/_count"));
        then.status(200).json_body(json!({"count": 620}));
    });
    for (index, status) in [
        ("/test_papers_v1", 200),
        ("/test_papers_v2", 200),
        ("/test_papers_v3", 404),
    ] {
        server.mock(|when, then| {
            when.method(HEAD).path(index);
            then.status(status);
        });
    }

    let status = manager(&server).status().await.unwrap();
    assert_eq!(status.alias, ALIAS);
    assert!(status.exists);
    assert_eq!(status.current_index.as_deref(), Some("test_papers_v2"));
    assert_eq!(status.version, Some(2));
    assert_eq!(status.document_count, Some(620));
    assert_eq!(status.all_versions, vec!["test_papers_v1", "test_papers_v2"]);
}

#[tokio::test]
async fn test_status_when_alias_missing() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/_alias/{ALIAS}"));
        then.status(404).json_body(json!({"error": "missing"}));
    });

    let status = manager(&server).status().await.unwrap();
    assert!(!status.exists);
    assert!(status.current_index.is_none());
    assert!(status.all_versions.is_empty());
}

fn doc_with_text(id: i32, text: &str) -> (Document, Vec<Enhancement>) {
    use chrono::Utc;
    let document = Document {
        id,
        file_path: format!("/papers/processing/doc{id}.pdf").into(),
        created_at: Utc::now(),
    };
    let enhancement = Enhancement {
        id,
        document_id: id,
        enhancement_type: EnhancementType::FullText,
        content: json!({"text": text}),
        robot_id: "pdf-extractor".to_string(),
        created_at: Utc::now(),
    };
    (document, vec![enhancement])
}

#[tokio::test]
async fn test_bulk_index_counts_successes_only() {
    let server = MockServer::start();
    let bulk = server.mock(|when, then| {
        when.method(POST).path("/_bulk");
        then.status(200).json_body(json!({
            "errors": true,
            "items": [
                {"index": {"_id": "1", "status": 201}},
                {"index": {"_id": "2", "status": 400, "error": {"type": "mapper_parsing_exception"}}},
                {"index": {"_id": "3", "status": 200}},
            ]
        }));
    });

    let items = vec![
        doc_with_text(1, "one"),
        doc_with_text(2, "two"),
        doc_with_text(3, "three"),
    ];
    let indexed = manager(&server).bulk_index(&items).await.unwrap();
    assert_eq!(indexed, 2);
    bulk.assert();
}

#[tokio::test]
async fn test_search_sends_query_and_parses_hits() {
    let server = MockServer::start();
    let search = server.mock(|when, then| {
        when.method(POST)
            .path(format!("/{ALIAS}/_search"))
            .json_body_partial(
                r#"{"query": {"bool": {"must": [{"multi_match": {"query": "chunking"}}]}}}"#,
            );
        then.status(200).json_body(json!({
            "hits": {"hits": [
                {"_id": "1", "_score": 3.2, "_source": {"title": "Paper", "year": 2024}}
            ]}
        }));
    });

    let hits = manager(&server)
        .search("chunking", &SearchFilters::default(), 10)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].source["title"], "Paper");
    search.assert();
}

#[tokio::test]
async fn test_count_uses_count_endpoint() {
    let server = MockServer::start();
    let count = server.mock(|when, then| {
        when.method(POST).path(format!("/{ALIAS}/_count"));
        then.status(200).json_body(json!({"count": 42}));
    });
    let search = server.mock(|when, then| {
        when.method(POST).path(format!("/{ALIAS}/_search"));
        then.status(200);
    });

    let result = manager(&server)
        .count("test", &SearchFilters::default())
        .await
        .unwrap();
    assert_eq!(result, 42);
    count.assert();
    assert_eq!(search.hits(), 0);
}

#[tokio::test]
async fn test_admin_errors_surface_status_and_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(format!("/_alias/{ALIAS}"));
        then.status(500).json_body(json!({"error": "broken"}));
    });

    let err = manager(&server).current_index().await.unwrap_err();
    match err {
        SearchError::UnexpectedStatus { status, body, .. } => {
            assert_eq!(status, 500);
            assert!(body.contains("broken"));
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}
