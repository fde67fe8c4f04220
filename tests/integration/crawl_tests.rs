//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the store and exercise the HTTP
//! collaborator and a full discovery job end-to-end.

use play_sweeper::config::Config;
use play_sweeper::control::{Controller, ManagerRegistry, WorkerPool};
use play_sweeper::fetch::{FetchError, HttpPlayFetcher, PlayFetcher, DETAIL_MARKER_FIELD};
use play_sweeper::state::{JobStatus, ProcessKind};
use play_sweeper::storage::{discover_dump_files, load_records};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Listing page holding one card per id
fn cards(ids: &[&str]) -> String {
    let cards: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<div class="card" data-uitype="500" data-docid="{id}">
                     <a class="title" title="Title of {id}">Title of {id}</a>
                     <a class="subtitle">Studio</a>
                   </div>"#
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", cards)
}

/// Creates a test configuration pointing at the mock store
fn create_test_config(base_url: &str, output_dir: &str) -> Config {
    let mut config = Config::default();
    config.fetch.base_url = format!("{}/store/apps", base_url);
    config.fetch.timeout_secs = 5;
    config.crawler.retry_limit = 2;
    config.output.output_dir = output_dir.to_string();
    config.output.max_records_per_file = 2;
    config
}

fn fetcher_for(server: &MockServer) -> HttpPlayFetcher {
    let config = create_test_config(&server.uri(), "unused");
    HttpPlayFetcher::new(&config.fetch).unwrap()
}

#[tokio::test]
async fn test_collection_posts_listing_form() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/store/apps/category/GAME/collection/topselling_free"))
        .and(query_param("hl", "en"))
        .and(query_param("gl", "us"))
        .and(body_string_contains("start=120"))
        .and(body_string_contains("num=120"))
        .respond_with(ResponseTemplate::new(200).set_body_string(cards(&["com.a", "com.b"])))
        .expect(1)
        .mount(&server)
        .await;

    let records = fetcher_for(&server)
        .collection("TOP_FREE", "GAME", 1, 120)
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].app_id(), "com.a");
    assert_eq!(
        records[0].get("url").and_then(|v| v.as_str()),
        Some(format!("{}/store/apps/details?id=com.a", server.uri()).as_str())
    );
}

#[tokio::test]
async fn test_collection_without_category() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/store/apps/collection/topgrossing"))
        .respond_with(ResponseTemplate::new(200).set_body_string(cards(&["com.top"])))
        .expect(1)
        .mount(&server)
        .await;

    let records = fetcher_for(&server)
        .collection("TOP_GROSSING", "", 0, 60)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_details_parses_page_and_rejects_unknown_app() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/store/apps/details"))
        .and(query_param("id", "com.a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                 <h1 itemprop="name">Alpha</h1>
                 <div itemprop="description">Alpha is a game.</div>
               </body></html>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/store/apps/details"))
        .and(query_param("id", "com.missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server);

    let record = fetcher.details("com.a").await.unwrap();
    assert_eq!(record.app_id(), "com.a");
    assert!(record.has_field(DETAIL_MARKER_FIELD));

    let err = fetcher.details("com.missing").await.unwrap_err();
    assert!(err.is_validation());
    assert!(matches!(err, FetchError::InvalidApplicationId { .. }));
}

#[tokio::test]
async fn test_server_errors_are_transient() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/store/apps/similar"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = fetcher_for(&server).similar("com.a").await.unwrap_err();
    assert!(!err.is_validation());
    assert!(matches!(err, FetchError::Status { status: 503, .. }));
}

#[tokio::test]
async fn test_search_posts_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/store/apps/search"))
        .and(query_param("q", "puzzle"))
        .and(query_param("c", "apps"))
        .respond_with(ResponseTemplate::new(200).set_body_string(cards(&["com.p1", "com.p2", "com.p3"])))
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server);
    assert_eq!(fetcher.search("puzzle", 0, 20).await.unwrap().len(), 3);
    assert!(fetcher.search("  ", 0, 20).await.unwrap_err().is_validation());
}

/// Discovery over a finite synthetic graph:
///
/// ```text
/// TOP_FREE/GAME -> a, b
/// a -> b, c     b -> c     c -> a, d     d -> (nothing)
/// ```
///
/// Every reachable id must be expanded exactly once and the job must
/// complete by itself.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_discovery_visits_graph_once() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/store/apps/category/GAME/collection/topselling_free"))
        .respond_with(ResponseTemplate::new(200).set_body_string(cards(&["a", "b"])))
        .expect(1)
        .mount(&server)
        .await;

    for (id, neighbours) in [
        ("a", vec!["b", "c"]),
        ("b", vec!["c"]),
        ("c", vec!["a", "d"]),
        ("d", vec![]),
    ] {
        Mock::given(method("GET"))
            .and(path("/store/apps/similar"))
            .and(query_param("id", id))
            .respond_with(ResponseTemplate::new(200).set_body_string(cards(&neighbours)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = create_test_config(&server.uri(), output.path().to_str().unwrap());
    let fetcher: Arc<dyn PlayFetcher> = Arc::new(HttpPlayFetcher::new(&config.fetch).unwrap());
    let controller = Controller::new(
        Arc::new(config),
        Arc::new(ManagerRegistry::new()),
        Arc::new(WorkerPool::new(1, "test").unwrap()),
        fetcher,
        None,
    );

    let started = controller.start(ProcessKind::Discover, None).unwrap();
    let snapshot = controller
        .registry()
        .wait_closed(&started.process_id)
        .await
        .unwrap();

    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.records_found, 4);
    assert_eq!(snapshot.dump_success, Some(true));

    let files = discover_dump_files(output.path(), "sweeper").unwrap();
    assert_eq!(files.len(), 2);

    let mut ids = HashSet::new();
    for file in &files {
        for record in load_records(file).unwrap() {
            assert!(ids.insert(record.app_id().to_string()));
        }
    }
    let expected: HashSet<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
    assert_eq!(ids, expected);

    controller.join_workers();
}

/// Enrichment picks up the discovery dump and writes a `_detailed` dump
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_details_job_enriches_previous_dump() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    std::fs::write(
        output.path().join("sweeper_prev.json.0"),
        r#"[{"app_id": "com.a", "title": "A"}, {"app_id": "com.b", "description": "done"}]"#,
    )
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/store/apps/details"))
        .and(query_param("id", "com.a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><div itemprop="description">Fresh text</div></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), output.path().to_str().unwrap());
    let fetcher: Arc<dyn PlayFetcher> = Arc::new(HttpPlayFetcher::new(&config.fetch).unwrap());
    let controller = Controller::new(
        Arc::new(config),
        Arc::new(ManagerRegistry::new()),
        Arc::new(WorkerPool::new(1, "test").unwrap()),
        fetcher,
        None,
    );

    let started = controller.start(ProcessKind::Details, None).unwrap();
    let snapshot = controller
        .registry()
        .wait_closed(&started.process_id)
        .await
        .unwrap();

    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.records_processed, 2);
    assert_eq!(snapshot.records_failed, 0);

    let detailed = output
        .path()
        .join(format!("sweeper_{}_detailed.json.0", started.process_id));
    let records = load_records(&detailed).unwrap();
    let enriched = records.iter().find(|r| r.app_id() == "com.a").unwrap();
    assert_eq!(
        enriched.get(DETAIL_MARKER_FIELD).and_then(|v| v.as_str()),
        Some("Fresh text")
    );
    assert_eq!(enriched.get("title").and_then(|v| v.as_str()), Some("A"));

    controller.join_workers();
}
