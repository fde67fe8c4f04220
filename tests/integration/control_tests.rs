//! Integration tests for the control API
//!
//! Jobs run on a real worker pool against an in-memory fetcher; requests go
//! through the actix service built from the production routes.

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use async_trait::async_trait;
use play_sweeper::config::Config;
use play_sweeper::control::{Controller, ManagerRegistry, WorkerPool};
use play_sweeper::crawler::Record;
use play_sweeper::fetch::{collection_path, FetchError, PlayFetcher};
use play_sweeper::server::configure;
use play_sweeper::state::{JobSnapshot, ProcessKind};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Store stand-in: TOP_FREE/GAME lists two apps, every other listing is empty
struct MemoryFetcher {
    /// Similar-app lookups never return when set
    stall_similar: bool,
}

#[async_trait]
impl PlayFetcher for MemoryFetcher {
    async fn details(&self, app_id: &str) -> Result<Record, FetchError> {
        match app_id {
            "com.missing" => Err(FetchError::invalid_app(app_id, "HTTP 404")),
            "com.flaky" => Err(FetchError::Status {
                url: format!("memory://details/{}", app_id),
                status: 503,
            }),
            _ => Ok(Record::new(app_id).with("description", "An app")),
        }
    }

    async fn collection(
        &self,
        collection: &str,
        category: &str,
        page: usize,
        _page_size: usize,
    ) -> Result<Vec<Record>, FetchError> {
        if collection_path(collection).is_none() {
            return Err(FetchError::invalid_listing(collection, category, "unknown collection"));
        }
        if (collection, category, page) == ("TOP_FREE", "GAME", 0) {
            return Ok(vec![Record::new("com.one"), Record::new("com.two")]);
        }
        Ok(Vec::new())
    }

    async fn similar(&self, _app_id: &str) -> Result<Vec<Record>, FetchError> {
        if self.stall_similar {
            std::future::pending::<()>().await;
        }
        Ok(Vec::new())
    }

    async fn search(&self, _token: &str, _page: usize, _page_size: usize) -> Result<Vec<Record>, FetchError> {
        Ok(vec![Record::new("com.found")])
    }
}

fn create_controller(stall_similar: bool) -> (Controller, TempDir) {
    let output = TempDir::new().unwrap();
    let mut config = Config::default();
    config.output.output_dir = output.path().display().to_string();

    let controller = Controller::new(
        Arc::new(config),
        Arc::new(ManagerRegistry::new()),
        Arc::new(WorkerPool::new(2, "api-test").unwrap()),
        Arc::new(MemoryFetcher { stall_similar }),
        Some("log/test.log".to_string()),
    );
    (controller, output)
}

macro_rules! service {
    ($controller:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($controller.clone()))
                .configure(configure),
        )
        .await
    };
}

fn started_pid(body: &Value) -> String {
    body["process_id"].as_str().unwrap().to_string()
}

/// Waits until the running job has collected `count` records
async fn wait_collected(controller: &Controller, pid: &str, count: usize) {
    for _ in 0..500 {
        if let Ok(snapshot) = controller.peek(pid, false).await {
            if snapshot.records_collected == Some(count) {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("process {} never collected {} records", pid, count);
}

#[actix_web::test]
async fn test_start_requires_type() {
    let (controller, _output) = create_controller(false);
    let app = service!(controller);

    let req = test::TestRequest::post().uri("/start").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "MISSING_PARAMETER");

    let req = test::TestRequest::post().uri("/start?type=CRAWL").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(controller.registry().is_empty());
}

#[actix_web::test]
async fn test_unknown_process_and_empty_view() {
    let (controller, _output) = create_controller(false);
    let app = service!(controller);

    let req = test::TestRequest::get().uri("/peek?pid=nope").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post().uri("/stop?pid=nope").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/peek").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/view").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_queued_process_cannot_be_controlled() {
    let (controller, _output) = create_controller(false);
    controller
        .registry()
        .insert_placeholder(JobSnapshot::initiated("queued", ProcessKind::Discover, None));
    let app = service!(controller);

    for req in [
        test::TestRequest::get().uri("/peek?pid=queued").to_request(),
        test::TestRequest::post().uri("/stop?pid=queued").to_request(),
        test::TestRequest::post().uri("/flush?pid=queued").to_request(),
    ] {
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    let req = test::TestRequest::get().uri("/view").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["processes"][0]["status"], "INITIATED");
}

#[actix_web::test]
async fn test_completed_job_lifecycle() {
    let (controller, _output) = create_controller(false);
    let app = service!(controller);

    let req = test::TestRequest::post().uri("/start?type=discover").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "process_started");
    assert_eq!(body["logfile"], "log/test.log");
    let pid = started_pid(&body);

    let closed = controller.registry().wait_closed(&pid).await.unwrap();
    assert_eq!(closed.records_found, 2);

    let req = test::TestRequest::get()
        .uri(&format!("/peek?pid={}", pid))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "process_peeked");
    assert_eq!(body["status"], "COMPLETED");
    assert_eq!(body["records_found"], 2);

    // stopping a finished job is idempotent
    let req = test::TestRequest::post()
        .uri(&format!("/stop?pid={}&show_records=true", pid))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "process_stopped");
    assert_eq!(body["status"], "COMPLETED");
    assert_eq!(body["records"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::post()
        .uri(&format!("/flush?pid={}", pid))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );

    let req = test::TestRequest::get().uri("/view").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "processes_viewed");
    assert_eq!(body["processes"].as_array().unwrap().len(), 1);

    controller.join_workers();
}

#[actix_web::test]
async fn test_stop_terminates_running_job() {
    let (controller, output) = create_controller(true);
    let app = service!(controller);

    let req = test::TestRequest::post().uri("/start?type=DISCOVER").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let pid = started_pid(&body);
    wait_collected(&controller, &pid, 2).await;

    let req = test::TestRequest::post()
        .uri(&format!("/flush?pid={}", pid))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::METHOD_NOT_ALLOWED
    );

    let req = test::TestRequest::post()
        .uri(&format!("/stop?pid={}", pid))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "TERMINATED");
    assert_eq!(body["records_found"], 2);
    assert_eq!(body["dump_success"], true);

    let optfile = body["optfile"].as_str().unwrap().to_string();
    assert!(optfile.starts_with(&output.path().display().to_string()));

    let req = test::TestRequest::post()
        .uri(&format!("/stop?pid={}", pid))
        .to_request();
    let again: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(again["status"], "TERMINATED");
    assert_eq!(again["stop_time"], body["stop_time"]);

    controller.join_workers();
}

#[actix_web::test]
async fn test_pass_through_routes() {
    let (controller, _output) = create_controller(false);
    let app = service!(controller);

    let req = test::TestRequest::get().uri("/detail?app_id=com.a").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["app_id"], "com.a");

    let req = test::TestRequest::get().uri("/detail?app_id=com.missing").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "INVALID_REQUEST");

    let req = test::TestRequest::get().uri("/detail?app_id=com.flaky").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_GATEWAY);

    let req = test::TestRequest::get().uri("/collection?coln=TOP_FREE&catg=GAME").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let req = test::TestRequest::get().uri("/collection?coln=BAD").to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );

    let req = test::TestRequest::get().uri("/collection?coln=TOP_FREE&page=x").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/similar?app_id=com.a").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/search").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/search?token=puzzle").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body[0]["app_id"], "com.found");
}
