use std::sync::Once;
use std::time::Duration;

use siteforge_client::{ClientSettings, ForgeHandle, JobEvent};
use siteforge_core::{JobStatus, StatusFilter};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(client_logging::initialize_for_tests);
}

async fn wait_until(limit: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    predicate()
}

#[tokio::test]
async fn submit_track_preview_and_delete_round_trip() {
    init_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "project_id": "p-9",
            "status": "started",
            "message": "Website generation started. Check status for progress."
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/p-9/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "project_id": "p-9",
            "status": "running",
            "progress": 10,
            "current_step": "Initializing crew...",
            "files_generated": [],
            "errors": []
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/p-9/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "project_id": "p-9",
            "status": "completed",
            "progress": 100,
            "current_step": "Done",
            "files_generated": ["index.html"],
            "errors": []
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/gallery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "projects": [{
                "project_id": "p-9",
                "title": "Coffee Shop",
                "description": "a coffee shop site",
                "status": "completed",
                "file_count": 2,
                "has_preview": true,
                "metadata": {"website_type": "business", "technologies": ["html", "css"], "file_size": 6144}
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/projects/p-9/preview/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "url": "http://localhost:3001"
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/projects/p-9"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let mut settings = ClientSettings::for_base_url(&server.uri()).expect("settings");
    settings.poll_interval = Duration::from_millis(10);
    let handle = ForgeHandle::new(settings).expect("handle");

    // Submission records a provisional view immediately; its status may
    // already have advanced if the first poll beat us here.
    let id = handle
        .submit("a coffee shop site", Vec::new(), serde_json::Value::Null)
        .await
        .expect("submit ok");
    assert_eq!(id, "p-9");
    let provisional = handle.projects();
    assert_eq!(provisional.len(), 1);
    assert_eq!(provisional[0].id, "p-9");
    assert_eq!(provisional[0].description, "a coffee shop site");

    // The tracked job converges on the server-canonical record: the
    // triggered refresh wins over the provisional snapshot.
    assert!(
        wait_until(Duration::from_secs(2), || {
            handle
                .projects()
                .first()
                .is_some_and(|record| record.status == JobStatus::Completed && record.file_count == 2)
        })
        .await,
        "record never reconciled with the gallery listing"
    );
    let record = handle.projects().remove(0);
    assert_eq!(record.title, "Coffee Shop");

    let mut finished = false;
    while let Some(event) = handle.try_recv() {
        if let JobEvent::Finished { project_id, status } = event {
            assert_eq!(project_id, "p-9");
            assert_eq!(status, JobStatus::Completed);
            finished = true;
        }
    }
    assert!(finished, "a finished event must be emitted");

    // Gallery projection over the cache.
    let hits = handle.gallery("coffee", StatusFilter::parse("completed"));
    assert_eq!(hits.len(), 1);
    assert!(handle.gallery("coffee", StatusFilter::parse("failed")).is_empty());

    // Preview and download are URL handoffs.
    let session = handle.preview("p-9").await.expect("preview ok");
    assert_eq!(session.url, "http://localhost:3001");
    assert!(handle.download_url("p-9").ends_with("/projects/p-9/download"));

    // Confirmed delete clears the record, the poll loop, and the session.
    handle.delete("p-9").await.expect("delete ok");
    assert!(handle.projects().is_empty());
    assert!(handle.preview_url("p-9").is_none());
    assert!(!handle.is_tracking("p-9"));
}

#[tokio::test]
async fn failed_submission_records_nothing() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut settings = ClientSettings::for_base_url(&server.uri()).expect("settings");
    settings.poll_interval = Duration::from_millis(10);
    let handle = ForgeHandle::new(settings).expect("handle");

    let err = handle
        .submit("doomed", Vec::new(), serde_json::Value::Null)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("submission failed"));
    assert!(handle.projects().is_empty());

    // No stray polls either.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let requests = server.received_requests().await.expect("requests");
    assert_eq!(requests.len(), 1, "only the failed submit may hit the server");
}

#[tokio::test]
async fn failed_generation_still_reconciles_once() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "project_id": "p-2",
            "status": "started",
            "message": "started"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/p-2/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "project_id": "p-2",
            "status": "failed",
            "progress": 30,
            "current_step": "Generation failed",
            "files_generated": [],
            "errors": [{"message": "crew crashed", "timestamp": "2026-02-01T09:05:00"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/gallery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "projects": [{
                "project_id": "p-2",
                "title": "",
                "description": "doomed",
                "status": "failed",
                "file_count": 0,
                "has_preview": false,
                "metadata": {"website_type": "", "technologies": [], "file_size": 0}
            }]
        })))
        .mount(&server)
        .await;

    let mut settings = ClientSettings::for_base_url(&server.uri()).expect("settings");
    settings.poll_interval = Duration::from_millis(10);
    let handle = ForgeHandle::new(settings).expect("handle");

    handle
        .submit("doomed", Vec::new(), serde_json::Value::Null)
        .await
        .expect("submit ok");

    assert!(
        wait_until(Duration::from_secs(2), || {
            handle
                .projects()
                .first()
                .is_some_and(|record| record.status == JobStatus::Failed)
                && !handle.is_tracking("p-2")
        })
        .await,
        "failed job should settle and stop polling"
    );

    // A failed project cannot be previewed.
    assert!(handle.preview("p-2").await.is_err());
}
