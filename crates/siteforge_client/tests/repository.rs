use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use siteforge_client::{ApiClient, ClientSettings, DeleteError, HttpApiClient, ProjectRepository};
use siteforge_core::{GenerationJob, JobSnapshot, JobStatus, ProjectRecord};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn listing(ids: &[&str]) -> serde_json::Value {
    let projects: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| {
            serde_json::json!({
                "project_id": id,
                "title": format!("Project {id}"),
                "description": "generated site",
                "status": "completed",
                "file_count": 2,
                "has_preview": true,
                "metadata": {"website_type": "landing", "technologies": [], "file_size": 1024}
            })
        })
        .collect();
    serde_json::json!({ "projects": projects })
}

async fn repository_for(server: &MockServer) -> Arc<ProjectRepository> {
    let settings = ClientSettings::for_base_url(&server.uri()).expect("settings");
    let client: Arc<dyn ApiClient> = Arc::new(HttpApiClient::new(settings).expect("client"));
    Arc::new(ProjectRepository::new(client))
}

#[tokio::test]
async fn refresh_replaces_the_cache_wholesale() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/gallery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&["a", "b"])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/gallery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&["b"])))
        .mount(&server)
        .await;

    let repository = repository_for(&server).await;
    repository.refresh().await.expect("first refresh");
    assert_eq!(repository.list().len(), 2);

    // A record the server no longer reports disappears on the next
    // refresh; nothing is merged.
    repository.refresh().await.expect("second refresh");
    let ids: Vec<String> = repository.list().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["b".to_string()]);
}

#[tokio::test]
async fn refresh_is_idempotent_against_an_unchanged_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/gallery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&["a", "b"])))
        .mount(&server)
        .await;

    let repository = repository_for(&server).await;
    repository.refresh().await.expect("refresh");
    let first = repository.list();
    repository.refresh().await.expect("refresh");
    let second = repository.list();
    assert_eq!(first, second);
}

#[tokio::test]
async fn applied_snapshot_is_reflected_exactly_by_list() {
    let server = MockServer::start().await;
    let repository = repository_for(&server).await;

    let mut job = GenerationJob::submitted("p-1", "a portfolio");
    job.apply_snapshot(JobSnapshot {
        status: JobStatus::Running,
        progress: 55,
        current_step: "Building pages".to_string(),
        files_generated: vec!["index.html".to_string(), "about.html".to_string()],
        errors: Vec::new(),
        created_at: "2026-02-01T09:00:00".to_string(),
    });
    repository.apply_job_snapshot(&job);

    let listed = repository.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0], ProjectRecord::provisional(&job));
    assert_eq!(listed[0].status, JobStatus::Running);
    assert_eq!(listed[0].file_count, 2);
}

#[tokio::test]
async fn reapplying_a_snapshot_updates_in_place_without_duplicating() {
    let server = MockServer::start().await;
    let repository = repository_for(&server).await;

    let mut job = GenerationJob::submitted("p-1", "a portfolio");
    repository.apply_job_snapshot(&job);
    job.apply_snapshot(JobSnapshot {
        status: JobStatus::Running,
        progress: 80,
        current_step: "Finishing".to_string(),
        files_generated: Vec::new(),
        errors: Vec::new(),
        created_at: String::new(),
    });
    repository.apply_job_snapshot(&job);

    let listed = repository.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, JobStatus::Running);
}

#[tokio::test]
async fn failed_delete_retains_the_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/gallery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&["a", "b"])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/projects/a"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let repository = repository_for(&server).await;
    repository.refresh().await.expect("refresh");
    let before = repository.list();

    let err = repository.delete("a").await.unwrap_err();
    assert!(matches!(err, DeleteError::Remote(_)));
    assert_eq!(repository.list(), before);
}

#[tokio::test]
async fn confirmed_delete_removes_exactly_that_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/gallery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&["a", "b"])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/projects/a"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let repository = repository_for(&server).await;
    repository.refresh().await.expect("refresh");

    repository.delete("a").await.expect("delete ok");
    let ids: Vec<String> = repository.list().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["b".to_string()]);

    // A repeat delete for the same id is allowed once the first completed;
    // the server answer decides the outcome.
    Mock::given(method("DELETE"))
        .and(path("/projects/b"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    repository.delete("b").await.expect("delete b");
    assert!(repository.list().is_empty());
}

#[tokio::test]
async fn a_second_in_flight_delete_for_the_same_id_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/gallery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&["a"])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/projects/a"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(200)))
        .mount(&server)
        .await;

    let repository = repository_for(&server).await;
    repository.refresh().await.expect("refresh");

    let first = {
        let repository = Arc::clone(&repository);
        tokio::spawn(async move { repository.delete("a").await })
    };
    // Let the first delete reach its network await.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = repository.delete("a").await;
    assert!(matches!(second, Err(DeleteError::ConcurrentOperation(ref id)) if id == "a"));

    first.await.expect("join").expect("first delete ok");
    assert!(repository.list().is_empty());
}
