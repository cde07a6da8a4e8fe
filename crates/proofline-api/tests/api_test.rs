mod helpers;

use helpers::*;
use uuid::Uuid;

#[tokio::test]
async fn test_upload_is_accepted_and_enqueued() {
    let app = setup_test_app().await;
    let classroom = Uuid::new_v4();

    let response = app
        .client
        .post("/api/v0/uploads")
        .multipart(upload_form(classroom, "group.png", "image/png", png(400, 300)))
        .await;

    assert_eq!(response.status_code(), 202);
    let data: serde_json::Value = response.json();
    let original_path = data["original_path"].as_str().unwrap();
    assert!(original_path.starts_with(&format!("originals/{}/", classroom)));
    assert!(original_path.ends_with(".png"));
    assert!(data["message_id"].as_i64().is_some());

    let stats = app.state.services.queue.stats().await.unwrap();
    assert_eq!(stats.visible, 1);
}

#[tokio::test]
async fn test_upload_rejects_disallowed_content_type() {
    let app = setup_test_app().await;

    let response = app
        .client
        .post("/api/v0/uploads")
        .multipart(upload_form(
            Uuid::new_v4(),
            "notes.txt",
            "text/plain",
            bytes::Bytes::from_static(b"not an image"),
        ))
        .await;

    assert_eq!(response.status_code(), 400);
    let data: serde_json::Value = response.json();
    assert_eq!(data["code"], "VALIDATION_ERROR");
    assert_eq!(data["recoverable"], false);

    let stats = app.state.services.queue.stats().await.unwrap();
    assert_eq!(stats.visible, 0);
}

#[tokio::test]
async fn test_upload_requires_classroom_id() {
    let app = setup_test_app().await;
    let form = axum_test::multipart::MultipartForm::new().add_part(
        "file",
        axum_test::multipart::Part::bytes(png(10, 10))
            .file_name("a.png")
            .mime_type("image/png"),
    );

    let response = app.client.post("/api/v0/uploads").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let data: serde_json::Value = response.json();
    assert!(data["error"].as_str().unwrap().contains("classroom_id"));
}

#[tokio::test]
async fn test_worker_endpoint_requires_bearer_secret() {
    let app = setup_test_app().await;

    let missing = app.client.post("/api/v0/worker/run").await;
    assert_eq!(missing.status_code(), 401);

    let wrong = app
        .client
        .post("/api/v0/worker/run")
        .add_header("Authorization", "Bearer nope")
        .await;
    assert_eq!(wrong.status_code(), 401);
}

#[tokio::test]
async fn test_worker_endpoint_rejects_everyone_without_configured_secret() {
    let mut config = memory_config(&[]);
    config.worker.secret = None;
    let app = proofline_api::setup::initialize_app(config).await.unwrap();
    let client = axum_test::TestServer::new(app.router.into_make_service()).unwrap();

    let response = client
        .post("/api/v0/worker/run")
        .add_header("Authorization", format!("Bearer {}", WORKER_SECRET))
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_upload_then_worker_run_publishes_photo() {
    let app = setup_test_app().await;
    let classroom = Uuid::new_v4();

    let upload = app
        .client
        .post("/api/v0/uploads")
        .multipart(upload_form(classroom, "team.png", "image/png", png(1800, 1200)))
        .await;
    assert_eq!(upload.status_code(), 202);

    let run = app
        .client
        .post("/api/v0/worker/run")
        .add_header("Authorization", format!("Bearer {}", WORKER_SECRET))
        .await;
    assert_eq!(run.status_code(), 200);
    let report: serde_json::Value = run.json();
    assert_eq!(report["processed_count"], 1);
    assert_eq!(report["success_count"], 1);
    assert_eq!(report["failure_count"], 0);
    assert_eq!(report["dead_lettered_count"], 0);

    let listing = app
        .client
        .get(&format!("/api/v0/classrooms/{}/photos", classroom))
        .await;
    assert_eq!(listing.status_code(), 200);
    let photos: serde_json::Value = listing.json();
    let photos = photos.as_array().unwrap();
    assert_eq!(photos.len(), 1);
    assert_eq!(photos[0]["width"], 1500);
    assert_eq!(photos[0]["height"], 1000);
    assert_eq!(photos[0]["alt_text"], "Class of 2026");
    assert!(photos[0].get("original_path").is_none());
    assert!(photos[0]["watermarked_url"]
        .as_str()
        .unwrap()
        .starts_with("https://cdn.example.test/media/processed/"));
    assert!(photos[0]["thumbnail_url"]
        .as_str()
        .unwrap()
        .starts_with("https://cdn.example.test/media/thumbnails/"));

    let stats = app.state.services.queue.stats().await.unwrap();
    assert_eq!(stats.archived, 1);
}

#[tokio::test]
async fn test_empty_worker_run_reports_zero() {
    let app = setup_test_app().await;

    let run = app
        .client
        .post("/api/v0/worker/run")
        .add_header("Authorization", format!("Bearer {}", WORKER_SECRET))
        .await;

    assert_eq!(run.status_code(), 200);
    let report: serde_json::Value = run.json();
    assert_eq!(report["processed_count"], 0);
}

#[tokio::test]
async fn test_health_reports_queue_stats() {
    let app = setup_test_app().await;

    let response = app.client.get("/health").await;

    assert_eq!(response.status_code(), 200);
    let data: serde_json::Value = response.json();
    assert_eq!(data["status"], "healthy");
    assert_eq!(data["storage_backend"], "memory");
    assert_eq!(data["queue_stats"]["visible"], 0);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = setup_test_app().await;

    let response = app
        .client
        .get("/health")
        .add_header("X-Request-ID", "req-123")
        .await;

    assert_eq!(response.header("X-Request-ID"), "req-123");
}
