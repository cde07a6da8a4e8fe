#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use bytes::Bytes;
use proofline_api::setup::initialize_app;
use proofline_api::AppState;
use proofline_core::Config;
use uuid::Uuid;

pub const WORKER_SECRET: &str = "test-worker-secret";

pub struct TestApp {
    pub client: TestServer,
    pub state: AppState,
}

/// Config with every backend in memory and a plain-proof fallback, since the
/// in-memory store starts without a watermark asset.
pub fn memory_config(extra: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = [
        ("STORAGE_BACKEND", "memory"),
        ("QUEUE_BACKEND", "memory"),
        ("PHOTO_STORE_BACKEND", "memory"),
        ("LOCAL_STORAGE_BASE_URL", "https://cdn.example.test/media"),
        ("WATERMARK_POLICY", "fallback_plain"),
        ("WORKER_SECRET", WORKER_SECRET),
        ("MAX_UPLOAD_SIZE_BYTES", "1048576"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in extra {
        vars.insert(k.to_string(), v.to_string());
    }
    Config::from_map(&vars).expect("Invalid test configuration")
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(&[]).await
}

pub async fn setup_test_app_with(extra: &[(&str, &str)]) -> TestApp {
    let app = initialize_app(memory_config(extra))
        .await
        .expect("Failed to initialize app");
    let client =
        TestServer::new(app.router.into_make_service()).expect("Failed to create test server");
    TestApp {
        client,
        state: app.state,
    }
}

pub fn png(width: u32, height: u32) -> Bytes {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([120, 80, 40]),
    ));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)
        .expect("Failed to encode test image");
    Bytes::from(buffer.into_inner())
}

pub fn upload_form(classroom_id: Uuid, file_name: &str, mime: &str, data: Bytes) -> MultipartForm {
    let part = Part::bytes(data).file_name(file_name).mime_type(mime);
    MultipartForm::new()
        .add_text("classroom_id", classroom_id.to_string())
        .add_text("alt_text", "Class of 2026")
        .add_part("file", part)
}
