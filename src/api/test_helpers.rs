//! Test helper functions for api tests

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;

use super::*;

/// Router over the reference bundles for every vertical
pub fn create_test_app() -> Router {
    create_router(AppState::demo())
}

/// Send `request` and return status plus parsed JSON body
pub async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.expect("test");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("test");
    let json = serde_json::from_slice(&body).expect("test");
    (status, json)
}

/// Form-encoded POST to `uri`
pub fn form_post(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let body = fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .expect("test")
}

/// Multipart POST with a single `file` part
pub fn multipart_upload(uri: &str, file_name: &str, contents: &str) -> Request<Body> {
    const BOUNDARY: &str = "prever-test-boundary";
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {contents}\r\n\
         --{BOUNDARY}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .expect("test")
}

/// The canonical crop sample as form fields
pub const CROP_SAMPLE: [(&str, &str); 7] = [
    ("Nitrogen", "90"),
    ("Phosporus", "42"),
    ("Potassium", "43"),
    ("Temperature", "20.8"),
    ("Humidity", "82.0"),
    ("pH", "6.5"),
    ("Rainfall", "202.9"),
];
