#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use tower::ServiceExt;

use a11yscan_api::config::ServerConfig;
use a11yscan_api::router::build_app_router;
use a11yscan_api::state::AppState;
use a11yscan_core::content::{Attachment, InMemoryContentRepository, Page};
use a11yscan_scanner::ScanOrchestrator;

pub const HOME_URL: &str = "https://example.com";

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        home_url: HOME_URL.to_string(),
    }
}

/// A small seeded corpus:
///
/// - page 1 (`post`): one inline image resolved via `wp-image-5`, whose
///   attachment has blank alt and no title.
/// - page 2 (`page`): featured image only (attachment 9, fully captioned).
pub fn seeded_content() -> InMemoryContentRepository {
    let modified = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

    InMemoryContentRepository::new(HOME_URL)
        .with_attachment(Attachment {
            id: 5,
            url: format!("{HOME_URL}/wp-content/uploads/2024/03/photo.jpg"),
            filename: "photo.jpg".to_string(),
            width: Some(800),
            height: Some(600),
            byte_size: Some(120_000),
            alt_text: Some(String::new()),
            title: None,
        })
        .with_attachment(Attachment {
            id: 9,
            url: format!("{HOME_URL}/wp-content/uploads/2024/03/hero.jpg"),
            filename: "hero.jpg".to_string(),
            width: Some(1600),
            height: Some(900),
            byte_size: Some(480_000),
            alt_text: Some("Sunset over the harbor".to_string()),
            title: Some("Harbor sunset".to_string()),
        })
        .with_page(Page {
            id: 1,
            title: "A post with one image".to_string(),
            url: format!("{HOME_URL}/posts/one-image"),
            page_type: "post".to_string(),
            last_modified: modified,
            body_html: format!(
                "<p>Intro.</p><img class=\"wp-image-5\" \
                 src=\"{HOME_URL}/wp-content/uploads/2024/03/photo.jpg\">"
            ),
            featured_image_id: None,
        })
        .with_page(Page {
            id: 2,
            title: "A page with a featured image".to_string(),
            url: format!("{HOME_URL}/about"),
            page_type: "page".to_string(),
            last_modified: modified,
            body_html: "<p>No inline images here.</p>".to_string(),
            featured_image_id: Some(9),
        })
}

/// Build the full application router against the given pool and the
/// default seeded corpus.
///
/// This goes through [`build_app_router`] so integration tests exercise
/// the same middleware stack (CORS, request ID, timeout, tracing, panic
/// recovery) that production uses.
pub fn build_test_app(pool: SqlitePool) -> Router {
    build_test_app_with(pool, seeded_content())
}

/// Build the application router with a caller-provided corpus.
pub fn build_test_app_with(pool: SqlitePool, content: InMemoryContentRepository) -> Router {
    let config = test_config();
    let orchestrator = Arc::new(ScanOrchestrator::new(pool.clone(), Arc::new(content)));

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        orchestrator,
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect the response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect the response body as a UTF-8 string.
pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Start a scan over the seeded corpus and return its session id.
pub async fn start_scan(app: &Router, mode: &str) -> String {
    let response = post_json(
        app.clone(),
        "/api/v1/scans",
        serde_json::json!({ "mode": mode }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["data"]["session_id"].as_str().unwrap().to_string()
}
