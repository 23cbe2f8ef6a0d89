//! End-to-end routing and envelope tests over a mock provider registry.

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use mediagen::dispatch::provider::ProviderCtx;
use mediagen::dispatch::types::MediaRecord;
use mediagen::dispatch::{CacheStore, MediaProvider, MemoryStore, ProviderRegistry, Result};
use mediagen::{Ctx, Settings, routes};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

struct StubProvider;

#[async_trait]
impl MediaProvider for StubProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn domains(&self) -> &'static [&'static str] {
        &["mock.example.com"]
    }

    fn extract_id(&self, url: &str) -> Option<String> {
        url.rsplit('/')
            .find(|s| !s.is_empty())
            .filter(|s| s.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string)
    }

    async fn generate(&self, sid: &str, _ctx: &ProviderCtx) -> Result<MediaRecord> {
        let mut record = MediaRecord::new("mock", sid);
        record.set("title", "Fight Club");
        record.set("year", 1999);
        Ok(record)
    }

    fn format(&self, record: &MediaRecord) -> String {
        format!(
            "Title: {}\nYear: {}",
            record.str_field("title").unwrap_or_default(),
            record.field("year").and_then(Value::as_i64).unwrap_or(0)
        )
    }
}

fn test_app(api_key: Option<&str>) -> (Router, Arc<MemoryStore>) {
    let mut registry = ProviderRegistry::new();
    registry.register(StubProvider);

    let store = Arc::new(MemoryStore::new(100));
    let settings = Settings {
        api_key: api_key.map(str::to_string),
        ..Settings::default()
    };
    let ctx = Ctx::with_parts(
        settings,
        Arc::new(registry),
        Some(store.clone() as Arc<dyn CacheStore>),
    );

    (routes::mount().with_state(ctx), store)
}

async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build");

    let response = app.oneshot(request).await.expect("app should respond");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("body should collect");
    let value = serde_json::from_slice(&bytes).expect("body should be JSON");
    (status, value)
}

#[tokio::test]
async fn test_direct_lookup_end_to_end() {
    let (app, store) = test_app(None);

    let (status, body) = post_json(app, "/api", r#"{"source":"mock","sid":"42"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["site"], "mock");
    assert_eq!(body["sid"], "42");
    assert_eq!(body["title"], "Fight Club");
    assert!(body["format"].as_str().unwrap().contains("Fight Club"));
    assert!(body["version"].is_string());
    assert!(body["copyright"].is_string());
    assert!(body["generate_at"].is_i64());

    // The persisted entry carries raw data only, never the rendered text
    let bytes = store
        .get("mock_42")
        .await
        .expect("store get should succeed")
        .expect("entry should exist");
    let entry: Value = serde_json::from_slice(&bytes).expect("entry should be JSON");
    assert_eq!(entry["title"], "Fight Club");
    assert!(entry.get("format").is_none());
}

#[tokio::test]
async fn test_url_dispatch_end_to_end() {
    let (app, _) = test_app(None);

    let (status, body) = post_json(app, "/", r#"{"url":"https://mock.example.com/42"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["site"], "mock");
    assert!(body["format"].as_str().unwrap().contains("Fight Club"));
}

#[tokio::test]
async fn test_body_overrides_query_parameters() {
    let (app, _) = test_app(None);

    let (status, body) = post_json(app, "/api?source=mock&sid=1", r#"{"sid":"42"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sid"], "42");
}

#[tokio::test]
async fn test_query_parameters_alone_work() {
    let (app, _) = test_app(None);

    let (status, body) = post_json(app, "/api?source=mock&sid=42", "").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["sid"], "42");
}

#[tokio::test]
async fn test_missing_parameters_is_400() {
    let (app, _) = test_app(None);

    let (status, body) = post_json(app, "/api", "{}").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("Expected one of"));
}

#[tokio::test]
async fn test_unsupported_url_is_structured_200() {
    let (app, _) = test_app(None);

    let (status, body) = post_json(app, "/api", r#"{"url":"https://example.com/x"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("Unsupported URL"));
}

#[tokio::test]
async fn test_unsupported_source_is_structured_200() {
    let (app, _) = test_app(None);

    let (status, body) = post_json(app, "/api", r#"{"source":"nosuch","sid":"1"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("Unsupported source"));
}

#[tokio::test]
async fn test_api_key_gate() {
    let (app, _) = test_app(Some("sekrit"));
    let (status, _) = post_json(app, "/api", r#"{"source":"mock","sid":"42"}"#).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (app, _) = test_app(Some("sekrit"));
    let (status, _) = post_json(app, "/api?key=wrong", r#"{"source":"mock","sid":"42"}"#).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (app, _) = test_app(Some("sekrit"));
    let (status, body) =
        post_json(app, "/api?key=sekrit", r#"{"source":"mock","sid":"42"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    // Key can also ride in the body
    let (app, _) = test_app(Some("sekrit"));
    let (status, _) = post_json(
        app,
        "/api",
        r#"{"source":"mock","sid":"42","key":"sekrit"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_docs_page_is_always_public() {
    let (app, _) = test_app(Some("sekrit"));

    let request = Request::builder()
        .method("GET")
        .uri("/")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
    let html = String::from_utf8_lossy(&bytes);
    assert!(html.contains("mediagen"));
}

#[tokio::test]
async fn test_malicious_uri_is_403() {
    let (app, _) = test_app(None);

    let (status, body) = post_json(app, "/api?query=../../etc/passwd", "").await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let (app, _) = test_app(None);

    let request = Request::builder()
        .method("GET")
        .uri("/nope")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_chinese_query_auto_routes_to_tmdb() {
    // No TMDB key is configured, so a CJK query must fail with the TMDB
    // configuration error rather than reaching the IMDb backend
    let (app, _) = test_app(None);

    let (status, body) = post_json(app, "/api", r#"{"query":"复仇者联盟"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("TMDB"));
    assert_eq!(body["data"], serde_json::json!([]));
}

#[tokio::test]
async fn test_explicit_search_with_unsupported_source() {
    let (app, _) = test_app(None);

    let (status, body) = post_json(app, "/api", r#"{"source":"melon","query":"x"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("Unsupported search source")
    );
}

#[tokio::test]
async fn test_health_probe() {
    let (app, _) = test_app(None);

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
