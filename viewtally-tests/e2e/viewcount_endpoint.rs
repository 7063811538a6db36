//! `/api/viewcount` through the full router.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use viewtally_core::providers::scripted::ScriptedTransport;
use viewtally_core::{ViewCountAggregator, ViewTallyConfig, select_extractor};
use viewtally_web::{AppState, build_router};

use crate::fixtures::{FakeApis, YOUTUBE_HOST, config_in, vimeo_embed, write_records, youtube_embed};

const LOCAL_ORIGIN: &str = "http://localhost:3000";

struct TestApp {
    _dir: TempDir,
    router: Router,
    transport: Arc<ScriptedTransport>,
}

fn test_app(apis: FakeApis, configure: impl FnOnce(&mut ViewTallyConfig)) -> TestApp {
    let dir = TempDir::new().unwrap();
    write_records(
        dir.path(),
        json!([
            { "slug": "reel", "embedUrl": youtube_embed("abc123XYZ_-") },
            { "slug": "short", "embedUrl": vimeo_embed("76979871") }
        ]),
    );

    let mut config = config_in(dir.path(), true, true);
    configure(&mut config);

    let transport = apis.into_transport();
    let aggregator =
        ViewCountAggregator::new(&config, select_extractor(&config.corpus), transport.clone());
    let router = build_router(AppState::new(aggregator, &config));

    TestApp {
        _dir: dir,
        router,
        transport,
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> Response {
    app.router.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str, origin: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(origin) = origin {
        builder = builder.header(header::ORIGIN, origin);
    }
    builder.body(Body::empty()).unwrap()
}

fn header_value<'a>(response: &'a Response, name: header::HeaderName) -> &'a str {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_get_returns_aggregate() {
    let app = test_app(FakeApis::new(42, 8), |_| {});

    let request = get("/api/viewcount?t=1712345678901", Some(LOCAL_ORIGIN));
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_value(&response, header::CACHE_CONTROL),
        "s-maxage=3600, stale-while-revalidate=86400"
    );
    assert_eq!(
        header_value(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN),
        LOCAL_ORIGIN
    );
    let content_type = header_value(&response, header::CONTENT_TYPE);
    assert!(content_type.starts_with("application/json"));

    let body = json_body(response).await;
    assert_eq!(body["total"], 50);
    assert_eq!(body["youtube"], 42);
    assert_eq!(body["vimeo"], 8);
    let counts = json!({ "youtubeVideos": 1, "vimeoVideos": 1 });
    assert_eq!(body["counts"], counts);
    assert!(body.get("failedProviders").is_none());
    assert!(body["updatedAt"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_each_request_recomputes() {
    let app = test_app(FakeApis::new(1, 1), |_| {});

    send(&app, get("/api/viewcount", None)).await;
    send(&app, get("/api/viewcount", None)).await;

    assert_eq!(app.transport.request_count(), 4);
}

#[tokio::test]
async fn test_unknown_origin_receives_default_origin() {
    let app = test_app(FakeApis::new(1, 1), |config| {
        config.cors.allowed_origins = vec!["https://studio.example".to_string()];
        config.cors.default_origin = "https://studio.example".to_string();
    });

    let request = get("/api/viewcount", Some("https://elsewhere.example"));
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_value(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN),
        "https://studio.example"
    );
}

#[tokio::test]
async fn test_preflight_is_answered_without_work() {
    let app = test_app(FakeApis::new(1, 1), |_| {});

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/viewcount")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        header_value(&response, header::ACCESS_CONTROL_ALLOW_METHODS),
        "GET, OPTIONS"
    );
    assert_eq!(
        header_value(&response, header::ACCESS_CONTROL_ALLOW_HEADERS),
        "Content-Type"
    );
    assert_eq!(app.transport.request_count(), 0);
}

#[tokio::test]
async fn test_head_is_refused_without_work() {
    let app = test_app(FakeApis::new(1, 1), |_| {});

    let request = Request::builder()
        .method(Method::HEAD)
        .uri("/api/viewcount")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(header_value(&response, header::ALLOW), "GET, OPTIONS");
    assert_eq!(app.transport.request_count(), 0);
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let app = test_app(FakeApis::new(42, 8).failing(YOUTUBE_HOST), |_| {});

    let response = send(&app, get("/api/viewcount", Some("http://localhost:5173"))).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(header_value(&response, header::CACHE_CONTROL), "no-store");
    assert_eq!(
        header_value(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN),
        "http://localhost:5173"
    );

    let body = json_body(response).await;
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("YouTube"));
    assert!(message.contains("500"));
    assert!(body.get("total").is_none());
}

#[tokio::test]
async fn test_missing_credentials_is_server_error() {
    let app = test_app(FakeApis::new(1, 1), |config| {
        config.youtube.api_key = None;
        config.vimeo.access_token = None;
    });

    let response = send(&app, get("/api/viewcount", None)).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("Missing credentials"));
    assert_eq!(app.transport.request_count(), 0);
}

#[tokio::test]
async fn test_degraded_response_lists_failed_provider() {
    let app = test_app(FakeApis::new(42, 8).failing(YOUTUBE_HOST), |config| {
        config.aggregation.failure_policy = viewtally_core::FailurePolicy::Degrade;
    });

    let response = send(&app, get("/api/viewcount", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total"], 8);
    assert_eq!(body["failedProviders"], json!(["youtube"]));
}
