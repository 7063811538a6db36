//! View-count endpoint handlers.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};

use crate::error::ApiError;
use crate::server::AppState;

/// `GET /api/viewcount`
///
/// Query parameters (such as a client cache-buster) are ignored.
pub async fn viewcount(State(state): State<AppState>) -> Result<Response, ApiError> {
    let summary = state.aggregator.aggregate().await?;

    Ok((
        [(header::CACHE_CONTROL, state.cache_control.clone())],
        Json(summary),
    )
        .into_response())
}

/// `OPTIONS /api/viewcount`
///
/// Answers CORS pre-flight without touching the corpus or providers.
pub async fn viewcount_preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// `HEAD /api/viewcount`
///
/// Refused outright so a HEAD never triggers an aggregation.
pub async fn viewcount_head() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "GET, OPTIONS")],
    )
}

/// `GET /healthz`
pub async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use viewtally_core::extraction::{ContentRecord, StructuredExtractor};
    use viewtally_core::providers::scripted::{ScriptedTransport, ok_json};
    use viewtally_core::{ViewCountAggregator, ViewTallyConfig};

    use crate::server::{AppState, build_router};

    fn app(config: ViewTallyConfig, transport: Arc<ScriptedTransport>) -> axum::Router {
        let records: Vec<ContentRecord> = serde_json::from_value(json!([
            { "embedUrl": "https://www.youtube.com/embed/abc123XY" }
        ]))
        .unwrap();
        let aggregator = ViewCountAggregator::new(
            &config,
            Box::new(StructuredExtractor::from_records(records)),
            transport,
        );
        build_router(AppState::new(aggregator, &config))
    }

    fn youtube_config() -> ViewTallyConfig {
        let mut config = ViewTallyConfig::default();
        config.youtube.api_key = Some("key".to_string());
        config
    }

    fn views(count: u64) -> Arc<ScriptedTransport> {
        Arc::new(ScriptedTransport::new(move |_| {
            let item = json!({ "statistics": { "viewCount": count.to_string() } });
            ok_json(json!({ "items": [item] }))
        }))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_get_returns_summary_with_cache_headers() {
        let response = app(youtube_config(), views(42))
            .oneshot(
                Request::get("/api/viewcount?t=1700000000000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "s-maxage=3600, stale-while-revalidate=86400"
        );

        let body = body_json(response).await;
        assert_eq!(body["total"], 42);
        assert_eq!(body["youtube"], 42);
        assert_eq!(body["counts"]["youtubeVideos"], 1);
    }

    #[tokio::test]
    async fn test_preflight_does_no_work() {
        let transport = views(1);
        let response = app(youtube_config(), transport.clone())
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/viewcount")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_METHODS)
                .unwrap(),
            "GET, OPTIONS"
        );
        assert_eq!(transport.request_count(), 0);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_missing_credentials_is_json_error() {
        let response = app(ViewTallyConfig::default(), views(1))
            .oneshot(Request::get("/api/viewcount").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("YOUTUBE_API_KEY"));
    }

    #[tokio::test]
    async fn test_post_is_not_allowed() {
        let response = app(youtube_config(), views(1))
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/viewcount")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_head_is_refused_without_aggregating() {
        let transport = views(1);
        let response = app(youtube_config(), transport.clone())
            .oneshot(
                Request::builder()
                    .method(Method::HEAD)
                    .uri("/api/viewcount")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.headers().get(header::ALLOW).unwrap(),
            "GET, OPTIONS"
        );
        assert!(response.headers().get(header::CACHE_CONTROL).is_none());
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_healthz() {
        let response = app(ViewTallyConfig::default(), views(1))
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
