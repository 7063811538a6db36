//! Origin allow-list for the view-count endpoint.
//!
//! An unrecognized origin receives the configured default origin in
//! `Access-Control-Allow-Origin`, never an empty or missing header.

use axum::extract::{Request, State};
use axum::http::{HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use viewtally_core::config::CorsConfig;

use crate::server::AppState;

const ALLOWED_METHODS: &str = "GET, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type";

/// The origin to advertise for a request carrying `origin`.
pub fn resolve_origin<'a>(cors: &'a CorsConfig, origin: Option<&'a str>) -> &'a str {
    match origin {
        Some(origin) if cors.allowed_origins.iter().any(|allowed| allowed == origin) => origin,
        _ => &cors.default_origin,
    }
}

/// Middleware adding CORS headers to every response of the route.
pub async fn apply_cors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let mut response = next.run(request).await;

    let allowed = resolve_origin(&state.cors, origin.as_deref());
    let headers = response.headers_mut();
    match HeaderValue::from_str(allowed) {
        Ok(value) => {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        Err(_) => tracing::warn!("Configured origin {allowed:?} is not a valid header value"),
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    headers.append(header::VARY, HeaderValue::from_static("Origin"));

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cors() -> CorsConfig {
        CorsConfig {
            allowed_origins: vec![
                "https://studio.example".to_string(),
                "https://www.studio.example".to_string(),
            ],
            default_origin: "https://studio.example".to_string(),
        }
    }

    #[test]
    fn test_known_origin_is_echoed() {
        let cors = cors();
        assert_eq!(
            resolve_origin(&cors, Some("https://www.studio.example")),
            "https://www.studio.example"
        );
    }

    #[test]
    fn test_unknown_origin_gets_default() {
        let cors = cors();
        assert_eq!(
            resolve_origin(&cors, Some("https://evil.example")),
            "https://studio.example"
        );
        assert_eq!(resolve_origin(&cors, None), "https://studio.example");
    }
}
