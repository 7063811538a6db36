//! JSON error responses.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use viewtally_core::ViewTallyError;

/// Errors surfaced by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    ViewTally(#[from] ViewTallyError),
}

impl ApiError {
    /// Status code reported to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ViewTally(error) if error.is_upstream() => StatusCode::BAD_GATEWAY,
            ApiError::ViewTally(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!("View count request failed with {status}: {self}");

        (
            status,
            [(header::CACHE_CONTROL, "no-store")],
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use viewtally_core::Provider;

    use super::*;

    #[test]
    fn test_status_mapping() {
        let upstream = ApiError::from(ViewTallyError::Upstream {
            provider: Provider::YouTube,
            status: Some(500),
            message: "internal".to_string(),
        });
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);

        let config = ApiError::from(ViewTallyError::missing_credentials());
        assert_eq!(config.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let corpus = ApiError::from(ViewTallyError::CorpusUnavailable {
            reason: "gone".to_string(),
        });
        assert_eq!(corpus.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_response_is_uncached() {
        let response = ApiError::from(ViewTallyError::missing_credentials()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );
    }
}
