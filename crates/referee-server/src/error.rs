use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use referee_store::StoreError;
use thiserror::Error;

use crate::peers::PeerError;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Malformed input, rejected before any store or peer call.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Well-formed input the store cannot act on, including zero rows
    /// affected by an update or delete.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A store or peer-service call failed.
    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerError::BadRequest(_) => "bad_request",
            ServerError::InvalidArgument(_) => "invalid_argument",
            ServerError::NotFound(_) => "not_found",
            ServerError::Upstream(_) => "upstream",
            ServerError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::InvalidArgument(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Zero rows affected by a write.
    pub fn no_rows(what: &str) -> Self {
        ServerError::InvalidArgument(format!("no {what} was changed"))
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = match &self {
            ServerError::Upstream(detail) => {
                tracing::error!(error = %detail, "upstream call failed");
                "Upstream service error".to_string()
            }
            ServerError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "error": {
                "kind": self.kind(),
                "message": message,
            },
        });

        (self.status(), axum::Json(body)).into_response()
    }
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ServerError::NotFound("record not found".into()),
            StoreError::Conflict(msg) => ServerError::InvalidArgument(msg),
            StoreError::Invalid(msg) => ServerError::InvalidArgument(msg),
            other => ServerError::Upstream(other.to_string()),
        }
    }
}

impl From<PeerError> for ServerError {
    fn from(err: PeerError) -> Self {
        match err {
            PeerError::Store(e) => e.into(),
            dup @ PeerError::DuplicateRole => ServerError::InvalidArgument(dup.to_string()),
            down @ PeerError::Unavailable(_) => ServerError::Upstream(down.to_string()),
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(rejection: QueryRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_taxonomy() {
        assert_eq!(ServerError::from(StoreError::NotFound).kind(), "not_found");
        assert_eq!(
            ServerError::from(StoreError::Conflict("dup".into())).kind(),
            "invalid_argument"
        );
        assert_eq!(
            ServerError::from(StoreError::Migration("boom".into())).kind(),
            "upstream"
        );
        assert_eq!(
            ServerError::from(PeerError::Unavailable("down".into())).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn test_envelope_hides_upstream_detail() {
        let response = ServerError::Upstream("disk I/O error at /secret".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"]["kind"], "upstream");
        assert_eq!(json["error"]["message"], "Upstream service error");
    }
}
