use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{models::ErrorResponse, repository::RepositoryError};

/// ApiError
///
/// Every failure a handler can return. Each variant maps to exactly one HTTP status,
/// and every response body has the shape `{ "error": <message> }`.
///
/// `Unauthorized` means no usable session; `Forbidden` means a resolved caller that is
/// not entitled to the snippet. Both render the message "Unauthorized".
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Unauthorized")]
    Forbidden,
    #[error("Snippet not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    /// Carries only the public, per-operation message. The underlying cause is logged
    /// where the error is created and never reaches the client.
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    /// Logs a store failure for operators and hides it behind `message`.
    pub fn internal(message: &'static str, cause: RepositoryError) -> Self {
        tracing::error!(error = %cause, "{}", message);
        ApiError::Internal(message)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Malformed or non-JSON request bodies are reported in the same `{ "error" }` shape.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "rejected request body");
        ApiError::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn forbidden_and_unauthorized_share_a_message_but_not_a_status() {
        assert_eq!(ApiError::Forbidden.to_string(), "Unauthorized");
        assert_eq!(ApiError::Unauthorized.to_string(), "Unauthorized");
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn internal_error_body_has_only_the_public_message() {
        let response = ApiError::Internal("Failed to fetch snippets").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "Failed to fetch snippets" }));
    }
}
