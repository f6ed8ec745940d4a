//! API error types with IntoResponse
//!
//! Every failure leaves the server as the error envelope
//! `{message, error, success:false}`, or the validation envelope for 422.

use std::any::Any;

use axum::extract::rejection::JsonRejection;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::AppError;
use crate::validation::ValidationErrors;

/// Message of the 422 envelope
pub const INVALID_INPUT_MESSAGE: &str = "Invalid input information";

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Service failure, status taken from the error kind
    App(AppError),

    /// Payload failed its rules (422)
    Validation(ValidationErrors),

    /// Body could not be decoded (400)
    BadRequest { detail: String },
}

/// `{message, error, success:false}` with `status`
pub(crate) fn error_body(status: StatusCode, message: &str, error: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "message": message,
            "error": error.into(),
            "success": false
        })),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::App(err) => {
                if let AppError::Internal { source } = &err {
                    tracing::error!(error = %source, "internal error");
                }
                error_body(err.status(), err.message(), err.detail())
            }
            Self::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "message": INVALID_INPUT_MESSAGE,
                    "errors": errors,
                    "success": false
                })),
            )
                .into_response(),
            Self::BadRequest { detail } => {
                error_body(StatusCode::BAD_REQUEST, "Invalid request body", detail)
            }
        }
    }
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        Self::App(e)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(e: ValidationErrors) -> Self {
        Self::Validation(e)
    }
}

impl From<crate::db::DbError> for ApiError {
    fn from(e: crate::db::DbError) -> Self {
        Self::App(e.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest {
            detail: rejection.body_text(),
        }
    }
}

/// Router fallback for unmatched paths.
pub async fn route_not_found(method: Method, uri: Uri) -> Response {
    error_body(
        StatusCode::NOT_FOUND,
        "Route not found",
        format!("Cannot {} {}", method, uri.path()),
    )
}

/// Method fallback for paths that exist under other methods.
pub async fn method_not_allowed(method: Method, uri: Uri) -> Response {
    error_body(
        StatusCode::METHOD_NOT_ALLOWED,
        "Method not allowed",
        format!("Cannot {} {}", method, uri.path()),
    )
}

/// Response rendered by the panic-catching layer.
pub fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("request handler panicked");
    error_body(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error",
        "handler panicked",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{FieldRules, Rule, Validate, Validator};
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    struct Title(&'static str);

    impl Validate for Title {
        fn fields(&self) -> Vec<FieldRules<'_>> {
            const RULES: &[Rule] = &[Rule::Required, Rule::Min(3)];
            vec![FieldRules::new("title", self.0, RULES)]
        }
    }

    #[tokio::test]
    async fn not_found_is_404_envelope() {
        let response = ApiError::from(AppError::not_found("Todo not found")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"message": "Todo not found", "error": "not found", "success": false})
        );
    }

    #[tokio::test]
    async fn internal_keeps_cause_text() {
        let response = ApiError::from(AppError::internal("pool timed out")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Internal server error");
        assert_eq!(body["error"], "pool timed out");
    }

    #[tokio::test]
    async fn validation_is_422_with_field_list() {
        let errors = Validator::todos().validate(&Title("ab")).unwrap_err();
        let response = ApiError::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["message"], INVALID_INPUT_MESSAGE);
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"][0]["field"], "title");
        assert_eq!(
            body["errors"][0]["message"],
            "Field 'title' is too short (minimum 3 characters)"
        );
    }

    #[tokio::test]
    async fn fallback_names_method_and_path() {
        let response = route_not_found(Method::GET, "/x?y=1".parse().unwrap()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"message": "Route not found", "error": "Cannot GET /x", "success": false})
        );
    }

    #[tokio::test]
    async fn wrong_method_is_405_envelope() {
        let response = method_not_allowed(Method::PATCH, "/api/todos".parse().unwrap()).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            body_json(response).await,
            json!({"message": "Method not allowed", "error": "Cannot PATCH /api/todos", "success": false})
        );
    }
}
