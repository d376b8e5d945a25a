use std::borrow::Cow;

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::QueryRejection;
use serde_json::json;

use crate::http_server::api::validation::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ServerError {
    /// A failure the caller can act on, rendered as `{"detail": ...}`.
    #[error("{1}")]
    Detail(StatusCode, Cow<'static, str>),
    #[error("Invalid payload")]
    Validation(ValidationErrors),
    #[error("{0}")]
    Report(color_eyre::Report, StatusCode),
}

impl ServerError {
    pub(crate) fn bad_request(detail: impl Into<Cow<'static, str>>) -> Self {
        Self::Detail(StatusCode::BAD_REQUEST, detail.into())
    }

    pub(crate) fn not_found() -> Self {
        Self::Detail(StatusCode::NOT_FOUND, "Not found.".into())
    }

    pub(crate) fn unauthorized() -> Self {
        Self::Detail(
            StatusCode::UNAUTHORIZED,
            "Authentication credentials were not provided.".into(),
        )
    }

    pub(crate) fn invalid_token() -> Self {
        Self::Detail(StatusCode::UNAUTHORIZED, "Invalid token.".into())
    }

    pub(crate) fn forbidden() -> Self {
        Self::Detail(
            StatusCode::FORBIDDEN,
            "You do not have permission to perform this action.".into(),
        )
    }

    pub(crate) fn status(&self) -> StatusCode {
        match self {
            ServerError::Detail(status, _) | ServerError::Report(_, status) => *status,
            ServerError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            ServerError::Detail(_, detail) => {
                (status, Json(json!({ "detail": detail }))).into_response()
            }
            ServerError::Validation(errors) => (status, Json(errors)).into_response(),
            ServerError::Report(report, _) if status.is_server_error() => {
                let error: &(dyn std::error::Error + Send + Sync + 'static) = report.as_ref();
                sentry::capture_error(error);

                tracing::error!(error = ?report, "ServerError");

                (
                    status,
                    Json(json!({ "detail": "A server error occurred." })),
                )
                    .into_response()
            }
            ServerError::Report(report, _) => {
                tracing::warn!(error = %report, "ServerError");

                (status, Json(json!({ "detail": report.to_string() }))).into_response()
            }
        }
    }
}

impl From<color_eyre::Report> for ServerError {
    fn from(err: color_eyre::Report) -> Self {
        ServerError::Report(err, StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<ValidationErrors> for ServerError {
    fn from(errors: ValidationErrors) -> Self {
        ServerError::Validation(errors)
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ServerError {
    fn from(_: PathRejection) -> Self {
        ServerError::not_found()
    }
}

impl From<QueryRejection> for ServerError {
    fn from(rejection: QueryRejection) -> Self {
        ServerError::bad_request(rejection.to_string())
    }
}

pub(crate) trait WithStatus<T> {
    fn with_status(self, status: StatusCode) -> Result<T, ServerError>;
}

impl<T> WithStatus<T> for Result<T, color_eyre::Report> {
    fn with_status(self, status: StatusCode) -> Result<T, ServerError> {
        self.map_err(|err| ServerError::Report(err, status))
    }
}

#[cfg(test)]
mod test {
    use color_eyre::eyre::eyre;

    use super::*;
    use crate::http_server::test_helpers::response_body_json;

    #[tokio::test]
    async fn test_detail_response() {
        let response = ServerError::not_found().into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = response_body_json(response).await;
        assert_eq!(body, json!({ "detail": "Not found." }));
    }

    #[tokio::test]
    async fn test_internal_errors_are_not_leaked() {
        let err: Result<(), _> = Err(eyre!("connection string postgres://secret"));
        let response = err
            .with_status(StatusCode::INTERNAL_SERVER_ERROR)
            .unwrap_err()
            .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response_body_json(response).await;
        assert_eq!(body, json!({ "detail": "A server error occurred." }));
    }

    #[tokio::test]
    async fn test_client_error_reports_show_their_message() {
        let err: Result<(), _> = Err(eyre!("Recipe is locked"));
        let response = err
            .with_status(StatusCode::CONFLICT)
            .unwrap_err()
            .into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body: serde_json::Value = response_body_json(response).await;
        assert_eq!(body, json!({ "detail": "Recipe is locked" }));
    }

    #[tokio::test]
    async fn test_validation_response() {
        let mut errors = ValidationErrors::default();
        errors.add("name", "This field is required.");

        let response = ServerError::from(errors).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response_body_json(response).await;
        assert_eq!(body, json!({ "name": ["This field is required."] }));
    }
}
