use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::domain::StageError;
use crate::ports::RepositoryError;
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid stage: {0}")]
    InvalidStage(String),

    #[error("Stage already completed: {0}")]
    AlreadyCompleted(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[source] RepositoryError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidStage(_) => StatusCode::BAD_REQUEST,
            AppError::AlreadyCompleted(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StageError> for AppError {
    fn from(err: StageError) -> Self {
        match err {
            StageError::InvalidStage(name) => AppError::InvalidStage(name),
            StageError::AlreadyCompleted(stage) => AppError::AlreadyCompleted(stage.to_string()),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Bodies that are not JSON, or whose fields have the wrong type, are
/// reported like any other invalid input.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => {
                AppError::NotFound(format!("Transaction {} not found", id))
            }
            RepositoryError::StageAlreadyCompleted(stage) => {
                AppError::AlreadyCompleted(stage.to_string())
            }
            other => AppError::Storage(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Stage;
    use uuid::Uuid;

    #[test]
    fn test_invalid_stage_status_code() {
        let error = AppError::from(StageError::InvalidStage("shipped".to_string()));
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_already_completed_status_code() {
        let error = AppError::from(StageError::AlreadyCompleted(Stage::B100Supplied));
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
        assert_eq!(error.to_string(), "Stage already completed: b100Supplied");
    }

    #[test]
    fn test_validation_error_status_code() {
        let error = AppError::from(ValidationError::new("volume", "must be a number"));
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(error.to_string(), "Validation error: volume: must be a number");
    }

    #[test]
    fn test_repository_not_found_maps_to_not_found() {
        let error = AppError::from(RepositoryError::NotFound(Uuid::nil()));
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_repository_stage_conflict_maps_to_conflict() {
        let error = AppError::from(RepositoryError::StageAlreadyCompleted(Stage::RcUploadedToBank));
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
        assert_eq!(error.to_string(), "Stage already completed: rcUploadedToBank");
    }

    #[test]
    fn test_storage_error_keeps_source() {
        let error = AppError::from(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(
            error,
            AppError::Storage(RepositoryError::Database(sqlx::Error::PoolTimedOut))
        ));
    }

    #[test]
    fn test_bad_request_error_status_code() {
        let error = AppError::BadRequest("Bad request".to_string());
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_not_found_error_response() {
        let error = AppError::NotFound("Transaction not found".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_storage_error_response() {
        let error = AppError::from(RepositoryError::Unavailable("down".to_string()));
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
