use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tripweave_shared::ServiceError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] tripweave_shared::Error),

    #[error("{0}")]
    BadRequest(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        AppError::Domain(err.into())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Domain(err.into())
    }
}

fn service_status(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::NotFound | ServiceError::NoRoute => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        ServiceError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ServiceError::Network(_) | ServiceError::Malformed(_) => StatusCode::BAD_GATEWAY,
        ServiceError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        use tripweave_shared::Error;

        let message = self.to_string();
        let (status, kind, message) = match self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request", message),
            AppError::Domain(Error::Validate(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation", message)
            }
            AppError::Domain(Error::User(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid", message)
            }
            AppError::Domain(Error::NotFound) => (StatusCode::NOT_FOUND, "not_found", message),
            AppError::Domain(Error::Conflict(_)) => (StatusCode::CONFLICT, "conflict", message),
            AppError::Domain(Error::Deleted) => (StatusCode::GONE, "deleted", message),
            AppError::Domain(Error::Service(err)) => {
                tracing::warn!(error = %err, "upstream service failed");
                (service_status(&err), err.kind(), message)
            }
            AppError::Domain(err @ (Error::Server(_) | Error::Unknown(_))) => {
                tracing::error!(error = ?err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Something went wrong".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message, "kind": kind }))).into_response()
    }
}
