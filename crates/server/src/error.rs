use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::{
    DbErr,
    models::{task::TaskError, user::UserError},
};
use thiserror::Error;
use utils_core::response::ApiResponse;
use utils_jwt::TokenError;

use crate::password::PasswordError;

pub const NOT_AUTHORIZED: &str = "Not authorized to access this route";
const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Task(err) => match err {
                TaskError::Validation(_) => (StatusCode::BAD_REQUEST, "TaskError"),
                TaskError::NotFound => (StatusCode::NOT_FOUND, "TaskError"),
                TaskError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "TaskError"),
            },
            // A duplicate account is reported as a plain 400, which is what
            // registration clients check for.
            ApiError::User(err) => match err {
                UserError::Validation(_) | UserError::EmailTaken => {
                    (StatusCode::BAD_REQUEST, "UserError")
                }
                UserError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "UserError"),
            },
            ApiError::Database(db_err) => match db_err {
                DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "DatabaseError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            },
            ApiError::Token(err) => match err {
                TokenError::Signing(_) => (StatusCode::INTERNAL_SERVER_ERROR, "TokenError"),
                _ => (StatusCode::UNAUTHORIZED, "TokenError"),
            },
            ApiError::Password(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PasswordError"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, "MethodNotAllowed"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };

        let error_message = match &self {
            _ if status_code.is_server_error() => INTERNAL_ERROR_MESSAGE.to_string(),
            ApiError::Task(TaskError::Validation(msg)) => msg.clone(),
            ApiError::User(UserError::Validation(msg)) => msg.clone(),
            ApiError::Token(_) => NOT_AUTHORIZED.to_string(),
            ApiError::Unauthorized(msg) => msg.clone(),
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::BadRequest(msg) => msg.clone(),
            _ => self.to_string(),
        };

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}
