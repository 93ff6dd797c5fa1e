use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Everything a request handler can fail with. Collaborator failures
/// (storage, serialization, disk) convert in via `#[from]`; the rest are
/// raised directly by the domain modules.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("unauthenticated request")]
    InvalidToken,

    #[error("session expired, log in again")]
    ExpiredToken,

    #[error("unknown user")]
    UnknownEmail,

    #[error("incorrect password")]
    BadCredential,

    #[error("email is already registered")]
    DuplicateEmail,

    #[error("book not found")]
    BookNotFound,

    #[error("rating already submitted for this book")]
    DuplicateRating,

    #[error("rating must be an integer between 0 and 5")]
    GradeOutOfRange,

    #[error("password hashing failed")]
    Hashing,

    #[error("token signing failed")]
    TokenIssue,

    #[error("storage error: {0}")]
    Storage(#[from] redis::RedisError),

    #[error("malformed stored document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("image storage error: {0}")]
    Image(#[from] std::io::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::DuplicateEmail
            | AppError::DuplicateRating
            | AppError::GradeOutOfRange => StatusCode::BAD_REQUEST,

            AppError::InvalidToken
            | AppError::ExpiredToken
            | AppError::UnknownEmail
            | AppError::BadCredential => StatusCode::UNAUTHORIZED,

            AppError::BookNotFound => StatusCode::NOT_FOUND,

            AppError::Hashing
            | AppError::TokenIssue
            | AppError::Storage(_)
            | AppError::Document(_)
            | AppError::Image(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("request failed: {self}");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;
    use axum::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::DuplicateRating.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::DuplicateEmail.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::ExpiredToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::BookNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Hashing.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
