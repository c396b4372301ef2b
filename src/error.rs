use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email address has not been verified")]
    EmailNotVerified,

    #[error("Invalid or expired token")]
    InvalidToken,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Validation(String),

    #[error("Access denied")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Too many attempts, try again in a few minutes")]
    RateLimited,

    /// A multi-step operation stopped partway; earlier steps are not rolled back.
    #[error("{0}")]
    PartialFailure(String),

    #[error("{0}")]
    Internal(anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Auth(AuthError::InvalidCredentials) => {
                (StatusCode::UNAUTHORIZED, "invalid_credentials")
            }
            AppError::Auth(AuthError::EmailNotVerified) => {
                (StatusCode::FORBIDDEN, "email_not_verified")
            }
            AppError::Auth(AuthError::InvalidToken) => (StatusCode::UNAUTHORIZED, "invalid_token"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            AppError::PartialFailure(_) => (StatusCode::INTERNAL_SERVER_ERROR, "partial_failure"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

/// Services return `anyhow::Result`; an `AppError` raised inside one survives the trip.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<AppError>() {
            Ok(app) => app,
            Err(err) => match err.downcast::<AuthError>() {
                Ok(auth) => AppError::Auth(auth),
                Err(err) => AppError::Internal(err),
            },
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {self}");
        }
        (status, Json(json!({ "error": self.to_string(), "code": code }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_survives_anyhow() {
        let err: anyhow::Error = AppError::NotFound("Trip").into();
        let back = AppError::from(err);
        assert!(matches!(back, AppError::NotFound("Trip")));
    }

    #[test]
    fn test_auth_error_survives_anyhow() {
        let err: anyhow::Error = AuthError::EmailNotVerified.into();
        let back = AppError::from(err);
        assert_eq!(back.status_and_code().0, StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_plain_anyhow_is_internal() {
        let back = AppError::from(anyhow::anyhow!("disk full"));
        assert!(matches!(back, AppError::Internal(_)));
        assert_eq!(back.to_string(), "disk full");
    }
}
