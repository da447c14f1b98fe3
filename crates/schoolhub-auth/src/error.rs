//! Authentication error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use schoolhub_db::DbError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Identifier or password was empty
    #[error("Identifier and password are required")]
    MissingFields,

    /// No user matches, or the password is wrong. Deliberately one variant.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, malformed, tampered or expired session token
    #[error("Invalid session")]
    InvalidSession,

    /// Valid session, but the role may not access the resource
    #[error("Forbidden")]
    Forbidden,

    #[error("User store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Token signing error: {0}")]
    TokenIssue(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingFields => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials | AuthError::InvalidSession => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::StoreUnavailable(_)
            | AuthError::PasswordHash(_)
            | AuthError::TokenIssue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for API bodies
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingFields => "MISSING_FIELDS",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::InvalidSession => "INVALID_SESSION",
            AuthError::Forbidden => "FORBIDDEN",
            AuthError::StoreUnavailable(_)
            | AuthError::PasswordHash(_)
            | AuthError::TokenIssue(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show a client. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::StoreUnavailable(_)
            | AuthError::PasswordHash(_)
            | AuthError::TokenIssue(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<DbError> for AuthError {
    fn from(err: DbError) -> Self {
        AuthError::StoreUnavailable(err.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = axum::Json(json!({
            "error": {
                "code": self.code(),
                "message": self.public_message(),
            }
        }));

        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AuthError::MissingFields.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InvalidSession.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::StoreUnavailable("down".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_not_exposed() {
        let err = AuthError::StoreUnavailable("connection refused at 10.0.0.3".into());
        assert_eq!(err.public_message(), "Internal error");
        assert_eq!(AuthError::InvalidCredentials.public_message(), "Invalid credentials");
    }
}
