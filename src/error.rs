//! Authentication Error Types
//!
//! Infrastructure failures raised while talking to the credential store or
//! the token issuer. Credential and registration failures are not errors:
//! they are reported through `AuthResponse` and `RegistrationResult`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Authentication errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Internal error")]
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            AuthError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                msg.clone(),
            ),
            AuthError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration_error",
                "Server configuration error".to_string(),
            ),
            AuthError::Database(_) | AuthError::Token(_) | AuthError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        (
            status,
            Json(serde_json::json!({
                "error": error_code,
                "message": message
            })),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AuthError::Database(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::error!("Password hashing error: {:?}", err);
        AuthError::Internal
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::error!("JWT encoding error: {:?}", err);
        AuthError::Token(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_maps_to_bad_request() {
        let response = AuthError::Validation("username is required".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_infrastructure_errors_map_to_internal_error() {
        for err in [
            AuthError::Database("connection refused".into()),
            AuthError::Token("bad key".into()),
            AuthError::Internal,
        ] {
            assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
