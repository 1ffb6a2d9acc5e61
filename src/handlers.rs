//! Authentication HTTP Handlers
//!
//! REST API endpoints for authentication operations.

use crate::error::AuthError;
use crate::models::*;
use crate::service::AuthService;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

/// Shared auth service state
pub type AuthState = Arc<AuthService>;

// ============================================
// Route Builder
// ============================================

/// Create authentication routes
pub fn create_routes(auth_service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/email-in-use", get(email_in_use))
        .route("/auth/username-in-use", get(username_in_use))
        .with_state(auth_service)
}

// ============================================
// Registration
// ============================================

/// POST /auth/register
///
/// Register a new account with the default role
pub async fn register(
    State(auth): State<AuthState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    req.validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;

    let result = auth.register(&req).await?;

    let status = if result.succeeded {
        StatusCode::CREATED
    } else {
        StatusCode::BAD_REQUEST
    };

    Ok((status, Json(result)))
}

// ============================================
// Login / Logout
// ============================================

/// POST /auth/login
///
/// Authenticate a user and return a bearer token
pub async fn login(
    State(auth): State<AuthState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    req.validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;

    let response = auth.authenticate(&req).await?;

    let status = if response.is_auth_successful {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    };

    Ok((status, Json(response)))
}

/// POST /auth/logout
pub async fn logout(State(auth): State<AuthState>) -> impl IntoResponse {
    auth.sign_out().await;

    Json(MessageResponse::new("Logged out successfully"))
}

// ============================================
// Uniqueness Checks
// ============================================

/// GET /auth/email-in-use?email=
pub async fn email_in_use(
    State(auth): State<AuthState>,
    Query(query): Query<EmailQuery>,
) -> Result<impl IntoResponse, AuthError> {
    let in_use = auth.is_email_in_use(&query.email).await?;

    Ok(Json(InUseResponse { in_use }))
}

/// GET /auth/username-in-use?username=
pub async fn username_in_use(
    State(auth): State<AuthState>,
    Query(query): Query<UsernameQuery>,
) -> Result<impl IntoResponse, AuthError> {
    let in_use = auth.is_username_in_use(&query.username).await?;

    Ok(Json(InUseResponse { in_use }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::store::MemoryCredentialStore;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let store = Arc::new(MemoryCredentialStore::new(&test_config()));
        create_routes(Arc::new(AuthService::new(store, test_config())))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn alice() -> Value {
        json!({
            "username": "alice",
            "email": "a@x.com",
            "password": "Sup3r!Pass",
            "password_confirm": "Sup3r!Pass"
        })
    }

    #[tokio::test]
    async fn test_register_login_flow() {
        let app = app();

        let (status, body) = send(&app, post_json("/auth/register", alice())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["succeeded"], true);
        assert_eq!(body["status"], "created_with_role");

        let (status, body) = send(
            &app,
            Request::get("/auth/username-in-use?username=alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["in_use"], true);

        let (status, body) = send(
            &app,
            post_json("/auth/login", json!({"username": "alice", "password": "Sup3r!Pass"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_auth_successful"], true);
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[tokio::test]
    async fn test_failed_login_is_generic() {
        let app = app();
        send(&app, post_json("/auth/register", alice())).await;

        let (wrong_status, wrong) = send(
            &app,
            post_json("/auth/login", json!({"username": "alice", "password": "wrong"})),
        )
        .await;
        let (unknown_status, unknown) = send(
            &app,
            post_json("/auth/login", json!({"username": "bob", "password": "anything"})),
        )
        .await;

        assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong, unknown);
        assert_eq!(wrong["error_message"], INVALID_AUTHENTICATION);
    }

    #[tokio::test]
    async fn test_duplicate_registration_returns_field_errors() {
        let app = app();
        send(&app, post_json("/auth/register", alice())).await;

        let (status, body) = send(&app, post_json("/auth/register", alice())).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "not_created");
        assert_eq!(body["errors"][0]["code"], "DuplicateUserName");
        assert_eq!(body["errors"][1]["code"], "DuplicateEmail");
    }

    #[tokio::test]
    async fn test_malformed_registration_is_rejected_before_store() {
        let app = app();
        let mut request = alice();
        request["password_confirm"] = json!("Different!1");

        let (status, body) = send(&app, post_json("/auth/register", request)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_email_not_in_use() {
        let (status, body) = send(
            &app(),
            Request::get("/auth/email-in-use?email=nobody%40x.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["in_use"], false);
    }

    #[tokio::test]
    async fn test_logout() {
        let (status, body) = send(
            &app(),
            Request::post("/auth/logout").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Logged out successfully");
    }
}
