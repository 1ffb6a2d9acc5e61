//! Authentication Models
//!
//! Data structures for authentication requests, responses, and stored accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Message returned for every failed authentication attempt.
///
/// Unknown usernames and wrong passwords must stay indistinguishable.
pub const INVALID_AUTHENTICATION: &str = "Invalid Authentication";

// ============================================
// Stored Entities
// ============================================

/// Registered account as held by the credential store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Lookup key for case-insensitive username uniqueness
    pub fn normalized_username(&self) -> String {
        normalize(&self.username)
    }

    /// Lookup key for case-insensitive email uniqueness
    pub fn normalized_email(&self) -> String {
        normalize(&self.email)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

/// Normalize a username or email for comparison
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

// ============================================
// Request DTOs
// ============================================

/// Login request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 256, message = "Username must be 1-256 characters"))]
    pub username: String,

    #[validate(
        email(message = "Invalid email format"),
        length(max = 256, message = "Email must be at most 256 characters")
    )]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub password_confirm: String,

    #[validate(length(max = 100, message = "Display name must be at most 100 characters"))]
    pub display_name: Option<String>,

    #[validate(length(max = 32, message = "Phone number must be at most 32 characters"))]
    pub phone_number: Option<String>,
}

impl RegisterRequest {
    /// Map the request onto a fresh, not yet persisted account
    pub fn to_account(&self) -> Account {
        Account {
            id: Uuid::new_v4(),
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password_hash: String::new(),
            display_name: self.display_name.clone(),
            phone_number: self.phone_number.clone(),
            roles: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Query string for the uniqueness endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

/// Query string for the uniqueness endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct UsernameQuery {
    pub username: String,
}

// ============================================
// Store Results
// ============================================

/// A single rejected field, surfaced verbatim to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub code: String,
    pub description: String,
}

impl FieldError {
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            description: description.into(),
        }
    }

    pub fn duplicate_username(username: &str) -> Self {
        Self::new(
            "username",
            "DuplicateUserName",
            format!("Username '{username}' is already taken."),
        )
    }

    pub fn duplicate_email(email: &str) -> Self {
        Self::new(
            "email",
            "DuplicateEmail",
            format!("Email '{email}' is already taken."),
        )
    }

    pub fn user_already_in_role(role: &str) -> Self {
        Self::new(
            "role",
            "UserAlreadyInRole",
            format!("User already in role '{role}'."),
        )
    }

    pub fn user_not_found() -> Self {
        Self::new("username", "UserNotFound", "User does not exist.")
    }
}

/// Outcome of a credential store write
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdentityResult {
    pub succeeded: bool,
    pub errors: Vec<FieldError>,
}

impl IdentityResult {
    pub fn success() -> Self {
        Self {
            succeeded: true,
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: Vec<FieldError>) -> Self {
        Self {
            succeeded: false,
            errors,
        }
    }
}

// ============================================
// Response DTOs
// ============================================

/// Authentication outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthResponse {
    pub is_auth_successful: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl AuthResponse {
    pub fn success(token: String) -> Self {
        Self {
            is_auth_successful: true,
            error_message: None,
            token: Some(token),
        }
    }

    /// Generic failure; never says which credential was wrong
    pub fn failed() -> Self {
        Self {
            is_auth_successful: false,
            error_message: Some(INVALID_AUTHENTICATION.to_string()),
            token: None,
        }
    }
}

/// How far a registration got
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    CreatedWithRole,
    /// Account exists but the default role could not be assigned
    CreatedWithoutRole,
    NotCreated,
}

/// Registration outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationResult {
    pub succeeded: bool,
    pub status: RegistrationStatus,
    pub errors: Vec<FieldError>,
}

impl RegistrationResult {
    pub fn created(role_assigned: bool) -> Self {
        let status = if role_assigned {
            RegistrationStatus::CreatedWithRole
        } else {
            RegistrationStatus::CreatedWithoutRole
        };

        Self {
            succeeded: true,
            status,
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: Vec<FieldError>) -> Self {
        Self {
            succeeded: false,
            status: RegistrationStatus::NotCreated,
            errors,
        }
    }
}

/// Uniqueness check response
#[derive(Debug, Clone, Serialize)]
pub struct InUseResponse {
    pub in_use: bool,
}

/// Simple message response
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================
// JWT Claims
// ============================================

/// JWT claims for access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (account ID)
    pub sub: Uuid,
    /// Username
    pub name: String,
    /// Account email
    pub email: String,
    /// Assigned role names
    pub roles: Vec<String>,
    /// Issued at timestamp
    pub iat: i64,
    /// Not before timestamp
    pub nbf: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// JWT ID (unique identifier)
    pub jti: Uuid,
}
