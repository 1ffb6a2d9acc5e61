//! Authentication Configuration
//!
//! All configuration values are loaded from environment variables.
//! No hardcoded secrets or sensitive data.

use crate::error::AuthError;
use jsonwebtoken::Algorithm;
use std::env;

/// Role given to every newly registered account unless overridden
pub const DEFAULT_ROLE: &str = "Customer";

/// Longest accepted token lifetime in seconds (one year)
pub const MAX_TOKEN_LIFETIME: i64 = 365 * 24 * 60 * 60;

/// Authentication configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT secret key for signing tokens (from JWT_SECRET env var)
    pub jwt_secret: String,

    /// JWT signing algorithm (from JWT_ALGORITHM env var)
    pub jwt_algorithm: Algorithm,

    /// Token lifetime in seconds (from JWT_TOKEN_LIFETIME env var)
    pub token_lifetime: i64,

    /// JWT issuer (from JWT_ISSUER env var)
    pub jwt_issuer: String,

    /// JWT audience (from JWT_AUDIENCE env var)
    pub jwt_audience: String,

    /// Role assigned after registration (from AUTH_DEFAULT_ROLE env var)
    pub default_role: String,

    /// Argon2 memory cost in KiB (from ARGON2_MEMORY_COST env var)
    pub argon2_memory_cost: u32,

    /// Argon2 time cost (iterations) (from ARGON2_TIME_COST env var)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (from ARGON2_PARALLELISM env var)
    pub argon2_parallelism: u32,

    /// Minimum password length (from MIN_PASSWORD_LENGTH env var)
    pub min_password_length: usize,
}

impl AuthConfig {
    /// Load configuration from environment variables
    ///
    /// Fails if JWT_SECRET is not set or JWT_ALGORITHM is not a known algorithm.
    pub fn from_env() -> Result<Self, AuthError> {
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| {
            AuthError::Config("JWT_SECRET environment variable must be set".to_string())
        })?;

        let jwt_algorithm = match env::var("JWT_ALGORITHM") {
            Ok(value) => value.parse::<Algorithm>().map_err(|_| {
                AuthError::Config(format!("JWT_ALGORITHM '{value}' is not a known algorithm"))
            })?,
            Err(_) => Algorithm::HS256,
        };

        Ok(Self {
            jwt_secret,
            jwt_algorithm,

            token_lifetime: parse_env("JWT_TOKEN_LIFETIME").unwrap_or(900), // 15 minutes

            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "negotiation-auth".to_string()),

            jwt_audience: env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "negotiation-api".to_string()),

            default_role: env::var("AUTH_DEFAULT_ROLE").unwrap_or_else(|_| DEFAULT_ROLE.to_string()),

            argon2_memory_cost: parse_env("ARGON2_MEMORY_COST").unwrap_or(65536), // 64 MiB

            argon2_time_cost: parse_env("ARGON2_TIME_COST").unwrap_or(3),

            argon2_parallelism: parse_env("ARGON2_PARALLELISM").unwrap_or(4),

            min_password_length: parse_env("MIN_PASSWORD_LENGTH").unwrap_or(8),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.jwt_secret.len() < 32 {
            return Err(AuthError::Config(
                "JWT_SECRET must be at least 32 characters".to_string(),
            ));
        }

        if !matches!(
            self.jwt_algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(AuthError::Config(
                "JWT_ALGORITHM must be one of HS256, HS384, HS512".to_string(),
            ));
        }

        if self.token_lifetime <= 0 {
            return Err(AuthError::Config(
                "JWT_TOKEN_LIFETIME must be positive".to_string(),
            ));
        }

        if self.token_lifetime > MAX_TOKEN_LIFETIME {
            return Err(AuthError::Config(format!(
                "JWT_TOKEN_LIFETIME must be at most {MAX_TOKEN_LIFETIME} seconds"
            )));
        }

        if self.default_role.trim().is_empty() {
            return Err(AuthError::Config(
                "AUTH_DEFAULT_ROLE must not be empty".to_string(),
            ));
        }

        if self.min_password_length < 6 {
            return Err(AuthError::Config(
                "MIN_PASSWORD_LENGTH must be at least 6".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Cheap configuration for tests: low Argon2 cost, fixed secret.
#[cfg(test)]
pub(crate) fn test_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "s".repeat(32),
        jwt_algorithm: Algorithm::HS256,
        token_lifetime: 3600,
        jwt_issuer: "test-issuer".to_string(),
        jwt_audience: "test-audience".to_string(),
        default_role: DEFAULT_ROLE.to_string(),
        argon2_memory_cost: 1024,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
        min_password_length: 8,
    }
}
