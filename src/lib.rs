//! Price Negotiation Authentication
//!
//! Authentication façade for the price negotiation app providing:
//! - Credential verification with enumeration-resistant failures
//! - JWT bearer token issuance
//! - Account registration with a default `Customer` role
//! - Email and username uniqueness checks
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `JWT_SECRET` - Secret key for signing JWTs (required, min 32 chars)
//! - `JWT_ALGORITHM` - HS256, HS384 or HS512 (default: HS256)
//! - `JWT_TOKEN_LIFETIME` - Token lifetime in seconds (default: 900, max one year)
//! - `JWT_ISSUER` - JWT issuer claim (default: "negotiation-auth")
//! - `JWT_AUDIENCE` - JWT audience claim (default: "negotiation-api")
//! - `AUTH_DEFAULT_ROLE` - Role given to new accounts (default: "Customer")
//! - `ARGON2_MEMORY_COST` - Argon2id memory cost in KiB (default: 65536)
//! - `ARGON2_TIME_COST` - Argon2id iterations (default: 3)
//! - `ARGON2_PARALLELISM` - Argon2id lanes (default: 4)
//! - `MIN_PASSWORD_LENGTH` - Minimum password length (default: 8, min 6)
//!
//! # Usage
//!
//! ```rust,ignore
//! use negotiation_auth::{AuthPlugin, LoginRequest};
//!
//! let plugin = AuthPlugin::new();
//! plugin.activate(db_pool).await?;
//!
//! let auth = plugin.auth_service().await.unwrap();
//! let response = auth.authenticate(&login_request).await?;
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod password;
pub mod service;
pub mod store;
pub mod token;

// Re-export commonly used types
pub use config::AuthConfig;
pub use error::AuthError;
pub use handlers::AuthState;
pub use models::*;
pub use service::AuthService;
pub use store::{CredentialStore, MemoryCredentialStore, PgCredentialStore};
pub use token::TokenIssuer;

use axum::Router;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Lifecycle state of the authentication plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Inactive,
    Active,
}

/// Plugin metadata
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
}

/// Wires the PostgreSQL credential store, configuration and service together
pub struct AuthPlugin {
    info: PluginInfo,
    state: RwLock<PluginState>,
    auth_service: RwLock<Option<Arc<AuthService>>>,
}

impl AuthPlugin {
    /// Create a new, inactive plugin instance
    pub fn new() -> Self {
        Self {
            info: PluginInfo {
                id: "negotiation-auth".into(),
                name: "Price Negotiation Authentication".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                description: "Login, token issuance and registration".into(),
            },
            state: RwLock::new(PluginState::Inactive),
            auth_service: RwLock::new(None),
        }
    }

    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    pub async fn state(&self) -> PluginState {
        *self.state.read().await
    }

    /// Get the authentication service, if active
    pub async fn auth_service(&self) -> Option<Arc<AuthService>> {
        self.auth_service.read().await.clone()
    }

    /// Load configuration from the environment and activate against `db`
    pub async fn activate(&self, db: PgPool) -> Result<(), AuthError> {
        let config = AuthConfig::from_env()?;
        self.activate_with(db, config).await
    }

    /// Run store migrations and build the service
    pub async fn activate_with(&self, db: PgPool, config: AuthConfig) -> Result<(), AuthError> {
        tracing::info!("Activating authentication plugin");

        config.validate()?;

        let store = PgCredentialStore::new(db, &config);
        store.migrate().await?;

        let auth_service = Arc::new(AuthService::new(Arc::new(store), config));

        *self.auth_service.write().await = Some(auth_service);
        *self.state.write().await = PluginState::Active;

        tracing::info!("Authentication plugin activated successfully");
        Ok(())
    }

    pub async fn deactivate(&self) {
        tracing::info!("Deactivating authentication plugin");

        *self.auth_service.write().await = None;
        *self.state.write().await = PluginState::Inactive;
    }

    /// Routes for the active service
    pub async fn routes(&self) -> Option<Router> {
        self.auth_service().await.map(create_routes)
    }
}

impl Default for AuthPlugin {
    fn default() -> Self {
        Self::new()
    }
}

/// Create authentication routes
pub fn create_routes(auth_service: Arc<AuthService>) -> Router {
    handlers::create_routes(auth_service)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_info() {
        let plugin = AuthPlugin::new();
        assert_eq!(plugin.info().id, "negotiation-auth");
        assert_eq!(plugin.info().name, "Price Negotiation Authentication");
    }

    #[tokio::test]
    async fn test_plugin_initial_state() {
        let plugin = AuthPlugin::new();
        assert_eq!(plugin.state().await, PluginState::Inactive);
        assert!(plugin.auth_service().await.is_none());
        assert!(plugin.routes().await.is_none());
    }

    #[tokio::test]
    async fn test_activation_rejects_invalid_config() {
        let plugin = AuthPlugin::new();
        let db = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        let config = AuthConfig {
            jwt_secret: "short".to_string(),
            ..config::test_config()
        };

        let result = plugin.activate_with(db, config).await;

        assert!(matches!(result, Err(AuthError::Config(_))));
        assert_eq!(plugin.state().await, PluginState::Inactive);
    }
}
