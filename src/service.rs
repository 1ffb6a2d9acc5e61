//! Authentication Service
//!
//! Orchestrates credential verification, token issuance, registration with
//! default role assignment, and identifier uniqueness checks on top of a
//! `CredentialStore`.

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::*;
use crate::password::CredentialHasher;
use crate::store::CredentialStore;
use crate::token::TokenIssuer;

use std::sync::Arc;
use uuid::Uuid;

/// Authentication service
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    tokens: TokenIssuer,
    hasher: CredentialHasher,
    /// Verified against when the username is unknown, so that path costs
    /// the same Argon2 work as a wrong password
    dummy_hash: Option<String>,
    config: AuthConfig,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(store: Arc<dyn CredentialStore>, config: AuthConfig) -> Self {
        let tokens = TokenIssuer::new(&config);
        let hasher = CredentialHasher::new(&config);
        let dummy_hash = hasher.hash(&Uuid::new_v4().to_string()).ok();

        Self {
            store,
            tokens,
            hasher,
            dummy_hash,
            config,
        }
    }

    // ============================================
    // Login / Logout
    // ============================================

    /// Verify credentials and issue a token
    ///
    /// Unknown usernames and wrong passwords produce the same failure.
    pub async fn authenticate(&self, req: &LoginRequest) -> Result<AuthResponse, AuthError> {
        let account = self.store.find_by_username(&req.username).await?;

        let verified = match &account {
            Some(account) => self.store.check_password(account, &req.password).await?,
            None => {
                if let Some(dummy_hash) = &self.dummy_hash {
                    let _ = self.hasher.spawn_verify(&req.password, dummy_hash).await;
                }
                false
            }
        };

        let account = match account {
            Some(account) if verified => account,
            _ => {
                tracing::warn!(
                    username = %sanitize_for_log(&req.username),
                    "Authentication failed"
                );
                return Ok(AuthResponse::failed());
            }
        };

        let credentials = self.tokens.signing_credentials();
        let claims = self.tokens.claims(&account)?;
        let token = self.tokens.build_token(credentials, claims);
        let token = self.tokens.write_token(&token)?;

        tracing::info!(
            username = %sanitize_for_log(&req.username),
            "User authenticated successfully"
        );

        Ok(AuthResponse::success(token))
    }

    /// Sign the current user out
    ///
    /// Tokens are stateless; the client discards its token.
    pub async fn sign_out(&self) {
        tracing::info!("User signed out");
    }

    // ============================================
    // Registration
    // ============================================

    /// Create an account and give it the default role
    pub async fn register(&self, req: &RegisterRequest) -> Result<RegistrationResult, AuthError> {
        let account = req.to_account();

        let created = self.store.create(&account, &req.password).await?;
        if !created.succeeded {
            return Ok(RegistrationResult::failed(created.errors));
        }

        let role_assigned = self.assign_default_role(&account).await;

        tracing::info!(
            username = %sanitize_for_log(&account.username),
            "User registered successfully"
        );

        Ok(RegistrationResult::created(role_assigned))
    }

    /// Best effort: the account is kept even if this fails.
    async fn assign_default_role(&self, account: &Account) -> bool {
        let role = &self.config.default_role;

        match self.store.add_role(account, role).await {
            Ok(result) if result.succeeded => true,
            Ok(result) => {
                tracing::warn!(
                    username = %sanitize_for_log(&account.username),
                    role = %role,
                    errors = ?result.errors,
                    "Default role was not assigned"
                );
                false
            }
            Err(err) => {
                tracing::warn!(
                    username = %sanitize_for_log(&account.username),
                    role = %role,
                    error = %err,
                    "Default role was not assigned"
                );
                false
            }
        }
    }

    // ============================================
    // Uniqueness Checks
    // ============================================

    pub async fn is_email_in_use(&self, email: &str) -> Result<bool, AuthError> {
        Ok(self.store.find_by_email(email).await?.is_some())
    }

    pub async fn is_username_in_use(&self, username: &str) -> Result<bool, AuthError> {
        Ok(self.store.find_by_username(username).await?.is_some())
    }
}

/// Replace line breaks so user input cannot forge extra log lines
pub fn sanitize_for_log(value: &str) -> String {
    value.replace(['\n', '\r'], "-")
}
