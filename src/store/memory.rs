//! In-process credential store
//!
//! Used for tests and single-node development setups.

use super::CredentialStore;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::{normalize, Account, FieldError, IdentityResult};
use crate::password::{validate_new_account, CredentialHasher};

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Accounts held in a map guarded by a single lock
pub struct MemoryCredentialStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
    hasher: CredentialHasher,
    min_password_length: usize,
}

impl MemoryCredentialStore {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            hasher: CredentialHasher::new(config),
            min_password_length: config.min_password_length,
        }
    }

    /// Number of stored accounts
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }

    async fn find_by<F>(&self, matches: F) -> Option<Account>
    where
        F: Fn(&Account) -> bool,
    {
        self.accounts
            .read()
            .await
            .values()
            .find(|account| matches(account))
            .cloned()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, AuthError> {
        let key = normalize(username);
        Ok(self.find_by(|a| a.normalized_username() == key).await)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AuthError> {
        let key = normalize(email);
        Ok(self.find_by(|a| a.normalized_email() == key).await)
    }

    async fn check_password(&self, account: &Account, password: &str) -> Result<bool, AuthError> {
        let stored = self.accounts.read().await.get(&account.id).cloned();

        match stored {
            Some(stored) => {
                self.hasher
                    .spawn_verify(password, &stored.password_hash)
                    .await
            }
            None => Ok(false),
        }
    }

    async fn create(&self, account: &Account, password: &str) -> Result<IdentityResult, AuthError> {
        let mut errors = validate_new_account(account, password, self.min_password_length);
        if !errors.is_empty() {
            return Ok(IdentityResult::failed(errors));
        }

        let password_hash = self.hasher.spawn_hash(password).await?;

        // Uniqueness check and insert happen under one write lock.
        let mut accounts = self.accounts.write().await;

        let username = account.normalized_username();
        let email = account.normalized_email();

        if accounts.values().any(|a| a.normalized_username() == username) {
            errors.push(FieldError::duplicate_username(&account.username));
        }
        if accounts.values().any(|a| a.normalized_email() == email) {
            errors.push(FieldError::duplicate_email(&account.email));
        }
        if !errors.is_empty() {
            return Ok(IdentityResult::failed(errors));
        }

        let mut stored = account.clone();
        stored.password_hash = password_hash;
        stored.roles.clear();
        accounts.insert(stored.id, stored);

        Ok(IdentityResult::success())
    }

    async fn add_role(&self, account: &Account, role: &str) -> Result<IdentityResult, AuthError> {
        let mut accounts = self.accounts.write().await;

        let Some(stored) = accounts.get_mut(&account.id) else {
            return Ok(IdentityResult::failed(vec![FieldError::user_not_found()]));
        };

        if stored.has_role(role) {
            return Ok(IdentityResult::failed(vec![FieldError::user_already_in_role(
                role,
            )]));
        }

        stored.roles.push(role.to_string());
        Ok(IdentityResult::success())
    }
}
