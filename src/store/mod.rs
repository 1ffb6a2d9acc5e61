//! Credential Store
//!
//! System of record for accounts and password verification. The
//! authentication service only talks to this trait; storage, hashing and
//! uniqueness enforcement live behind it.

mod memory;
mod postgres;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

use crate::error::AuthError;
use crate::models::{Account, IdentityResult};

use async_trait::async_trait;

/// Account storage contract
///
/// Implementations must enforce username/email uniqueness atomically in
/// `create`; a preceding lookup is only a hint.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find an account by username (case-insensitive)
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, AuthError>;

    /// Find an account by email (case-insensitive)
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AuthError>;

    /// Check a plaintext password against the account's stored credential
    async fn check_password(&self, account: &Account, password: &str) -> Result<bool, AuthError>;

    /// Validate, hash and persist a new account
    async fn create(&self, account: &Account, password: &str) -> Result<IdentityResult, AuthError>;

    /// Add a role to an existing account
    async fn add_role(&self, account: &Account, role: &str) -> Result<IdentityResult, AuthError>;
}
