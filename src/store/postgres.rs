//! PostgreSQL credential store
//!
//! Uniqueness is enforced by unique constraints on the normalized username
//! and email columns, so concurrent registrations cannot both commit.

use super::CredentialStore;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::{normalize, Account, FieldError, IdentityResult};
use crate::password::{validate_new_account, CredentialHasher};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const USERNAME_CONSTRAINT: &str = "users_normalized_username_key";
const EMAIL_CONSTRAINT: &str = "users_normalized_email_key";

/// User row without roles
#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    display_name: Option<String>,
    phone_number: Option<String>,
    created_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_account(self, roles: Vec<String>) -> Account {
        Account {
            id: self.id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            display_name: self.display_name,
            phone_number: self.phone_number,
            roles,
            created_at: self.created_at,
        }
    }
}

/// Credential store backed by a PostgreSQL pool
pub struct PgCredentialStore {
    db: PgPool,
    hasher: CredentialHasher,
    min_password_length: usize,
}

impl PgCredentialStore {
    pub fn new(db: PgPool, config: &AuthConfig) -> Self {
        Self {
            db,
            hasher: CredentialHasher::new(config),
            min_password_length: config.min_password_length,
        }
    }

    /// Create the account tables if they do not exist yet
    pub async fn migrate(&self) -> Result<(), AuthError> {
        tracing::info!("Running credential store migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                username VARCHAR(256) NOT NULL,
                normalized_username VARCHAR(256) NOT NULL,
                email VARCHAR(256) NOT NULL,
                normalized_email VARCHAR(256) NOT NULL,
                password_hash VARCHAR(255) NOT NULL,
                display_name VARCHAR(100),
                phone_number VARCHAR(32),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT users_normalized_username_key UNIQUE (normalized_username),
                CONSTRAINT users_normalized_email_key UNIQUE (normalized_email)
            );
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_roles (
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                role_name VARCHAR(256) NOT NULL,
                PRIMARY KEY (user_id, role_name)
            );
            "#,
        )
        .execute(&self.db)
        .await?;

        // Role names compare case-insensitively, as in the in-memory store.
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS user_roles_user_id_lower_role_name_key
                ON user_roles (user_id, lower(role_name));
            "#,
        )
        .execute(&self.db)
        .await?;

        tracing::info!("Credential store migrations completed successfully");
        Ok(())
    }

    async fn roles_for(&self, user_id: Uuid) -> Result<Vec<String>, AuthError> {
        let roles = sqlx::query_scalar(
            "SELECT role_name FROM user_roles WHERE user_id = $1 ORDER BY role_name",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(roles)
    }

    async fn find_where(&self, column: &str, value: &str) -> Result<Option<Account>, AuthError> {
        let sql = format!(
            "SELECT id, username, email, password_hash, display_name, phone_number, created_at \
             FROM users WHERE {column} = $1"
        );

        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(normalize(value))
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => {
                let roles = self.roles_for(row.id).await?;
                Ok(Some(row.into_account(roles)))
            }
            None => Ok(None),
        }
    }
}

/// Map a unique violation raised by a racing insert onto a field error
fn duplicate_from_constraint(err: &sqlx::Error, account: &Account) -> Option<FieldError> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };

    if !db_err.is_unique_violation() {
        return None;
    }

    match db_err.constraint() {
        Some(USERNAME_CONSTRAINT) => Some(FieldError::duplicate_username(&account.username)),
        Some(EMAIL_CONSTRAINT) => Some(FieldError::duplicate_email(&account.email)),
        _ => None,
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, AuthError> {
        self.find_where("normalized_username", username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AuthError> {
        self.find_where("normalized_email", email).await
    }

    async fn check_password(&self, account: &Account, password: &str) -> Result<bool, AuthError> {
        let hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
                .bind(account.id)
                .fetch_optional(&self.db)
                .await?;

        match hash {
            Some(hash) => self.hasher.spawn_verify(password, &hash).await,
            None => Ok(false),
        }
    }

    async fn create(&self, account: &Account, password: &str) -> Result<IdentityResult, AuthError> {
        let mut errors = validate_new_account(account, password, self.min_password_length);
        if !errors.is_empty() {
            return Ok(IdentityResult::failed(errors));
        }

        let username = account.normalized_username();
        let email = account.normalized_email();

        // Report every conflicting field up front; the constraints below
        // still decide the race.
        let (username_taken, email_taken): (bool, bool) = sqlx::query_as(
            r#"
            SELECT
                EXISTS (SELECT 1 FROM users WHERE normalized_username = $1),
                EXISTS (SELECT 1 FROM users WHERE normalized_email = $2)
            "#,
        )
        .bind(&username)
        .bind(&email)
        .fetch_one(&self.db)
        .await?;

        if username_taken {
            errors.push(FieldError::duplicate_username(&account.username));
        }
        if email_taken {
            errors.push(FieldError::duplicate_email(&account.email));
        }
        if !errors.is_empty() {
            return Ok(IdentityResult::failed(errors));
        }

        let password_hash = self.hasher.spawn_hash(password).await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO users (id, username, normalized_username, email, normalized_email,
                               password_hash, display_name, phone_number, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(account.id)
        .bind(&account.username)
        .bind(&username)
        .bind(&account.email)
        .bind(&email)
        .bind(&password_hash)
        .bind(&account.display_name)
        .bind(&account.phone_number)
        .bind(account.created_at)
        .execute(&self.db)
        .await;

        match inserted {
            Ok(_) => Ok(IdentityResult::success()),
            Err(err) => match duplicate_from_constraint(&err, account) {
                Some(duplicate) => Ok(IdentityResult::failed(vec![duplicate])),
                None => Err(err.into()),
            },
        }
    }

    async fn add_role(&self, account: &Account, role: &str) -> Result<IdentityResult, AuthError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(account.id)
            .fetch_one(&self.db)
            .await?;

        if !exists {
            return Ok(IdentityResult::failed(vec![FieldError::user_not_found()]));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_name)
            SELECT $1, $2
            WHERE NOT EXISTS (
                SELECT 1 FROM user_roles WHERE user_id = $1 AND lower(role_name) = lower($2)
            )
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(account.id)
        .bind(role)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(IdentityResult::failed(vec![FieldError::user_already_in_role(
                role,
            )]));
        }

        Ok(IdentityResult::success())
    }
}
