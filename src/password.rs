//! Password hashing and new-account validation
//!
//! Shared by every credential store so that hashing parameters and the
//! password policy stay identical regardless of the backing storage.

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::{Account, FieldError};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use validator::ValidateEmail;

/// Characters allowed in a username besides ASCII alphanumerics
const USERNAME_EXTRA_CHARS: &str = "-._@+";

/// Column widths of the `users` table, in characters
pub const MAX_USERNAME_LENGTH: usize = 256;
pub const MAX_EMAIL_LENGTH: usize = 256;
pub const MAX_DISPLAY_NAME_LENGTH: usize = 100;
pub const MAX_PHONE_NUMBER_LENGTH: usize = 32;

/// Argon2id hasher configured from `AuthConfig`
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    memory_cost: u32,
    time_cost: u32,
    parallelism: u32,
}

impl CredentialHasher {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            memory_cost: config.argon2_memory_cost,
            time_cost: config.argon2_time_cost,
            parallelism: config.argon2_parallelism,
        }
    }

    fn argon2(&self) -> Result<Argon2<'static>, AuthError> {
        let params = Params::new(self.memory_cost, self.time_cost, self.parallelism, None)
            .map_err(|_| AuthError::Internal)?;

        Ok(Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            params,
        ))
    }

    /// Hash a password using Argon2id
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)?
            .to_string();

        Ok(hash)
    }

    /// Verify a password against a stored PHC hash
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::Internal)?;

        Ok(self
            .argon2()?
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// `hash` on the blocking thread pool
    pub async fn spawn_hash(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.clone();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|err| {
                tracing::error!("Password hashing task failed: {:?}", err);
                AuthError::Internal
            })?
    }

    /// `verify` on the blocking thread pool
    pub async fn spawn_verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let hasher = self.clone();
        let password = password.to_string();
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|err| {
                tracing::error!("Password verification task failed: {:?}", err);
                AuthError::Internal
            })?
    }
}

/// Check a new account and its password before it is stored
///
/// Uniqueness is left to the store; everything else is checked here.
pub fn validate_new_account(
    account: &Account,
    password: &str,
    min_password_length: usize,
) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if account.username.chars().count() > MAX_USERNAME_LENGTH {
        errors.push(too_long("username", "UserNameTooLong", MAX_USERNAME_LENGTH));
    }

    if account.username.is_empty()
        || !account
            .username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || USERNAME_EXTRA_CHARS.contains(c))
    {
        errors.push(FieldError::new(
            "username",
            "InvalidUserName",
            format!(
                "Username '{}' is invalid, can only contain letters or digits.",
                account.username
            ),
        ));
    }

    if account.email.chars().count() > MAX_EMAIL_LENGTH {
        errors.push(too_long("email", "EmailTooLong", MAX_EMAIL_LENGTH));
    } else if !account.email.validate_email() {
        errors.push(FieldError::new(
            "email",
            "InvalidEmail",
            format!("Email '{}' is invalid.", account.email),
        ));
    }

    if exceeds(&account.display_name, MAX_DISPLAY_NAME_LENGTH) {
        errors.push(too_long(
            "display_name",
            "DisplayNameTooLong",
            MAX_DISPLAY_NAME_LENGTH,
        ));
    }

    if exceeds(&account.phone_number, MAX_PHONE_NUMBER_LENGTH) {
        errors.push(too_long(
            "phone_number",
            "PhoneNumberTooLong",
            MAX_PHONE_NUMBER_LENGTH,
        ));
    }

    errors.extend(validate_password(password, min_password_length));
    errors
}

fn exceeds(value: &Option<String>, max: usize) -> bool {
    value.as_ref().is_some_and(|v| v.chars().count() > max)
}

fn too_long(field: &str, code: &str, max: usize) -> FieldError {
    FieldError::new(
        field,
        code,
        format!("{field} must be at most {max} characters."),
    )
}

/// Password policy: length plus upper, lower, digit and symbol
pub fn validate_password(password: &str, min_length: usize) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if password.chars().count() < min_length {
        errors.push(FieldError::new(
            "password",
            "PasswordTooShort",
            format!("Passwords must be at least {min_length} characters."),
        ));
    }

    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push(FieldError::new(
            "password",
            "PasswordRequiresUpper",
            "Passwords must have at least one uppercase ('A'-'Z').",
        ));
    }

    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push(FieldError::new(
            "password",
            "PasswordRequiresLower",
            "Passwords must have at least one lowercase ('a'-'z').",
        ));
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(FieldError::new(
            "password",
            "PasswordRequiresDigit",
            "Passwords must have at least one digit ('0'-'9').",
        ));
    }

    if password.chars().all(|c| c.is_alphanumeric()) {
        errors.push(FieldError::new(
            "password",
            "PasswordRequiresNonAlphanumeric",
            "Passwords must have at least one non alphanumeric character.",
        ));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::models::RegisterRequest;

    fn account(username: &str, email: &str) -> Account {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: String::new(),
            password_confirm: String::new(),
            display_name: None,
            phone_number: None,
        }
        .to_account()
    }

    fn codes(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.code.as_str()).collect()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = CredentialHasher::new(&test_config());
        let hash = hasher.hash("Sup3r!Pass").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("Sup3r!Pass", &hash).unwrap());
        assert!(!hasher.verify("wrong", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = CredentialHasher::new(&test_config());

        assert_ne!(
            hasher.hash("Sup3r!Pass").unwrap(),
            hasher.hash("Sup3r!Pass").unwrap()
        );
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        let hasher = CredentialHasher::new(&test_config());
        assert!(hasher.verify("Sup3r!Pass", "not-a-hash").is_err());
    }

    #[test]
    fn test_strong_password_passes() {
        assert!(validate_password("Sup3r!Pass", 8).is_empty());
    }

    #[test]
    fn test_weak_password_lists_every_violation() {
        let errors = validate_password("abc", 8);

        assert_eq!(
            codes(&errors),
            vec![
                "PasswordTooShort",
                "PasswordRequiresUpper",
                "PasswordRequiresDigit",
                "PasswordRequiresNonAlphanumeric",
            ]
        );
        assert!(errors.iter().all(|e| e.field == "password"));
    }

    #[test]
    fn test_invalid_username_and_email() {
        let errors = validate_new_account(&account("bad name", "not-an-email"), "Sup3r!Pass", 8);

        assert_eq!(codes(&errors), vec!["InvalidUserName", "InvalidEmail"]);
    }

    #[test]
    fn test_non_ascii_letters_do_not_count_as_case() {
        let errors = validate_password("Écolexx1!", 8);
        assert_eq!(codes(&errors), vec!["PasswordRequiresUpper"]);
    }

    #[test]
    fn test_overlong_fields_are_rejected() {
        let email = format!("{}@{}.com", "a".repeat(60), "b".repeat(240));
        let mut long = account(&"u".repeat(257), &email);
        long.display_name = Some("d".repeat(101));
        long.phone_number = Some("5".repeat(33));

        let errors = validate_new_account(&long, "Sup3r!Pass", 8);

        assert_eq!(
            codes(&errors),
            vec![
                "UserNameTooLong",
                "EmailTooLong",
                "DisplayNameTooLong",
                "PhoneNumberTooLong",
            ]
        );
    }

    #[test]
    fn test_fields_at_column_width_are_accepted() {
        let mut edge = account(&"u".repeat(256), "a@x.com");
        edge.display_name = Some("d".repeat(100));
        edge.phone_number = Some("5".repeat(32));

        assert!(validate_new_account(&edge, "Sup3r!Pass", 8).is_empty());
    }

    #[tokio::test]
    async fn test_spawned_hash_and_verify() {
        let hasher = CredentialHasher::new(&test_config());
        let hash = hasher.spawn_hash("Sup3r!Pass").await.unwrap();

        assert!(hasher.spawn_verify("Sup3r!Pass", &hash).await.unwrap());
        assert!(!hasher.spawn_verify("wrong", &hash).await.unwrap());
    }

    #[test]
    fn test_valid_account() {
        let errors = validate_new_account(&account("alice.b-1", "a@x.com"), "Sup3r!Pass", 8);
        assert!(errors.is_empty());
    }
}
