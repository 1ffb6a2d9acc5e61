//! JWT Token Issuer
//!
//! Builds and signs access tokens for verified accounts. Tokens are only
//! issued here; consumers validate them with the same secret.

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::{AccessTokenClaims, Account};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use uuid::Uuid;

/// Key and algorithm used to sign a token
#[derive(Clone)]
pub struct SigningCredentials {
    key: EncodingKey,
    algorithm: Algorithm,
}

impl SigningCredentials {
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

/// A token ready to be written out
pub struct JwtToken {
    header: Header,
    claims: AccessTokenClaims,
    key: EncodingKey,
}

impl JwtToken {
    pub fn claims(&self) -> &AccessTokenClaims {
        &self.claims
    }
}

/// Issues signed, time-bounded bearer tokens
pub struct TokenIssuer {
    credentials: SigningCredentials,
    lifetime_secs: i64,
    issuer: String,
    audience: String,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            credentials: SigningCredentials {
                key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
                algorithm: config.jwt_algorithm,
            },
            lifetime_secs: config.token_lifetime,
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
        }
    }

    /// Signing material for the configured algorithm
    pub fn signing_credentials(&self) -> SigningCredentials {
        self.credentials.clone()
    }

    /// Claims for an account, valid from now
    pub fn claims(&self, account: &Account) -> Result<AccessTokenClaims, AuthError> {
        self.claims_at(account, Utc::now())
    }

    /// Claims for an account, valid from `now` until `now + lifetime`
    pub fn claims_at(
        &self,
        account: &Account,
        now: DateTime<Utc>,
    ) -> Result<AccessTokenClaims, AuthError> {
        let exp = Duration::try_seconds(self.lifetime_secs)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                AuthError::Token(format!(
                    "token lifetime of {}s is out of range",
                    self.lifetime_secs
                ))
            })?;

        Ok(AccessTokenClaims {
            sub: account.id,
            name: account.username.clone(),
            email: account.email.clone(),
            roles: account.roles.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4(),
        })
    }

    pub fn build_token(&self, credentials: SigningCredentials, claims: AccessTokenClaims) -> JwtToken {
        JwtToken {
            header: Header::new(credentials.algorithm),
            claims,
            key: credentials.key,
        }
    }

    /// Serialize to the compact JWS form
    pub fn write_token(&self, token: &JwtToken) -> Result<String, AuthError> {
        let token = encode(&token.header, &token.claims, &token.key)?;
        Ok(token)
    }

    /// Sign a token for an account that has already been verified
    pub fn issue(&self, account: &Account) -> Result<String, AuthError> {
        let credentials = self.signing_credentials();
        let claims = self.claims(account)?;
        let token = self.build_token(credentials, claims);
        self.write_token(&token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};

    fn account() -> Account {
        Account {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            password_hash: "$argon2id$hash".to_string(),
            display_name: None,
            phone_number: None,
            roles: vec!["Customer".to_string()],
            created_at: Utc::now(),
        }
    }

    fn decode_claims(token: &str, config: &AuthConfig) -> jsonwebtoken::errors::Result<AccessTokenClaims> {
        let mut validation = Validation::new(config.jwt_algorithm);
        validation.set_issuer(&[&config.jwt_issuer]);
        validation.set_audience(&[&config.jwt_audience]);

        decode::<AccessTokenClaims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
    }

    #[test]
    fn test_issued_token_carries_subject_and_roles() {
        let config = test_config();
        let issuer = TokenIssuer::new(&config);
        let account = account();

        let token = issuer.issue(&account).unwrap();
        let claims = decode_claims(&token, &config).unwrap();

        assert_eq!(claims.sub, account.id);
        assert_eq!(claims.name, "alice");
        assert_eq!(claims.roles, vec!["Customer".to_string()]);
        assert_eq!(claims.exp - claims.iat, config.token_lifetime);
    }

    #[test]
    fn test_token_is_rejected_after_lifetime() {
        let config = test_config();
        let issuer = TokenIssuer::new(&config);

        let issued_at = Utc::now() - Duration::seconds(config.token_lifetime * 2);
        let claims = issuer.claims_at(&account(), issued_at).unwrap();
        let token = issuer.build_token(issuer.signing_credentials(), claims);
        assert_eq!(token.claims().iat, issued_at.timestamp());
        let token = issuer.write_token(&token).unwrap();

        let err = decode_claims(&token, &config).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ExpiredSignature));
    }

    #[test]
    fn test_token_is_rejected_with_other_secret() {
        let config = test_config();
        let token = TokenIssuer::new(&config).issue(&account()).unwrap();

        let other = AuthConfig {
            jwt_secret: "o".repeat(32),
            ..test_config()
        };
        assert!(decode_claims(&token, &other).is_err());
    }

    #[test]
    fn test_configured_algorithm_is_used() {
        let config = AuthConfig {
            jwt_algorithm: Algorithm::HS512,
            ..test_config()
        };
        let issuer = TokenIssuer::new(&config);
        assert_eq!(issuer.signing_credentials().algorithm(), Algorithm::HS512);

        let token = issuer.issue(&account()).unwrap();
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS512);
        assert!(decode_claims(&token, &config).is_ok());
    }

    #[test]
    fn test_each_token_has_unique_id() {
        let issuer = TokenIssuer::new(&test_config());
        let account = account();

        assert_ne!(
            issuer.claims(&account).unwrap().jti,
            issuer.claims(&account).unwrap().jti
        );
    }

    #[test]
    fn test_out_of_range_lifetime_is_an_error() {
        let config = AuthConfig {
            token_lifetime: 1_000_000_000_000_000,
            ..test_config()
        };
        let issuer = TokenIssuer::new(&config);

        assert!(matches!(issuer.issue(&account()), Err(AuthError::Token(_))));

        let config = AuthConfig {
            token_lifetime: i64::MAX,
            ..test_config()
        };
        assert!(TokenIssuer::new(&config).issue(&account()).is_err());
    }
}
