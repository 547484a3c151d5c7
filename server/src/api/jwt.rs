use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use pickem_common::User;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub username: String,
    pub exp: i64,
    pub iat: i64,
    /// Copied from the user at login; a demotion takes effect on the next token
    #[serde(default)]
    pub is_admin: bool,
}

/// Issues and checks the HS256 bearer tokens of the API.
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("ttl_hours", &self.ttl.num_hours())
            .finish_non_exhaustive()
    }
}

impl JwtManager {
    pub fn new(secret: &str) -> Self {
        let secret = secret.as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl: Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
        }
    }

    pub fn with_ttl_hours(mut self, hours: i64) -> Self {
        self.ttl = Duration::hours(hours.max(1));
        self
    }

    pub fn issue(&self, user: &User) -> Result<String> {
        let issued_at = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            exp: (issued_at + self.ttl).timestamp(),
            iat: issued_at.timestamp(),
            is_admin: user.is_admin,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .with_context(|| format!("Failed to sign token for user {}", user.id))
    }

    /// Signature and expiry check; the user is not re-read from storage.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let claims = decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .context("Rejected bearer token")?
            .claims;
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(is_admin: bool) -> User {
        User {
            id: "u1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            display_name: String::new(),
            password_hash: String::new(),
            is_admin,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_claims_carry_identity_and_role() {
        let jwt = JwtManager::new("secret").with_ttl_hours(2);
        let claims = jwt.verify(&jwt.issue(&user(true)).unwrap()).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.username, "alice");
        assert!(claims.is_admin);
        assert_eq!(claims.exp - claims.iat, 2 * 3600);
    }

    #[test]
    fn test_foreign_or_malformed_tokens_rejected() {
        let token = JwtManager::new("secret").issue(&user(false)).unwrap();
        assert!(JwtManager::new("other").verify(&token).is_err());
        assert!(JwtManager::new("secret").verify("garbage").is_err());
    }
}
