//! JWT token generation and validation.
//!
//! Access and refresh tokens are signed with separate secrets and carry a
//! `typ` claim, so neither kind can stand in for the other.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::UserRole;

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token, never persisted
    Access,
    /// Long-lived refresh token, persisted and revocable
    Refresh,
}

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user id)
    pub sub: i64,
    /// User role at issue time
    pub role: UserRole,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// JWT claims for refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Unique id; keeps two refresh tokens minted in the same second distinct
    pub jti: String,
    /// Subject (user id)
    pub sub: i64,
    pub role: UserRole,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    pub iat: u64,
    pub exp: u64,
}

/// Default access token lifetime: 15 minutes
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 15 * 60;

/// Default refresh token lifetime: 7 days
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Configuration for JWT operations.
pub struct JwtConfig {
    access: SigningKeys,
    refresh: SigningKeys,
    access_ttl: u64,
    refresh_ttl: u64,
}

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct AccessTokenResult {
    pub token: String,
    /// Token lifetime in seconds
    pub duration: u64,
}

/// A freshly signed refresh token.
#[derive(Debug, Clone)]
pub struct RefreshTokenResult {
    pub token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
}

impl JwtConfig {
    /// Create a JWT configuration with the default lifetimes.
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Self {
        Self::with_lifetimes(
            access_secret,
            refresh_secret,
            DEFAULT_ACCESS_TOKEN_TTL_SECS,
            DEFAULT_REFRESH_TOKEN_TTL_SECS,
        )
    }

    pub fn with_lifetimes(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl: u64,
        refresh_ttl: u64,
    ) -> Self {
        Self {
            access: SigningKeys::new(access_secret),
            refresh: SigningKeys::new(refresh_secret),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(
        &self,
        user_id: i64,
        role: UserRole,
    ) -> Result<AccessTokenResult, JwtError> {
        let now = unix_now()?;

        let claims = AccessClaims {
            sub: user_id,
            role,
            token_type: TokenType::Access,
            iat: now,
            exp: expiry(now, self.access_ttl)?,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.access.encoding)
            .map_err(JwtError::Encoding)?;

        Ok(AccessTokenResult {
            token,
            duration: self.access_ttl,
        })
    }

    /// Generate a refresh token for a user. The caller persists it.
    pub fn generate_refresh_token(
        &self,
        user_id: i64,
        role: UserRole,
    ) -> Result<RefreshTokenResult, JwtError> {
        let now = unix_now()?;

        let exp = expiry(now, self.refresh_ttl)?;

        let claims = RefreshClaims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: user_id,
            role,
            token_type: TokenType::Refresh,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.refresh.encoding)
            .map_err(JwtError::Encoding)?;

        Ok(RefreshTokenResult {
            token,
            expires_at: exp,
        })
    }

    /// Validate and decode an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let token_data =
            jsonwebtoken::decode::<AccessClaims>(token, &self.access.decoding, &strict_validation())
                .map_err(JwtError::Decoding)?;

        if token_data.claims.token_type != TokenType::Access {
            return Err(JwtError::WrongTokenType);
        }

        Ok(token_data.claims)
    }

    /// Validate and decode a refresh token. Does not consult the token store.
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        let token_data = jsonwebtoken::decode::<RefreshClaims>(
            token,
            &self.refresh.decoding,
            &strict_validation(),
        )
        .map_err(JwtError::Decoding)?;

        if token_data.claims.token_type != TokenType::Refresh {
            return Err(JwtError::WrongTokenType);
        }

        Ok(token_data.claims)
    }
}

fn strict_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
}

fn unix_now() -> Result<u64, JwtError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| JwtError::TimeError)?
        .as_secs())
}

fn expiry(now: u64, ttl: u64) -> Result<u64, JwtError> {
    now.checked_add(ttl).ok_or(JwtError::LifetimeOverflow)
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Bad signature, malformed payload or lapsed expiry
    Decoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
    /// Configured lifetime pushes the expiry past the representable range
    LifetimeOverflow,
    /// Wrong token type (e.g., using refresh token as access token)
    WrongTokenType,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            JwtError::TimeError => write!(f, "System time error"),
            JwtError::LifetimeOverflow => write!(f, "Token lifetime too large"),
            JwtError::WrongTokenType => write!(f, "Wrong token type"),
        }
    }
}

impl std::error::Error for JwtError {}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS_SECRET: &[u8] = b"test-access-secret-key-for-testing";
    const REFRESH_SECRET: &[u8] = b"test-refresh-secret-key-for-testing";

    fn config() -> JwtConfig {
        JwtConfig::new(ACCESS_SECRET, REFRESH_SECRET)
    }

    #[test]
    fn test_generate_and_validate_access_token() {
        let config = config();

        let result = config.generate_access_token(42, UserRole::User).unwrap();
        assert_eq!(result.duration, DEFAULT_ACCESS_TOKEN_TTL_SECS);

        let claims = config.validate_access_token(&result.token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, UserRole::User);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, DEFAULT_ACCESS_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_generate_and_validate_refresh_token() {
        let config = config();

        let result = config.generate_refresh_token(42, UserRole::Admin).unwrap();

        let claims = config.validate_refresh_token(&result.token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert!(!claims.jti.is_empty());
        assert_eq!(claims.exp, result.expires_at);
        assert_eq!(claims.exp - claims.iat, DEFAULT_REFRESH_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_tokens_not_interchangeable() {
        let config = config();

        let access = config.generate_access_token(1, UserRole::User).unwrap();
        let refresh = config.generate_refresh_token(1, UserRole::User).unwrap();

        assert!(config.validate_refresh_token(&access.token).is_err());
        assert!(config.validate_access_token(&refresh.token).is_err());
    }

    #[test]
    fn test_same_secret_still_rejects_wrong_type() {
        let config = JwtConfig::new(ACCESS_SECRET, ACCESS_SECRET);

        let refresh = config.generate_refresh_token(1, UserRole::User).unwrap();
        assert!(matches!(
            config.validate_access_token(&refresh.token),
            Err(JwtError::Decoding(_)) | Err(JwtError::WrongTokenType)
        ));
    }

    #[test]
    fn test_invalid_token() {
        let result = config().validate_access_token("invalid-token");
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let config1 = JwtConfig::new(b"secret-1", b"refresh-1");
        let config2 = JwtConfig::new(b"secret-2", b"refresh-2");

        let result = config1.generate_access_token(1, UserRole::User).unwrap();
        assert!(config2.validate_access_token(&result.token).is_err());
    }

    #[test]
    fn test_expired_token() {
        let encoding_key = EncodingKey::from_secret(ACCESS_SECRET);
        let now = unix_now().unwrap();

        let claims = AccessClaims {
            sub: 1,
            role: UserRole::User,
            token_type: TokenType::Access,
            iat: now - 100,
            exp: now - 50,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &encoding_key).unwrap();
        assert!(config().validate_access_token(&token).is_err());
    }

    #[test]
    fn test_custom_lifetimes() {
        let config = JwtConfig::with_lifetimes(ACCESS_SECRET, REFRESH_SECRET, 60, 120);

        let access = config.generate_access_token(1, UserRole::User).unwrap();
        assert_eq!(access.duration, 60);

        let refresh = config.generate_refresh_token(1, UserRole::User).unwrap();
        let claims = config.validate_refresh_token(&refresh.token).unwrap();
        assert_eq!(claims.exp - claims.iat, 120);
    }

    #[test]
    fn test_huge_lifetime_is_an_error() {
        let config = JwtConfig::with_lifetimes(ACCESS_SECRET, REFRESH_SECRET, u64::MAX, u64::MAX);

        assert!(matches!(
            config.generate_access_token(1, UserRole::User),
            Err(JwtError::LifetimeOverflow)
        ));
        assert!(matches!(
            config.generate_refresh_token(1, UserRole::User),
            Err(JwtError::LifetimeOverflow)
        ));
    }

    #[test]
    fn test_unique_jti_per_refresh_token() {
        let config = config();

        let first = config.generate_refresh_token(1, UserRole::User).unwrap();
        let second = config.generate_refresh_token(1, UserRole::User).unwrap();

        let first_jti = config.validate_refresh_token(&first.token).unwrap().jti;
        let second_jti = config.validate_refresh_token(&second.token).unwrap().jti;
        assert_ne!(first_jti, second_jti);
        assert_ne!(first.token, second.token);
    }
}
