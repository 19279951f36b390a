use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use craftmart_core::UserId;

/// Session token claims.
///
/// Only the subject is carried; the caller's role is always read from the
/// user store so that role changes take effect without re-issuing tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / user identifier.
    pub sub: UserId,

    /// Issued-at (seconds since the Unix epoch).
    pub iat: i64,

    /// Expiration (seconds since the Unix epoch).
    pub exp: i64,
}

impl JwtClaims {
    pub fn new(sub: UserId, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.iat, 0).single()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Deterministically validate token claims against `now`.
///
/// Signature verification happens before this, in the validator.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenError> {
    if claims.exp <= claims.iat {
        return Err(TokenError::InvalidTimeWindow);
    }
    let now = now.timestamp();
    if now < claims.iat {
        return Err(TokenError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenError::Expired);
    }
    Ok(())
}

/// Verifies a bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError>;
}

/// Issues signed session tokens.
pub trait JwtIssuer: Send + Sync {
    fn issue(&self, sub: UserId, now: DateTime<Utc>) -> Result<String, TokenError>;
}

/// HMAC-SHA256 signed tokens with a fixed lifetime.
#[derive(Clone)]
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Hs256Jwt {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl core::fmt::Debug for Hs256Jwt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Jwt").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl JwtIssuer for Hs256Jwt {
    fn issue(&self, sub: UserId, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = JwtClaims::new(sub, now, self.ttl);
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        // Time checks run against the injected clock in `validate_claims`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation)
            .map_err(|e| TokenError::Malformed(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt() -> Hs256Jwt {
        Hs256Jwt::new(b"test-secret", Duration::minutes(10))
    }

    #[test]
    fn issued_token_validates_within_lifetime() {
        let now = Utc::now();
        let sub = UserId::new();
        let token = jwt().issue(sub, now).unwrap();

        let claims = jwt().validate(&token, now + Duration::minutes(5)).unwrap();
        assert_eq!(claims.sub, sub);
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let token = jwt().issue(UserId::new(), now).unwrap();

        let err = jwt().validate(&token, now + Duration::minutes(11)).unwrap_err();
        assert_eq!(err, TokenError::Expired);
    }

    #[test]
    fn token_signed_with_other_secret_is_malformed() {
        let now = Utc::now();
        let other = Hs256Jwt::new(b"other-secret", Duration::minutes(10));
        let token = other.issue(UserId::new(), now).unwrap();

        assert!(matches!(jwt().validate(&token, now), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            jwt().validate("not.a.token", Utc::now()),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn validate_claims_checks_window() {
        let now = Utc::now();
        let mut claims = JwtClaims::new(UserId::new(), now, Duration::minutes(1));
        assert_eq!(validate_claims(&claims, now - Duration::minutes(1)), Err(TokenError::NotYetValid));

        claims.exp = claims.iat;
        assert_eq!(validate_claims(&claims, now), Err(TokenError::InvalidTimeWindow));
    }
}
