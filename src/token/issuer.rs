//! Signed-token issuance and validation.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use super::errors::{TokenError, TokenResult};

/// Claims carried by every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user identifier the token asserts
    pub sub: String,
    /// Issued-at, seconds since the epoch
    pub iat: i64,
    /// Expiry, seconds since the epoch
    pub exp: i64,
    /// Unique token identifier, so two tokens minted for the same
    /// subject in the same second are still distinct
    pub jti: String,
}

/// Mints and validates HS256-signed access and refresh tokens.
///
/// The signing secret is process-wide configuration, immutable after
/// construction; the issuer holds no per-request state.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(signing_secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        // Token lifetimes are exact; no clock-skew leeway.
        let mut validation = Validation::default();
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(signing_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(signing_secret.as_bytes()),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Short-lived token asserting `subject`.
    pub fn issue_access_token(&self, subject: &str) -> TokenResult<String> {
        self.issue(subject, self.access_ttl)
    }

    /// Longer-lived token asserting `subject`. The session layer hashes
    /// this value before persisting it; the issuer stores nothing.
    pub fn issue_refresh_token(&self, subject: &str) -> TokenResult<String> {
        self.issue(subject, self.refresh_ttl)
    }

    /// Mint a token with an explicit time-to-live.
    pub fn issue(&self, subject: &str, ttl: Duration) -> TokenResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Ulid::new().to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding_key).map_err(TokenError::Creation)
    }

    /// Verify signature and expiry, returning the embedded claims.
    ///
    /// Every failure mode collapses to [`TokenError::Invalid`]; callers
    /// must not distinguish expired from forged.
    pub fn validate_token(&self, token: &str) -> TokenResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::Invalid)
    }

    /// Configured refresh-token lifetime.
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            "test-signing-secret-0123456789abcdef",
            Duration::minutes(15),
            Duration::days(30),
        )
    }

    #[test]
    fn access_token_round_trips_subject() {
        let issuer = issuer();
        let token = issuer.issue_access_token("01ARZ3NDEKTSV4RRFFQ69G5FAV").unwrap();

        let claims = issuer.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "01ARZ3NDEKTSV4RRFFQ69G5FAV");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_invalid() {
        let issuer = issuer();
        let token = issuer.issue("user", Duration::seconds(-5)).unwrap();

        assert!(matches!(
            issuer.validate_token(&token),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn foreign_signature_is_invalid() {
        let token = issuer().issue_access_token("user").unwrap();
        let other = TokenIssuer::new(
            "another-signing-secret-fedcba987654",
            Duration::minutes(15),
            Duration::days(30),
        );

        assert!(matches!(other.validate_token(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn malformed_token_is_invalid() {
        assert!(matches!(
            issuer().validate_token("not.a.token"),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn same_second_tokens_are_distinct() {
        let issuer = issuer();
        let first = issuer.issue_refresh_token("user").unwrap();
        let second = issuer.issue_refresh_token("user").unwrap();
        assert_ne!(first, second);
    }
}
