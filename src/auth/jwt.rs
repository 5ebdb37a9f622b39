/// JWT Token Issuance and Validation
///
/// HS256 compact tokens signed with the configured shared secret. Access and
/// refresh tokens are the same kind of token and differ only by lifetime;
/// expiry is the only way a token stops being valid.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;
use std::time::Duration;

use crate::auth::claims::{IdentityClaim, TokenClaims};
use crate::configuration::JwtSettings;
use crate::error::AppError;

/// Lifetime of an access token
pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);
/// Lifetime of a refresh token
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Why a token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationFailure {
    BadSignature,
    Expired,
    Malformed,
}

impl VerificationFailure {
    pub fn reason(&self) -> &'static str {
        match self {
            VerificationFailure::BadSignature => "bad-signature",
            VerificationFailure::Expired => "expired",
            VerificationFailure::Malformed => "malformed",
        }
    }
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

impl std::error::Error for VerificationFailure {}

/// Signs and verifies identity tokens with one shared secret
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against our own clock reading in `verify_at`.
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn from_settings(settings: &JwtSettings) -> Self {
        Self::new(&settings.secret)
    }

    /// Sign a token for `claim` that expires `ttl` from now
    ///
    /// # Errors
    /// Returns an internal error if the payload cannot be encoded
    pub fn sign(&self, claim: &IdentityClaim, ttl: Duration) -> Result<String, AppError> {
        self.sign_at(claim, ttl, Utc::now())
    }

    pub fn sign_at(
        &self,
        claim: &IdentityClaim,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = TokenClaims::new(claim.clone(), ttl, now);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Check signature and expiry, returning the embedded identity
    pub fn verify(&self, token: &str) -> Result<IdentityClaim, VerificationFailure> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<IdentityClaim, VerificationFailure> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| {
                let failure = match e.kind() {
                    ErrorKind::InvalidSignature => VerificationFailure::BadSignature,
                    ErrorKind::ExpiredSignature => VerificationFailure::Expired,
                    _ => VerificationFailure::Malformed,
                };
                tracing::debug!(error = %e, reason = failure.reason(), "JWT rejected");
                failure
            },
        )?;

        if data.claims.is_expired_at(now) {
            return Err(VerificationFailure::Expired);
        }

        Ok(data.claims.identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE64URL: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret-key-at-least-32-characters-long")
    }

    fn claim() -> IdentityClaim {
        IdentityClaim::new("624baad608f0ea0de8b1cfa1", "Dan Han")
    }

    /// Flip the lowest bit of the first signature character's 6-bit value.
    fn flip_signature_bit(token: &str) -> String {
        let (head, signature) = token.rsplit_once('.').unwrap();
        let mut sig = signature.as_bytes().to_vec();
        let index = BASE64URL.iter().position(|&c| c == sig[0]).unwrap();
        sig[0] = BASE64URL[index ^ 1];
        format!("{}.{}", head, String::from_utf8(sig).unwrap())
    }

    #[test]
    fn test_sign_and_verify() {
        let issuer = issuer();
        let token = issuer.sign(&claim(), ACCESS_TOKEN_TTL).expect("Failed to sign token");

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(issuer.verify(&token).expect("Failed to verify token"), claim());
    }

    #[test]
    fn test_expired_after_ttl() {
        let issuer = issuer();
        let issued_at = Utc::now();
        let token = issuer.sign_at(&claim(), ACCESS_TOKEN_TTL, issued_at).unwrap();

        let just_before = issued_at + chrono::Duration::seconds(15 * 60 - 1);
        assert!(issuer.verify_at(&token, just_before).is_ok());

        let at_expiry = issued_at + chrono::Duration::seconds(15 * 60);
        assert_eq!(
            issuer.verify_at(&token, at_expiry),
            Err(VerificationFailure::Expired)
        );

        let much_later = issued_at + chrono::Duration::days(2);
        assert_eq!(
            issuer.verify_at(&token, much_later),
            Err(VerificationFailure::Expired)
        );
    }

    #[test]
    fn test_token_signed_in_the_past_is_expired() {
        let issuer = issuer();
        let long_ago = Utc::now() - chrono::Duration::hours(13);
        let token = issuer.sign_at(&claim(), REFRESH_TOKEN_TTL, long_ago).unwrap();

        assert_eq!(issuer.verify(&token), Err(VerificationFailure::Expired));
    }

    #[test]
    fn test_different_secret() {
        let token = issuer().sign(&claim(), ACCESS_TOKEN_TTL).unwrap();
        let other = TokenIssuer::new("another-secret-key-at-least-32-characters");

        assert_eq!(other.verify(&token), Err(VerificationFailure::BadSignature));
    }

    #[test]
    fn test_flipped_signature_bit() {
        let issuer = issuer();
        let token = issuer.sign(&claim(), ACCESS_TOKEN_TTL).unwrap();
        let tampered = flip_signature_bit(&token);

        assert_ne!(token, tampered);
        assert_eq!(issuer.verify(&tampered), Err(VerificationFailure::BadSignature));
    }

    #[test]
    fn test_tampered_payload() {
        let issuer = issuer();
        let token = issuer.sign(&claim(), ACCESS_TOKEN_TTL).unwrap();
        let other = issuer
            .sign(&IdentityClaim::new("someone-else", "Mallory"), ACCESS_TOKEN_TTL)
            .unwrap();

        // Payload of one token under the signature of another.
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert_eq!(issuer.verify(&spliced), Err(VerificationFailure::BadSignature));
    }

    #[test]
    fn test_malformed_token() {
        let issuer = issuer();

        assert_eq!(issuer.verify("not-a-token"), Err(VerificationFailure::Malformed));
        assert_eq!(issuer.verify(""), Err(VerificationFailure::Malformed));
    }

    #[test]
    fn test_access_and_refresh_differ() {
        let issuer = issuer();
        let access = issuer.sign(&claim(), ACCESS_TOKEN_TTL).unwrap();
        let refresh = issuer.sign(&claim(), REFRESH_TOKEN_TTL).unwrap();

        assert_ne!(access, refresh);
        assert_eq!(issuer.verify(&refresh).unwrap(), claim());
    }

    #[test]
    fn test_failure_reasons() {
        assert_eq!(VerificationFailure::BadSignature.reason(), "bad-signature");
        assert_eq!(VerificationFailure::Expired.reason(), "expired");
        assert_eq!(VerificationFailure::Malformed.reason(), "malformed");
    }
}
