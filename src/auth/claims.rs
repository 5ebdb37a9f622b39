/// Token Claims
///
/// The identity embedded in every token plus the registered time claims.
/// On the wire the payload is `{ "id", "name", "iat", "exp" }`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Who the token speaks for
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct IdentityClaim {
    /// Account id (UUID string)
    #[serde(rename = "id")]
    pub subject_id: String,
    #[serde(rename = "name")]
    pub display_name: String,
}

impl IdentityClaim {
    pub fn new(subject_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Full token payload
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    #[serde(flatten)]
    pub identity: IdentityClaim,
    /// Issued at (Unix timestamp, seconds)
    pub iat: i64,
    /// Expiration time (Unix timestamp, seconds)
    pub exp: i64,
}

impl TokenClaims {
    pub fn new(identity: IdentityClaim, ttl: Duration, now: DateTime<Utc>) -> Self {
        let iat = now.timestamp();
        Self {
            identity,
            iat,
            exp: iat.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)),
        }
    }

    /// A token is only accepted strictly before `exp`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_claims_creation() {
        let now = Utc::now();
        let identity = IdentityClaim::new(Uuid::new_v4().to_string(), "Dan Han");
        let claims = TokenClaims::new(identity.clone(), Duration::from_secs(900), now);

        assert_eq!(claims.identity, identity);
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp - claims.iat, 900);
        assert!(!claims.is_expired_at(now));
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let claims = TokenClaims::new(IdentityClaim::new("a", "b"), Duration::from_secs(60), now);

        assert!(!claims.is_expired_at(now + chrono::Duration::seconds(59)));
        assert!(claims.is_expired_at(now + chrono::Duration::seconds(60)));
    }

    #[test]
    fn test_wire_field_names() {
        let claims = TokenClaims::new(IdentityClaim::new("abc", "Dan"), Duration::from_secs(1), Utc::now());
        let json = serde_json::to_value(&claims).unwrap();

        assert_eq!(json["id"], "abc");
        assert_eq!(json["name"], "Dan");
        assert!(json.get("exp").is_some());
        assert!(json.get("iat").is_some());
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let now = Utc::now();
        let claims = TokenClaims::new(IdentityClaim::new("a", "b"), Duration::MAX, now);

        assert_eq!(claims.exp, i64::MAX);
        assert!(!claims.is_expired_at(now));
    }
}
