/// Authentication module
///
/// Password hashing/verification and signed identity tokens.

mod claims;
mod jwt;
mod password;

pub use claims::IdentityClaim;
pub use jwt::TokenIssuer;
pub use jwt::VerificationFailure;
pub use jwt::{ACCESS_TOKEN_TTL, REFRESH_TOKEN_TTL};
pub use password::hash_password;
pub use password::verify_password;
pub use password::MAX_PASSWORD_BYTES;
