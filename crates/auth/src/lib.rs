//! `depot-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows how
//! to sign and check tokens, hash passwords and compare roles, but never where
//! users live.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod principal;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, authorize};
pub use claims::{JwtClaims, TokenError, validate_claims};
pub use jwt::{Hs256JwtValidator, IssuedToken, JwtValidator, TOKEN_TTL_DAYS, token_ttl};
pub use password::{
    MIN_PASSWORD_LEN, PasswordError, generate_password, hash_password, validate_password,
    verify_password,
};
pub use principal::Principal;
pub use roles::{Role, role_at_least};
pub use user::{User, validate_username};
