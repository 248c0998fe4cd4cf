//! HS256 token issuance and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use depot_core::UserId;

use crate::{JwtClaims, Role, TokenError, validate_claims};

/// Lifetime of an issued session token, in days.
pub const TOKEN_TTL_DAYS: i64 = 7;

pub fn token_ttl() -> Duration {
    Duration::days(TOKEN_TTL_DAYS)
}

/// Verifies bearer tokens presented by clients.
///
/// The API middleware depends on this trait only, so tests can swap in a
/// validator with a fixed key.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError>;
}

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: JwtClaims,
}

/// Shared-secret HS256 signer/validator.
#[derive(Clone)]
pub struct Hs256JwtValidator {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Sign a token for `user_id` valid for [`TOKEN_TTL_DAYS`] from `now`.
    pub fn issue(
        &self,
        user_id: UserId,
        username: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let claims = JwtClaims {
            user_id,
            username: username.to_string(),
            role,
            jti: Uuid::now_v7().simple().to_string(),
            iat: now.timestamp(),
            exp: (now + token_ttl()).timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok(IssuedToken { token, claims })
    }
}

impl core::fmt::Debug for Hs256JwtValidator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256JwtValidator").finish_non_exhaustive()
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        // Only HS256 is accepted; the time window is checked against the
        // injected clock below rather than the library's wall clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation)
            .map_err(|_| TokenError::Invalid)?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_validates_with_same_secret() {
        let jwt = Hs256JwtValidator::new("test-secret-key");
        let now = Utc::now();
        let issued = jwt.issue(UserId::new(1), "admin", Role::Admin, now).unwrap();

        let claims = jwt.validate(&issued.token, now).unwrap();
        assert_eq!(claims.user_id, UserId::new(1));
        assert_eq!(claims.username, "admin");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, token_ttl().num_seconds());
    }

    #[test]
    fn wrong_secret_and_garbage_are_rejected() {
        let now = Utc::now();
        let issued = Hs256JwtValidator::new("secret1")
            .issue(UserId::new(1), "admin", Role::Admin, now)
            .unwrap();

        let other = Hs256JwtValidator::new("secret2");
        assert_eq!(other.validate(&issued.token, now), Err(TokenError::Invalid));
        assert_eq!(other.validate("not-a-token", now), Err(TokenError::Invalid));
    }

    #[test]
    fn token_expires_after_ttl() {
        let jwt = Hs256JwtValidator::new("s");
        let now = Utc::now();
        let issued = jwt.issue(UserId::new(2), "bob", Role::User, now).unwrap();

        let later = now + token_ttl() + Duration::seconds(1);
        assert_eq!(jwt.validate(&issued.token, later), Err(TokenError::Expired));
    }

    #[test]
    fn every_token_gets_a_fresh_jti() {
        let jwt = Hs256JwtValidator::new("s");
        let now = Utc::now();
        let a = jwt.issue(UserId::new(1), "a", Role::User, now).unwrap();
        let b = jwt.issue(UserId::new(1), "a", Role::User, now).unwrap();
        assert_ne!(a.claims.jti, b.claims.jti);
    }
}
