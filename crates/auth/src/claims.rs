use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use depot_core::UserId;

use crate::Role;

/// JWT claims model.
///
/// Times are unix seconds so the registered `iat`/`exp` claims stay
/// interoperable with standard JWT tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Authenticated user.
    pub user_id: UserId,

    /// Username at issue time (display and log attribution only).
    pub username: String,

    /// Role at issue time. The API re-reads the live role on every request.
    pub role: Role,

    /// Unique token id, the handle used for revocation.
    pub jti: String,

    /// Issued-at, unix seconds.
    pub iat: i64,

    /// Expiration, unix seconds.
    pub exp: i64,
}

impl JwtClaims {
    pub fn issued_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.iat, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed or its signature is invalid")]
    Invalid,

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("token has been revoked")]
    Revoked,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Deterministically validate the time window of decoded claims.
///
/// Signature verification happens in [`crate::jwt`]; this only looks at the
/// claims themselves so it can be checked against an injected clock.
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims(iat: DateTime<Utc>, exp: DateTime<Utc>) -> JwtClaims {
        JwtClaims {
            user_id: UserId::new(1),
            username: "admin".into(),
            role: Role::Admin,
            jti: "abc".into(),
            iat: iat.timestamp(),
            exp: exp.timestamp(),
        }
    }

    #[test]
    fn accepts_current_window() {
        let now = Utc::now();
        let c = claims(now - Duration::minutes(1), now + Duration::minutes(1));
        assert_eq!(validate_claims(&c, now), Ok(()));
    }

    #[test]
    fn rejects_expired_future_and_inverted() {
        let now = Utc::now();
        let expired = claims(now - Duration::hours(2), now - Duration::hours(1));
        assert_eq!(validate_claims(&expired, now), Err(TokenError::Expired));

        let future = claims(now + Duration::hours(1), now + Duration::hours(2));
        assert_eq!(validate_claims(&future, now), Err(TokenError::NotYetValid));

        let inverted = claims(now, now - Duration::seconds(1));
        assert_eq!(validate_claims(&inverted, now), Err(TokenError::InvalidTimeWindow));
    }
}
