use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use depot_auth::{JwtValidator, Principal, TokenError};
use depot_infra::Store;

use crate::app::errors::{json_error, store_error_to_response, token_error_to_response};
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub store: Store,
}

/// Authenticate the bearer token and attach a [`PrincipalContext`].
///
/// Besides signature and expiry, the token must not be revoked and its user
/// must still be active. The role comes from the user row, not the token.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers()).map_err(|status| {
        json_error(status, "unauthorized", "missing or invalid authorization header")
    })?;

    let claims = state
        .jwt
        .validate(token, Utc::now())
        .map_err(token_error_to_response)?;

    let revoked = state
        .store
        .is_token_revoked(&claims.jti)
        .await
        .map_err(store_error_to_response)?;
    if revoked {
        return Err(token_error_to_response(TokenError::Revoked));
    }

    let user = state
        .store
        .user(claims.user_id)
        .await
        .map_err(store_error_to_response)?
        .filter(|user| user.is_active())
        .ok_or_else(|| json_error(StatusCode::UNAUTHORIZED, "unauthorized", "user no longer exists"))?;

    let context = PrincipalContext::new(
        Principal::new(user.id, user.username, user.role),
        claims.jti.clone(),
        claims.expires_at(),
    );
    req.extensions_mut().insert(context.clone());

    // Echoed on the response so the outer request logger can attribute failures.
    let mut response = next.run(req).await;
    response.extensions_mut().insert(context);
    Ok(response)
}

/// Log requests that end in an error status: 4xx at `warn`, 5xx at `error`.
pub async fn log_failed_requests(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_default();
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();

    let response = next.run(req).await;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let user = response
            .extensions()
            .get::<PrincipalContext>()
            .map(|p| p.username().to_string())
            .unwrap_or_default();
        let latency_ms = started.elapsed().as_millis() as u64;
        if status.is_server_error() {
            tracing::error!(%method, %path, status = status.as_u16(), latency_ms, %remote, %user, "request");
        } else {
            tracing::warn!(%method, %path, status = status.as_u16(), latency_ms, %remote, %user, "request");
        }
    }
    response
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, header::AUTHORIZATION};

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def")), Ok("abc.def"));
    }

    #[test]
    fn missing_or_malformed_headers_are_unauthorized() {
        assert_eq!(extract_bearer(&HeaderMap::new()), Err(StatusCode::UNAUTHORIZED));
        assert_eq!(extract_bearer(&headers("Basic abc")), Err(StatusCode::UNAUTHORIZED));
        assert_eq!(extract_bearer(&headers("Bearer   ")), Err(StatusCode::UNAUTHORIZED));
    }
}
