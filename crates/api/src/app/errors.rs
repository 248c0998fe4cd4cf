//! Consistent error responses: every failure renders
//! `{"error": <code>, "message": <text>}`.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use serde_json::json;

use depot_auth::{PasswordError, TokenError};
use depot_core::DomainError;
use depot_infra::StoreError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        DomainError::Validation(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", message),
        DomainError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", message),
        DomainError::InvalidQuantity(_) => json_error(StatusCode::BAD_REQUEST, "invalid_quantity", message),
        DomainError::SelfTransfer => json_error(StatusCode::BAD_REQUEST, "self_transfer", message),
        DomainError::InsufficientQuantity { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "insufficient_quantity", message)
        }
        DomainError::InvalidAdjustment { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_adjustment", message)
        }
        DomainError::OwnerVariantMismatch => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "owner_variant_mismatch", message)
        }
        DomainError::OwnerHasInventory { .. } => {
            json_error(StatusCode::CONFLICT, "owner_has_inventory", message)
        }
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", message),
        DomainError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", message),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::Domain(e) => domain_error_to_response(e),
        StoreError::Contention(op) => {
            tracing::warn!(operation = %op, "storage contention");
            let mut response = json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "storage_contention",
                "storage is busy, retry shortly",
            );
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
            response
        }
        StoreError::DeadlineExceeded => json_error(
            StatusCode::GATEWAY_TIMEOUT,
            "deadline_exceeded",
            "operation did not complete in time; nothing was changed",
        ),
        StoreError::Storage(detail) => {
            tracing::error!(error = %detail, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

pub fn token_error_to_response(err: TokenError) -> axum::response::Response {
    match err {
        TokenError::Signing(detail) => {
            tracing::error!(error = %detail, "failed to sign token");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "failed to generate token")
        }
        other => json_error(StatusCode::UNAUTHORIZED, "unauthorized", other.to_string()),
    }
}

pub fn password_error_to_response(err: PasswordError) -> axum::response::Response {
    match err {
        PasswordError::TooShort => json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string()),
        other => {
            tracing::error!(error = %other, "password hashing failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_documented_statuses() {
        let cases = [
            (DomainError::SelfTransfer, StatusCode::BAD_REQUEST),
            (DomainError::invalid_quantity("0"), StatusCode::BAD_REQUEST),
            (
                DomainError::InsufficientQuantity { held: 1, requested: 2 },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                DomainError::InvalidAdjustment { held: 1, delta: -2 },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (DomainError::OwnerVariantMismatch, StatusCode::UNPROCESSABLE_ENTITY),
            (DomainError::OwnerHasInventory { entries: 2 }, StatusCode::CONFLICT),
            (DomainError::conflict("taken"), StatusCode::CONFLICT),
            (DomainError::not_found("item"), StatusCode::NOT_FOUND),
        ];
        for (err, status) in cases {
            assert_eq!(domain_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn contention_asks_the_client_to_retry() {
        let response = store_error_to_response(StoreError::Contention("begin_immediate".into()));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    }

    #[test]
    fn deadline_and_storage_failures() {
        assert_eq!(
            store_error_to_response(StoreError::DeadlineExceeded).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            store_error_to_response(StoreError::Storage("disk I/O error".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
