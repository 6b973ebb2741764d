//! Admin token extractor.
//!
//! Admin routes require `Authorization: Bearer <STOREFRONT_ADMIN_TOKEN>`.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use secrecy::ExposeSecret;

use crate::error::AppError;
use crate::state::AppState;

/// Extractor that rejects requests without the admin bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn list_discounts(_admin: RequireAdmin, State(state): State<AppState>) { ... }
/// ```
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("Missing admin token".to_string()))?;

        if !constant_time_compare(token.trim(), state.config().admin_token.expose_secret()) {
            tracing::warn!(path = %parts.uri.path(), "Rejected admin request");
            return Err(AppError::Unauthorized("Invalid admin token".to_string()));
        }

        Ok(Self)
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("token", "token"));
        assert!(!constant_time_compare("token", "tokem"));
        assert!(!constant_time_compare("token", "token2"));
        assert!(!constant_time_compare("", "token"));
    }
}
