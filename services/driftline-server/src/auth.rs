//! HTTP-layer Bearer-token authorization (spec.md §6, "all mutating
//! endpoints require Bearer token"). Reuses the same HMAC claim format the
//! Token Issuer signs for room sessions (spec.md §4.E): a caller's token
//! is a self-referential claim with `sender_id == :userId` in the route.

use axum::http::HeaderMap;

use crate::http::response::{unauthorized, HttpResponse};
use crate::state::AppState;

pub fn extract_bearer(authorization: &str) -> Option<&str> {
    authorization.strip_prefix("Bearer ")
}

fn extract_bearer_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer)
}

/// Verifies the request's Bearer token is a non-expired claim issued for
/// `user_id`. Fails closed: any malformed header, bad signature, or a
/// claim whose `sender_id` disagrees with the path parameter is a 401.
pub fn authorize_user(headers: &HeaderMap, state: &AppState, user_id: &str) -> Result<(), HttpResponse> {
    let token = extract_bearer_from_headers(headers).ok_or_else(|| unauthorized("missing bearer token"))?;
    let claim = state.token_issuer.verify(token);
    if claim.is_empty() || claim.sender_id != user_id {
        return Err(unauthorized("invalid or mismatched token"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bearer_handles_missing_and_valid_prefix() {
        assert_eq!(extract_bearer("Basic abc"), None);
        assert_eq!(extract_bearer("Bearer tok-1"), Some("tok-1"));
    }
}
