//! driftline-auth: HMAC-based session token issuer (spec.md §4.E).
//!
//! Tokens bind `(senderId, receiverId, roomId)` plus an expiry, signed with
//! a shared secret. Verification is fail-soft: any malformed token, bad
//! signature, or missing field returns the zero-value claim rather than an
//! error, so callers uniformly reject via `SessionClaim::is_empty` instead
//! of exception handling (spec.md §9).

use driftline_protocol::SessionClaim;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime (spec.md §4.E, "default expiry 7 days").
pub const DEFAULT_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, thiserror::Error)]
pub enum TokenError {
    #[error("secret must not be empty")]
    EmptySecret,
}

pub struct TokenIssuer {
    secret: Vec<u8>,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, TokenError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        Ok(Self { secret })
    }

    /// Signs a claim with the default 7-day expiry, using the real clock.
    #[must_use]
    pub fn sign(&self, mut claim: SessionClaim) -> String {
        let now = now_unix_secs();
        claim.expires_at = now + DEFAULT_TTL_SECS;
        sign_claim(&self.secret, &claim)
    }

    /// Signs a claim with an explicit TTL and an effectively non-expiring
    /// variant when `ttl_secs` is `None` (spec.md §4.E, "friend-chat tokens
    /// may be effectively non-expiring").
    #[must_use]
    pub fn sign_with_ttl(&self, mut claim: SessionClaim, ttl_secs: Option<i64>) -> String {
        let now = now_unix_secs();
        claim.expires_at = match ttl_secs {
            Some(ttl) => now + ttl,
            None => i64::MAX,
        };
        sign_claim(&self.secret, &claim)
    }

    /// Verifies `token`. Returns the zero-value claim on any failure:
    /// malformed encoding, bad signature, or expiry in the past. Never
    /// panics or returns an `Err` -- this is the fail-soft contract
    /// spec.md §9 requires of the socket layer's authorization check.
    #[must_use]
    pub fn verify(&self, token: &str) -> SessionClaim {
        self.verify_at(token, now_unix_secs())
    }

    #[must_use]
    pub fn verify_at(&self, token: &str, now_unix_secs: i64) -> SessionClaim {
        verify_claim(&self.secret, token, now_unix_secs).unwrap_or_default()
    }
}

fn now_unix_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

fn sign_claim(secret: &[u8], claim: &SessionClaim) -> String {
    let payload = serde_json::to_vec(claim).unwrap_or_default();
    let payload_b64 = base64_encode(&payload);

    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(payload_b64.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    format!("{payload_b64}.{signature}")
}

fn verify_claim(secret: &[u8], token: &str, now_unix_secs: i64) -> Option<SessionClaim> {
    let (payload_b64, signature) = token.split_once('.')?;

    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(payload_b64.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());
    if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
        return None;
    }

    let payload = base64_decode(payload_b64)?;
    let claim: SessionClaim = serde_json::from_slice(&payload).ok()?;

    if claim.sender_id.is_empty() || claim.receiver_id.is_empty() || claim.room_id.is_empty() {
        return None;
    }
    if claim.expires_at != i64::MAX && claim.expires_at < now_unix_secs {
        return None;
    }

    Some(claim)
}

fn base64_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
}

fn base64_decode(data: &str) -> Option<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(data)
        .ok()
}

/// Avoids short-circuiting on the first mismatched byte, matching the
/// security posture of a signature comparison -- a timing side-channel
/// here would leak the expected signature byte by byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim() -> SessionClaim {
        SessionClaim {
            sender_id: "alice".to_owned(),
            receiver_id: "bob".to_owned(),
            room_id: "room-1".to_owned(),
            sender_username: Some("alice".to_owned()),
            receiver_username: Some("bob".to_owned()),
            expires_at: 0,
        }
    }

    /// Invariant 10: sign -> verify round-trips to the same claim.
    #[test]
    fn sign_then_verify_round_trips() {
        let issuer = TokenIssuer::new(b"test-secret".to_vec()).unwrap();
        let token = issuer.sign_with_ttl(claim(), Some(60));
        let verified = issuer.verify_at(&token, 0);
        assert_eq!(verified.sender_id, "alice");
        assert_eq!(verified.receiver_id, "bob");
        assert_eq!(verified.room_id, "room-1");
        assert!(!verified.is_empty());
    }

    /// Invariant 10: a tampered token returns the zero claim, never panics.
    #[test]
    fn verify_rejects_tampered_signature() {
        let issuer = TokenIssuer::new(b"test-secret".to_vec()).unwrap();
        let token = issuer.sign_with_ttl(claim(), Some(60));
        let mut tampered = token.clone();
        tampered.push('0');
        let verified = issuer.verify_at(&tampered, 0);
        assert!(verified.is_empty());
    }

    #[test]
    fn verify_rejects_expired_token() {
        let issuer = TokenIssuer::new(b"test-secret".to_vec()).unwrap();
        let token = issuer.sign_with_ttl(claim(), Some(60));
        let verified = issuer.verify_at(&token, 1_000);
        assert!(verified.is_empty());
    }

    #[test]
    fn verify_rejects_malformed_token() {
        let issuer = TokenIssuer::new(b"test-secret".to_vec()).unwrap();
        assert!(issuer.verify_at("not-a-token", 0).is_empty());
        assert!(issuer.verify_at("", 0).is_empty());
    }

    #[test]
    fn verify_rejects_token_signed_with_a_different_secret() {
        let issuer_a = TokenIssuer::new(b"secret-a".to_vec()).unwrap();
        let issuer_b = TokenIssuer::new(b"secret-b".to_vec()).unwrap();
        let token = issuer_a.sign_with_ttl(claim(), Some(60));
        assert!(issuer_b.verify_at(&token, 0).is_empty());
    }

    #[test]
    fn non_expiring_token_survives_far_future_clock() {
        let issuer = TokenIssuer::new(b"test-secret".to_vec()).unwrap();
        let token = issuer.sign_with_ttl(claim(), None);
        let verified = issuer.verify_at(&token, 10_000_000_000);
        assert!(!verified.is_empty());
    }

    #[test]
    fn new_rejects_empty_secret() {
        assert!(TokenIssuer::new(Vec::new()).is_err());
    }
}
