//! Bearer-token claim decoding.
//!
//! The client never verifies signatures; it only reads the subject and
//! expiry claims out of the payload segment for display and for
//! addressing the per-user chat endpoint. Any malformation yields
//! `None` rather than an error.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

/// Claims extracted from a bearer token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject claim: the user id, rendered as a string by the backend.
    pub sub: String,
    /// Expiry as epoch seconds.
    pub exp: i64,
}

impl TokenClaims {
    /// The numeric user id, if the subject claim parses as one.
    pub fn subject_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }

    /// Whether the token has expired relative to `now_epoch` seconds.
    pub fn is_expired(&self, now_epoch: i64) -> bool {
        self.exp <= now_epoch
    }
}

/// Decodes the payload segment of a JWT-shaped bearer token.
///
/// Returns `None` on any malformation: wrong segment count, invalid
/// base64url, or a payload that is not the expected JSON shape.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let payload = token.split('.').nth(1)?;
    // Tolerate padded encoders
    let payload = payload.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}
