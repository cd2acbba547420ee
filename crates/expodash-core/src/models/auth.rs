use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// The subset of JWT claims the dashboard reads.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    #[serde(default, deserialize_with = "super::organizer::deserialize_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Decode the payload segment of a JWT without verifying it. The
    /// backend is the only party that checks signatures.
    pub fn decode_unverified(token: &str) -> Option<Self> {
        let payload = token.split('.').nth(1)?;
        // Some issuers pad, some don't
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}
