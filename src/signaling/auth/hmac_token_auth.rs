use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::signaling::{
    auth::{AuthBackend, AuthError},
    protocol::Member,
};

type HmacSha256 = Hmac<Sha256>;

/// Stateless signed tokens: `user_id:username:hex(hmac_sha256(secret, "user_id:username"))`.
///
/// Whoever issues credentials shares `secret` with the relay; the relay keeps
/// no user table.
pub struct HmacTokenAuth {
    secret: Vec<u8>,
}

impl HmacTokenAuth {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|_| AuthError::Internal)
    }

    /// Mint a token for `user_id`/`username`. The user id may not contain `:`.
    pub fn issue(&self, user_id: &str, username: &str) -> Result<String, AuthError> {
        if user_id.is_empty() || user_id.contains(':') || username.is_empty() {
            return Err(AuthError::InvalidCredential);
        }
        let payload = format!("{user_id}:{username}");
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let tag = mac.finalize().into_bytes();
        Ok(format!("{payload}:{}", to_hex(&tag)))
    }
}

impl AuthBackend for HmacTokenAuth {
    fn verify(&self, token: &str) -> Result<Member, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingCredential);
        }
        let (payload, tag_hex) = token.rsplit_once(':').ok_or(AuthError::InvalidCredential)?;
        let (user_id, username) = payload
            .split_once(':')
            .ok_or(AuthError::InvalidCredential)?;
        if user_id.is_empty() || username.is_empty() {
            return Err(AuthError::InvalidCredential);
        }
        let tag = from_hex(tag_hex).ok_or(AuthError::InvalidCredential)?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        // constant-time comparison
        mac.verify_slice(&tag)
            .map_err(|_| AuthError::InvalidCredential)?;

        Ok(Member::new(user_id, username))
    }
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

fn from_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 || !s.is_ascii() {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}
