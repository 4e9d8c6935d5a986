use std::collections::HashMap;

use crate::config::Config;
use crate::signaling::{
    auth::{AuthBackend, AuthError},
    protocol::{Member, UserId, UserName},
};

/// Static token table: token → identity.
#[derive(Debug, Default)]
pub struct InMemoryAuthBackend {
    tokens: HashMap<String, Member>,
}

impl InMemoryAuthBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenient builder-style helper.
    pub fn with_token(
        mut self,
        token: impl Into<String>,
        user_id: impl Into<UserId>,
        username: impl Into<UserName>,
    ) -> Self {
        self.tokens
            .insert(token.into(), Member::new(user_id, username));
        self
    }

    /// `[Tokens]` section, one `token = user_id:username` per line.
    /// Malformed entries are skipped.
    pub fn from_config(config: &Config) -> Self {
        let mut backend = Self::new();
        for (token, ident) in config.section("Tokens") {
            if let Some((user_id, username)) = ident.split_once(':') {
                let (user_id, username) = (user_id.trim(), username.trim());
                if !user_id.is_empty() && !username.is_empty() {
                    backend = backend.with_token(token, user_id, username);
                }
            }
        }
        backend
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl AuthBackend for InMemoryAuthBackend {
    fn verify(&self, token: &str) -> Result<Member, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingCredential);
        }
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidCredential)
    }
}

/// Dev / test backend that trusts the token itself: `user_id` or
/// `user_id:username`.
#[derive(Debug, Default)]
pub struct AllowAllAuthBackend;

impl AuthBackend for AllowAllAuthBackend {
    fn verify(&self, token: &str) -> Result<Member, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingCredential);
        }
        Ok(match token.split_once(':') {
            Some((user_id, username)) => Member::new(user_id, username),
            None => Member::new(token, token),
        })
    }
}
