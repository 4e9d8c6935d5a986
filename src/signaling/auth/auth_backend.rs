use crate::signaling::auth::AuthError;
use crate::signaling::protocol::Member;

/// Credential check performed once, on the first frame of a connection.
///
/// Implementations turn an opaque token into the identity the relay will
/// attach to everything that connection sends.
pub trait AuthBackend: Send + Sync {
    fn verify(&self, token: &str) -> Result<Member, AuthError>;
}
