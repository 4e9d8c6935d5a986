mod auth_backend;
mod auth_error;
mod hmac_token_auth;
mod in_memory_auth_backend;
pub use auth_backend::AuthBackend;
pub use auth_error::AuthError;
pub use hmac_token_auth::HmacTokenAuth;
pub use in_memory_auth_backend::{AllowAllAuthBackend, InMemoryAuthBackend};
