pub mod auth;
pub mod call_ledger;
pub mod errors;
pub mod membership;
pub mod presence;
pub mod protocol;
pub mod rooms;
pub mod router;
pub mod run;
pub mod runtime;
pub mod server_engine;
pub mod server_event;
pub mod settings;
pub mod signaling_server;
pub mod tls;
pub mod transport;
pub mod types;

pub use auth::{AllowAllAuthBackend, AuthBackend, AuthError, HmacTokenAuth, InMemoryAuthBackend};
pub use membership::{AllowAllMembership, InMemoryMembership, MembershipBackend};
pub use server_engine::ServerEngine;
pub use signaling_server::SignalingServer;
