//! Headless client: one thread that feeds signaling events, user commands
//! and timer ticks into the call and voice sessions, in order.
pub mod client_command;
pub mod client_event;
pub mod client_settings;
pub mod health;
pub mod mesh_client;
pub mod runtime;

pub use client_command::{ClientCommand, CommandParseError};
pub use client_event::ClientEvent;
pub use client_settings::ClientSettings;
pub use health::{Health, HealthMonitor};
pub use mesh_client::MeshClient;
pub use runtime::{run_client_loop, spawn_client};
