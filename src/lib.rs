//! meshrtc: signaling and connection orchestration for small mesh WebRTC
//! groups.
//!
//! It provides two binaries:
//! - `signaling_server`: the relay that authenticates clients, tracks room
//!   membership and routes offers, answers, candidates and call events.
//! - `meshrtc_client`: a headless client driving group voice rooms and
//!   private calls from stdin commands.
//!
//! Media itself never passes through the relay; every participant holds a
//! direct peer link to every other one.

/// Private 1:1 call state machine.
pub mod call;
/// Headless client runtime: command dispatch, health and event loop.
pub mod client;
/// Handles configuration loading and management.
pub mod config;
/// Logging utilities for the relay and the client.
pub mod log;
/// Local capture seam and track types.
pub mod media;
/// Peer links: negotiation state, candidate queues, stream classification.
pub mod peer;
/// SDP (Session Description Protocol) parsing and building.
pub mod sdp;
/// Signaling relay: wire protocol, rooms, routing and the TCP/TLS server.
pub mod signaling;
/// Signaling client for communicating with the relay.
pub mod signaling_client;
/// TLS (Transport Layer Security) utility functions.
pub mod tls_utils;
/// Group voice rooms over a full mesh of peer links.
pub mod voice;
