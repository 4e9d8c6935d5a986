use std::sync::Arc;

use crate::config::Config;
use crate::log::LogSink;
use crate::signaling::auth::{AllowAllAuthBackend, AuthBackend, HmacTokenAuth, InMemoryAuthBackend};
use crate::signaling::errors::RelayError;
use crate::signaling::membership::{AllowAllMembership, InMemoryMembership, MembershipBackend};
use crate::signaling::server_engine::ServerEngine;
use crate::signaling::settings::RelaySettings;
use crate::signaling::signaling_server::SignalingServer;
use crate::signaling::tls::build_signaling_server_config;
use crate::tls_utils::TlsSettings;
use crate::{sink_info, sink_warn};

/// Pick the auth backend the config asks for: signed tokens when
/// `[Auth] token_secret` is set, else the static `[Tokens]` table, else
/// accept-all (development only).
pub fn auth_backend_from_config(config: &Config, log: &Arc<dyn LogSink>) -> Box<dyn AuthBackend> {
    if let Some(secret) = config.get_non_empty("Auth", "token_secret") {
        sink_info!(log, "auth: HMAC-signed tokens");
        return Box::new(HmacTokenAuth::new(secret.as_bytes()));
    }
    let table = InMemoryAuthBackend::from_config(config);
    if !table.is_empty() {
        sink_info!(log, "auth: static token table ({} tokens)", table.len());
        return Box::new(table);
    }
    sink_warn!(log, "auth: no [Auth] or [Tokens] configured; accepting any token");
    Box::new(AllowAllAuthBackend)
}

/// `[Membership]` table when present, otherwise every room is open.
pub fn membership_from_config(
    config: &Config,
    log: &Arc<dyn LogSink>,
) -> Box<dyn MembershipBackend> {
    if config.section("Membership").next().is_some() {
        let m = InMemoryMembership::from_config(config);
        sink_info!(log, "membership: {} configured rooms", m.room_count());
        return Box::new(m);
    }
    sink_info!(log, "membership: all rooms open");
    Box::new(AllowAllMembership)
}

/// Build a relay from `config`.
///
/// # Errors
/// Config values that do not parse, TLS material that cannot be loaded, or
/// a bind failure.
pub fn build_signaling_server(
    config: &Config,
    log: Arc<dyn LogSink>,
) -> Result<SignalingServer, RelayError> {
    let settings = RelaySettings::from_config(config)?;
    let tls_settings = TlsSettings::from_config(config)?;
    let tls = if tls_settings.enabled {
        Some(build_signaling_server_config(&tls_settings)?)
    } else {
        None
    };

    let engine = ServerEngine::with_backends(
        log.clone(),
        auth_backend_from_config(config, &log),
        membership_from_config(config, &log),
    );
    Ok(SignalingServer::bind(settings, log, engine, tls)?)
}

/// Build and serve until the listener fails.
///
/// # Errors
/// See [`build_signaling_server`].
pub fn run_signaling_server(config: &Config, log: Arc<dyn LogSink>) -> Result<(), RelayError> {
    build_signaling_server(config, log)?.serve()?;
    Ok(())
}
