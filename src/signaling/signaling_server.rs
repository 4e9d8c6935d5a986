use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, mpsc};
use std::{io, thread};

use rustls::ServerConfig;

use crate::log::{LogSink, NoopLogSink};
use crate::signaling::router::Router;
use crate::signaling::runtime::run_server_loop;
use crate::signaling::server_engine::ServerEngine;
use crate::signaling::server_event::ServerEvent;
use crate::signaling::settings::RelaySettings;
use crate::signaling::transport::{Connection, spawn_connection_threads};
use crate::signaling::types::ClientId;
use crate::{sink_info, sink_warn};

/// Top-level runtime object for the signaling relay.
///
/// Owns the bound listener, the logging sink, the engine (with its auth and
/// membership backends) and the optional TLS config, and knows how to spin
/// up the central loop plus per-connection threads.
pub struct SignalingServer {
    listener: TcpListener,
    settings: RelaySettings,
    log: Arc<dyn LogSink>,
    engine: ServerEngine,
    tls: Option<Arc<ServerConfig>>,
}

impl SignalingServer {
    /// Bind now so callers (and tests using port 0) can learn the address
    /// before serving.
    pub fn bind(
        settings: RelaySettings,
        log: Arc<dyn LogSink>,
        engine: ServerEngine,
        tls: Option<Arc<ServerConfig>>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(&settings.bind_addr)?;
        Ok(Self {
            listener,
            settings,
            log,
            engine,
            tls,
        })
    }

    /// Plain TCP, accept-all backends, no logging.
    pub fn bind_dev(addr: &str) -> io::Result<Self> {
        let settings = RelaySettings {
            bind_addr: addr.to_owned(),
            ..RelaySettings::default()
        };
        Self::bind(settings, Arc::new(NoopLogSink), ServerEngine::new(), None)
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve on a background thread.
    pub fn spawn(self) -> io::Result<thread::JoinHandle<io::Result<()>>> {
        thread::Builder::new()
            .name("signaling-accept".into())
            .spawn(move || self.serve())
    }

    /// Blocking main loop: spawn central server loop, accept clients.
    pub fn serve(self) -> io::Result<()> {
        let Self {
            listener,
            settings,
            log,
            engine,
            tls,
        } = self;

        // Events from all connections → central server loop
        let (server_tx, server_rx) = mpsc::channel::<ServerEvent>();

        {
            let log_for_loop = log.clone();
            thread::Builder::new()
                .name("signaling-server-loop".into())
                .spawn(move || {
                    sink_info!(log_for_loop, "[signaling] server loop started");
                    run_server_loop(Router::with_engine(engine), log_for_loop, server_rx);
                })?;
        }

        let mut next_client_id: ClientId = 1;
        sink_info!(
            log,
            "signaling server listening on {} ({})",
            listener.local_addr()?,
            if tls.is_some() { "tls" } else { "plain tcp" }
        );

        for stream in listener.incoming() {
            let tcp = match stream {
                Ok(s) => s,
                Err(e) => {
                    sink_warn!(log, "incoming TCP accept failed: {} (continuing to accept)", e);
                    continue;
                }
            };

            let client_id = next_client_id;
            next_client_id += 1;

            let conn = match &tls {
                Some(cfg) => Connection::tls_server(tcp, Arc::clone(cfg), settings.poll_interval),
                None => Connection::plain(tcp, settings.poll_interval),
            };
            let conn = match conn {
                Ok(c) => c,
                Err(e) => {
                    sink_warn!(log, "failed to set up connection {}: {}", client_id, e);
                    continue;
                }
            };

            if let Ok(addr) = conn.peer_addr() {
                sink_info!(log, "accepted connection from {} as client_id={}", addr, client_id);
            }

            if let Err(e) = spawn_connection_threads(
                client_id,
                conn,
                server_tx.clone(),
                log.clone(),
                settings.max_frame_len,
            ) {
                sink_warn!(
                    log,
                    "failed to spawn connection threads for client {}: {}",
                    client_id,
                    e
                );
            }
        }

        Ok(())
    }
}
