use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use rustls::ClientConfig;

use crate::log::LogSink;
use crate::signaling::protocol::{MAX_BODY_LEN, Member, SignalingMsg};
use crate::signaling::transport::Connection;
use crate::signaling::types::ToClient;
use crate::signaling_client::{SignalingChannel, SignalingClientError, SignalingEvent};
use crate::{sink_info, sink_warn};

/// How to reach the relay.
#[derive(Clone)]
pub struct ClientTransportSettings {
    pub server_addr: String,
    /// TLS config plus the server name to verify, or `None` for plain TCP.
    pub tls: Option<(Arc<ClientConfig>, String)>,
    pub poll_interval: Duration,
    pub max_frame_len: usize,
    pub handshake_timeout: Duration,
}

impl ClientTransportSettings {
    pub fn plain(server_addr: impl Into<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
            tls: None,
            poll_interval: Duration::from_millis(50),
            max_frame_len: MAX_BODY_LEN,
            handshake_timeout: Duration::from_secs(5),
        }
    }
}

/// Cloneable outbound handle; what the client state machines talk to.
#[derive(Debug, Clone)]
pub struct SignalingSender {
    tx: Sender<ToClient>,
}

impl SignalingSender {
    /// Ask the writer to close the connection after flushing.
    pub fn close(&self) {
        let _ = self.tx.send(ToClient::Close);
    }
}

impl SignalingChannel for SignalingSender {
    fn send(&self, msg: SignalingMsg) -> Result<(), SignalingClientError> {
        self.tx
            .send(ToClient::Msg(msg))
            .map_err(|_| SignalingClientError::Disconnected)
    }
}

/// An authenticated connection to the relay, backed by one reader and one
/// writer thread.
pub struct SignalingClient {
    sender: SignalingSender,
    events: Receiver<SignalingEvent>,
    identity: Member,
    conn: Connection,
}

impl SignalingClient {
    /// Connect, present `token`, and wait for the relay's verdict.
    ///
    /// # Errors
    /// Transport failures, a refused credential, or no reply within
    /// `handshake_timeout`.
    pub fn connect(
        settings: &ClientTransportSettings,
        token: &str,
        log: Arc<dyn LogSink>,
    ) -> Result<Self, SignalingClientError> {
        let tcp = TcpStream::connect(&settings.server_addr)?;
        let conn = match &settings.tls {
            Some((cfg, domain)) => {
                Connection::tls_client(tcp, Arc::clone(cfg), domain, settings.poll_interval)?
            }
            None => Connection::plain(tcp, settings.poll_interval)?,
        };

        let (out_tx, out_rx) = mpsc::channel::<ToClient>();
        let (ev_tx, ev_rx) = mpsc::channel::<SignalingEvent>();

        conn.spawn_writer("signaling-writer".into(), out_rx, log.clone())?;
        let close_tx = ev_tx.clone();
        conn.spawn_reader(
            "signaling-reader".into(),
            settings.max_frame_len,
            log.clone(),
            move |msg| ev_tx.send(SignalingEvent::Msg(msg)).is_ok(),
            move || {
                let _ = close_tx.send(SignalingEvent::Disconnected);
            },
        )?;

        let sender = SignalingSender { tx: out_tx };
        sender.send(SignalingMsg::Authenticate {
            token: token.to_owned(),
        })?;

        let identity = match ev_rx.recv_timeout(settings.handshake_timeout) {
            Ok(SignalingEvent::Msg(SignalingMsg::AuthOk { user_id, username })) => {
                Member { user_id, username }
            }
            Ok(SignalingEvent::Msg(SignalingMsg::AuthErr { code })) => {
                sink_warn!(log, "relay refused credentials (code {})", code);
                conn.shutdown();
                return Err(SignalingClientError::AuthRefused { code });
            }
            Ok(SignalingEvent::Msg(other)) => {
                conn.shutdown();
                return Err(SignalingClientError::UnexpectedHandshake(other.name()));
            }
            Ok(SignalingEvent::Disconnected) | Err(RecvTimeoutError::Disconnected) => {
                return Err(SignalingClientError::Disconnected);
            }
            Err(RecvTimeoutError::Timeout) => {
                conn.shutdown();
                return Err(SignalingClientError::HandshakeTimeout);
            }
        };

        sink_info!(
            log,
            "connected to {} as {} ({})",
            settings.server_addr,
            identity.user_id,
            identity.username
        );

        Ok(Self {
            sender,
            events: ev_rx,
            identity,
            conn,
        })
    }

    pub fn identity(&self) -> &Member {
        &self.identity
    }

    pub fn sender(&self) -> SignalingSender {
        self.sender.clone()
    }

    pub fn events(&self) -> &Receiver<SignalingEvent> {
        &self.events
    }

    /// Split into the pieces the client runtime owns.
    pub fn into_parts(self) -> (SignalingSender, Receiver<SignalingEvent>, Member) {
        (self.sender, self.events, self.identity)
    }

    pub fn disconnect(&self) {
        self.sender.close();
        self.conn.shutdown();
    }
}
