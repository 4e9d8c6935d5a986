use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, ServerConfig, ServerConnection, StreamOwned};

use crate::log::LogSink;
use crate::signaling::protocol::{FrameDecoder, FrameError, SignalingMsg, encode_frame};
use crate::signaling::server_event::ServerEvent;
use crate::signaling::types::{ClientId, ToClient};
use crate::{sink_debug, sink_warn};

/// Anything a signaling connection can run over: plain TCP or a TLS stream.
pub trait SignalingStream: Read + Write + Send {}
impl<T: Read + Write + Send> SignalingStream for T {}

/// One established connection. Reader and writer threads share the stream
/// under a mutex; the reader only ever holds it for one timed-out read.
pub struct Connection {
    stream: Arc<Mutex<Box<dyn SignalingStream>>>,
    tcp: TcpStream,
}

impl Connection {
    /// `poll_interval` bounds how long the reader holds the stream per read.
    pub fn plain(tcp: TcpStream, poll_interval: Duration) -> io::Result<Self> {
        let inner = tcp.try_clone()?;
        Self::wrap(tcp, Box::new(inner), poll_interval)
    }

    pub fn tls_server(
        tcp: TcpStream,
        config: Arc<ServerConfig>,
        poll_interval: Duration,
    ) -> io::Result<Self> {
        let conn = ServerConnection::new(config).map_err(io::Error::other)?;
        let inner = tcp.try_clone()?;
        Self::wrap(tcp, Box::new(StreamOwned::new(conn, inner)), poll_interval)
    }

    pub fn tls_client(
        tcp: TcpStream,
        config: Arc<ClientConfig>,
        domain: &str,
        poll_interval: Duration,
    ) -> io::Result<Self> {
        let name = ServerName::try_from(domain.to_owned())
            .map_err(|e| io::Error::new(ErrorKind::InvalidInput, format!("bad domain: {e}")))?;
        let conn = ClientConnection::new(config, name).map_err(io::Error::other)?;
        let inner = tcp.try_clone()?;
        Self::wrap(tcp, Box::new(StreamOwned::new(conn, inner)), poll_interval)
    }

    fn wrap(
        tcp: TcpStream,
        stream: Box<dyn SignalingStream>,
        poll_interval: Duration,
    ) -> io::Result<Self> {
        tcp.set_read_timeout(Some(poll_interval))?;
        tcp.set_nodelay(true)?;
        Ok(Self {
            stream: Arc::new(Mutex::new(stream)),
            tcp,
        })
    }

    pub fn peer_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.tcp.peer_addr()
    }

    /// Spawn the reader thread. `on_msg` returns false to stop reading;
    /// `on_close` runs exactly once when the reader exits.
    pub fn spawn_reader<F, C>(
        &self,
        name: String,
        max_frame_len: usize,
        log: Arc<dyn LogSink>,
        mut on_msg: F,
        on_close: C,
    ) -> io::Result<JoinHandle<()>>
    where
        F: FnMut(SignalingMsg) -> bool + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let stream = Arc::clone(&self.stream);
        thread::Builder::new().name(name.clone()).spawn(move || {
            let mut decoder = FrameDecoder::new(max_frame_len);
            let mut buf = [0u8; 4096];
            'read: loop {
                let res = match stream.lock() {
                    Ok(mut guard) => guard.read(&mut buf),
                    Err(_) => break,
                };
                match res {
                    Ok(0) => {
                        sink_debug!(log, "[{}] peer closed the stream", name);
                        break;
                    }
                    Ok(n) => {
                        decoder.extend(&buf[..n]);
                        loop {
                            match decoder.next_msg() {
                                Ok(Some(msg)) => {
                                    if !on_msg(msg) {
                                        break 'read;
                                    }
                                }
                                Ok(None) => break,
                                Err(e) => {
                                    sink_warn!(log, "[{}] frame error in reader: {}", name, e);
                                    break 'read;
                                }
                            }
                        }
                    }
                    Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                        // Let a waiting writer take the stream.
                        thread::sleep(Duration::from_millis(1));
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => {}
                    Err(e) => {
                        sink_debug!(log, "[{}] IO error in reader: {} (kind={:?})", name, e, e.kind());
                        break;
                    }
                }
            }
            on_close();
        })
    }

    /// Spawn the writer thread: drains `rx` until it closes or a `Close`
    /// item arrives, then shuts the socket down (which also ends the reader).
    pub fn spawn_writer(
        &self,
        name: String,
        rx: Receiver<ToClient>,
        log: Arc<dyn LogSink>,
    ) -> io::Result<JoinHandle<()>> {
        let stream = Arc::clone(&self.stream);
        let tcp = self.tcp.try_clone()?;
        thread::Builder::new().name(name.clone()).spawn(move || {
            while let Ok(item) = rx.recv() {
                let msg = match item {
                    ToClient::Msg(msg) => msg,
                    ToClient::Close => break,
                };
                if let Err(e) = write_locked(&stream, &msg) {
                    sink_warn!(log, "[{}] error sending {}: {}", name, msg.name(), e);
                    break;
                }
            }
            let _ = tcp.shutdown(Shutdown::Both);
        })
    }

    /// Shut the socket down from outside the worker threads.
    pub fn shutdown(&self) {
        let _ = self.tcp.shutdown(Shutdown::Both);
    }
}

fn write_locked(
    stream: &Mutex<Box<dyn SignalingStream>>,
    msg: &SignalingMsg,
) -> Result<(), FrameError> {
    let frame = encode_frame(msg)?;
    let mut guard = stream
        .lock()
        .map_err(|_| io::Error::other("stream lock poisoned"))?;
    guard.write_all(&frame)?;
    guard.flush()?;
    Ok(())
}

/// Spawn reader + writer threads for a single accepted client.
///
/// `server_tx` is the Sender<ServerEvent> that talks to the central server loop.
pub fn spawn_connection_threads(
    client_id: ClientId,
    conn: Connection,
    server_tx: Sender<ServerEvent>,
    log: Arc<dyn LogSink>,
    max_frame_len: usize,
) -> io::Result<()> {
    let (to_client_tx, to_client_rx) = mpsc::channel::<ToClient>();

    server_tx
        .send(ServerEvent::RegisterClient {
            client_id,
            to_client: to_client_tx,
        })
        .map_err(|_| io::Error::new(ErrorKind::BrokenPipe, "server loop is gone"))?;

    conn.spawn_writer(format!("conn-{client_id}-writer"), to_client_rx, log.clone())?;

    let msg_tx = server_tx.clone();
    conn.spawn_reader(
        format!("conn-{client_id}-reader"),
        max_frame_len,
        log,
        move |msg| {
            msg_tx
                .send(ServerEvent::MsgFromClient { client_id, msg })
                .is_ok()
        },
        move || {
            let _ = server_tx.send(ServerEvent::Disconnected { client_id });
        },
    )?;

    Ok(())
}
