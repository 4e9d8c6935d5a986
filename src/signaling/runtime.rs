use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};

use crate::log::LogSink;
use crate::signaling::router::Router;
use crate::signaling::server_event::ServerEvent;
use crate::signaling::types::{ClientId, ToClient};
use crate::{sink_debug, sink_info, sink_warn};

/// Central server loop: owns Router + maps client_id -> Sender<ToClient>.
///
/// Returns when every event sender is gone.
pub fn run_server_loop(mut router: Router, log: Arc<dyn LogSink>, rx: Receiver<ServerEvent>) {
    use ServerEvent::*;

    let mut clients: HashMap<ClientId, Sender<ToClient>> = HashMap::new();

    while let Ok(ev) = rx.recv() {
        match ev {
            RegisterClient {
                client_id,
                to_client,
            } => {
                router.register_client(client_id);
                clients.insert(client_id, to_client);

                sink_info!(
                    log,
                    "registered client {} in server loop (now {} clients)",
                    client_id,
                    clients.len()
                );
            }

            MsgFromClient { client_id, msg } => {
                sink_debug!(log, "MsgFromClient from {}: {}", client_id, msg.name());
                router.handle_from_client(client_id, msg);
            }

            Disconnected { client_id } => {
                if clients.remove(&client_id).is_some() {
                    sink_info!(log, "client {} disconnected (transport)", client_id);
                    router.unregister_client(client_id);
                }
            }
        }

        // Fan-out is per recipient and unordered across recipients.
        for (target, item) in router.drain_all_outgoing() {
            match clients.get(&target) {
                Some(tx) => {
                    if tx.send(item).is_err() {
                        sink_warn!(
                            log,
                            "failed to deliver message to client {} (channel closed)",
                            target
                        );
                    }
                }
                None => {
                    sink_warn!(log, "no client {} to deliver outgoing message", target);
                }
            }
        }
    }

    sink_info!(
        log,
        "ServerEvent channel closed; server loop shutting down ({} clients left)",
        clients.len()
    );
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use crate::log::NoopLogSink;
    use crate::signaling::protocol::SignalingMsg;

    #[test]
    fn server_loop_authenticates_and_replies() {
        let (ev_tx, ev_rx) = mpsc::channel::<ServerEvent>();
        let log: Arc<dyn LogSink> = Arc::new(NoopLogSink);
        let handle = thread::spawn(move || run_server_loop(Router::new(), log, ev_rx));

        let (to_client_tx, to_client_rx) = mpsc::channel::<ToClient>();
        ev_tx
            .send(ServerEvent::RegisterClient {
                client_id: 1,
                to_client: to_client_tx,
            })
            .unwrap();
        ev_tx
            .send(ServerEvent::MsgFromClient {
                client_id: 1,
                msg: SignalingMsg::Authenticate {
                    token: "u1:alice".into(),
                },
            })
            .unwrap();

        let item = to_client_rx
            .recv_timeout(Duration::from_millis(500))
            .expect("expected a message from server");
        assert_eq!(
            item,
            ToClient::Msg(SignalingMsg::AuthOk {
                user_id: "u1".into(),
                username: "alice".into(),
            })
        );

        ev_tx.send(ServerEvent::Disconnected { client_id: 1 }).unwrap();
        drop(ev_tx);
        handle.join().unwrap();
    }
}
