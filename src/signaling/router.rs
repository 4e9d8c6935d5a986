use std::collections::HashMap;
use std::sync::Arc;

use crate::log::{LogSink, NoopLogSink};
use crate::signaling::protocol::SignalingMsg;
use crate::signaling::server_engine::ServerEngine;
use crate::signaling::types::{ClientId, OutgoingMsg, ToClient};

/// Router glues the ServerEngine state machine to per-client outboxes.
pub struct Router {
    engine: ServerEngine,
    outboxes: HashMap<ClientId, Vec<ToClient>>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::with_log(Arc::new(NoopLogSink))
    }

    pub fn with_log(log: Arc<dyn LogSink>) -> Self {
        Self::with_engine(ServerEngine::with_log(log))
    }

    pub fn with_engine(engine: ServerEngine) -> Self {
        Self {
            engine,
            outboxes: HashMap::new(),
        }
    }

    /// Register a new client with this Router.
    pub fn register_client(&mut self, client_id: ClientId) {
        self.outboxes.entry(client_id).or_default();
    }

    /// Unregister a client:
    /// - removes its outbox
    /// - lets the engine clean up presence/rooms and emit any notifications.
    pub fn unregister_client(&mut self, client_id: ClientId) {
        self.outboxes.remove(&client_id);

        for out_msg in self.engine.handle_disconnect(client_id) {
            self.enqueue(out_msg);
        }
    }

    /// Main entrypoint: handle a message coming *from* a client.
    pub fn handle_from_client(&mut self, from_cid: ClientId, msg: SignalingMsg) {
        for out_msg in self.engine.handle(from_cid, msg) {
            self.enqueue(out_msg);
        }
    }

    /// Drain the messages queued for a client, dropping close markers.
    /// Mostly useful in tests.
    pub fn take_outgoing_for(&mut self, client_id: ClientId) -> Vec<SignalingMsg> {
        self.outboxes
            .get_mut(&client_id)
            .map(std::mem::take)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| match item {
                ToClient::Msg(msg) => Some(msg),
                ToClient::Close => None,
            })
            .collect()
    }

    /// Whether a close is queued for this client.
    pub fn close_pending_for(&self, client_id: ClientId) -> bool {
        self.outboxes
            .get(&client_id)
            .is_some_and(|q| q.contains(&ToClient::Close))
    }

    /// Drain all pending outgoing items for all clients.
    pub fn drain_all_outgoing(&mut self) -> Vec<(ClientId, ToClient)> {
        let mut result = Vec::new();
        for (cid, queue) in &mut self.outboxes {
            for item in queue.drain(..) {
                result.push((*cid, item));
            }
        }
        result
    }

    pub fn engine(&self) -> &ServerEngine {
        &self.engine
    }

    fn enqueue(&mut self, out_msg: OutgoingMsg) {
        // Messages for clients that are already gone are dropped.
        let Some(queue) = self.outboxes.get_mut(&out_msg.client_id_target) else {
            return;
        };
        queue.push(ToClient::Msg(out_msg.msg));
        if out_msg.close_after {
            queue.push(ToClient::Close);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn auth_join_and_offer_are_routed() {
        let mut router = Router::new();
        router.register_client(1);
        router.register_client(2);

        router.handle_from_client(1, SignalingMsg::Authenticate { token: "u1:alice".into() });
        router.handle_from_client(2, SignalingMsg::Authenticate { token: "u2:bob".into() });
        assert!(matches!(
            router.take_outgoing_for(1)[..],
            [SignalingMsg::AuthOk { .. }]
        ));
        router.take_outgoing_for(2);

        router.handle_from_client(
            1,
            SignalingMsg::Offer {
                from: String::new(),
                to: "u2".into(),
                room_id: None,
                sdp: "v=0\r\n".into(),
                tracks: vec![],
            },
        );
        assert!(router.take_outgoing_for(1).is_empty());
        match &router.take_outgoing_for(2)[..] {
            [SignalingMsg::Offer { from, sdp, .. }] => {
                assert_eq!(from, "u1");
                assert_eq!(sdp, "v=0\r\n");
            }
            other => panic!("expected forwarded Offer, got {other:?}"),
        }
    }

    #[test]
    fn refused_auth_queues_close_after_error() {
        let mut router = Router::new();
        router.register_client(7);
        router.handle_from_client(7, SignalingMsg::Authenticate { token: String::new() });
        assert!(router.close_pending_for(7));
        let items = router.drain_all_outgoing();
        assert!(matches!(items[0], (7, ToClient::Msg(SignalingMsg::AuthErr { .. }))));
        assert_eq!(items[1], (7, ToClient::Close));
    }

    #[test]
    fn unregister_notifies_room_members() {
        let mut router = Router::new();
        for (cid, token) in [(1, "u1:alice"), (2, "u2:bob")] {
            router.register_client(cid);
            router.handle_from_client(cid, SignalingMsg::Authenticate { token: token.into() });
            router.handle_from_client(cid, SignalingMsg::JoinRoom { room_id: "r".into() });
        }
        router.drain_all_outgoing();

        router.unregister_client(2);
        assert_eq!(
            router.take_outgoing_for(1),
            vec![SignalingMsg::PeerLeft {
                room_id: "r".into(),
                user_id: "u2".into(),
                username: "bob".into(),
            }]
        );
        assert!(router.drain_all_outgoing().is_empty());
    }
}
