#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]
//! In-process mesh: every client talks to one `Router` through a
//! `RecordingChannel`, and `pump` shuttles messages until nothing moves.

use std::sync::Arc;
use std::time::{Duration, Instant};

use meshrtc::client::{ClientCommand, ClientEvent, ClientSettings, MeshClient};
use meshrtc::log::NoopLogSink;
use meshrtc::media::SyntheticMediaDevices;
use meshrtc::peer::{PeerOrchestrator, SdpPeerConnectionFactory};
use meshrtc::signaling::protocol::{Member, SignalingMsg};
use meshrtc::signaling::router::Router;
use meshrtc::signaling::types::ClientId;
use meshrtc::signaling_client::RecordingChannel;

const MAX_ROUNDS: usize = 200;

pub struct Node {
    pub cid: ClientId,
    pub client: MeshClient,
    pub channel: Arc<RecordingChannel>,
    pub devices: Arc<SyntheticMediaDevices>,
    pub events: Vec<ClientEvent>,
    pub online: bool,
}

impl Node {
    pub fn voice_peers(&self) -> &PeerOrchestrator {
        self.client.voice().peers().expect("in a room")
    }

    pub fn call_peers(&self) -> &PeerOrchestrator {
        self.client.call().peers()
    }
}

pub struct Mesh {
    pub router: Router,
    pub nodes: Vec<Node>,
    next_cid: ClientId,
    pub now: Instant,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            nodes: Vec::new(),
            next_cid: 1,
            now: Instant::now(),
        }
    }

    /// Connect and authenticate `user_id`; returns its index.
    pub fn connect(&mut self, user_id: &str) -> usize {
        self.connect_with(user_id, ClientSettings::default())
    }

    pub fn connect_with(&mut self, user_id: &str, settings: ClientSettings) -> usize {
        let cid = self.next_cid;
        self.next_cid += 1;
        self.router.register_client(cid);
        self.router.handle_from_client(
            cid,
            SignalingMsg::Authenticate {
                token: format!("{user_id}:{user_id}"),
            },
        );
        let reply = self.router.take_outgoing_for(cid);
        assert!(
            matches!(reply.as_slice(), [SignalingMsg::AuthOk { .. }]),
            "auth failed: {reply:?}"
        );

        let channel = Arc::new(RecordingChannel::new());
        let devices = Arc::new(SyntheticMediaDevices::new());
        let client = MeshClient::new(
            Member::new(user_id, user_id),
            &settings,
            devices.clone(),
            Arc::new(SdpPeerConnectionFactory::with_base_port("127.0.0.1", 40_000 + cid as u16 * 100)),
            channel.clone(),
            Arc::new(NoopLogSink),
        );
        self.nodes.push(Node {
            cid,
            client,
            channel,
            devices,
            events: Vec::new(),
            online: true,
        });
        self.nodes.len() - 1
    }

    pub fn command(&mut self, idx: usize, cmd: ClientCommand) {
        self.nodes[idx].client.handle_command(cmd);
        self.collect();
    }

    pub fn join(&mut self, idx: usize, room: &str) {
        self.command(
            idx,
            ClientCommand::Join {
                room_id: room.into(),
                video: false,
            },
        );
    }

    pub fn call(&mut self, idx: usize, target: &str, video: bool) {
        self.command(
            idx,
            ClientCommand::Call {
                user_id: target.into(),
                video,
            },
        );
    }

    /// Move messages client → relay → client until quiescent.
    pub fn pump(&mut self) {
        for _ in 0..MAX_ROUNDS {
            let mut moved = false;
            for node in self.nodes.iter().filter(|n| n.online) {
                for msg in node.channel.take() {
                    self.router.handle_from_client(node.cid, msg);
                    moved = true;
                }
            }
            for node in self.nodes.iter_mut().filter(|n| n.online) {
                for msg in self.router.take_outgoing_for(node.cid) {
                    node.client.handle_signaling(msg, self.now);
                    moved = true;
                }
            }
            self.collect();
            if !moved {
                return;
            }
        }
        panic!("mesh did not settle");
    }

    /// Deliver only what the relay already queued for `idx`.
    pub fn deliver_to(&mut self, idx: usize) {
        let node = &mut self.nodes[idx];
        for msg in self.router.take_outgoing_for(node.cid) {
            node.client.handle_signaling(msg, self.now);
        }
        self.collect();
    }

    /// Forward only what `idx` sent so far.
    pub fn flush_from(&mut self, idx: usize) {
        let node = &self.nodes[idx];
        for msg in node.channel.take() {
            self.router.handle_from_client(node.cid, msg);
        }
    }

    /// Drop the connection the way a dead TCP stream would.
    pub fn disconnect(&mut self, idx: usize) {
        let node = &mut self.nodes[idx];
        node.online = false;
        node.channel.disconnect();
        self.router.unregister_client(node.cid);
        node.client.on_disconnected();
        self.collect();
    }

    pub fn tick(&mut self, idx: usize, after: Duration) {
        self.now += after;
        self.nodes[idx].client.tick(self.now);
        self.collect();
    }

    pub fn take_events(&mut self, idx: usize) -> Vec<ClientEvent> {
        std::mem::take(&mut self.nodes[idx].events)
    }

    fn collect(&mut self) {
        for node in &mut self.nodes {
            let ev = node.client.take_events();
            node.events.extend(ev);
        }
    }
}
