#![allow(clippy::unwrap_used, clippy::expect_used)]
mod common;

use common::Mesh;
use meshrtc::client::{ClientCommand, ClientEvent};
use meshrtc::peer::{MediaSlot, PeerUpdate, SignalingState};
use meshrtc::voice::VoiceEvent;

fn stable(mesh: &Mesh, idx: usize, peer: &str) -> bool {
    mesh.nodes[idx].voice_peers().link_state(peer) == Some(SignalingState::Stable)
}

#[test]
fn three_members_form_a_full_mesh() {
    let mut mesh = Mesh::new();
    let a = mesh.connect("alice");
    let b = mesh.connect("bob");
    let c = mesh.connect("carol");
    for idx in [a, b, c] {
        mesh.join(idx, "lobby");
        mesh.pump();
    }

    assert_eq!(mesh.nodes[a].voice_peers().peers(), vec!["bob", "carol"]);
    assert_eq!(mesh.nodes[b].voice_peers().peers(), vec!["alice", "carol"]);
    assert_eq!(mesh.nodes[c].voice_peers().peers(), vec!["alice", "bob"]);
    for (idx, peer) in [(a, "bob"), (a, "carol"), (b, "alice"), (b, "carol"), (c, "alice"), (c, "bob")] {
        assert!(stable(&mesh, idx, peer), "{idx} -> {peer}");
        let media = mesh.nodes[idx].voice_peers().classifier().media_for(peer).unwrap();
        assert!(media.voice.is_some());
        assert!(media.camera.is_none());
    }

    // carol answered both offers; she never offered
    let roster: Vec<_> = mesh.nodes[c]
        .client
        .voice()
        .roster()
        .iter()
        .map(|m| m.user_id.clone())
        .collect();
    assert_eq!(roster.len(), 3);
    assert!(roster.contains(&"alice".to_string()));
}

#[test]
fn candidates_sent_before_the_offer_is_answered_are_applied() {
    let mut mesh = Mesh::new();
    let a = mesh.connect("alice");
    let b = mesh.connect("bob");
    mesh.join(a, "lobby");
    mesh.pump();
    mesh.join(b, "lobby");
    mesh.pump();

    // each side gathered one host candidate and the other applied it
    let at_alice = mesh.nodes[a].voice_peers().applied_candidates("bob");
    let at_bob = mesh.nodes[b].voice_peers().applied_candidates("alice");
    assert_eq!(at_alice.len(), 1);
    assert_eq!(at_bob.len(), 1);
    assert!(at_bob[0].candidate.starts_with("candidate:"));
    assert_eq!(mesh.nodes[b].voice_peers().queued_candidates("alice"), 0);
}

#[test]
fn camera_toggle_renegotiates_every_link() {
    let mut mesh = Mesh::new();
    let a = mesh.connect("alice");
    let b = mesh.connect("bob");
    let c = mesh.connect("carol");
    for idx in [a, b, c] {
        mesh.join(idx, "lobby");
        mesh.pump();
    }
    mesh.take_events(b);

    mesh.command(a, ClientCommand::Camera);
    mesh.pump();
    assert!(mesh.nodes[a].client.voice().state().camera);
    for idx in [b, c] {
        assert!(stable(&mesh, idx, "alice"));
        let media = mesh.nodes[idx].voice_peers().classifier().media_for("alice").unwrap();
        assert!(media.camera.is_some());
        assert!(media.screen.is_none());
    }
    let added = mesh.take_events(b).into_iter().any(|e| {
        matches!(
            e,
            ClientEvent::Voice(VoiceEvent::Media(PeerUpdate::TrackAdded {
                ref peer,
                slot: MediaSlot::Camera,
                ..
            })) if peer == "alice"
        )
    });
    assert!(added);

    mesh.command(a, ClientCommand::Camera);
    mesh.pump();
    let media = mesh.nodes[b].voice_peers().classifier().media_for("alice").unwrap();
    assert!(media.camera.is_none());
    assert!(media.voice.is_some());
}

#[test]
fn screen_share_is_classified_as_screen() {
    let mut mesh = Mesh::new();
    let a = mesh.connect("alice");
    let b = mesh.connect("bob");
    mesh.join(a, "lobby");
    mesh.pump();
    mesh.join(b, "lobby");
    mesh.pump();

    mesh.command(b, ClientCommand::Screen);
    mesh.pump();
    let media = mesh.nodes[a].voice_peers().classifier().media_for("bob").unwrap();
    assert!(media.screen.is_some());
    assert!(media.camera.is_none());
}

#[test]
fn leaving_member_is_dropped_by_the_rest() {
    let mut mesh = Mesh::new();
    let a = mesh.connect("alice");
    let b = mesh.connect("bob");
    let c = mesh.connect("carol");
    for idx in [a, b, c] {
        mesh.join(idx, "lobby");
        mesh.pump();
    }

    mesh.command(c, ClientCommand::Leave);
    mesh.pump();
    assert!(mesh.nodes[c].client.voice().room_id().is_none());
    for idx in [a, b] {
        let peers = mesh.nodes[idx].voice_peers();
        assert!(!peers.peers().contains(&"carol".to_string()));
        assert!(peers.classifier().media_for("carol").is_none());
    }
    assert!(stable(&mesh, a, "bob"));

    // rejoining builds fresh links
    mesh.join(c, "lobby");
    mesh.pump();
    assert!(stable(&mesh, a, "carol"));
    assert!(stable(&mesh, c, "bob"));
}

#[test]
fn dead_connection_reads_as_a_leave() {
    let mut mesh = Mesh::new();
    let a = mesh.connect("alice");
    let b = mesh.connect("bob");
    mesh.join(a, "lobby");
    mesh.pump();
    mesh.join(b, "lobby");
    mesh.pump();

    mesh.disconnect(b);
    mesh.pump();
    assert!(mesh.nodes[a].voice_peers().peers().is_empty());
    assert!(mesh.nodes[b].events.contains(&ClientEvent::Disconnected));
    assert_eq!(mesh.nodes[b].devices.live_track_count(), 0);
}

#[test]
fn newcomer_and_existing_member_interleave() {
    // bob joins while alice's join is still in flight at the relay
    let mut mesh = Mesh::new();
    let a = mesh.connect("alice");
    let b = mesh.connect("bob");
    mesh.join(a, "lobby");
    mesh.join(b, "lobby");
    mesh.flush_from(a);
    mesh.flush_from(b);
    mesh.deliver_to(b);
    mesh.pump();

    assert!(stable(&mesh, a, "bob"));
    assert!(stable(&mesh, b, "alice"));
    assert_eq!(mesh.nodes[b].voice_peers().link("alice").unwrap().role(), meshrtc::peer::LinkRole::Answerer);
}

#[test]
fn whisper_reaches_the_room() {
    let mut mesh = Mesh::new();
    let a = mesh.connect("alice");
    let b = mesh.connect("bob");
    mesh.join(a, "lobby");
    mesh.pump();
    mesh.join(b, "lobby");
    mesh.pump();
    mesh.take_events(b);

    mesh.command(a, ClientCommand::Whisper(Some("bob".into())));
    mesh.pump();
    assert!(mesh.take_events(b).contains(&ClientEvent::Voice(VoiceEvent::Whisper {
        from: "alice".into(),
        target: Some("bob".into()),
    })));
}

#[test]
fn simultaneous_renegotiation_leaves_the_link_waiting() {
    // both sides offer on the same link; each ignores the other's offer
    // and no rollback exists, so the link stays in have-local-offer
    let mut mesh = Mesh::new();
    let a = mesh.connect("alice");
    let b = mesh.connect("bob");
    mesh.join(a, "lobby");
    mesh.pump();
    mesh.join(b, "lobby");
    mesh.pump();

    mesh.command(a, ClientCommand::Camera);
    mesh.command(b, ClientCommand::Camera);
    mesh.pump();
    for (idx, peer) in [(a, "bob"), (b, "alice")] {
        let peers = mesh.nodes[idx].voice_peers();
        assert_eq!(peers.link_state(peer), Some(SignalingState::HaveLocalOffer));
        assert!(peers.classifier().media_for(peer).unwrap().camera.is_none());
    }

    // later changes are deferred behind the unanswered offer
    mesh.command(a, ClientCommand::Screen);
    assert!(mesh.nodes[a].channel.sent().is_empty());
    mesh.pump();
    assert_eq!(
        mesh.nodes[a].voice_peers().link_state("bob"),
        Some(SignalingState::HaveLocalOffer)
    );
    assert!(mesh.nodes[b].voice_peers().classifier().media_for("alice").unwrap().screen.is_none());
}
