#![allow(clippy::unwrap_used, clippy::expect_used)]
mod common;

use std::time::Duration;

use common::Mesh;
use meshrtc::call::{CallEvent, CallStatus};
use meshrtc::client::{ClientCommand, ClientEvent, ClientSettings};
use meshrtc::peer::SignalingState;

fn status(mesh: &Mesh, idx: usize) -> CallStatus {
    mesh.nodes[idx].client.call().status()
}

fn incoming(mesh: &mut Mesh, idx: usize) -> Option<(String, bool)> {
    mesh.take_events(idx).into_iter().find_map(|e| match e {
        ClientEvent::Call(CallEvent::Incoming { from, is_video, .. }) => Some((from, is_video)),
        _ => None,
    })
}

#[test]
fn video_call_connects_and_classifies_media() {
    let mut mesh = Mesh::new();
    let a = mesh.connect("alice");
    let b = mesh.connect("bob");

    mesh.call(a, "bob", true);
    mesh.pump();
    assert_eq!(status(&mesh, a), CallStatus::Calling);
    assert_eq!(status(&mesh, b), CallStatus::Receiving);
    assert_eq!(incoming(&mut mesh, b), Some(("alice".into(), true)));
    // the caller's candidate waits for the answer side to exist
    assert_eq!(mesh.nodes[b].call_peers().queued_candidates("alice"), 1);

    mesh.command(b, ClientCommand::Accept);
    mesh.pump();
    assert_eq!(status(&mesh, a), CallStatus::InCall);
    assert_eq!(status(&mesh, b), CallStatus::InCall);
    assert_eq!(mesh.nodes[a].call_peers().link_state("bob"), Some(SignalingState::Stable));
    assert_eq!(mesh.nodes[b].call_peers().applied_candidates("alice").len(), 1);
    assert_eq!(mesh.nodes[a].call_peers().applied_candidates("bob").len(), 1);

    for (idx, peer) in [(a, "bob"), (b, "alice")] {
        let media = mesh.nodes[idx].call_peers().classifier().media_for(peer).unwrap();
        assert!(media.voice.is_some());
        assert!(media.camera.is_some());
    }

    mesh.command(a, ClientCommand::End);
    mesh.pump();
    assert_eq!(status(&mesh, a), CallStatus::Idle);
    assert_eq!(status(&mesh, b), CallStatus::Idle);
    assert!(mesh.nodes[b].call_peers().peers().is_empty());
    assert_eq!(mesh.nodes[a].devices.live_track_count(), 0);
    assert_eq!(mesh.nodes[b].devices.live_track_count(), 0);
}

#[test]
fn declined_call_returns_both_sides_to_idle() {
    let mut mesh = Mesh::new();
    let a = mesh.connect("alice");
    let b = mesh.connect("bob");

    mesh.call(a, "bob", false);
    mesh.pump();
    mesh.command(b, ClientCommand::Decline);
    mesh.pump();
    assert_eq!(status(&mesh, a), CallStatus::Idle);
    assert_eq!(status(&mesh, b), CallStatus::Idle);
    assert!(mesh.nodes[a].call_peers().peers().is_empty());
    assert_eq!(mesh.nodes[a].devices.live_track_count(), 0);
    assert!(mesh.router.engine().calls().is_empty());
}

#[test]
fn crossed_calls_keep_the_smaller_id_as_caller() {
    let mut mesh = Mesh::new();
    let a = mesh.connect("alice");
    let b = mesh.connect("bob");

    mesh.call(a, "bob", false);
    mesh.call(b, "alice", false);
    mesh.pump();
    assert_eq!(status(&mesh, a), CallStatus::Calling);
    assert_eq!(status(&mesh, b), CallStatus::Receiving);

    mesh.command(b, ClientCommand::Accept);
    mesh.pump();
    assert_eq!(status(&mesh, a), CallStatus::InCall);
    assert_eq!(status(&mesh, b), CallStatus::InCall);
    assert_eq!(mesh.nodes[b].call_peers().link_state("alice"), Some(SignalingState::Stable));

    // bob's abandoned offer trickled a candidate too; only the answering
    // link's candidate may reach alice's link
    let applied = mesh.nodes[a].call_peers().applied_candidates("bob");
    assert_eq!(applied.len(), 1);
    assert!(applied[0].candidate.contains(" 40201 "));
    assert_eq!(mesh.nodes[b].call_peers().applied_candidates("alice").len(), 1);
}

#[test]
fn third_caller_is_ignored_while_busy() {
    let mut mesh = Mesh::new();
    let a = mesh.connect("alice");
    let b = mesh.connect("bob");
    let c = mesh.connect("carol");

    mesh.call(a, "bob", false);
    mesh.pump();
    mesh.command(b, ClientCommand::Accept);
    mesh.pump();

    mesh.call(c, "bob", false);
    mesh.pump();
    assert_eq!(status(&mesh, b), CallStatus::InCall);
    assert_eq!(mesh.nodes[b].client.call().active().unwrap().peer, "alice");
    assert_eq!(status(&mesh, c), CallStatus::Calling);
}

#[test]
fn camera_during_call_reaches_the_other_side() {
    let mut mesh = Mesh::new();
    let a = mesh.connect("alice");
    let b = mesh.connect("bob");
    mesh.call(a, "bob", false);
    mesh.pump();
    mesh.command(b, ClientCommand::Accept);
    mesh.pump();
    assert!(mesh.nodes[a].call_peers().classifier().media_for("bob").unwrap().camera.is_none());

    mesh.command(b, ClientCommand::Camera);
    mesh.pump();
    let media = mesh.nodes[a].call_peers().classifier().media_for("bob").unwrap();
    assert!(media.camera.is_some());
    assert_eq!(mesh.nodes[b].call_peers().link_state("alice"), Some(SignalingState::Stable));
}

#[test]
fn callee_dropping_off_ends_the_call() {
    let mut mesh = Mesh::new();
    let a = mesh.connect("alice");
    let b = mesh.connect("bob");
    mesh.call(a, "bob", false);
    mesh.pump();
    mesh.command(b, ClientCommand::Accept);
    mesh.pump();

    mesh.disconnect(b);
    mesh.pump();
    assert_eq!(status(&mesh, a), CallStatus::Idle);
    assert_eq!(status(&mesh, b), CallStatus::Idle);
}

#[test]
fn unanswered_call_times_out() {
    let mut mesh = Mesh::new();
    let settings = ClientSettings {
        ring_timeout: Some(Duration::from_secs(30)),
        ..ClientSettings::default()
    };
    let a = mesh.connect_with("alice", settings);
    let b = mesh.connect("bob");
    mesh.call(a, "bob", false);
    mesh.pump();

    mesh.tick(a, Duration::from_secs(31));
    mesh.pump();
    assert_eq!(status(&mesh, a), CallStatus::Idle);
    assert_eq!(status(&mesh, b), CallStatus::Idle);
}

#[test]
fn calling_an_offline_user_rings_until_cancelled() {
    let mut mesh = Mesh::new();
    let a = mesh.connect("alice");
    mesh.call(a, "nobody", false);
    mesh.pump();
    assert_eq!(status(&mesh, a), CallStatus::Calling);

    mesh.command(a, ClientCommand::End);
    mesh.pump();
    assert_eq!(status(&mesh, a), CallStatus::Idle);
}
