//! Headless client. Connects to the relay, authenticates with the configured
//! token, optionally joins `[Client] room`, prints events and reads commands
//! from stdin:
//!
//! `join <room> [video]`, `leave`, `call <user> [video]`, `accept`,
//! `decline`, `end`, `camera`, `screen`, `mute`, `deafen`,
//! `whisper [user]`, `quit`.

use std::io::{self, BufRead};
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;
use std::{env, process, thread};

use meshrtc::client::{ClientCommand, ClientSettings, MeshClient, spawn_client};
use meshrtc::config::Config;
use meshrtc::log::LogSink;
use meshrtc::log::logger::Logger;
use meshrtc::media::SyntheticMediaDevices;
use meshrtc::peer::SdpPeerConnectionFactory;
use meshrtc::signaling::settings::RelaySettings;
use meshrtc::signaling::tls::build_signaling_client_config;
use meshrtc::signaling_client::{ClientTransportSettings, SignalingClient};
use meshrtc::tls_utils::TlsSettings;

const LOG_QUEUE_CAP: usize = 10_000;
const TICK: Duration = Duration::from_millis(50);

fn fail(msg: String) -> ! {
    eprintln!("{msg}");
    process::exit(1);
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => Config::load(path).unwrap_or_else(|e| fail(format!("config {path}: {e}"))),
        None => Config::load_first(&["client_default.conf"]).unwrap_or_else(|_| Config::empty()),
    };

    let logger = Logger::start_client(LOG_QUEUE_CAP, &config);
    let log: Arc<dyn LogSink> = Arc::new(logger.handle());

    let settings = ClientSettings::from_config(&config).unwrap_or_else(|e| fail(e.to_string()));
    let relay = RelaySettings::from_config(&config).unwrap_or_else(|e| fail(e.to_string()));
    let tls = TlsSettings::from_config(&config).unwrap_or_else(|e| fail(e.to_string()));

    let mut transport = ClientTransportSettings::plain(settings.server_addr.clone());
    transport.poll_interval = relay.poll_interval;
    transport.max_frame_len = relay.max_frame_len;
    if tls.enabled {
        let cfg = build_signaling_client_config(&tls)
            .unwrap_or_else(|e| fail(format!("TLS setup: {e}")));
        transport.tls = Some((cfg, tls.domain.clone()));
    }

    let client = SignalingClient::connect(&transport, &settings.token, log.clone())
        .unwrap_or_else(|e| fail(format!("connect to {}: {e}", settings.server_addr)));
    let (sender, events, identity) = client.into_parts();
    let sender = Arc::new(sender);

    let mesh = MeshClient::new(
        identity,
        &settings,
        Arc::new(SyntheticMediaDevices::new()),
        Arc::new(SdpPeerConnectionFactory::new(settings.candidate_ip.clone())),
        sender.clone(),
        log,
    );

    let (cmd_tx, cmd_rx) = mpsc::channel::<ClientCommand>();
    let (out_tx, out_rx) = mpsc::channel();
    if let Some(room) = &settings.room {
        let _ = cmd_tx.send(ClientCommand::Join {
            room_id: room.clone(),
            video: false,
        });
    }

    let runtime = spawn_client(mesh, events, cmd_rx, out_tx, TICK)
        .unwrap_or_else(|e| fail(format!("client thread: {e}")));

    let stdin_tx = cmd_tx.clone();
    let _ = thread::Builder::new().name("stdin".into()).spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<ClientCommand>() {
                Ok(cmd) => {
                    let quit = cmd == ClientCommand::Quit;
                    if stdin_tx.send(cmd).is_err() || quit {
                        break;
                    }
                }
                Err(e) => eprintln!("{e}"),
            }
        }
    });
    drop(cmd_tx);

    for ev in out_rx {
        println!("{ev}");
    }
    let _ = runtime.join();
    sender.close();
}
