use std::io;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::client::{ClientCommand, ClientEvent, MeshClient};
use crate::signaling_client::SignalingEvent;

/// Drive `client` until the user quits, the relay goes away or nobody
/// listens to `out` any more. Commands are picked up between signaling
/// events; `tick` bounds how long either waits.
pub fn run_client_loop(
    mut client: MeshClient,
    signaling: Receiver<SignalingEvent>,
    commands: Receiver<ClientCommand>,
    out: Sender<ClientEvent>,
    tick: Duration,
) {
    let mut running = true;
    while running {
        loop {
            match commands.try_recv() {
                Ok(cmd) => {
                    if !client.handle_command(cmd) {
                        running = false;
                        break;
                    }
                }
                Err(TryRecvError::Empty) => break,
                // no more user input: keep serving the relay
                Err(TryRecvError::Disconnected) => break,
            }
        }

        if running {
            match signaling.recv_timeout(tick) {
                Ok(SignalingEvent::Msg(msg)) => client.handle_signaling(msg, Instant::now()),
                Ok(SignalingEvent::Disconnected) | Err(RecvTimeoutError::Disconnected) => {
                    client.on_disconnected();
                    running = false;
                }
                Err(RecvTimeoutError::Timeout) => {}
            }
            client.tick(Instant::now());
        }

        for ev in client.take_events() {
            if out.send(ev).is_err() {
                return;
            }
        }
    }
}

/// Run the loop on a named thread.
pub fn spawn_client(
    client: MeshClient,
    signaling: Receiver<SignalingEvent>,
    commands: Receiver<ClientCommand>,
    out: Sender<ClientEvent>,
    tick: Duration,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("client-loop".into())
        .spawn(move || run_client_loop(client, signaling, commands, out, tick))
}
