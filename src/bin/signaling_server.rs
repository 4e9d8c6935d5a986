//! The relay binary. Loads its config, starts the file logger and serves
//! until the listener fails.

use std::sync::Arc;
use std::{env, process};

use meshrtc::config::Config;
use meshrtc::log::LogSink;
use meshrtc::log::logger::Logger;
use meshrtc::signaling::run::run_signaling_server;

const LOG_QUEUE_CAP: usize = 10_000;

fn main() {
    // Supported:
    //   signaling_server                 -> relay_default.conf, else built-in defaults
    //   signaling_server path/to/relay.conf
    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => Config::load(path).unwrap_or_else(|e| {
            eprintln!("Error loading config {path}: {e}");
            process::exit(1);
        }),
        None => Config::load_first(&["relay_default.conf"]).unwrap_or_else(|e| {
            eprintln!("No relay config ({e}); using defaults.");
            Config::empty()
        }),
    };

    let logger = Logger::start_server(LOG_QUEUE_CAP, &config);
    let log: Arc<dyn LogSink> = Arc::new(logger.handle());
    eprintln!("Logging to {}", logger.file_path().display());

    if let Err(e) = run_signaling_server(&config, log) {
        eprintln!("signaling server error: {e}");
        process::exit(1);
    }
}
