use std::time::Duration;

use crate::config::{Config, ConfigError};
use crate::signaling::settings::DEFAULT_BIND_ADDR;

pub const DEFAULT_PING_INTERVAL_MS: u64 = 5_000;

/// `[Client]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub server_addr: String,
    pub token: String,
    /// Voice room to join right after connecting.
    pub room: Option<String>,
    pub ping_interval: Duration,
    /// `None` when `ring_timeout_secs` is 0 or absent.
    pub ring_timeout: Option<Duration>,
    /// Address put into locally gathered host candidates.
    pub candidate_ip: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_BIND_ADDR.into(),
            token: String::new(),
            room: None,
            ping_interval: Duration::from_millis(DEFAULT_PING_INTERVAL_MS),
            ring_timeout: None,
            candidate_ip: "127.0.0.1".into(),
        }
    }
}

impl ClientSettings {
    /// # Errors
    /// Fails on unparsable numbers.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let ping_ms = config.get_parsed_or("Client", "ping_interval_ms", DEFAULT_PING_INTERVAL_MS)?;
        let ring_secs: u64 = config.get_parsed_or("Client", "ring_timeout_secs", 0)?;
        Ok(Self {
            server_addr: config
                .get_non_empty_or_default("Client", "server_addr", DEFAULT_BIND_ADDR)
                .to_owned(),
            token: config.get_or_default("Client", "token", "").to_owned(),
            room: config.get_non_empty("Client", "room").map(str::to_owned),
            ping_interval: Duration::from_millis(ping_ms.max(1)),
            ring_timeout: (ring_secs > 0).then(|| Duration::from_secs(ring_secs)),
            candidate_ip: config
                .get_non_empty_or_default("Client", "candidate_ip", "127.0.0.1")
                .to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn defaults_when_section_missing() {
        let s = ClientSettings::from_config(&Config::empty()).unwrap();
        assert_eq!(s, ClientSettings::default());
        assert!(s.ring_timeout.is_none());
    }

    #[test]
    fn reads_client_section() {
        let cfg = Config::empty()
            .with("Client", "server_addr", "10.0.0.5:7000")
            .with("Client", "token", "alice:Alice")
            .with("Client", "room", "general")
            .with("Client", "ring_timeout_secs", "30")
            .with("Client", "ping_interval_ms", "250");
        let s = ClientSettings::from_config(&cfg).unwrap();
        assert_eq!(s.server_addr, "10.0.0.5:7000");
        assert_eq!(s.room.as_deref(), Some("general"));
        assert_eq!(s.ring_timeout, Some(Duration::from_secs(30)));
        assert_eq!(s.ping_interval, Duration::from_millis(250));
    }

    #[test]
    fn bad_number_is_an_error() {
        let cfg = Config::empty().with("Client", "ring_timeout_secs", "soon");
        assert!(ClientSettings::from_config(&cfg).is_err());
    }
}
