use std::time::Duration;

use crate::config::{Config, ConfigError};
use crate::signaling::protocol::MAX_BODY_LEN;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5005";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// `[Relay]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    pub bind_addr: String,
    /// Socket read timeout used by connection reader threads.
    pub poll_interval: Duration,
    pub max_frame_len: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_frame_len: MAX_BODY_LEN,
        }
    }
}

impl RelaySettings {
    /// # Errors
    /// Fails on unparsable numbers.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let poll_ms = config.get_parsed_or("Relay", "poll_interval_ms", DEFAULT_POLL_INTERVAL_MS)?;
        let max_frame_len = config
            .get_parsed_or("Relay", "max_frame_len", MAX_BODY_LEN)?
            .min(MAX_BODY_LEN);
        Ok(Self {
            bind_addr: config
                .get_non_empty_or_default("Relay", "bind_addr", DEFAULT_BIND_ADDR)
                .to_owned(),
            poll_interval: Duration::from_millis(poll_ms.max(1)),
            max_frame_len,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn relay_settings_clamp_frame_len() {
        let cfg = Config::empty()
            .with("Relay", "bind_addr", "0.0.0.0:7000")
            .with("Relay", "max_frame_len", "99999999");
        let s = RelaySettings::from_config(&cfg).unwrap();
        assert_eq!(s.bind_addr, "0.0.0.0:7000");
        assert_eq!(s.max_frame_len, MAX_BODY_LEN);
        assert_eq!(s.poll_interval, Duration::from_millis(DEFAULT_POLL_INTERVAL_MS));
    }
}
