use std::fmt;
use std::time::{Duration, Instant};

/// Connection-health indicator shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Health {
    Connected,
    /// No pong for two ping intervals.
    Degraded,
    Disconnected,
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connected => "connected",
            Self::Degraded => "degraded",
            Self::Disconnected => "disconnected",
        })
    }
}

/// Tracks keepalive pings and derives `Health` from pong arrival.
#[derive(Debug)]
pub struct HealthMonitor {
    interval: Duration,
    last_ping: Option<Instant>,
    last_pong: Instant,
    next_nonce: u64,
    health: Health,
}

impl HealthMonitor {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_ping: None,
            last_pong: now,
            next_nonce: 1,
            health: Health::Connected,
        }
    }

    pub fn health(&self) -> Health {
        self.health
    }

    /// Nonce to send if a ping is due.
    pub fn ping_due(&mut self, now: Instant) -> Option<u64> {
        if self.health == Health::Disconnected {
            return None;
        }
        let due = self
            .last_ping
            .is_none_or(|t| now.saturating_duration_since(t) >= self.interval);
        if !due {
            return None;
        }
        self.last_ping = Some(now);
        let nonce = self.next_nonce;
        self.next_nonce = self.next_nonce.wrapping_add(1);
        Some(nonce)
    }

    /// Any pong counts as life. Returns the new health if it changed.
    pub fn on_pong(&mut self, now: Instant) -> Option<Health> {
        self.last_pong = now;
        self.set(Health::Connected)
    }

    /// Re-evaluate at a tick. Returns the new health if it changed.
    pub fn evaluate(&mut self, now: Instant) -> Option<Health> {
        if self.health == Health::Disconnected {
            return None;
        }
        if now.saturating_duration_since(self.last_pong) > self.interval * 2 {
            self.set(Health::Degraded)
        } else {
            None
        }
    }

    pub fn mark_disconnected(&mut self) -> Option<Health> {
        self.set(Health::Disconnected)
    }

    fn set(&mut self, health: Health) -> Option<Health> {
        if self.health == health || self.health == Health::Disconnected {
            return None;
        }
        self.health = health;
        Some(health)
    }
}
