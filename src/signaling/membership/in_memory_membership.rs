use std::collections::{HashMap, HashSet};

use crate::config::Config;
use crate::signaling::{
    membership::MembershipBackend,
    protocol::{RoomId, UserId},
};

/// Room → allowed users, loaded from the `[Membership]` section:
///
/// ```text
/// [Membership]
/// open_rooms = false
/// raid-night = u1, u2, u3
/// ```
///
/// A room listed nowhere is joinable only when `open_rooms` is set.
#[derive(Debug, Default)]
pub struct InMemoryMembership {
    rooms: HashMap<RoomId, HashSet<UserId>>,
    open_rooms: bool,
}

impl InMemoryMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_member(mut self, room_id: impl Into<RoomId>, user_id: impl Into<UserId>) -> Self {
        self.rooms
            .entry(room_id.into())
            .or_default()
            .insert(user_id.into());
        self
    }

    pub fn with_open_rooms(mut self, open: bool) -> Self {
        self.open_rooms = open;
        self
    }

    pub fn from_config(config: &Config) -> Self {
        let mut m = Self::new().with_open_rooms(
            config
                .get_bool("Membership", "open_rooms")
                .unwrap_or(false),
        );
        for (room_id, users) in config.section("Membership") {
            if room_id == "open_rooms" {
                continue;
            }
            for user in users.split(',').map(str::trim).filter(|u| !u.is_empty()) {
                m = m.with_member(room_id, user);
            }
        }
        m
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl MembershipBackend for InMemoryMembership {
    fn is_member(&self, user_id: &str, room_id: &str) -> bool {
        match self.rooms.get(room_id) {
            Some(users) => users.contains(user_id),
            None => self.open_rooms,
        }
    }
}

/// Dev / test membership: every room admits everyone.
#[derive(Debug, Default)]
pub struct AllowAllMembership;

impl MembershipBackend for AllowAllMembership {
    fn is_member(&self, _user_id: &str, _room_id: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn listed_rooms_are_closed_to_outsiders() {
        let cfg: Config = "[Membership]\nraid = u1, u2\n".parse().unwrap();
        let m = InMemoryMembership::from_config(&cfg);
        assert_eq!(m.room_count(), 1);
        assert!(m.is_member("u1", "raid"));
        assert!(!m.is_member("u3", "raid"));
        assert!(!m.is_member("u1", "unlisted"));
    }

    #[test]
    fn open_rooms_admit_anyone_to_unlisted_rooms() {
        let cfg: Config = "[Membership]\nopen_rooms = true\nraid = u1\n".parse().unwrap();
        let m = InMemoryMembership::from_config(&cfg);
        assert!(m.is_member("u9", "lobby"));
        assert!(!m.is_member("u9", "raid"));
    }
}
