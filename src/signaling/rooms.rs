use std::collections::HashMap;

use crate::signaling::protocol::{Member, RoomId, UserId};
use crate::signaling::types::ClientId;

/// Group voice rooms and per-user private rooms share one registry but never
/// one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomKey {
    Group(RoomId),
    Private(UserId),
}

#[derive(Debug, Default)]
struct Room {
    /// Connections in join order.
    members: Vec<(ClientId, Member)>,
}

impl Room {
    fn has_client(&self, client_id: ClientId) -> bool {
        self.members.iter().any(|(c, _)| *c == client_id)
    }

    fn has_user(&self, user_id: &str) -> bool {
        self.members.iter().any(|(_, m)| m.user_id == user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The connection was already in the room; nothing changed.
    AlreadyJoined,
    /// Added. `first_for_user` is false when another connection of the same
    /// user was already present.
    Joined { first_for_user: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub member: Member,
    /// No other connection of this user remains in the room.
    pub last_for_user: bool,
    /// The room reached zero connections and was dropped.
    pub room_destroyed: bool,
}

/// Reference-counted room registry: a room exists exactly while at least one
/// connection is in it.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomKey, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&mut self, key: RoomKey, client_id: ClientId, member: Member) -> JoinOutcome {
        let room = self.rooms.entry(key).or_default();
        if room.has_client(client_id) {
            return JoinOutcome::AlreadyJoined;
        }
        let first_for_user = !room.has_user(&member.user_id);
        room.members.push((client_id, member));
        JoinOutcome::Joined { first_for_user }
    }

    /// `None` if the connection was not in the room.
    pub fn leave(&mut self, key: &RoomKey, client_id: ClientId) -> Option<LeaveOutcome> {
        let room = self.rooms.get_mut(key)?;
        let idx = room.members.iter().position(|(c, _)| *c == client_id)?;
        let (_, member) = room.members.remove(idx);
        let last_for_user = !room.has_user(&member.user_id);
        let room_destroyed = room.members.is_empty();
        if room_destroyed {
            self.rooms.remove(key);
        }
        Some(LeaveOutcome {
            member,
            last_for_user,
            room_destroyed,
        })
    }

    /// Remove a connection from every room it is in.
    pub fn leave_all(&mut self, client_id: ClientId) -> Vec<(RoomKey, LeaveOutcome)> {
        let keys: Vec<RoomKey> = self
            .rooms
            .iter()
            .filter(|(_, room)| room.has_client(client_id))
            .map(|(key, _)| key.clone())
            .collect();

        keys.into_iter()
            .filter_map(|key| {
                let outcome = self.leave(&key, client_id)?;
                Some((key, outcome))
            })
            .collect()
    }

    /// Members of a room, one entry per user, in first-join order.
    pub fn roster(&self, key: &RoomKey) -> Vec<Member> {
        let mut out: Vec<Member> = Vec::new();
        if let Some(room) = self.rooms.get(key) {
            for (_, m) in &room.members {
                if !out.iter().any(|o| o.user_id == m.user_id) {
                    out.push(m.clone());
                }
            }
        }
        out
    }

    pub fn clients_in(&self, key: &RoomKey) -> Vec<ClientId> {
        self.rooms
            .get(key)
            .map(|room| room.members.iter().map(|(c, _)| *c).collect())
            .unwrap_or_default()
    }

    pub fn contains_client(&self, key: &RoomKey, client_id: ClientId) -> bool {
        self.rooms
            .get(key)
            .is_some_and(|room| room.has_client(client_id))
    }

    pub fn contains_user(&self, key: &RoomKey, user_id: &str) -> bool {
        self.rooms.get(key).is_some_and(|room| room.has_user(user_id))
    }

    /// Number of live connections in a room (its reference count).
    pub fn connection_count(&self, key: &RoomKey) -> usize {
        self.rooms.get(key).map_or(0, |room| room.members.len())
    }

    pub fn exists(&self, key: &RoomKey) -> bool {
        self.rooms.contains_key(key)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn group(id: &str) -> RoomKey {
        RoomKey::Group(id.into())
    }

    #[test]
    fn room_lives_exactly_while_occupied() {
        let mut reg = RoomRegistry::new();
        let alice = Member::new("u1", "alice");
        assert!(!reg.exists(&group("r1")));

        assert_eq!(
            reg.join(group("r1"), 1, alice.clone()),
            JoinOutcome::Joined { first_for_user: true }
        );
        assert_eq!(reg.join(group("r1"), 1, alice), JoinOutcome::AlreadyJoined);
        assert_eq!(reg.connection_count(&group("r1")), 1);

        let out = reg.leave(&group("r1"), 1).unwrap();
        assert!(out.last_for_user && out.room_destroyed);
        assert!(!reg.exists(&group("r1")));
        assert!(reg.leave(&group("r1"), 1).is_none());
    }

    #[test]
    fn roster_is_per_user_across_connections() {
        let mut reg = RoomRegistry::new();
        reg.join(group("r"), 1, Member::new("u1", "alice"));
        reg.join(group("r"), 2, Member::new("u2", "bob"));
        assert_eq!(
            reg.join(group("r"), 3, Member::new("u1", "alice")),
            JoinOutcome::Joined { first_for_user: false }
        );

        let ids: Vec<_> = reg.roster(&group("r")).into_iter().map(|m| m.user_id).collect();
        assert_eq!(ids, vec!["u1", "u2"]);

        let out = reg.leave(&group("r"), 1).unwrap();
        assert!(!out.last_for_user);
        assert!(reg.contains_user(&group("r"), "u1"));
    }

    #[test]
    fn leave_all_covers_private_and_group_rooms() {
        let mut reg = RoomRegistry::new();
        let bob = Member::new("u2", "bob");
        reg.join(RoomKey::Private("u2".into()), 5, bob.clone());
        reg.join(group("a"), 5, bob.clone());
        reg.join(group("b"), 5, bob);
        reg.join(group("b"), 6, Member::new("u3", "carol"));

        let mut left = reg.leave_all(5);
        left.sort_by_key(|(k, _)| format!("{k:?}"));
        assert_eq!(left.len(), 3);
        assert_eq!(reg.room_count(), 1);
        assert_eq!(reg.clients_in(&group("b")), vec![6]);
    }
}
