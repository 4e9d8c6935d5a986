use std::collections::HashMap;

use crate::signaling::protocol::Member;
use crate::signaling::types::ClientId;

/// Tracks which authenticated identity each connection belongs to.
///
/// A user may hold several connections at once; per-user fan-out goes through
/// the user's private room in the `RoomRegistry`.
#[derive(Debug, Default)]
pub struct Presence {
    client_to_member: HashMap<ClientId, Member>,
}

impl Presence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a connection as authenticated. Returns false if it already was.
    pub fn login(&mut self, client_id: ClientId, member: Member) -> bool {
        if self.client_to_member.contains_key(&client_id) {
            return false;
        }
        self.client_to_member.insert(client_id, member);
        true
    }

    /// Remove a connection; returns its identity if it had authenticated.
    pub fn logout(&mut self, client_id: ClientId) -> Option<Member> {
        self.client_to_member.remove(&client_id)
    }

    pub fn member_for(&self, client_id: ClientId) -> Option<&Member> {
        self.client_to_member.get(&client_id)
    }

    pub fn is_authenticated(&self, client_id: ClientId) -> bool {
        self.client_to_member.contains_key(&client_id)
    }

    pub fn connection_count(&self) -> usize {
        self.client_to_member.len()
    }
}
