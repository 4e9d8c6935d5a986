use std::collections::HashMap;

use crate::signaling::protocol::{CallId, UserId};

/// Relay-side memory of private calls in flight, keyed by unordered user pair.
/// Lets the relay tell the surviving party when the other one vanishes.
#[derive(Debug, Default)]
pub struct CallLedger {
    calls: HashMap<(UserId, UserId), CallId>,
}

fn pair_key(a: &str, b: &str) -> (UserId, UserId) {
    if a <= b {
        (a.to_owned(), b.to_owned())
    } else {
        (b.to_owned(), a.to_owned())
    }
}

impl CallLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, a: &str, b: &str, call_id: CallId) {
        self.calls.insert(pair_key(a, b), call_id);
    }

    /// Forget the pair's call if it is `call_id`. Returns whether it was known.
    pub fn clear(&mut self, a: &str, b: &str, call_id: CallId) -> bool {
        let key = pair_key(a, b);
        if self.calls.get(&key) == Some(&call_id) {
            self.calls.remove(&key);
            true
        } else {
            false
        }
    }

    /// Remove every call involving `user`, returning (partner, call id).
    pub fn take_partners(&mut self, user: &str) -> Vec<(UserId, CallId)> {
        let keys: Vec<(UserId, UserId)> = self
            .calls
            .keys()
            .filter(|(a, b)| a == user || b == user)
            .cloned()
            .collect();

        keys.into_iter()
            .filter_map(|key| {
                let call_id = self.calls.remove(&key)?;
                let partner = if key.0 == user { key.1 } else { key.0 };
                Some((partner, call_id))
            })
            .collect()
    }

    pub fn active(&self, a: &str, b: &str) -> Option<CallId> {
        self.calls.get(&pair_key(a, b)).copied()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn pair_is_unordered_and_clear_matches_call_id() {
        let mut l = CallLedger::new();
        l.record("bob", "alice", 3);
        assert_eq!(l.active("alice", "bob"), Some(3));
        assert!(!l.clear("alice", "bob", 4));
        assert!(l.clear("bob", "alice", 3));
        assert!(l.is_empty());
    }

    #[test]
    fn take_partners_drains_only_that_user() {
        let mut l = CallLedger::new();
        l.record("a", "b", 1);
        l.record("c", "a", 2);
        l.record("c", "d", 3);
        let mut partners = l.take_partners("a");
        partners.sort();
        assert_eq!(partners, vec![("b".to_string(), 1), ("c".to_string(), 2)]);
        assert_eq!(l.len(), 1);
    }
}
