use std::collections::VecDeque;

use crate::signaling::protocol::IceCandidate;

pub const MAX_QUEUED_CANDIDATES: usize = 256;

/// Candidates for one remote peer that arrived before its description.
#[derive(Debug)]
pub struct CandidateQueue {
    items: VecDeque<IceCandidate>,
    capacity: usize,
}

impl Default for CandidateQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::with_capacity(MAX_QUEUED_CANDIDATES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: VecDeque::new(),
            capacity,
        }
    }

    /// Append in arrival order. When full the new candidate is handed back
    /// and not stored.
    pub fn push(&mut self, candidate: IceCandidate) -> Result<(), IceCandidate> {
        if self.items.len() >= self.capacity {
            return Err(candidate);
        }
        self.items.push_back(candidate);
        Ok(())
    }

    /// Take everything, oldest first, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<IceCandidate> {
        self.items.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn drains_once_in_arrival_order() {
        let mut q = CandidateQueue::new();
        for i in 0..3 {
            q.push(IceCandidate::new(format!("candidate:{i}"))).unwrap();
        }
        let out: Vec<_> = q.drain().into_iter().map(|c| c.candidate).collect();
        assert_eq!(out, vec!["candidate:0", "candidate:1", "candidate:2"]);
        assert!(q.drain().is_empty());
    }

    #[test]
    fn overflow_rejects_newest() {
        let mut q = CandidateQueue::with_capacity(2);
        q.push(IceCandidate::new("a")).unwrap();
        q.push(IceCandidate::new("b")).unwrap();
        assert_eq!(q.push(IceCandidate::new("c")).unwrap_err().candidate, "c");
        assert_eq!(q.len(), 2);
        assert_eq!(q.drain()[1].candidate, "b");
    }
}
