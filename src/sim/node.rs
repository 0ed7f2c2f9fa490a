use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Log, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Follower,
    Candidate,
    Leader,
    Crashed,
}

/// Per-node Raft state, exclusively owned by the engine. Collaborators only
/// ever see value copies via `ClusterSnapshot`.
#[derive(Debug, Clone)]
pub struct RaftNode {
    pub id: NodeId,
    pub role: NodeRole,
    pub current_term: u64,
    pub voted_for: Option<NodeId>,
    pub log: Log,
    pub commit_index: i64,

    /// Remaining ticks before this node (unless Leader) starts an election.
    pub election_timeout: u32,
    /// The randomized timeout length last assigned; also the reset value.
    pub timeout_duration: u32,

    // Volatile leader state, reinitialized on each election win.
    pub next_index: HashMap<NodeId, i64>,
    pub match_index: HashMap<NodeId, i64>,
    pub heartbeat_timer: u32,
}

impl RaftNode {
    pub fn new(id: NodeId, timeout: u32) -> Self {
        Self {
            id,
            role: NodeRole::Follower,
            current_term: 0,
            voted_for: None,
            log: Log::new(),
            commit_index: -1,
            election_timeout: timeout,
            timeout_duration: timeout,
            next_index: HashMap::new(),
            match_index: HashMap::new(),
            heartbeat_timer: 0,
        }
    }

    pub fn is_leader(&self) -> bool {
        matches!(self.role, NodeRole::Leader)
    }

    pub fn is_crashed(&self) -> bool {
        matches!(self.role, NodeRole::Crashed)
    }

    /// A granted vote or a valid AppendEntries restarts the countdown from
    /// the last randomized duration.
    pub fn reset_election_timer(&mut self) {
        self.election_timeout = self.timeout_duration;
    }

    /// Adopt a higher term observed in any RPC or response and fall back to
    /// Follower. The vote belongs to the old term and is forgotten.
    pub fn step_down(&mut self, term: u64) {
        self.current_term = term;
        self.voted_for = None;
        self.role = NodeRole::Follower;
    }

    /// Transition to Leader. The heartbeat timer is left at zero so the first
    /// broadcast goes out on the current tick, and the per-peer replication
    /// trackers restart from the end of our log. matchIndex starts at -1:
    /// nothing is known to be replicated until a peer acknowledges.
    pub fn become_leader(&mut self, cluster_size: usize) {
        self.role = NodeRole::Leader;
        self.heartbeat_timer = 0;
        self.next_index.clear();
        self.match_index.clear();
        for peer in 0..cluster_size {
            if peer == self.id {
                continue;
            }
            self.next_index.insert(peer, self.log.len() as i64);
            self.match_index.insert(peer, -1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::LogEntry;

    #[test]
    fn new_node_starts_as_follower_with_empty_log() {
        let node = RaftNode::new(3, 200);

        assert_eq!(node.id, 3);
        assert_eq!(node.role, NodeRole::Follower);
        assert_eq!(node.current_term, 0);
        assert_eq!(node.voted_for, None);
        assert_eq!(node.commit_index, -1);
        assert_eq!(node.election_timeout, 200);
        assert_eq!(node.timeout_duration, 200);
        assert!(node.log.is_empty());
    }

    #[test]
    fn become_leader_initializes_replication_trackers() {
        let mut node = RaftNode::new(1, 180);
        node.current_term = 2;
        node.log.append(LogEntry::new(1, "a"));
        node.log.append(LogEntry::new(2, "b"));

        node.become_leader(3);

        assert!(node.is_leader());
        assert_eq!(node.heartbeat_timer, 0);
        assert_eq!(node.next_index.len(), 2);
        assert_eq!(node.match_index.len(), 2);
        for peer in [0usize, 2] {
            assert_eq!(node.next_index.get(&peer), Some(&2));
            assert_eq!(node.match_index.get(&peer), Some(&-1));
        }
        assert!(!node.next_index.contains_key(&1));
    }

    #[test]
    fn step_down_clears_vote_and_demotes() {
        let mut node = RaftNode::new(0, 150);
        node.current_term = 4;
        node.voted_for = Some(0);
        node.role = NodeRole::Candidate;

        node.step_down(7);

        assert_eq!(node.role, NodeRole::Follower);
        assert_eq!(node.current_term, 7);
        assert_eq!(node.voted_for, None);
    }

    #[test]
    fn reset_election_timer_restores_last_duration() {
        let mut node = RaftNode::new(0, 220);
        node.election_timeout = 3;

        node.reset_election_timer();

        assert_eq!(node.election_timeout, 220);
    }
}
