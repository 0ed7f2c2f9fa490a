use serde::{Deserialize, Serialize};

use super::{LogEntry, NodeId};

// Message types for the simulated Raft wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RaftMessage {
    // Leader election messages
    RequestVote {
        term: u64,
        candidate_id: NodeId,
        last_log_index: i64,
        last_log_term: u64,
    },
    RequestVoteResponse {
        term: u64,
        vote_granted: bool,
    },

    // Log replication messages
    AppendEntries {
        term: u64,
        leader_id: NodeId,
        prev_log_index: i64,
        prev_log_term: u64,
        entries: Vec<LogEntry>,
        leader_commit: i64,
    },
    AppendEntriesResponse {
        term: u64,
        success: bool,
        match_index: i64,
    },
}

impl RaftMessage {
    pub fn kind(&self) -> PacketKind {
        match self {
            RaftMessage::RequestVote { .. } => PacketKind::RequestVote,
            RaftMessage::RequestVoteResponse { .. } => PacketKind::VoteResponse,
            RaftMessage::AppendEntries { .. } => PacketKind::AppendEntries,
            RaftMessage::AppendEntriesResponse { .. } => PacketKind::AppendResponse,
        }
    }
}

/// Message family tag exposed to rendering collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketKind {
    RequestVote,
    VoteResponse,
    AppendEntries,
    AppendResponse,
}

/// A protocol message in transit between two nodes. Progress runs 0..100 and
/// advances by `speed` each tick; the packet leaves the wire once progress
/// reaches 100. Multiple packets between the same pair may be in flight with
/// independent progress, but per-link order is never inverted because every
/// packet on a link moves at the speed it was created with.
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: u64,
    pub from: NodeId,
    pub to: NodeId,
    pub message: RaftMessage,
    pub progress: f64,
    pub speed: f64,
}

impl Packet {
    pub fn advance(&mut self) {
        self.progress += self.speed;
    }

    pub fn arrived(&self) -> bool {
        self.progress >= 100.0
    }
}
