use std::collections::HashSet;

// Use external log crate, not our own log module
use ::log::{debug, info};

use super::{LogEntry, NodeId, NodeRole, RaftMessage, RaftNode};

/// RequestVote receiver side. Term adoption happens before the vote decision
/// so a higher-term candidate is never rejected solely for staleness.
pub fn handle_request_vote(
    node: &mut RaftNode,
    term: u64,
    candidate_id: NodeId,
    last_log_index: i64,
    last_log_term: u64,
) -> RaftMessage {
    if term > node.current_term {
        node.step_down(term);
    }

    let our_last_index = node.log.last_index();
    let our_last_term = node.log.last_term();
    let log_up_to_date = last_log_term > our_last_term
        || (last_log_term == our_last_term && last_log_index >= our_last_index);

    let mut vote_granted = false;
    if term >= node.current_term
        && (node.voted_for.is_none() || node.voted_for == Some(candidate_id))
        && log_up_to_date
    {
        vote_granted = true;
        node.voted_for = Some(candidate_id);
        // A granted vote signals an active peer; hold off our own election.
        node.reset_election_timer();
        debug!(
            "node {} votes for {} in term {}",
            node.id, candidate_id, node.current_term
        );
    }

    RaftMessage::RequestVoteResponse {
        term: node.current_term,
        vote_granted,
    }
}

/// AppendEntries receiver side: heartbeat acknowledgement, log continuity
/// check, conflict truncation, and commit-index catch-up.
pub fn handle_append_entries(
    node: &mut RaftNode,
    term: u64,
    leader_id: NodeId,
    prev_log_index: i64,
    prev_log_term: u64,
    entries: &[LogEntry],
    leader_commit: i64,
) -> RaftMessage {
    if term < node.current_term {
        // Strictly stale leader: reject without touching log or timers.
        return RaftMessage::AppendEntriesResponse {
            term: node.current_term,
            success: false,
            match_index: node.log.last_index(),
        };
    }

    // A current-or-newer leader push is authoritative: fall back to Follower
    // and hold off our own election. The recorded vote is only forgotten
    // when the term actually advances.
    if term > node.current_term {
        node.step_down(term);
    }
    node.role = NodeRole::Follower;
    node.reset_election_timer();

    // Log continuity: the entry right before the new ones must exist here
    // with the same term. An empty-log base (-1) always passes.
    let log_ok =
        prev_log_index == -1 || node.log.term_at(prev_log_index) == Some(prev_log_term);

    if !log_ok {
        debug!(
            "node {} rejects entries from {}: no match at index {}",
            node.id, leader_id, prev_log_index
        );
        return RaftMessage::AppendEntriesResponse {
            term: node.current_term,
            success: false,
            match_index: node.log.last_index(),
        };
    }

    for (k, entry) in entries.iter().enumerate() {
        let index = prev_log_index + 1 + k as i64;
        match node.log.term_at(index) {
            None => {
                node.log.append(entry.clone());
            }
            Some(existing) if existing != entry.term => {
                // Conflicting suffix: everything from here on is superseded.
                node.log.truncate_from(index);
                node.log.append(entry.clone());
            }
            Some(_) => {} // already present
        }
    }

    // Never commit past what is actually present locally.
    if leader_commit > node.commit_index {
        node.commit_index = leader_commit.min(node.log.last_index());
    }

    RaftMessage::AppendEntriesResponse {
        term: node.current_term,
        success: true,
        match_index: node.log.last_index(),
    }
}

/// Candidate-side vote counting. Returns true when this response completes a
/// majority and the node has just become Leader.
pub fn handle_vote_response(
    node: &mut RaftNode,
    votes: &mut HashSet<NodeId>,
    from: NodeId,
    term: u64,
    vote_granted: bool,
    cluster_size: usize,
) -> bool {
    if term > node.current_term {
        // A higher-term responder outranks us even mid-candidacy, and can
        // dethrone a sitting leader the same way.
        node.step_down(term);
        return false;
    }

    if node.role != NodeRole::Candidate || term != node.current_term || !vote_granted {
        return false;
    }

    votes.insert(from);
    // The self-vote plus recorded grants must exceed half the cluster.
    if votes.len() + 1 > cluster_size / 2 {
        info!(
            "node {} wins election for term {} with {} votes",
            node.id,
            node.current_term,
            votes.len() + 1
        );
        node.become_leader(cluster_size);
        votes.clear();
        return true;
    }
    false
}

/// Leader-side bookkeeping for AppendEntries acknowledgements: replication
/// progress on success, nextIndex backoff on mismatch, then a commit-index
/// recomputation.
pub fn handle_append_response(
    node: &mut RaftNode,
    from: NodeId,
    term: u64,
    success: bool,
    match_index: i64,
    cluster_size: usize,
) {
    if term > node.current_term {
        info!(
            "node {} steps down: peer {} reports newer term {}",
            node.id, from, term
        );
        node.step_down(term);
        return;
    }

    if node.role != NodeRole::Leader || term != node.current_term {
        return;
    }

    if success {
        node.match_index.insert(from, match_index);
        node.next_index.insert(from, match_index + 1);
        advance_commit_index(node, cluster_size);
    } else {
        // Log mismatch: back up one entry and retry on the next heartbeat.
        let next = node.next_index.get(&from).copied().unwrap_or(0);
        node.next_index.insert(from, (next - 1).max(0));
    }
}

/// Majority-rank commit rule: sort {own last index} with the matchIndex of
/// every configured peer descending and take the value at rank N/2. Crashed
/// peers stay in the multiset; their stale matchIndex can only delay a
/// commit. An entry only commits once one from the leader's own term has
/// reached that rank.
pub fn advance_commit_index(node: &mut RaftNode, cluster_size: usize) {
    let mut indices: Vec<i64> = node.match_index.values().copied().collect();
    indices.push(node.log.last_index());
    indices.sort_unstable_by(|a, b| b.cmp(a));

    let Some(&candidate) = indices.get(cluster_size / 2) else {
        return;
    };

    if candidate > node.commit_index && node.log.term_at(candidate) == Some(node.current_term) {
        info!(
            "node {} advances commit index to {} in term {}",
            node.id, candidate, node.current_term
        );
        node.commit_index = candidate;
    }
}
