use std::collections::{HashMap, HashSet};

// Use external log crate, not our own log module
use ::log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SimConfig;

use super::{
    handlers, ClusterSnapshot, LogEntry, NodeId, NodeRole, Packet, RaftMessage, RaftNode,
    SimError,
};

/// The authoritative simulation state: every node, every in-flight packet,
/// and the ephemeral per-candidate vote trackers. One `tick()` advances the
/// whole cluster by a single discrete step. External collaborators only ever
/// see `ClusterSnapshot` value copies; the sanctioned mutations are
/// `set_node_live`, `propose_entry`, and the run-state setters.
pub struct Engine {
    config: SimConfig,
    nodes: Vec<RaftNode>,
    packets: Vec<Packet>,
    // Granting voter ids per candidate, scoped to that candidate's current
    // election attempt.
    votes: HashMap<NodeId, HashSet<NodeId>>,
    next_packet_id: u64,
    tick_count: u64,
    paused: bool,
    speed_multiplier: f64,
    rng: StdRng,
}

impl Engine {
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;

        let mut rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let nodes = (0..config.cluster_size)
            .map(|id| {
                let timeout = rng
                    .random_range(config.election_timeout_min..=config.election_timeout_max);
                RaftNode::new(id, timeout)
            })
            .collect();

        Ok(Self {
            config,
            nodes,
            packets: Vec::new(),
            votes: HashMap::new(),
            next_packet_id: 0,
            tick_count: 0,
            paused: false,
            speed_multiplier: 1.0,
            rng,
        })
    }

    /// Advance the simulation by one discrete step: packet transit, then
    /// delivery, then timer aging. Deliveries run before timers so a
    /// heartbeat arriving this tick can suppress an election timeout that
    /// would otherwise fire this tick.
    pub fn tick(&mut self) {
        self.tick_count += 1;

        for packet in &mut self.packets {
            packet.advance();
        }
        let (arrived, flying): (Vec<_>, Vec<_>) = std::mem::take(&mut self.packets)
            .into_iter()
            .partition(Packet::arrived);
        self.packets = flying;

        for packet in arrived {
            self.deliver(packet);
        }

        self.age_election_timers();
        self.age_heartbeat_timers();
    }

    fn deliver(&mut self, packet: Packet) {
        let cluster_size = self.nodes.len();
        let Some(node) = self.nodes.get_mut(packet.to) else {
            debug!("dropping packet {} for unknown node {}", packet.id, packet.to);
            return;
        };
        if node.is_crashed() {
            debug!("dropping packet {} for crashed node {}", packet.id, packet.to);
            return;
        }

        let term_before = node.current_term;
        let was_candidate = node.role == NodeRole::Candidate;

        let reply = match &packet.message {
            RaftMessage::RequestVote {
                term,
                candidate_id,
                last_log_index,
                last_log_term,
            } => Some(handlers::handle_request_vote(
                node,
                *term,
                *candidate_id,
                *last_log_index,
                *last_log_term,
            )),
            RaftMessage::AppendEntries {
                term,
                leader_id,
                prev_log_index,
                prev_log_term,
                entries,
                leader_commit,
            } => Some(handlers::handle_append_entries(
                node,
                *term,
                *leader_id,
                *prev_log_index,
                *prev_log_term,
                entries,
                *leader_commit,
            )),
            RaftMessage::RequestVoteResponse { term, vote_granted } => {
                let votes = self.votes.entry(packet.to).or_default();
                if handlers::handle_vote_response(
                    node,
                    votes,
                    packet.from,
                    *term,
                    *vote_granted,
                    cluster_size,
                ) {
                    self.votes.remove(&packet.to);
                }
                None
            }
            RaftMessage::AppendEntriesResponse {
                term,
                success,
                match_index,
            } => {
                handlers::handle_append_response(
                    node,
                    packet.from,
                    *term,
                    *success,
                    *match_index,
                    cluster_size,
                );
                None
            }
        };

        // A term change or a lost candidacy invalidates the election attempt
        // the tracker belonged to.
        let node = &self.nodes[packet.to];
        if node.current_term != term_before
            || (was_candidate && node.role != NodeRole::Candidate)
        {
            self.votes.remove(&packet.to);
        }

        if let Some(message) = reply {
            self.send(packet.to, packet.from, message);
        }
    }

    fn age_election_timers(&mut self) {
        let mut expired = Vec::new();
        for node in &mut self.nodes {
            if node.is_crashed() || node.is_leader() {
                continue;
            }
            node.election_timeout = node.election_timeout.saturating_sub(1);
            if node.election_timeout == 0 {
                expired.push(node.id);
            }
        }
        for id in expired {
            self.start_election(id);
        }
    }

    fn age_heartbeat_timers(&mut self) {
        let mut firing = Vec::new();
        for node in &mut self.nodes {
            if !node.is_leader() {
                continue;
            }
            node.heartbeat_timer = node.heartbeat_timer.saturating_sub(1);
            if node.heartbeat_timer == 0 {
                node.heartbeat_timer = self.config.heartbeat_interval;
                firing.push(node.id);
            }
        }
        for id in firing {
            self.broadcast_append_entries(id);
        }
    }

    /// Election-timeout expiry: become Candidate for the next term, vote for
    /// ourselves, and ask every live peer for theirs.
    fn start_election(&mut self, id: NodeId) {
        let timeout = self.draw_timeout();
        let cluster_size = self.nodes.len();

        let node = &mut self.nodes[id];
        node.role = NodeRole::Candidate;
        node.current_term += 1;
        node.voted_for = Some(id);
        node.election_timeout = timeout;
        node.timeout_duration = timeout;

        let term = node.current_term;
        let last_log_index = node.log.last_index();
        let last_log_term = node.log.last_term();
        info!("node {} starts election for term {}", id, term);

        self.votes.insert(id, HashSet::new());

        // Single-node cluster: the self-vote is already a majority.
        if 1 > cluster_size / 2 {
            self.nodes[id].become_leader(cluster_size);
            self.votes.remove(&id);
            info!("node {} wins election for term {} unopposed", id, term);
            return;
        }

        for peer in self.live_peers(id) {
            self.send(
                id,
                peer,
                RaftMessage::RequestVote {
                    term,
                    candidate_id: id,
                    last_log_index,
                    last_log_term,
                },
            );
        }
    }

    /// One AppendEntries per live peer, each tailored to that peer's
    /// replication progress. Caught-up peers get a bare heartbeat.
    fn broadcast_append_entries(&mut self, leader_id: NodeId) {
        let leader = &self.nodes[leader_id];
        let term = leader.current_term;
        let leader_commit = leader.commit_index;

        let mut outgoing = Vec::new();
        for peer in self.live_peers(leader_id) {
            let next = leader
                .next_index
                .get(&peer)
                .copied()
                .unwrap_or(leader.log.len() as i64);
            let prev_log_index = next - 1;
            let prev_log_term = leader.log.term_at(prev_log_index).unwrap_or(0);
            let entries = leader.log.entries_from(next);
            outgoing.push((
                peer,
                RaftMessage::AppendEntries {
                    term,
                    leader_id,
                    prev_log_index,
                    prev_log_term,
                    entries,
                    leader_commit,
                },
            ));
        }
        for (peer, message) in outgoing {
            self.send(leader_id, peer, message);
        }
    }

    fn send(&mut self, from: NodeId, to: NodeId, message: RaftMessage) {
        let id = self.next_packet_id;
        self.next_packet_id += 1;
        self.packets.push(Packet {
            id,
            from,
            to,
            message,
            progress: 0.0,
            speed: self.config.base_packet_speed * self.speed_multiplier,
        });
    }

    fn live_peers(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.id != id && !n.is_crashed())
            .map(|n| n.id)
            .collect()
    }

    fn draw_timeout(&mut self) -> u32 {
        self.rng
            .random_range(self.config.election_timeout_min..=self.config.election_timeout_max)
    }

    /// Crash or revive a node. Crashing freezes every protocol-visible field
    /// and discards the node's election attempt; reviving re-enters Follower
    /// with a fresh randomized timeout.
    pub fn set_node_live(&mut self, id: NodeId, live: bool) -> Result<(), SimError> {
        if id >= self.nodes.len() {
            return Err(SimError::UnknownNode(id));
        }
        if live {
            let timeout = self.draw_timeout();
            let node = &mut self.nodes[id];
            if !node.is_crashed() {
                return Ok(());
            }
            node.role = NodeRole::Follower;
            node.election_timeout = timeout;
            node.timeout_duration = timeout;
            info!("node {} revived as follower in term {}", id, node.current_term);
        } else {
            let node = &mut self.nodes[id];
            if node.is_crashed() {
                return Ok(());
            }
            node.role = NodeRole::Crashed;
            self.votes.remove(&id);
            info!("node {} crashed", id);
        }
        Ok(())
    }

    /// Append a client command to the current leader's log. Recoverable
    /// failure when no leader exists; never touches any other node.
    pub fn propose_entry(&mut self, command: impl Into<String>) -> Result<(NodeId, i64), SimError> {
        let leader_id = self.leader().ok_or(SimError::NoLeader)?;
        let cluster_size = self.nodes.len();

        let leader = &mut self.nodes[leader_id];
        let entry = LogEntry::new(leader.current_term, command);
        let index = leader.log.append(entry);
        // A single-node cluster has no acknowledgements to wait for, so the
        // commit rank is re-evaluated right away.
        handlers::advance_commit_index(leader, cluster_size);
        info!(
            "leader {} accepted entry {} in term {}",
            leader_id, index, leader.current_term
        );
        Ok((leader_id, index))
    }

    /// Current leader id, preferring the highest term if a deposed leader has
    /// not yet learned of its successor.
    pub fn leader(&self) -> Option<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.is_leader())
            .max_by_key(|n| n.current_term)
            .map(|n| n.id)
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Playback multiplier applied to packets created from now on; packets
    /// already in flight keep the speed they were created with.
    pub fn set_speed_multiplier(&mut self, multiplier: f64) {
        self.speed_multiplier = multiplier.max(0.0);
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.speed_multiplier
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn nodes(&self) -> &[RaftNode] {
        &self.nodes
    }

    pub fn in_flight(&self) -> &[Packet] {
        &self.packets
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Read-only value copy of the whole simulation for rendering and
    /// summarization collaborators.
    pub fn snapshot(&self) -> ClusterSnapshot {
        ClusterSnapshot::capture(self)
    }
}
