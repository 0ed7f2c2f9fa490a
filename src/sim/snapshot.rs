use serde::{Deserialize, Serialize};

use super::{Engine, LogEntry, NodeId, NodeRole, Packet, PacketKind, RaftNode};

/// Read-only value copy of the whole simulation, taken between ticks. Safe to
/// hand to rendering or summarization collaborators; nothing here aliases
/// engine state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    pub cluster: Vec<NodeView>,
    pub packets: Vec<PacketView>,
    pub paused: bool,
    pub speed_multiplier: f64,
    pub tick: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeView {
    pub id: NodeId,
    pub role: NodeRole,
    pub current_term: u64,
    pub voted_for: Option<NodeId>,
    pub log: Vec<LogEntry>,
    pub commit_index: i64,
    pub election_timeout: u32,
    pub timeout_duration: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketView {
    pub id: u64,
    pub from: NodeId,
    pub to: NodeId,
    pub kind: PacketKind,
    pub progress: f64,
}

impl ClusterSnapshot {
    pub(crate) fn capture(engine: &Engine) -> Self {
        Self {
            cluster: engine.nodes().iter().map(NodeView::from).collect(),
            packets: engine.in_flight().iter().map(PacketView::from).collect(),
            paused: engine.paused(),
            speed_multiplier: engine.speed_multiplier(),
            tick: engine.tick_count(),
        }
    }
}

impl From<&RaftNode> for NodeView {
    fn from(node: &RaftNode) -> Self {
        Self {
            id: node.id,
            role: node.role,
            current_term: node.current_term,
            voted_for: node.voted_for,
            log: node.log.entries().to_vec(),
            commit_index: node.commit_index,
            election_timeout: node.election_timeout,
            timeout_duration: node.timeout_duration,
        }
    }
}

impl From<&Packet> for PacketView {
    fn from(packet: &Packet) -> Self {
        Self {
            id: packet.id,
            from: packet.from,
            to: packet.to,
            kind: packet.message.kind(),
            progress: packet.progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    #[test]
    fn snapshot_round_trips_through_json() {
        let config = SimConfig {
            cluster_size: 3,
            rng_seed: Some(1),
            ..SimConfig::default()
        };
        let mut engine = Engine::new(config).expect("engine");
        for _ in 0..5 {
            engine.tick();
        }

        let snapshot = engine.snapshot();
        let json = serde_json::to_string(&snapshot).expect("serialize");
        let back: ClusterSnapshot = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(back.cluster.len(), 3);
        assert_eq!(back.tick, 5);
        assert_eq!(back.cluster[0].commit_index, -1);
    }
}
