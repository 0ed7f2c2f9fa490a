use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::{ClusterSnapshot, NodeId, NodeRole};

/// Fixed narration used whenever a summarizer is unavailable or fails.
pub const FALLBACK_SUMMARY: &str =
    "Cluster summary is unavailable right now; the simulation continues unaffected.";

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("Summarizer unavailable: {0}")]
    Unavailable(String),

    #[error("Summarizer returned an unusable response: {0}")]
    BadResponse(String),
}

/// Derived aggregates handed to a summarization collaborator. The engine
/// side computes these from a snapshot; summarizers receive them ready-made
/// and only produce text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterDigest {
    pub leader: Option<NodeId>,
    pub candidates: Vec<NodeId>,
    pub crashed: Vec<NodeId>,
    pub max_term: u64,
    pub nodes: Vec<NodeDigest>,
    pub paused: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDigest {
    pub id: NodeId,
    pub log_len: usize,
    pub commit_index: i64,
}

impl ClusterDigest {
    pub fn from_snapshot(snapshot: &ClusterSnapshot) -> Self {
        let leader = snapshot
            .cluster
            .iter()
            .filter(|n| n.role == NodeRole::Leader)
            .max_by_key(|n| n.current_term)
            .map(|n| n.id);
        let candidates = snapshot
            .cluster
            .iter()
            .filter(|n| n.role == NodeRole::Candidate)
            .map(|n| n.id)
            .collect();
        let crashed = snapshot
            .cluster
            .iter()
            .filter(|n| n.role == NodeRole::Crashed)
            .map(|n| n.id)
            .collect();
        let max_term = snapshot
            .cluster
            .iter()
            .map(|n| n.current_term)
            .max()
            .unwrap_or(0);
        let nodes = snapshot
            .cluster
            .iter()
            .map(|n| NodeDigest {
                id: n.id,
                log_len: n.log.len(),
                commit_index: n.commit_index,
            })
            .collect();

        Self {
            leader,
            candidates,
            crashed,
            max_term,
            nodes,
            paused: snapshot.paused,
        }
    }
}

/// Boundary to the external narration service. Implementations receive the
/// precomputed digest and return free text; they never see engine state.
pub trait Summarizer {
    fn summarize(&self, digest: &ClusterDigest) -> Result<String, SummaryError>;
}

/// Degrade to `FALLBACK_SUMMARY` on any summarizer failure. The failure is
/// reported and swallowed here; it never reaches the engine.
pub fn summarize_or_fallback(summarizer: &dyn Summarizer, digest: &ClusterDigest) -> String {
    match summarizer.summarize(digest) {
        Ok(text) => text,
        Err(e) => {
            warn!("summarizer failed: {e}");
            FALLBACK_SUMMARY.to_string()
        }
    }
}

/// Deterministic local narration used by the bundled CLI and REPL drivers in
/// place of an external language-model service.
pub struct TemplateSummarizer;

impl Summarizer for TemplateSummarizer {
    fn summarize(&self, digest: &ClusterDigest) -> Result<String, SummaryError> {
        let mut parts = Vec::new();

        match digest.leader {
            Some(id) => parts.push(format!(
                "Node {id} leads the cluster at term {}.",
                digest.max_term
            )),
            None => parts.push(format!(
                "No node currently leads; the highest term seen is {}.",
                digest.max_term
            )),
        }

        if !digest.candidates.is_empty() {
            parts.push(format!(
                "Campaigning for votes: {}.",
                join_ids(&digest.candidates)
            ));
        }

        if !digest.crashed.is_empty() {
            parts.push(format!("Currently crashed: {}.", join_ids(&digest.crashed)));
        }

        let longest_log = digest.nodes.iter().map(|n| n.log_len).max().unwrap_or(0);
        let highest_commit = digest
            .nodes
            .iter()
            .map(|n| n.commit_index)
            .max()
            .unwrap_or(-1);
        if longest_log > 0 {
            parts.push(format!(
                "Logs hold up to {longest_log} entries; replication has committed through index {highest_commit}."
            ));
        }

        if digest.paused {
            parts.push("The simulation is paused.".to_string());
        }

        Ok(parts.join(" "))
    }
}

fn join_ids(ids: &[NodeId]) -> String {
    ids.iter()
        .map(|id| format!("node {id}"))
        .collect::<Vec<_>>()
        .join(", ")
}
