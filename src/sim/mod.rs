mod engine;
mod error;
pub mod handlers;
mod log;
mod node;
mod packet;
mod snapshot;

pub use self::engine::Engine;
pub use self::error::SimError;
pub use self::log::{Log, LogEntry};
pub use self::node::{NodeRole, RaftNode};
pub use self::packet::{Packet, PacketKind, RaftMessage};
pub use self::snapshot::{ClusterSnapshot, NodeView, PacketView};

/// Cluster members are identified by their position in the engine's node
/// vector.
pub type NodeId = usize;
