use thiserror::Error;

use super::NodeId;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Unknown node id: {0}")]
    UnknownNode(NodeId),

    #[error("No leader elected")]
    NoLeader,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
