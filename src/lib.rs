// Simulation engine modules
pub mod config;
pub mod sim;
pub mod summary;

// Driver modules
pub mod repl;

// Public exports
pub use config::SimConfig;
pub use sim::{ClusterSnapshot, Engine, SimError};
pub use summary::{ClusterDigest, Summarizer, TemplateSummarizer};
