use serde::{Deserialize, Serialize};

use crate::sim::SimError;

/// Simulation tuning knobs. The defaults mirror the classic interactive Raft
/// demos: five nodes, 150-300 tick election timeouts, 50 tick heartbeats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub cluster_size: usize,
    pub election_timeout_min: u32, // in ticks
    pub election_timeout_max: u32, // in ticks
    pub heartbeat_interval: u32,   // in ticks
    /// Progress units (out of 100) a packet gains per tick before the
    /// playback multiplier is applied.
    pub base_packet_speed: f64,
    /// Fixed seed for reproducible runs; None seeds from OS entropy.
    pub rng_seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            cluster_size: 5,
            election_timeout_min: 150,
            election_timeout_max: 300,
            heartbeat_interval: 50,
            base_packet_speed: 5.0,
            rng_seed: None,
        }
    }
}

impl SimConfig {
    /// Default configuration with a fixed seed, for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng_seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.cluster_size == 0 {
            return Err(SimError::InvalidConfig(
                "cluster_size must be at least 1".to_string(),
            ));
        }
        if self.election_timeout_min == 0 || self.election_timeout_min > self.election_timeout_max
        {
            return Err(SimError::InvalidConfig(format!(
                "election timeout range {}..={} is invalid",
                self.election_timeout_min, self.election_timeout_max
            )));
        }
        if self.heartbeat_interval == 0 {
            return Err(SimError::InvalidConfig(
                "heartbeat_interval must be at least 1".to_string(),
            ));
        }
        if self.base_packet_speed <= 0.0 {
            return Err(SimError::InvalidConfig(
                "base_packet_speed must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_sensible() {
        let cfg = SimConfig::default();

        assert_eq!(cfg.cluster_size, 5);
        assert_eq!(cfg.election_timeout_min, 150);
        assert_eq!(cfg.election_timeout_max, 300);
        assert_eq!(cfg.heartbeat_interval, 50);
        assert!(cfg.rng_seed.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn seeded_config_carries_the_seed() {
        let cfg = SimConfig::seeded(42);
        assert_eq!(cfg.rng_seed, Some(42));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_ranges() {
        let cfg = SimConfig {
            cluster_size: 0,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = SimConfig {
            election_timeout_min: 400,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = SimConfig {
            election_timeout_min: 0,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = SimConfig {
            heartbeat_interval: 0,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = SimConfig {
            base_packet_speed: 0.0,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
