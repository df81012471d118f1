use crate::error::{Error, Result};
use core::time::Duration;

/// Default number of shard workers.
pub const DEFAULT_NUM_SHARDS: usize = 16;

/// Upper bound on the number of shard workers.
pub const MAX_SHARDS: usize = 1024;

/// Runtime configuration of a [`PacketService`](crate::PacketService).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Number of single-writer shard workers. Must be a power of two.
    pub num_shards: usize,
    /// How long a caller waits for its claim before giving up. `None` waits
    /// indefinitely.
    pub claim_timeout: Option<Duration>,
    /// How long shutdown waits for each shard to acknowledge.
    pub shutdown_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            num_shards: DEFAULT_NUM_SHARDS,
            claim_timeout: None,
            shutdown_timeout: Duration::from_secs(3),
        }
    }
}

impl ServiceConfig {
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `num_shards` is zero, not a power
    /// of two, or larger than [`MAX_SHARDS`].
    pub fn validate(&self) -> Result<()> {
        if self.num_shards == 0 {
            return Err(Error::invalid("num_shards must be greater than 0"));
        }
        if !self.num_shards.is_power_of_two() {
            return Err(Error::invalid(format!(
                "num_shards ({}) must be a power of two",
                self.num_shards
            )));
        }
        if self.num_shards > MAX_SHARDS {
            return Err(Error::invalid(format!(
                "num_shards ({}) exceeds maximum ({MAX_SHARDS})",
                self.num_shards
            )));
        }
        Ok(())
    }
}
