#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::time::Duration;

use crate::errors::{Error, Result};

use super::{
    search::{SearchLimits, SEARCH_CHECK_INTERVAL},
    table::{validate_table_size, BATCH_SIZE, BUILD_CHECK_INTERVAL},
};

/// Table size used when a balance is decrypted before any size was requested.
#[cfg(not(target_arch = "wasm32"))]
pub const DEFAULT_TABLE_SIZE: usize = 1 << 23; // 64 MiB
#[cfg(target_arch = "wasm32")]
pub const DEFAULT_TABLE_SIZE: usize = 1 << 16; // 512 KiB

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Settings of a `BalanceDecryptor`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecryptorConfig {
    /// Entries per shard of the table built on first use.
    pub default_table_size: usize,
    /// Shards per lookup table.
    pub shard_count: usize,
    /// Entries built between two cancellation checks.
    pub build_check_interval: usize,
    /// Giant steps between two cancellation checks.
    pub search_check_interval: u64,
    /// How often a caller blocked on table construction re-checks its stop signal.
    pub poll_interval: Duration,
    /// Give up after this many giant steps. `None` searches until cancelled.
    pub max_giant_steps: Option<u64>,
}

impl Default for DecryptorConfig {
    fn default() -> Self {
        Self {
            default_table_size: DEFAULT_TABLE_SIZE,
            shard_count: 1,
            build_check_interval: BUILD_CHECK_INTERVAL,
            search_check_interval: SEARCH_CHECK_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_giant_steps: None,
        }
    }
}

impl DecryptorConfig {
    pub fn with_table_size(table_size: usize) -> Self {
        Self {
            default_table_size: table_size,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_table_size(self.default_table_size)?;
        if self.shard_count == 0 {
            return Err(Error::InvalidShardCount {
                count: self.shard_count,
            });
        }
        if self.build_check_interval == 0 || self.build_check_interval % BATCH_SIZE != 0 {
            return Err(Error::InvalidCheckInterval {
                interval: self.build_check_interval,
            });
        }
        Ok(())
    }

    pub fn search_limits(&self) -> SearchLimits {
        SearchLimits {
            check_interval: self.search_check_interval,
            max_giant_steps: self.max_giant_steps,
        }
    }
}
