//! Runtime configuration

use crate::pid::NO_HOST;
use serde::{Deserialize, Serialize};

/// Default values shared by configuration and tests.
pub mod defaults {
    /// Advisory maximum items per mailbox turn.
    pub const THROUGHPUT: usize = 300;
    /// Maximum remote deliveries collected into one endpoint batch.
    pub const BATCH_SIZE: usize = 1000;
}

/// Node-level runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Address under which this node's pids are minted.
    pub address: String,
    /// Advisory dispatcher throughput per mailbox turn.
    pub throughput: usize,
    /// Batch size for remote-facing mailboxes.
    pub batch_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            address: NO_HOST.to_string(),
            throughput: defaults::THROUGHPUT,
            batch_size: defaults::BATCH_SIZE,
        }
    }
}
