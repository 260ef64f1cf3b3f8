//! Process identifiers
//!
//! A [`Pid`] is the logical address of a process: the owning node's address
//! plus an id that is unique within that address's namespace at a point in
//! time. Pids are immutable, structurally comparable, and used as map keys
//! by the process registry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel address for processes that have no owning host (local-only).
pub const NO_HOST: &str = "nohost";

/// Logical address of a process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pid {
    /// Address of the owning node, or [`NO_HOST`].
    pub address: String,
    /// Process id, unique within the address's namespace.
    pub id: String,
}

impl Pid {
    /// Create a pid for a process hosted at `address`.
    pub fn new(address: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            id: id.into(),
        }
    }

    /// Create a pid with the [`NO_HOST`] sentinel address.
    pub fn local(id: impl Into<String>) -> Self {
        Self::new(NO_HOST, id)
    }

    /// True when the pid carries the [`NO_HOST`] sentinel.
    pub fn is_local(&self) -> bool {
        self.address == NO_HOST
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.id)
    }
}
