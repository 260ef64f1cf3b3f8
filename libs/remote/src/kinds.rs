//! Known kinds
//!
//! The table of actor templates a node is willing to instantiate for
//! remote spawn requests. Kinds are registered at node startup; a request
//! naming an unregistered kind is a protocol-level error.

use actor_runtime::Props;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
pub struct KindRegistry {
    kinds: RwLock<HashMap<String, Props>>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: impl Into<String>, props: Props) {
        self.kinds.write().insert(kind.into(), props);
    }

    pub fn get(&self, kind: &str) -> Option<Props> {
        self.kinds.read().get(kind).cloned()
    }

    /// Registered kind names, for diagnostics.
    pub fn kinds(&self) -> Vec<String> {
        self.kinds.read().keys().cloned().collect()
    }
}
