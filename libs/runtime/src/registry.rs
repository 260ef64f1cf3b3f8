//! Process registry
//!
//! Process-wide lookup from pid to process. Constructed once at node
//! startup and passed by reference to every component that resolves
//! addresses; there is no hidden global. Lookup is total: an unmapped pid
//! resolves to the node's single dead-letter sentinel.

use crate::error::{Result, RuntimeError};
use crate::pid::{Pid, NO_HOST};
use crate::process::{DeadLetterProcess, Process};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

pub struct ProcessRegistry {
    address: String,
    sequence: AtomicU64,
    processes: DashMap<Pid, Arc<dyn Process>>,
    dead_letter: Arc<DeadLetterProcess>,
}

impl ProcessRegistry {
    /// Registry for a node reachable at `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            sequence: AtomicU64::new(0),
            processes: DashMap::new(),
            dead_letter: Arc::new(DeadLetterProcess::new()),
        }
    }

    /// Registry for a node with no reachable host address.
    pub fn local() -> Self {
        Self::new(NO_HOST)
    }

    /// The owning node's address; new local pids are minted under it.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Generate a fresh process id, unique for the lifetime of this node.
    pub fn next_id(&self) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("${sequence}")
    }

    /// Resolve a pid. Total: unmapped pids yield the dead-letter sentinel,
    /// the same one every time.
    pub fn get(&self, pid: &Pid) -> Arc<dyn Process> {
        match self.processes.get(pid) {
            Some(entry) => Arc::clone(entry.value()),
            None => Arc::clone(&self.dead_letter) as Arc<dyn Process>,
        }
    }

    /// Resolve a pid, distinguishing a miss from a mapped process.
    pub fn find(&self, pid: &Pid) -> Option<Arc<dyn Process>> {
        self.processes.get(pid).map(|entry| Arc::clone(entry.value()))
    }

    /// Map a pid to a process. A pid denotes the same process until
    /// removed; an already-mapped pid is rejected.
    pub fn register(&self, pid: Pid, process: Arc<dyn Process>) -> Result<()> {
        match self.processes.entry(pid) {
            Entry::Occupied(entry) => {
                Err(RuntimeError::process_name_exists(entry.key().id.clone()))
            }
            Entry::Vacant(entry) => {
                debug!(pid = %entry.key(), "process registered");
                entry.insert(process);
                Ok(())
            }
        }
    }

    /// Unmap a pid. Reusing an id is only safe after this.
    pub fn remove(&self, pid: &Pid) {
        if self.processes.remove(pid).is_some() {
            debug!(pid = %pid, "process removed");
        }
    }

    /// The node's dead-letter sentinel.
    pub fn dead_letter(&self) -> &Arc<DeadLetterProcess> {
        &self.dead_letter
    }

    /// Number of registered processes.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::DefaultMailbox;
    use crate::process::LocalProcess;

    fn local_process() -> Arc<dyn Process> {
        Arc::new(LocalProcess::new(Arc::new(DefaultMailbox::new())))
    }

    #[test]
    fn unmapped_pid_resolves_to_the_same_dead_letter_sentinel() {
        let registry = ProcessRegistry::local();
        let first = registry.get(&Pid::local("ghost"));
        let second = registry.get(&Pid::local("other-ghost"));
        assert!(Arc::ptr_eq(&first, &second));

        // Absorbed, never an error.
        first.send_user_message(&Pid::local("ghost"), crate::message::AnyMessage::new(1u8));
        assert_eq!(registry.dead_letter().absorbed(), 1);
    }

    #[test]
    fn register_then_get_resolves_the_process() {
        let registry = ProcessRegistry::local();
        let pid = Pid::local("worker");
        let process = local_process();
        registry.register(pid.clone(), Arc::clone(&process)).unwrap();

        assert!(Arc::ptr_eq(&registry.get(&pid), &process));
        assert!(registry.find(&pid).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = ProcessRegistry::local();
        let pid = Pid::local("worker");
        registry.register(pid.clone(), local_process()).unwrap();

        let error = registry.register(pid, local_process()).unwrap_err();
        assert!(matches!(error, RuntimeError::ProcessNameExists { id } if id == "worker"));
    }

    #[test]
    fn removal_makes_the_id_reusable() {
        let registry = ProcessRegistry::local();
        let pid = Pid::local("worker");
        registry.register(pid.clone(), local_process()).unwrap();
        registry.remove(&pid);

        assert!(registry.find(&pid).is_none());
        registry.register(pid, local_process()).unwrap();
    }

    #[test]
    fn next_id_never_repeats() {
        let registry = ProcessRegistry::local();
        let first = registry.next_id();
        let second = registry.next_id();
        assert_ne!(first, second);
        assert!(first.starts_with('$'));
    }
}
