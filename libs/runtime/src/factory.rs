//! Actor factory
//!
//! Resolves a kind descriptor to a pid, creating the underlying process
//! only when nothing is registered at the computed address. Each kind maps
//! to a base construction template plus an optional configuration
//! transform applied at creation time.

use crate::error::{Result, RuntimeError};
use crate::pid::Pid;
use crate::registry::ProcessRegistry;
use crate::spawn::{spawn_named, Props};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

type PropsTransform = dyn Fn(Props) -> Props + Send + Sync;

/// Per-kind construction templates and configuration transforms.
#[derive(Default)]
pub struct PropsRegistry {
    base: RwLock<HashMap<String, Props>>,
    transforms: RwLock<HashMap<String, Arc<PropsTransform>>>,
}

impl PropsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the base template for a kind.
    pub fn register_kind(&self, kind: impl Into<String>, props: Props) {
        self.base.write().insert(kind.into(), props);
    }

    /// Register a configuration transform for a kind; absent transforms
    /// are the identity.
    pub fn register_transform<F>(&self, kind: impl Into<String>, transform: F)
    where
        F: Fn(Props) -> Props + Send + Sync + 'static,
    {
        self.transforms.write().insert(kind.into(), Arc::new(transform));
    }

    /// Base template with the kind's transform applied.
    pub fn resolve(&self, kind: &str) -> Option<Props> {
        let props = self.base.read().get(kind).cloned()?;
        let transform = self.transforms.read().get(kind).cloned();
        Some(match transform {
            Some(transform) => transform(props),
            None => props,
        })
    }
}

/// Kind-driven process creation with get-or-create semantics.
pub struct ActorFactory {
    registry: Arc<ProcessRegistry>,
    props: Arc<PropsRegistry>,
}

impl ActorFactory {
    pub fn new(registry: Arc<ProcessRegistry>, props: Arc<PropsRegistry>) -> Self {
        Self { registry, props }
    }

    pub fn registry(&self) -> &Arc<ProcessRegistry> {
        &self.registry
    }

    /// Resolve a pid for `kind`, spawning it on a registry miss.
    ///
    /// The id defaults to the kind name; a parent scopes it as
    /// `{parent.id}/{id}`. An existing registration resolves to the
    /// existing pid without touching its process.
    pub fn get_or_create(
        &self,
        kind: &str,
        id: Option<&str>,
        parent: Option<&Pid>,
    ) -> Result<Pid> {
        let id = id.unwrap_or(kind);
        let scoped = match parent {
            Some(parent) => format!("{}/{}", parent.id, id),
            None => id.to_string(),
        };

        let pid = Pid::new(self.registry.address(), scoped.as_str());
        if self.registry.find(&pid).is_some() {
            return Ok(pid);
        }

        let props = self
            .props
            .resolve(kind)
            .ok_or_else(|| RuntimeError::unknown_kind(kind))?;
        debug!(kind, pid = %pid, "creating actor for kind");
        spawn_named(&self.registry, &props, &scoped)
    }
}
