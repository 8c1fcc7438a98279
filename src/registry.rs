//! Registry of named specs.

use crate::error::{SpecError, SpecResult};
use crate::spec::{Spec, SpecRef};
use log::debug;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Alias chains longer than this are treated as cycles.
const MAX_ALIAS_DEPTH: usize = 32;

/// Resolves spec names to specs.
pub trait Registry: Send + Sync {
    fn resolve(&self, name: &str) -> SpecResult<Arc<dyn Spec>>;
}

/// In-memory registry. A name may map to a spec or to another name.
#[derive(Default)]
pub struct SpecRegistry {
    specs: RwLock<HashMap<String, SpecRef>>,
}

impl SpecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `spec` under `name`, replacing any previous definition.
    pub fn register(&self, name: &str, spec: impl Into<SpecRef>) {
        debug!("registering spec {}", name);
        self.specs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), spec.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.read().unwrap_or_else(|e| e.into_inner()).contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .specs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl Registry for SpecRegistry {
    fn resolve(&self, name: &str) -> SpecResult<Arc<dyn Spec>> {
        let specs = self.specs.read().unwrap_or_else(|e| e.into_inner());
        let mut current = name;
        for _ in 0..MAX_ALIAS_DEPTH {
            match specs.get(current) {
                Some(SpecRef::Spec(spec)) => return Ok(Arc::clone(spec)),
                Some(SpecRef::Named(alias)) => current = alias,
                None => return Err(SpecError::UnknownSpec(current.to_string())),
            }
        }
        Err(SpecError::UnknownSpec(format!("{} (alias chain too long)", name)))
    }
}

static REGISTRY: Lazy<SpecRegistry> = Lazy::new(SpecRegistry::new);

/// The process-wide registry used by named spec references.
pub fn registry() -> &'static SpecRegistry {
    &REGISTRY
}

/// Register `spec` under `name` in the process-wide registry.
pub fn def(name: &str, spec: impl Into<SpecRef>) {
    registry().register(name, spec)
}
