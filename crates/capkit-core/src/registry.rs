//! The immutable capability registry and the loader that builds it.
//!
//! Loading is tolerant: a record that fails to parse is logged, reported in
//! `LoadOutcome::skipped`, and left out, while the rest of the registry loads.
//! Once built a `Registry` is never mutated. Hot reload goes through
//! `RegistryHandle`, which swaps in a whole new snapshot.

use crate::capability::{parse_capability, Capability};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::source::{CapabilitySource, DirSource};
use crate::types::CapabilityType;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Registry {
    capabilities: BTreeMap<String, Capability>,
}

impl Registry {
    /// Build a registry from already-parsed capabilities. A later entry with
    /// the same id replaces an earlier one.
    pub fn from_capabilities(caps: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            capabilities: caps.into_iter().map(|c| (c.id.clone(), c)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Capability> {
        self.capabilities.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.capabilities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// All ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        self.capabilities.keys().map(|k| k.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities.values()
    }

    pub fn by_type(&self, t: CapabilityType) -> Vec<&Capability> {
        self.iter().filter(|c| c.capability_type == t).collect()
    }

    pub fn by_role(&self, role: &str) -> Vec<&Capability> {
        self.iter()
            .filter(|c| c.agent_roles.iter().any(|r| r == role))
            .collect()
    }

    /// Capabilities that list `id` as a required dependency.
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        self.iter()
            .filter(|c| c.required().iter().any(|d| d == id))
            .map(|c| c.id.as_str())
            .collect()
    }

    /// Ids of capabilities matching `keyword` in their relevance triggers,
    /// tags, name or description.
    pub fn search(&self, keyword: &str) -> Vec<&str> {
        if keyword.trim().is_empty() {
            return Vec::new();
        }
        self.iter()
            .filter(|c| c.matches_keyword(keyword.trim()))
            .map(|c| c.id.as_str())
            .collect()
    }

    /// A copy of this registry where every declared conflict is also recorded
    /// on its target, making conflicts symmetric.
    pub fn with_mirrored_conflicts(&self) -> Self {
        let mut capabilities = self.capabilities.clone();
        for cap in self.iter() {
            for target in &cap.conflicts {
                if let Some(other) = capabilities.get_mut(target) {
                    if !other.declares_conflict_with(&cap.id) {
                        other.conflicts.push(cap.id.clone());
                    }
                }
            }
        }
        Self { capabilities }
    }
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub id: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub registry: Registry,
    pub skipped: Vec<SkippedRecord>,
}

/// Enumerate `source` and parse every record, skipping the malformed ones.
///
/// Only a failure to enumerate the source itself is returned as an error.
pub fn load_registry(source: &dyn CapabilitySource) -> Result<LoadOutcome> {
    let mut caps = Vec::new();
    let mut skipped = Vec::new();

    for entry in source.entries()? {
        let parsed = entry
            .record
            .and_then(|raw| parse_capability(&entry.id, raw, &entry.origin));
        match parsed {
            Ok(cap) => caps.push(cap),
            Err(e) => {
                tracing::warn!(record = %entry.id, error = %e, "skipping capability metadata");
                skipped.push(SkippedRecord {
                    id: entry.id,
                    reason: e.to_string(),
                });
            }
        }
    }

    let registry = Registry::from_capabilities(caps);
    tracing::debug!(
        loaded = registry.len(),
        skipped = skipped.len(),
        "capability registry loaded"
    );
    Ok(LoadOutcome { registry, skipped })
}

/// Load the capability tree of the project at `root` as configured by `cfg`,
/// mirroring conflicts when `cfg.mirror_conflicts` is set.
pub fn load_project_registry(root: &Path, cfg: &EngineConfig) -> Result<LoadOutcome> {
    let source = DirSource::new(cfg.capabilities_root(root));
    let mut outcome = load_registry(&source)?;
    if cfg.mirror_conflicts {
        outcome.registry = outcome.registry.with_mirrored_conflicts();
    }
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// RegistryHandle
// ---------------------------------------------------------------------------

/// Shared access to the current registry snapshot.
///
/// Readers take an `Arc<Registry>` and keep using it for as long as they like;
/// a reload never touches a snapshot that has been handed out.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    current: Arc<RwLock<Arc<Registry>>>,
}

impl RegistryHandle {
    pub fn new(registry: Registry) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(registry))),
        }
    }

    pub fn snapshot(&self) -> Arc<Registry> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Swap in `registry`, returning the snapshot it replaced.
    pub fn replace(&self, registry: Registry) -> Arc<Registry> {
        let next = Arc::new(registry);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, next)
    }

    /// Load a fresh registry from `source` and swap it in. The current
    /// snapshot stays in place if the source cannot be enumerated.
    pub fn reload(&self, source: &dyn CapabilitySource) -> Result<Vec<SkippedRecord>> {
        let outcome = load_registry(source)?;
        tracing::info!(
            capabilities = outcome.registry.len(),
            skipped = outcome.skipped.len(),
            "capability registry reloaded"
        );
        self.replace(outcome.registry);
        Ok(outcome.skipped)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
