//! Graph operations over a registry snapshot: dependency resolution, cycle
//! detection, conflict detection and recommendations.
//!
//! Every function here is a pure query. None of them mutate the registry, so
//! any number may run concurrently against the same snapshot.

use crate::error::{CapkitError, Result};
use crate::registry::Registry;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

/// A declared incompatibility between two selected capabilities. `first` is
/// the capability that declares the conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub first: String,
    pub second: String,
    pub reason: String,
}

impl Conflict {
    fn declared(by: &str, against: &str) -> Self {
        Self {
            first: by.to_string(),
            second: against.to_string(),
            reason: format!("'{by}' declares a conflict with '{against}'"),
        }
    }

    pub fn involves(&self, id: &str) -> bool {
        self.first == id || self.second == id
    }
}

/// A composition problem found during validation. Always returned as data,
/// never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    Cycle { path: Vec<String> },
    Conflict(Conflict),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Cycle { path } => {
                write!(f, "circular dependency: {}", path.join(" -> "))
            }
            Violation::Conflict(c) => write!(f, "conflict: {}", c.reason),
        }
    }
}

// ---------------------------------------------------------------------------
// Dependency resolution
// ---------------------------------------------------------------------------

/// Expand `requested` to the full set of capabilities it needs.
///
/// Required dependencies are followed transitively and a missing one fails
/// the call. With `include_optional`, optional dependencies present in the
/// registry are pulled in too; absent optional ids are skipped silently.
pub fn resolve_dependencies<S: AsRef<str>>(
    requested: &[S],
    registry: &Registry,
    include_optional: bool,
) -> Result<BTreeSet<String>> {
    let mut resolved: BTreeSet<String> = BTreeSet::new();
    let mut queue: VecDeque<String> = requested.iter().map(|s| s.as_ref().to_string()).collect();

    while let Some(id) = queue.pop_front() {
        if resolved.contains(&id) {
            continue;
        }
        let cap = registry
            .get(&id)
            .ok_or_else(|| CapkitError::Resolution(id.clone()))?;

        for dep in cap.required() {
            if !resolved.contains(dep) {
                queue.push_back(dep.clone());
            }
        }
        if include_optional {
            for dep in cap.optional() {
                if registry.contains(dep) && !resolved.contains(dep) {
                    queue.push_back(dep.clone());
                }
            }
        }
        resolved.insert(id);
    }

    Ok(resolved)
}

// ---------------------------------------------------------------------------
// Cycle detection
// ---------------------------------------------------------------------------

/// Follow required edges depth-first from `start` and return the first cycle
/// found, as the cyclic part of the path with the repeated id at both ends.
///
/// The path and its membership set are copied for every branch, so two
/// siblings reaching the same node (a diamond) never look like a cycle.
/// Nodes whose whole subtree has been walked without finding a cycle are
/// remembered and not walked again, which keeps layered graphs linear.
pub fn detect_circular_dependencies(start: &str, registry: &Registry) -> Option<Vec<String>> {
    let mut cleared = HashSet::new();
    walk_required(start, registry, &[], &HashSet::new(), &mut cleared)
}

fn walk_required(
    id: &str,
    registry: &Registry,
    path: &[String],
    on_path: &HashSet<String>,
    cleared: &mut HashSet<String>,
) -> Option<Vec<String>> {
    if on_path.contains(id) {
        let from = path.iter().position(|p| p == id)?;
        let mut cycle = path[from..].to_vec();
        cycle.push(id.to_string());
        return Some(cycle);
    }
    if cleared.contains(id) {
        return None;
    }

    // unknown ids are leaves here; resolution reports them
    let cap = registry.get(id)?;

    let mut path = path.to_vec();
    path.push(id.to_string());
    let mut on_path = on_path.clone();
    on_path.insert(id.to_string());

    for dep in cap.required() {
        if let Some(cycle) = walk_required(dep, registry, &path, &on_path, cleared) {
            return Some(cycle);
        }
    }

    // no cycle anywhere below `id`
    cleared.insert(id.to_string());
    None
}

/// Rotation-independent key for a cycle path, so `a -> b -> a` and
/// `b -> a -> b` compare equal.
pub(crate) fn cycle_key(path: &[String]) -> Vec<String> {
    let nodes = match path.split_last() {
        Some((_, rest)) if !rest.is_empty() => rest,
        _ => return path.to_vec(),
    };
    let pivot = nodes
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    nodes[pivot..]
        .iter()
        .chain(nodes[..pivot].iter())
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Conflicts
// ---------------------------------------------------------------------------

/// Check every unordered pair of `ids` for a declared conflict.
///
/// Only the ids given are checked, not their dependencies. A pair is reported
/// once, with the declaring side first; symmetry is not assumed, so a
/// conflict declared by neither side is not a conflict.
pub fn detect_conflicts<S: AsRef<str>>(ids: &[S], registry: &Registry) -> Vec<Conflict> {
    let mut seen = HashSet::new();
    let unique: Vec<&str> = ids
        .iter()
        .map(|s| s.as_ref())
        .filter(|s| seen.insert(*s))
        .collect();

    let mut conflicts = Vec::new();
    for (i, a) in unique.iter().enumerate() {
        for b in &unique[i + 1..] {
            let a_declares = registry
                .get(a)
                .map(|c| c.declares_conflict_with(b))
                .unwrap_or(false);
            let b_declares = registry
                .get(b)
                .map(|c| c.declares_conflict_with(a))
                .unwrap_or(false);
            if a_declares {
                conflicts.push(Conflict::declared(a, b));
            } else if b_declares {
                conflicts.push(Conflict::declared(b, a));
            }
        }
    }
    conflicts
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

/// Capabilities that compose well with `ids`, excluding those already
/// selected and those missing from the registry. Sorted.
pub fn get_recommended_capabilities<S: AsRef<str>>(
    ids: &[S],
    registry: &Registry,
) -> Vec<String> {
    let selected: HashSet<&str> = ids.iter().map(|s| s.as_ref()).collect();

    let recommended: BTreeSet<&str> = selected
        .iter()
        .filter_map(|id| registry.get(id))
        .flat_map(|cap| cap.composable_with.iter())
        .map(|s| s.as_str())
        .filter(|s| !selected.contains(s) && registry.contains(s))
        .collect();

    recommended.into_iter().map(str::to_string).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
