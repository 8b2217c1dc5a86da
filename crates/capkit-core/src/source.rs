//! Where capability records come from.
//!
//! A source is a tree of named records addressed by hierarchical path. The
//! loader only needs the flattened list of entries; each entry carries its own
//! parse result so one unreadable record never hides the rest.

use crate::capability::RawRecord;
use crate::error::Result;
use crate::paths;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One record found in a source, not yet validated against the schema.
#[derive(Debug)]
pub struct SourceEntry {
    /// Hierarchical id, e.g. `skills/testing`.
    pub id: String,
    /// Human-readable location used in error messages.
    pub origin: String,
    pub record: Result<RawRecord>,
}

pub trait CapabilitySource {
    /// Enumerate every record, sorted by id. Errors here mean the source as a
    /// whole could not be read; per-record failures live in `SourceEntry::record`.
    fn entries(&self) -> Result<Vec<SourceEntry>>;
}

// ---------------------------------------------------------------------------
// DirSource
// ---------------------------------------------------------------------------

/// A directory tree where every directory holding a `metadata.yaml` (or
/// `metadata.yml`) is a capability whose id is its path relative to the root.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk one capability directory below the root. A directory that cannot
    /// be listed becomes a failed entry so the loader skips it like any other
    /// malformed record.
    fn walk(&self, dir: &Path, out: &mut Vec<SourceEntry>) {
        let relative = dir.strip_prefix(&self.root).unwrap_or(dir);
        let id = paths::capability_id(relative);

        let listing = match std::fs::read_dir(dir) {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!(
                    dir = %dir.display(),
                    error = %e,
                    "unreadable capability directory"
                );
                out.push(SourceEntry {
                    id,
                    origin: dir.display().to_string(),
                    record: Err(e.into()),
                });
                return;
            }
        };

        if let Some(file) = metadata_file(dir) {
            out.push(SourceEntry {
                id,
                origin: file.display().to_string(),
                record: read_record(&file),
            });
        }
        self.walk_listing(listing, out);
    }

    fn walk_listing(&self, listing: std::fs::ReadDir, out: &mut Vec<SourceEntry>) {
        for entry in listing {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(
                        root = %self.root.display(),
                        error = %e,
                        "unreadable directory entry"
                    );
                    continue;
                }
            };
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir && !hidden {
                self.walk(&entry.path(), out);
            }
        }
    }
}

impl CapabilitySource for DirSource {
    fn entries(&self) -> Result<Vec<SourceEntry>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        // only the root itself failing to list is fatal
        let listing = std::fs::read_dir(&self.root)?;
        let mut out = Vec::new();
        self.walk_listing(listing, &mut out);
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }
}

fn metadata_file(dir: &Path) -> Option<PathBuf> {
    paths::METADATA_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

fn read_record(path: &Path) -> Result<RawRecord> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&text)?)
}

// ---------------------------------------------------------------------------
// MemorySource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Stored {
    Record(RawRecord),
    Yaml(String),
}

/// An in-memory source, for embedders that already hold the records and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: BTreeMap<String, Stored>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, record: RawRecord) -> &mut Self {
        self.records.insert(id.into(), Stored::Record(record));
        self
    }

    /// Store unparsed YAML; it is parsed when the source is enumerated.
    pub fn insert_yaml(&mut self, id: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.records.insert(id.into(), Stored::Yaml(text.into()));
        self
    }
}

impl CapabilitySource for MemorySource {
    fn entries(&self) -> Result<Vec<SourceEntry>> {
        Ok(self
            .records
            .iter()
            .map(|(id, stored)| SourceEntry {
                id: id.clone(),
                origin: format!("memory:{id}"),
                record: match stored {
                    Stored::Record(r) => Ok(r.clone()),
                    Stored::Yaml(text) => serde_yaml::from_str(text).map_err(Into::into),
                },
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
