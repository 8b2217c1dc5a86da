//! Capability metadata records and the parser that validates them.
//!
//! A capability is declared as a YAML mapping. The parser checks required
//! fields, closed enum values and the version string, defaults the composition
//! lists to empty, and keeps the original mapping in `raw_metadata` so unknown
//! fields survive a round trip.

use crate::error::{CapkitError, Result};
use crate::types::{CapabilityStatus, CapabilityType};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

/// A declarative record as read from the source, before validation.
pub type RawRecord = BTreeMap<String, serde_yaml::Value>;

pub const REQUIRED_FIELDS: &[&str] = &[
    "name",
    "type",
    "version",
    "description",
    "category",
    "tags",
    "status",
    "author",
    "last_updated",
];

// ---------------------------------------------------------------------------
// Sub-records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dependencies {
    pub required: Vec<String>,
    pub optional: Vec<String>,
    pub suggested: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Relevance {
    pub triggers: Vec<String>,
    pub contexts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSpec {
    pub steps: Vec<String>,
    pub estimated_duration: Option<String>,
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSpec {
    pub idempotent: bool,
    pub side_effects: Vec<String>,
    pub prerequisites: Vec<String>,
}

/// Extra fields carried only by workflow and command capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypePayload {
    Workflow(WorkflowSpec),
    Command(CommandSpec),
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Capability {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub capability_type: CapabilityType,
    pub version: String,
    pub status: CapabilityStatus,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub author: String,
    pub last_updated: String,
    pub dependencies: Dependencies,
    pub conflicts: Vec<String>,
    pub composable_with: Vec<String>,
    pub agent_roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance: Option<Relevance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<TypePayload>,
    pub raw_metadata: RawRecord,
}

impl Capability {
    pub fn required(&self) -> &[String] {
        &self.dependencies.required
    }

    pub fn optional(&self) -> &[String] {
        &self.dependencies.optional
    }

    pub fn declares_conflict_with(&self, other: &str) -> bool {
        self.conflicts.iter().any(|c| c == other)
    }

    pub fn is_deprecated(&self) -> bool {
        self.status == CapabilityStatus::Deprecated
    }

    pub fn workflow(&self) -> Option<&WorkflowSpec> {
        match &self.payload {
            Some(TypePayload::Workflow(w)) => Some(w),
            _ => None,
        }
    }

    pub fn command(&self) -> Option<&CommandSpec> {
        match &self.payload {
            Some(TypePayload::Command(c)) => Some(c),
            _ => None,
        }
    }

    /// Case-insensitive match against triggers, tags, name and description.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let needle = keyword.to_lowercase();
        let hit = |s: &String| s.to_lowercase().contains(&needle);
        self.relevance
            .as_ref()
            .map(|r| r.triggers.iter().any(hit))
            .unwrap_or(false)
            || self.tags.iter().any(hit)
            || hit(&self.name)
            || hit(&self.description)
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

static SEMVER_RE: OnceLock<Regex> = OnceLock::new();

fn semver_re() -> &'static Regex {
    SEMVER_RE.get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+$").unwrap())
}

pub fn is_valid_version(version: &str) -> bool {
    semver_re().is_match(version)
}

/// Validate `raw` and build a `Capability` with the given `id`.
///
/// `origin` identifies the record in error messages (usually a file path).
pub fn parse_capability(id: &str, raw: RawRecord, origin: &str) -> Result<Capability> {
    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|f| field(&raw, f).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(CapkitError::schema(
            origin,
            format!("missing required fields: {}", missing.join(", ")),
        ));
    }

    let type_name = string_field(&raw, "type", origin)?;
    let capability_type = CapabilityType::from_name(&type_name).ok_or_else(|| {
        CapkitError::schema(
            origin,
            format!(
                "invalid type '{type_name}', must be one of: {}",
                CapabilityType::legal_values()
            ),
        )
    })?;

    let status_name = string_field(&raw, "status", origin)?;
    let status = CapabilityStatus::from_name(&status_name).ok_or_else(|| {
        CapkitError::schema(
            origin,
            format!(
                "invalid status '{status_name}', must be one of: {}",
                CapabilityStatus::legal_values()
            ),
        )
    })?;

    let version = string_field(&raw, "version", origin)?;
    if !is_valid_version(&version) {
        return Err(CapkitError::schema(
            origin,
            format!("invalid version '{version}', expected MAJOR.MINOR.PATCH"),
        ));
    }

    let payload = match capability_type {
        CapabilityType::Workflow => Some(TypePayload::Workflow(WorkflowSpec {
            steps: typed_field(&raw, "steps", origin)?.unwrap_or_default(),
            estimated_duration: typed_field(&raw, "estimated_duration", origin)?,
            outputs: typed_field(&raw, "outputs", origin)?.unwrap_or_default(),
        })),
        CapabilityType::Command => Some(TypePayload::Command(CommandSpec {
            idempotent: typed_field(&raw, "idempotent", origin)?.unwrap_or_default(),
            side_effects: typed_field(&raw, "side_effects", origin)?.unwrap_or_default(),
            prerequisites: typed_field(&raw, "prerequisites", origin)?.unwrap_or_default(),
        })),
        CapabilityType::Skill | CapabilityType::Agent => None,
    };

    Ok(Capability {
        id: id.to_string(),
        name: string_field(&raw, "name", origin)?,
        capability_type,
        version,
        status,
        description: string_field(&raw, "description", origin)?,
        category: string_field(&raw, "category", origin)?,
        tags: required_typed(&raw, "tags", origin)?,
        author: string_field(&raw, "author", origin)?,
        last_updated: string_field(&raw, "last_updated", origin)?,
        dependencies: typed_field(&raw, "dependencies", origin)?.unwrap_or_default(),
        conflicts: typed_field(&raw, "conflicts", origin)?.unwrap_or_default(),
        composable_with: typed_field(&raw, "composable_with", origin)?.unwrap_or_default(),
        agent_roles: typed_field(&raw, "agent_roles", origin)?.unwrap_or_default(),
        relevance: typed_field(&raw, "relevance", origin)?,
        payload,
        raw_metadata: raw,
    })
}

/// Parse YAML text holding one capability record.
pub fn parse_capability_str(id: &str, text: &str, origin: &str) -> Result<Capability> {
    let raw: RawRecord = serde_yaml::from_str(text)?;
    parse_capability(id, raw, origin)
}

/// Read and parse a single named metadata file. Errors go straight to the
/// caller; only bulk loading tolerates malformed records.
pub fn parse_capability_file(path: &Path, id: &str) -> Result<Capability> {
    let text = std::fs::read_to_string(path)?;
    parse_capability_str(id, &text, &path.display().to_string())
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// A present, non-null field.
fn field<'a>(raw: &'a RawRecord, key: &str) -> Option<&'a serde_yaml::Value> {
    raw.get(key).filter(|v| !v.is_null())
}

fn string_field(raw: &RawRecord, key: &str, origin: &str) -> Result<String> {
    use serde_yaml::Value;
    match field(raw, key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(_) => Err(CapkitError::schema(
            origin,
            format!("field '{key}' must be a string"),
        )),
        None => Err(CapkitError::schema(
            origin,
            format!("missing required fields: {key}"),
        )),
    }
}

fn typed_field<T: DeserializeOwned>(
    raw: &RawRecord,
    key: &str,
    origin: &str,
) -> Result<Option<T>> {
    field(raw, key)
        .map(|v| {
            serde_yaml::from_value(v.clone()).map_err(|e| {
                CapkitError::schema(origin, format!("field '{key}' is malformed: {e}"))
            })
        })
        .transpose()
}

fn required_typed<T: DeserializeOwned>(
    raw: &RawRecord,
    key: &str,
    origin: &str,
) -> Result<T> {
    typed_field(raw, key, origin)?.ok_or_else(|| {
        CapkitError::schema(origin, format!("missing required fields: {key}"))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
