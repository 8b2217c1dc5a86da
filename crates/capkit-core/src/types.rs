use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// CapabilityType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityType {
    Skill,
    Workflow,
    Command,
    Agent,
}

impl CapabilityType {
    pub fn all() -> &'static [CapabilityType] {
        &[
            CapabilityType::Skill,
            CapabilityType::Workflow,
            CapabilityType::Command,
            CapabilityType::Agent,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CapabilityType::Skill => "skill",
            CapabilityType::Workflow => "workflow",
            CapabilityType::Command => "command",
            CapabilityType::Agent => "agent",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|t| t.as_str() == s)
    }

    /// Comma-separated legal values, for error messages.
    pub fn legal_values() -> String {
        join_names(Self::all().iter().map(|t| t.as_str()))
    }
}

impl fmt::Display for CapabilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CapabilityType {
    type Err = crate::error::CapkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| crate::error::CapkitError::InvalidValue {
            field: "type",
            value: s.to_string(),
            expected: Self::legal_values(),
        })
    }
}

// ---------------------------------------------------------------------------
// CapabilityStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityStatus {
    Stable,
    Beta,
    Experimental,
    Deprecated,
}

impl CapabilityStatus {
    pub fn all() -> &'static [CapabilityStatus] {
        &[
            CapabilityStatus::Stable,
            CapabilityStatus::Beta,
            CapabilityStatus::Experimental,
            CapabilityStatus::Deprecated,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CapabilityStatus::Stable => "stable",
            CapabilityStatus::Beta => "beta",
            CapabilityStatus::Experimental => "experimental",
            CapabilityStatus::Deprecated => "deprecated",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|st| st.as_str() == s)
    }

    pub fn legal_values() -> String {
        join_names(Self::all().iter().map(|st| st.as_str()))
    }
}

impl fmt::Display for CapabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CapabilityStatus {
    type Err = crate::error::CapkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| crate::error::CapkitError::InvalidValue {
            field: "status",
            value: s.to_string(),
            expected: Self::legal_values(),
        })
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
