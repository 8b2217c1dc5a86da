use crate::error::{CapkitError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CAPKIT_DIR: &str = ".capkit";
pub const CONFIG_FILE: &str = ".capkit/config.yaml";
pub const AGENTS_DIR: &str = ".capkit/agents";

pub const DEFAULT_CAPABILITIES_DIR: &str = "capabilities";

/// File names recognised as capability metadata, in lookup order.
pub const METADATA_FILES: &[&str] = &["metadata.yaml", "metadata.yml"];

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn agent_config_path(root: &Path, name: &str) -> Result<PathBuf> {
    validate_agent_name(name)?;
    Ok(root.join(AGENTS_DIR).join(format!("{name}.yaml")))
}

/// Turn a directory path relative to the capability root into an id,
/// always `/`-separated regardless of platform.
pub fn capability_id(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

// ---------------------------------------------------------------------------
// Agent name validation
// ---------------------------------------------------------------------------

static AGENT_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn agent_name_re() -> &'static Regex {
    AGENT_NAME_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_\-]*$").unwrap())
}

/// Agent names become file names under `.capkit/agents`, so separators,
/// dots and leading punctuation are rejected.
pub fn validate_agent_name(name: &str) -> Result<()> {
    if name.len() > 64 || !agent_name_re().is_match(name) {
        return Err(CapkitError::InvalidAgentName(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
