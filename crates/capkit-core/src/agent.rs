//! Agent configurations and their validation against a capability registry.

use crate::compose::{self, Violation};
use crate::config::EngineConfig;
use crate::error::{CapkitError, Result};
use crate::paths;
use crate::registry::Registry;
use crate::types::CapabilityStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// AgentConfig
// ---------------------------------------------------------------------------

/// A named bundle of selected capabilities plus behavioural guidance for an
/// agent runtime. Capabilities are referenced by id and are not resolved here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub context_priority: Vec<String>,
    #[serde(default)]
    pub agent_instructions: Vec<String>,
    #[serde(default)]
    pub required_files: Vec<String>,
    #[serde(default)]
    pub optional_files: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_status")]
    pub status: CapabilityStatus,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_status() -> CapabilityStatus {
    CapabilityStatus::Experimental
}

impl AgentConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            description: String::new(),
            created: Utc::now(),
            author: String::new(),
            capabilities: Vec::new(),
            context_priority: Vec::new(),
            agent_instructions: Vec::new(),
            required_files: Vec::new(),
            optional_files: Vec::new(),
            tags: Vec::new(),
            status: default_status(),
        }
    }

    /// Add a capability id. Returns `false` if already selected.
    pub fn add_capability(&mut self, id: &str) -> bool {
        if self.capabilities.iter().any(|c| c == id) {
            return false;
        }
        self.capabilities.push(id.to_string());
        true
    }

    /// Remove a capability id. Returns `false` if it was not selected.
    pub fn remove_capability(&mut self, id: &str) -> bool {
        let before = self.capabilities.len();
        self.capabilities.retain(|c| c != id);
        self.capabilities.len() < before
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    pub fn load(root: &Path, name: &str) -> Result<Self> {
        let path = paths::agent_config_path(root, name)?;
        if !path.exists() {
            return Err(CapkitError::AgentConfigNotFound(name.to_string()));
        }
        let data = std::fs::read_to_string(&path)?;
        let agent: AgentConfig = serde_yaml::from_str(&data)?;
        Ok(agent)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::agent_config_path(root, &self.name)?;
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn list(root: &Path) -> Result<Vec<Self>> {
        let dir = root.join(paths::AGENTS_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut agents = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(name) if paths::validate_agent_name(name).is_ok() => {
                    agents.push(Self::load(root, name)?);
                }
                _ => {}
            }
        }
        agents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(agents)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Result of validating an agent. `errors` block use of the agent;
/// `warnings` are advisory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AgentValidation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Structured form of the cycle and conflict errors.
    pub violations: Vec<Violation>,
}

impl AgentValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn violation(&mut self, v: Violation) {
        self.errors.push(v.to_string());
        self.violations.push(v);
    }
}

pub fn validate_agent_config(agent: &AgentConfig, registry: &Registry) -> AgentValidation {
    validate_agent_config_with(agent, registry, &EngineConfig::default())
}

pub fn validate_agent_config_with(
    agent: &AgentConfig,
    registry: &Registry,
    cfg: &EngineConfig,
) -> AgentValidation {
    let mut report = AgentValidation::default();

    if agent.capabilities.is_empty() {
        report
            .errors
            .push(format!("agent '{}' has no capabilities selected", agent.name));
        return report;
    }

    // Nothing below is meaningful against an incomplete picture.
    let missing: Vec<&str> = agent
        .capabilities
        .iter()
        .map(|s| s.as_str())
        .filter(|id| !registry.contains(id))
        .collect();
    if !missing.is_empty() {
        report
            .errors
            .push(format!("unknown capabilities: {}", missing.join(", ")));
        return report;
    }

    let mut seen_cycles = HashSet::new();
    for id in &agent.capabilities {
        if let Some(path) = compose::detect_circular_dependencies(id, registry) {
            if seen_cycles.insert(compose::cycle_key(&path)) {
                report.violation(Violation::Cycle { path });
            }
        }
    }

    for conflict in compose::detect_conflicts(&agent.capabilities, registry) {
        report.violation(Violation::Conflict(conflict));
    }

    if agent.context_priority.is_empty() {
        report
            .warnings
            .push("no context_priority set; the agent has no focus order".to_string());
    }
    if agent.agent_instructions.is_empty() {
        report
            .warnings
            .push("no agent_instructions set".to_string());
    }
    if agent.author.trim().is_empty() {
        report.warnings.push("author is empty".to_string());
    }

    if cfg.warn_on_deprecated {
        for id in &agent.capabilities {
            if registry.get(id).map(|c| c.is_deprecated()).unwrap_or(false) {
                report
                    .warnings
                    .push(format!("capability '{id}' is deprecated"));
            }
        }
    }

    match compose::resolve_dependencies(&agent.capabilities, registry, true) {
        Ok(resolved) if resolved.len() > cfg.max_resolved_capabilities => {
            report.warnings.push(format!(
                "agent resolves to {} capabilities (soft limit {}); consider narrowing its scope",
                resolved.len(),
                cfg.max_resolved_capabilities
            ));
        }
        Ok(_) => {}
        Err(e) => report
            .errors
            .push(format!("dependency resolution failed: {e}")),
    }

    report
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{cap, registry};
    use tempfile::TempDir;

    fn complete_agent(caps: &[&str]) -> AgentConfig {
        let mut agent = AgentConfig::new("reviewer");
        agent.author = "capkit".to_string();
        agent.context_priority = vec!["correctness first".to_string()];
        agent.agent_instructions = vec!["explain every finding".to_string()];
        for c in caps {
            agent.add_capability(c);
        }
        agent
    }

    fn base_registry() -> Registry {
        registry(vec![
            cap("skills/testing").composes_with(&["skills/debugging"]),
            cap("skills/debugging").requires(&["skills/testing"]),
            cap("workflows/bug-fix").requires(&["skills/testing", "skills/debugging"]),
        ])
    }

    #[test]
    fn clean_agent_has_no_findings() {
        let agent = complete_agent(&["workflows/bug-fix"]);
        let report = validate_agent_config(&agent, &base_registry());
        assert!(report.is_valid());
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn empty_selection_fails_fast() {
        let report = validate_agent_config(&complete_agent(&[]), &base_registry());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("no capabilities"));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn unknown_capability_stops_analysis() {
        let reg = registry(vec![
            cap("a").requires(&["b"]),
            cap("b").requires(&["a"]),
            cap("c").conflicts_with(&["a"]),
        ]);
        let mut agent = complete_agent(&["a", "c", "ghost"]);
        agent.author.clear();

        let report = validate_agent_config(&agent, &reg);
        assert_eq!(report.errors, vec!["unknown capabilities: ghost".to_string()]);
        assert!(report.warnings.is_empty());
        assert!(report.violations.is_empty());
    }

    #[test]
    fn cycles_reported_once_per_cycle() {
        let reg = registry(vec![cap("a").requires(&["b"]), cap("b").requires(&["a"])]);
        let report = validate_agent_config(&complete_agent(&["a", "b"]), &reg);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0], "circular dependency: a -> b -> a");
        assert!(matches!(report.violations[0], Violation::Cycle { .. }));
    }

    #[test]
    fn conflicts_are_errors() {
        let reg = registry(vec![cap("a").conflicts_with(&["b"]), cap("b")]);
        let report = validate_agent_config(&complete_agent(&["b", "a"]), &reg);
        assert!(!report.is_valid());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("'a' declares a conflict with 'b'"));
    }

    #[test]
    fn advisory_warnings_for_missing_guidance() {
        let mut agent = AgentConfig::new("bare");
        agent.add_capability("skills/testing");
        let report = validate_agent_config(&agent, &base_registry());
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 3);
    }

    #[test]
    fn broad_agents_warned_past_soft_limit() {
        let ids: Vec<String> = (0..16).map(|i| format!("skills/s{i:02}")).collect();
        let reg = registry(ids.iter().map(|id| cap(id)).collect());
        let id_refs: Vec<&str> = ids.iter().map(|s| s.as_str()).collect();

        let report = validate_agent_config(&complete_agent(&id_refs), &reg);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("16 capabilities"));

        let at_limit = validate_agent_config(&complete_agent(&id_refs[..15]), &reg);
        assert!(at_limit.warnings.is_empty());
    }

    #[test]
    fn soft_limit_counts_optional_dependencies() {
        let reg = registry(vec![cap("a").optionally(&["b", "c"]), cap("b"), cap("c")]);
        let cfg = EngineConfig {
            max_resolved_capabilities: 2,
            ..EngineConfig::default()
        };
        let report = validate_agent_config_with(&complete_agent(&["a"]), &reg, &cfg);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("3 capabilities"));
    }

    #[test]
    fn missing_transitive_dependency_is_an_error() {
        let reg = registry(vec![cap("a").requires(&["gone"])]);
        let report = validate_agent_config(&complete_agent(&["a"]), &reg);
        assert_eq!(
            report.errors,
            vec!["dependency resolution failed: capability not found: gone".to_string()]
        );
    }

    #[test]
    fn deprecated_selection_warns_unless_disabled() {
        let reg = registry(vec![cap("old").status(CapabilityStatus::Deprecated)]);
        let agent = complete_agent(&["old"]);
        let report = validate_agent_config(&agent, &reg);
        assert_eq!(report.warnings, vec!["capability 'old' is deprecated".to_string()]);

        let cfg = EngineConfig {
            warn_on_deprecated: false,
            ..EngineConfig::default()
        };
        assert!(validate_agent_config_with(&agent, &reg, &cfg).warnings.is_empty());
    }

    #[test]
    fn add_remove_capability_idempotent() {
        let mut agent = AgentConfig::new("x");
        assert!(agent.add_capability("skills/testing"));
        assert!(!agent.add_capability("skills/testing"));
        assert!(agent.remove_capability("skills/testing"));
        assert!(!agent.remove_capability("skills/testing"));
    }

    #[test]
    fn save_load_list() {
        let dir = TempDir::new().unwrap();
        complete_agent(&["skills/testing"]).save(dir.path()).unwrap();
        AgentConfig::new("architect").save(dir.path()).unwrap();

        let loaded = AgentConfig::load(dir.path(), "reviewer").unwrap();
        assert_eq!(loaded.capabilities, vec!["skills/testing"]);
        assert_eq!(loaded.author, "capkit");

        let names: Vec<String> = AgentConfig::list(dir.path())
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["architect", "reviewer"]);

        assert!(matches!(
            AgentConfig::load(dir.path(), "ghost"),
            Err(CapkitError::AgentConfigNotFound(_))
        ));
    }

    #[test]
    fn load_and_save_reject_traversal_names() {
        let dir = TempDir::new().unwrap();
        let outside = dir.path().join("secret.yaml");
        std::fs::write(&outside, "name: secret\ncreated: 2024-05-01T00:00:00Z\n").unwrap();

        assert!(matches!(
            AgentConfig::load(dir.path(), "../../secret"),
            Err(CapkitError::InvalidAgentName(_))
        ));
        assert!(matches!(
            AgentConfig::new("../escape").save(dir.path()),
            Err(CapkitError::InvalidAgentName(_))
        ));
        assert!(!dir.path().join(".capkit/escape.yaml").exists());
    }

    #[test]
    fn minimal_yaml_fills_defaults() {
        let yaml = "name: tiny\ncreated: 2024-05-01T00:00:00Z\ncapabilities: [skills/testing]\n";
        let agent: AgentConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(agent.version, "1.0.0");
        assert_eq!(agent.status, CapabilityStatus::Experimental);
        assert!(agent.context_priority.is_empty());
    }
}
