use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root of the capability tree, relative to the project root.
    #[serde(default = "default_capabilities_dir")]
    pub capabilities_dir: String,
    /// Resolved-set size above which the agent validator suggests narrowing scope.
    #[serde(default = "default_max_resolved")]
    pub max_resolved_capabilities: usize,
    #[serde(default)]
    pub mirror_conflicts: bool,
    #[serde(default = "default_warn_on_deprecated")]
    pub warn_on_deprecated: bool,
}

fn default_capabilities_dir() -> String {
    paths::DEFAULT_CAPABILITIES_DIR.to_string()
}

fn default_max_resolved() -> usize {
    15
}

fn default_warn_on_deprecated() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capabilities_dir: default_capabilities_dir(),
            max_resolved_capabilities: default_max_resolved(),
            mirror_conflicts: false,
            warn_on_deprecated: default_warn_on_deprecated(),
        }
    }
}

impl EngineConfig {
    /// Load `.capkit/config.yaml`. Returns defaults if the file is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: EngineConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&paths::config_path(root), data.as_bytes())
    }

    pub fn capabilities_root(&self, root: &Path) -> PathBuf {
        root.join(&self.capabilities_dir)
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.capabilities_dir.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "capabilities_dir is empty".to_string(),
            });
        } else if Path::new(&self.capabilities_dir).is_absolute() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "capabilities_dir '{}' is absolute; the project will not be portable",
                    self.capabilities_dir
                ),
            });
        }

        if self.max_resolved_capabilities == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "max_resolved_capabilities is 0; every agent will be flagged as too broad"
                    .to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
