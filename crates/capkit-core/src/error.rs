use thiserror::Error;

#[derive(Debug, Error)]
pub enum CapkitError {
    #[error("invalid capability metadata in '{record}': {reason}")]
    Schema { record: String, reason: String },

    #[error("capability not found: {0}")]
    Resolution(String),

    #[error("invalid agent name '{0}': use letters, digits, '-' and '_'")]
    InvalidAgentName(String),

    #[error("{field} '{value}' is not one of: {expected}")]
    InvalidValue {
        field: &'static str,
        value: String,
        expected: String,
    },

    #[error("agent config not found: {0}")]
    AgentConfigNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl CapkitError {
    pub(crate) fn schema(record: impl Into<String>, reason: impl Into<String>) -> Self {
        CapkitError::Schema {
            record: record.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CapkitError>;
