use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Golden dataset not found: {0}")]
    NotFound(Uuid),

    #[error("Custom test '{name}' errored: {message}")]
    Test { name: String, message: String },

    #[error("Audit log error: {0}")]
    AuditLog(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GuardError {
    pub fn test(name: impl Into<String>, message: impl Into<String>) -> Self {
        GuardError::Test {
            name: name.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GuardError>;
