use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordRulesError {
    #[error("Duplicate rule id: {rule_id}")]
    DuplicateRule { rule_id: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RecordRulesError>;
