use thiserror::Error;

#[derive(Debug, Error)]
pub enum SibylError {
    // LLM errors
    #[error("LLM request failed: {0}")]
    LlmRequest(String),

    #[error("LLM response parse error: {0}")]
    LlmParse(String),

    #[error("LLM provider not supported: {0}")]
    UnsupportedProvider(String),

    // Collaborator errors
    #[error("Dataset directory error: {0}")]
    Directory(String),

    #[error("Insight store error: {0}")]
    InsightStore(String),

    // Orchestration errors
    #[error("Agent '{0}' not found in registry")]
    UnknownAgent(String),

    #[error("Run exceeded max hops ({0})")]
    MaxHopsExceeded(usize),

    #[error("Run cancelled")]
    Cancelled,

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SibylError>;
