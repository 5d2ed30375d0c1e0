use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Workflow engine error: {0}")]
    Engine(String),

    #[error("Resolve/resume failed: {0}")]
    Resume(String),

    #[error("Prediction API error: {0}")]
    PredictionApi(String),

    #[error("Job ended with terminal status '{status}'")]
    PollFailed { status: String },

    #[error("Job did not reach a terminal status after {attempts} attempts")]
    PollTimeout { attempts: u32 },

    #[error("Poll cancelled")]
    Cancelled,

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Clarification not found: {0}")]
    ClarificationNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
