//! Error types for the portfolio optimizer

use thiserror::Error;

use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed position: {0}")]
    MalformedPosition(String),

    #[error("Invalid risk score {0}: expected a value between 0 and 10")]
    InvalidRiskScore(f64),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool not registered: {0}")]
    ToolUnavailable(String),

    #[error("Data API error: {0}")]
    DataApi(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
