use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Slack API error: {0}")]
    Api(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Task error: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
