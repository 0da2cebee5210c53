use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReviewerError>;

#[derive(Error, Debug)]
pub enum ReviewerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<config::ConfigError> for ReviewerError {
    fn from(e: config::ConfigError) -> Self {
        ReviewerError::Config(e.to_string())
    }
}

pub mod commands;
pub mod config;
pub mod coverage;
pub mod database;
pub mod embeddings;
pub mod llm;
pub mod parser;
pub mod rag;
pub mod reviewer;
