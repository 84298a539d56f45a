//! Failures of the memory store: docstore, vector index, embedder and transcript

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Poisoned docstore lock, or rows that do not decode into entries
    #[error("Storage error: {0}")]
    Storage(String),

    /// The SQLite docstore
    #[error("Docstore error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Transcript lines
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Model load or inference failure; nothing from the call is stored
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// LanceDB index failures, including vectors of the wrong dimension
    #[error("Vector index error: {0}")]
    VectorDb(String),

    /// Invalid chunking or retrieval settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// An entry reached the writer without an embedding
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    pub fn vector_db(msg: impl Into<String>) -> Self {
        Self::VectorDb(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
