//! Configuration for dolphin-memory

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Configuration for the memory store
#[derive(Debug, Clone)]
pub struct Config {
    /// Base directory for all storage
    pub data_dir: PathBuf,

    /// Embedding model name (for reference, actual model set in embedding.rs)
    pub embedding_model: String,

    /// Embedding dimensions (384 for all-MiniLM-L6-v2)
    pub embedding_dimensions: usize,

    /// Maximum chunk length in characters
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,

    /// Number of chunks retrieved to ground an answer
    pub max_retrieval_results: usize,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dolphin");

        Self {
            data_dir,
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            embedding_dimensions: 384, // MiniLM-L6-v2 outputs 384-dim vectors
            chunk_size: 1000,
            chunk_overlap: 200,
            max_retrieval_results: 3,
        }
    }
}

impl Config {
    /// Create a new config with a custom data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Get the path to the SQLite docstore
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("docstore.db")
    }

    /// Get the path to the vector index
    pub fn vector_db_path(&self) -> PathBuf {
        self.data_dir.join("index")
    }

    /// Get the path to the conversation transcript
    pub fn transcript_path(&self) -> PathBuf {
        self.data_dir.join("transcript.jsonl")
    }

    /// Ensure all required directories exist
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(self.vector_db_path())?;
        Ok(())
    }

    /// Reject settings the splitter and retriever cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::config("chunk_size must be greater than zero"));
        }
        if self.chunk_overlap > self.chunk_size {
            return Err(Error::config(format!(
                "chunk_overlap ({}) is larger than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.max_retrieval_results == 0 {
            return Err(Error::config("max_retrieval_results must be greater than zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_live_under_data_dir() {
        let config = Config::with_data_dir("/tmp/dolphin-test");
        assert_eq!(config.sqlite_path(), PathBuf::from("/tmp/dolphin-test/docstore.db"));
        assert_eq!(config.vector_db_path(), PathBuf::from("/tmp/dolphin-test/index"));
        assert_eq!(
            config.transcript_path(),
            PathBuf::from("/tmp/dolphin-test/transcript.jsonl")
        );
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.max_retrieval_results, 3);
    }

    #[test]
    fn overlap_larger_than_chunk_is_rejected() {
        let config = Config {
            chunk_size: 100,
            chunk_overlap: 150,
            ..Config::with_data_dir("/tmp/x")
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
