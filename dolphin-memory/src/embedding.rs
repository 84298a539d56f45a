//! Embedding generation using fastembed (local, no API keys)

use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::error::{Error, Result};

/// Maps text to a fixed-length vector
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, failing on the first error
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Length of every vector this embedder produces
    fn dimensions(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Embedding service backed by a local fastembed model
pub struct EmbeddingService {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
    dimensions: usize,
}

impl EmbeddingService {
    /// Create a new embedding service with local model
    pub fn new(config: &Config) -> Result<Self> {
        let model_kind = resolve_model(&config.embedding_model)?;

        // Model downloads automatically on first use to ~/.cache/fastembed
        let model = TextEmbedding::try_new(
            InitOptions::new(model_kind).with_show_download_progress(true),
        )
        .map_err(|e| Error::embedding(format!("Failed to load embedding model: {}", e)))?;

        tracing::debug!(model = %config.embedding_model, "embedding model loaded");

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            model_name: config.embedding_model.clone(),
            dimensions: config.embedding_dimensions,
        })
    }
}

#[async_trait]
impl Embedder for EmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut guard = self.model.lock().await;
        let embeddings = guard
            .embed(vec![text.to_string()], None)
            .map_err(|e| Error::embedding(format!("Embedding failed: {}", e)))?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut guard = self.model.lock().await;
        let embeddings = guard
            .embed(texts.to_vec(), None)
            .map_err(|e| Error::embedding(format!("Embedding failed: {}", e)))?;

        if embeddings.len() != texts.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

fn resolve_model(name: &str) -> Result<EmbeddingModel> {
    match name {
        "all-MiniLM-L6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "all-MiniLM-L12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        other => Err(Error::config(format!("Unsupported embedding model: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingAfter {
        calls: AtomicUsize,
        limit: usize,
    }

    #[async_trait]
    impl Embedder for FailingAfter {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n >= self.limit {
                return Err(Error::embedding("model unavailable"));
            }
            Ok(vec![n as f32; 2])
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn default_batch_stops_at_first_failure() {
        let embedder = FailingAfter {
            calls: AtomicUsize::new(0),
            limit: 1,
        };
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let result = embedder.embed_batch(&texts).await;
        assert!(matches!(result, Err(Error::Embedding(_))));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn known_models_resolve() {
        assert!(resolve_model("all-MiniLM-L6-v2").is_ok());
        assert!(matches!(resolve_model("gpt-embed"), Err(Error::Config(_))));
    }
}
