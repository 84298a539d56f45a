//! Memory entries and the store that coordinates embedding and storage

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::retrieval::{RetrievalContext, RetrievedChunk};
use crate::splitter::TextSplitter;
use crate::storage::{SqliteStorage, VectorStorage};

/// Text of the entry seeded into an empty store
pub const PLACEHOLDER_TEXT: &str = "This is a placeholder entry that initializes the memory store.";

/// What produced an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A chunk of something the user told us
    Statement,

    /// Seed entry so the index is never empty
    Placeholder,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::Statement => write!(f, "statement"),
            EntryKind::Placeholder => write!(f, "placeholder"),
        }
    }
}

/// One stored chunk of text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: Uuid,

    pub kind: EntryKind,

    /// Statement this chunk was split from (nil for the placeholder)
    pub statement_id: Uuid,

    /// Index of this chunk within its statement
    pub position: u32,

    pub content: String,

    /// Embedding vector (populated before writing, never read back from the docstore)
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,

    pub created_at: DateTime<Utc>,
}

impl MemoryEntry {
    pub fn statement_chunk(statement_id: Uuid, position: u32, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: EntryKind::Statement,
            statement_id,
            position,
            content: content.into(),
            embedding: None,
            created_at: Utc::now(),
        }
    }

    pub fn placeholder() -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: EntryKind::Placeholder,
            statement_id: Uuid::nil(),
            position: 0,
            content: PLACEHOLDER_TEXT.to_string(),
            embedding: None,
            created_at: Utc::now(),
        }
    }

    /// Set the embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// Counts reported by [`MemoryStore::stats`]
#[derive(Debug, Clone)]
pub struct MemoryStats {
    pub entries: usize,
    pub statements: usize,
    pub embedding_model: String,
    pub data_dir: PathBuf,
}

/// The vector memory store: splits, embeds, indexes and retrieves text
pub struct MemoryStore {
    config: Config,
    embedder: Arc<dyn Embedder>,
    splitter: TextSplitter,
    docstore: SqliteStorage,
    vector: VectorStorage,
}

impl MemoryStore {
    /// Open the persisted store under `config.data_dir`, seeding it if empty
    pub async fn open(config: Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
        config.validate()?;
        config.ensure_dirs()?;

        let splitter = TextSplitter::from_config(&config)?;
        let docstore = SqliteStorage::new(&config)?;
        let vector = VectorStorage::new(&config, embedder.dimensions()).await?;

        let store = Self {
            config,
            embedder,
            splitter,
            docstore,
            vector,
        };

        if store.docstore.count(None)? == 0 {
            tracing::info!(data_dir = ?store.config.data_dir, "initializing empty memory store");
            store.vector.clear().await?;
            store.seed_placeholder().await?;
        }

        Ok(store)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Split `text` into chunks, embed each one and append them all.
    ///
    /// Every chunk is embedded before anything is written, so an embedding
    /// failure leaves the store unchanged.
    pub async fn insert(&self, text: &str) -> Result<Vec<MemoryEntry>> {
        let chunks = self.splitter.split_text(text);
        if chunks.is_empty() {
            tracing::debug!("nothing to store");
            return Ok(Vec::new());
        }

        let embeddings = self.embedder.embed_batch(&chunks).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let statement_id = Uuid::new_v4();
        let entries: Vec<MemoryEntry> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(position, (chunk, embedding))| {
                MemoryEntry::statement_chunk(statement_id, position as u32, chunk)
                    .with_embedding(embedding)
            })
            .collect();

        self.write_entries(&entries).await?;

        tracing::info!(%statement_id, chunks = entries.len(), "stored statement");
        Ok(entries)
    }

    /// Return up to `k` stored chunks nearest to `text`, closest first
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let embedding = self.embedder.embed(text).await?;
        let hits = self.vector.search(&embedding, k).await?;

        let ids: Vec<Uuid> = hits.iter().map(|hit| hit.id).collect();
        let mut entries: HashMap<Uuid, MemoryEntry> = self
            .docstore
            .get_entries(&ids)?
            .into_iter()
            .map(|entry| (entry.id, entry))
            .collect();

        let chunks: Vec<RetrievedChunk> = hits
            .into_iter()
            .filter_map(|hit| {
                entries
                    .remove(&hit.id)
                    .map(|entry| RetrievedChunk::new(entry, hit.distance))
            })
            .collect();

        tracing::debug!(k, found = chunks.len(), "queried memory");
        Ok(chunks)
    }

    /// Query and bundle the results as prompt context
    pub async fn retrieve_context(&self, text: &str, k: usize) -> Result<RetrievalContext> {
        Ok(RetrievalContext::new(self.query(text, k).await?))
    }

    /// Forget everything; only the placeholder entry remains
    pub async fn reset(&self) -> Result<()> {
        self.vector.clear().await?;
        self.docstore.clear()?;
        self.seed_placeholder().await?;

        tracing::info!("memory cleared");
        Ok(())
    }

    /// Number of stored entries, placeholder included
    pub async fn len(&self) -> Result<usize> {
        self.docstore.count(None)
    }

    pub async fn stats(&self) -> Result<MemoryStats> {
        Ok(MemoryStats {
            entries: self.docstore.count(None)?,
            statements: self.docstore.count(Some(EntryKind::Statement))?,
            embedding_model: self.embedder.model_name().to_string(),
            data_dir: self.config.data_dir.clone(),
        })
    }

    async fn seed_placeholder(&self) -> Result<()> {
        let placeholder = MemoryEntry::placeholder();
        let embedding = self.embedder.embed(&placeholder.content).await?;
        self.write_entries(&[placeholder.with_embedding(embedding)]).await
    }

    async fn write_entries(&self, entries: &[MemoryEntry]) -> Result<()> {
        let vectors = entries
            .iter()
            .map(|entry| {
                entry
                    .embedding
                    .clone()
                    .map(|embedding| (entry.id, embedding))
                    .ok_or_else(|| Error::invalid_input(format!("Entry {} has no embedding", entry.id)))
            })
            .collect::<Result<Vec<_>>>()?;

        self.vector.add(&vectors).await?;
        self.docstore.save_entries(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    /// Deterministic embedder: one dimension per keyword, 1.0 when the text mentions it.
    struct KeywordEmbedder;

    const KEYWORDS: [&str; 8] = [
        "rust", "python", "cat", "dog", "paris", "music", "coffee", "boom",
    ];

    fn keyword_embedding(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        KEYWORDS
            .iter()
            .map(|kw| if lower.contains(kw) { 1.0 } else { 0.0 })
            .collect()
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(keyword_embedding(text))
        }

        fn dimensions(&self) -> usize {
            KEYWORDS.len()
        }

        fn model_name(&self) -> &str {
            "keyword-test"
        }
    }

    /// Fails on any text mentioning "boom".
    struct BoomEmbedder;

    #[async_trait]
    impl Embedder for BoomEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.contains("boom") {
                return Err(Error::embedding("model crashed"));
            }
            Ok(keyword_embedding(text))
        }

        fn dimensions(&self) -> usize {
            KEYWORDS.len()
        }

        fn model_name(&self) -> &str {
            "boom-test"
        }
    }

    async fn open_with(tmp: &TempDir, embedder: Arc<dyn Embedder>, config: Option<Config>) -> MemoryStore {
        let config = config.unwrap_or_else(|| Config::with_data_dir(tmp.path()));
        MemoryStore::open(config, embedder).await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn new_store_holds_only_the_placeholder() {
        let tmp = TempDir::new().unwrap();
        let store = open_with(&tmp, Arc::new(KeywordEmbedder), None).await;

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.statements, 0);
        assert_eq!(stats.embedding_model, "keyword-test");

        let hits = store.query("anything", 3).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, EntryKind::Placeholder);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn related_statement_is_retrieved_first() {
        let tmp = TempDir::new().unwrap();
        let store = open_with(&tmp, Arc::new(KeywordEmbedder), None).await;

        store.insert("My cat is called Miso").await.unwrap();
        store.insert("I drink coffee every morning").await.unwrap();
        store.insert("Rust is my favourite language").await.unwrap();

        let hits = store.query("What is my cat called?", 3).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].content, "My cat is called Miso");
        assert!(hits[0].distance <= hits[1].distance);
        assert!(hits[1].distance <= hits[2].distance);

        let context = store.retrieve_context("What is my cat called?", 1).await.unwrap();
        assert_eq!(context.format_for_prompt(), "My cat is called Miso");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn query_returns_at_most_k() {
        let tmp = TempDir::new().unwrap();
        let store = open_with(&tmp, Arc::new(KeywordEmbedder), None).await;

        for fact in ["rust one", "rust two", "rust three", "rust four", "rust five"] {
            store.insert(fact).await.unwrap();
        }

        assert_eq!(store.query("rust?", 3).await.unwrap().len(), 3);
        assert_eq!(store.query("rust?", 10).await.unwrap().len(), 6);
        assert!(store.query("rust?", 0).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reset_forgets_every_statement() {
        let tmp = TempDir::new().unwrap();
        let store = open_with(&tmp, Arc::new(KeywordEmbedder), None).await;

        store.insert("My dog lives in Paris").await.unwrap();
        assert_eq!(store.len().await.unwrap(), 2);

        assert_ok!(store.reset().await);

        assert_eq!(store.len().await.unwrap(), 1);
        let hits = store.query("Where does my dog live?", 3).await.unwrap();
        assert!(hits.iter().all(|hit| hit.kind == EntryKind::Placeholder));
        assert!(hits.iter().all(|hit| !hit.content.contains("Paris")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn long_statement_is_chunked() {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            chunk_size: 40,
            chunk_overlap: 10,
            ..Config::with_data_dir(tmp.path())
        };
        let store = open_with(&tmp, Arc::new(KeywordEmbedder), Some(config)).await;

        let text = "The cat sleeps all day. The dog barks at night. \
                    Music plays in Paris. Coffee keeps me awake.";
        let entries = store.insert(text).await.unwrap();

        assert!(entries.len() > 1);
        assert!(entries.iter().all(|e| e.content.chars().count() <= 40));
        assert!(entries.iter().all(|e| e.statement_id == entries[0].statement_id));
        let positions: Vec<u32> = entries.iter().map(|e| e.position).collect();
        assert_eq!(positions, (0..entries.len() as u32).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn embedding_failure_stores_nothing() {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            chunk_size: 20,
            chunk_overlap: 0,
            ..Config::with_data_dir(tmp.path())
        };
        let store = open_with(&tmp, Arc::new(BoomEmbedder), Some(config)).await;

        let result = store.insert("first chunk is fine, then boom goes the model").await;
        assert!(matches!(result, Err(Error::Embedding(_))));
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn blank_statement_stores_nothing() {
        let tmp = TempDir::new().unwrap();
        let store = open_with(&tmp, Arc::new(KeywordEmbedder), None).await;

        assert!(store.insert("   ").await.unwrap().is_empty());
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn entries_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let store = open_with(&tmp, Arc::new(KeywordEmbedder), None).await;
            store.insert("Python was my first language").await.unwrap();
        }

        let store = open_with(&tmp, Arc::new(KeywordEmbedder), None).await;
        assert_eq!(store.len().await.unwrap(), 2);

        let hits = store.query("Which python?", 1).await.unwrap();
        assert_eq!(hits[0].content, "Python was my first language");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn mismatched_embedding_is_rejected() {
        struct WrongSize;

        #[async_trait]
        impl Embedder for WrongSize {
            async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
                Ok(vec![0.0; 3])
            }

            fn dimensions(&self) -> usize {
                4
            }

            fn model_name(&self) -> &str {
                "wrong-size"
            }
        }

        let tmp = TempDir::new().unwrap();
        let result = MemoryStore::open(Config::with_data_dir(tmp.path()), Arc::new(WrongSize)).await;
        assert!(matches!(result, Err(Error::VectorDb(_))));
    }
}
