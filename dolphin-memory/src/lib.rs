//! # Dolphin Memory
//!
//! Retrieval memory for the Dolphin assistant: statements are split into
//! overlapping chunks, embedded locally and indexed, so a question can be
//! answered from the chunks nearest to it.
//!
//! ## Storage
//!
//! - **Vector index** - LanceDB table of `(id, vector)`
//! - **Docstore** - SQLite table of chunk text and metadata keyed by id
//! - **Transcript** - JSONL append-only log of exchanges
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dolphin_memory::{Config, EmbeddingService, MemoryStore};
//!
//! let config = Config::default();
//! let embedder = Arc::new(EmbeddingService::new(&config)?);
//! let store = MemoryStore::open(config, embedder).await?;
//!
//! store.insert("My cat is called Miso.").await?;
//! let context = store.retrieve_context("What is my cat called?", 3).await?;
//! println!("{}", context.format_for_prompt());
//! ```

pub mod config;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod message;
pub mod retrieval;
pub mod splitter;
pub mod storage;

pub use config::Config;
pub use embedding::{Embedder, EmbeddingService};
pub use error::{Error, Result};
pub use memory::{EntryKind, MemoryEntry, MemoryStats, MemoryStore};
pub use message::{Message, Role};
pub use retrieval::{RetrievalContext, RetrievedChunk};
pub use splitter::TextSplitter;
pub use storage::TranscriptLog;
