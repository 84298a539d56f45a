//! Storage backends for dolphin-memory

mod jsonl;
mod sqlite;
pub mod vector;

pub use jsonl::TranscriptLog;
pub use sqlite::SqliteStorage;
pub use vector::{VectorHit, VectorStorage};
