//! Retrieved chunks and the context they render into

use uuid::Uuid;

use crate::memory::{EntryKind, MemoryEntry};

/// A stored chunk returned from a nearest-neighbour query
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub id: Uuid,
    pub kind: EntryKind,
    pub content: String,
    pub distance: f32,
    /// `1 / (1 + distance)`; higher is more similar
    pub score: f32,
}

impl RetrievedChunk {
    pub fn new(entry: MemoryEntry, distance: f32) -> Self {
        Self {
            id: entry.id,
            kind: entry.kind,
            content: entry.content,
            distance,
            score: 1.0 / (1.0 + distance),
        }
    }
}

/// Retrieved chunks ready for injection into a prompt
#[derive(Debug, Clone, Default)]
pub struct RetrievalContext {
    pub chunks: Vec<RetrievedChunk>,
}

impl RetrievalContext {
    pub fn new(chunks: Vec<RetrievedChunk>) -> Self {
        Self { chunks }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Chunk contents joined by newlines, nearest first
    pub fn format_for_prompt(&self) -> String {
        self.chunks
            .iter()
            .map(|chunk| chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
