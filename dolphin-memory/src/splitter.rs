//! Recursive character splitter for long statements
//!
//! Text is split on the first separator that occurs in it (paragraphs, then
//! lines, then words, then characters). Pieces shorter than `chunk_size` are
//! merged greedily into chunks, each new chunk starting with up to
//! `chunk_overlap` characters of the previous one. Pieces that are still too
//! long are split again with the remaining separators.
//!
//! Lengths are counted in `char`s, not bytes.

use std::collections::VecDeque;

use crate::config::Config;
use crate::error::{Error, Result};

const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Splits text into bounded, overlapping chunks
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::config("chunk_size must be greater than zero"));
        }
        if chunk_overlap > chunk_size {
            return Err(Error::config(format!(
                "chunk_overlap ({}) is larger than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split `text` into chunks. Whitespace-only input yields no chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut final_chunks = Vec::new();

        let mut separator: &str = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate.as_str();
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut good: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                good.push(piece);
                continue;
            }

            if !good.is_empty() {
                final_chunks.extend(self.merge_splits(&good));
                good.clear();
            }
            if remaining.is_empty() {
                final_chunks.extend(trimmed_chunk(piece));
            } else {
                final_chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !good.is_empty() {
            final_chunks.extend(self.merge_splits(&good));
        }

        final_chunks
    }

    fn merge_splits(&self, splits: &[&str]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in splits {
            let len = char_len(piece);

            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        size = total,
                        limit = self.chunk_size,
                        "created a chunk larger than the configured size"
                    );
                }

                if !window.is_empty() {
                    if let Some(doc) = join_pieces(&window) {
                        docs.push(doc);
                    }

                    while total > self.chunk_overlap
                        || (total + len > self.chunk_size && total > 0)
                    {
                        match window.pop_front() {
                            Some(front) => total -= char_len(front),
                            None => break,
                        }
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        if let Some(doc) = join_pieces(&window) {
            docs.push(doc);
        }

        docs
    }
}

/// Split on `separator`, keeping each separator at the start of the piece that follows it.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut last = 0;
    for (idx, _) in text.match_indices(separator) {
        pieces.push(&text[last..idx]);
        last = idx;
    }
    pieces.push(&text[last..]);

    pieces.into_iter().filter(|p| !p.is_empty()).collect()
}

fn join_pieces(pieces: &VecDeque<&str>) -> Option<String> {
    let joined: String = pieces.iter().copied().collect();
    trimmed_chunk(&joined)
}

/// Trimmed text, or `None` if nothing is left
fn trimmed_chunk(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
