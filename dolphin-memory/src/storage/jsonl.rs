//! JSONL transcript of every exchange

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::message::Message;

/// Append-only transcript log, one JSON message per line
pub struct TranscriptLog {
    path: PathBuf,
}

impl TranscriptLog {
    pub fn new(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        Ok(Self {
            path: config.transcript_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a message to the log
    pub fn append(&self, message: &Message) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(message)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }

    /// Read every message in the log
    pub fn read_all(&self) -> Result<Vec<Message>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);

        let mut messages = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            messages.push(serde_json::from_str(&line)?);
        }

        Ok(messages)
    }

    /// Read the last N messages
    pub fn read_last_n(&self, n: usize) -> Result<Vec<Message>> {
        let all = self.read_all()?;
        let start = all.len().saturating_sub(n);
        Ok(all[start..].to_vec())
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.read_all()?.len())
    }
}
