//! CLI argument parsing using clap derive macros

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::settings::AppSettings;

/// A small assistant that remembers what you tell it and answers questions from that memory.
///
/// Statements are stored; anything ending in '?' is answered by a local
/// Ollama-compatible model using the most relevant stored statements.
#[derive(Parser, Debug)]
#[command(name = "dolphin")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
  #[command(subcommand)]
  pub command: Option<Commands>,

  /// Directory holding the memory index, docstore and transcript
  #[arg(long, global = true)]
  pub data_dir: Option<PathBuf>,

  /// Base URL of the generation service
  #[arg(long, global = true)]
  pub endpoint: Option<String>,

  /// Model name sent to the generation service
  #[arg(long, global = true)]
  pub model: Option<String>,

  /// Number of stored chunks used to answer a question
  #[arg(long, global = true)]
  pub top_k: Option<usize>,

  /// Settings file (defaults to ~/.dolphin/settings.json)
  #[arg(long, global = true)]
  pub settings: Option<PathBuf>,

  /// Log what is happening to stderr
  #[arg(short, long, global = true)]
  pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
  /// Interactive chat (the default)
  Chat,

  /// Store a statement
  Remember {
    #[arg(required = true, num_args = 1..)]
    text: Vec<String>,
  },

  /// Answer a question from memory
  Ask {
    #[arg(required = true, num_args = 1..)]
    text: Vec<String>,
  },

  /// Clear all memory
  Forget,

  /// Show what is stored
  Status,

  /// Show recent exchanges
  History {
    /// Number of messages to show
    #[arg(short = 'n', long, default_value_t = 20)]
    limit: usize,
  },

  /// Print the effective settings
  Settings {
    /// Save them to the settings file
    #[arg(long)]
    write: bool,
  },
}

impl Cli {
  /// Flags win over the settings file
  pub fn apply_overrides(&self, settings: &mut AppSettings) {
    if let Some(dir) = &self.data_dir {
      settings.data_dir = Some(dir.to_string_lossy().into_owned());
    }
    if let Some(endpoint) = &self.endpoint {
      settings.endpoint = endpoint.clone();
    }
    if let Some(model) = &self.model {
      settings.model = model.clone();
    }
    if let Some(top_k) = self.top_k {
      settings.top_k = top_k;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn no_subcommand_means_chat() {
    let cli = Cli::try_parse_from(["dolphin"]).unwrap();
    assert!(cli.command.is_none());
  }

  #[test]
  fn words_are_collected() {
    let cli = Cli::try_parse_from(["dolphin", "ask", "where", "is", "Paris?"]).unwrap();
    assert_eq!(
      cli.command,
      Some(Commands::Ask {
        text: vec!["where".into(), "is".into(), "Paris?".into()]
      })
    );
  }

  #[test]
  fn remember_needs_text() {
    assert!(Cli::try_parse_from(["dolphin", "remember"]).is_err());
  }

  #[test]
  fn history_limit_defaults_to_twenty() {
    let cli = Cli::try_parse_from(["dolphin", "history"]).unwrap();
    assert_eq!(cli.command, Some(Commands::History { limit: 20 }));
  }

  #[test]
  fn flags_override_settings() {
    let cli = Cli::try_parse_from([
      "dolphin",
      "status",
      "--model",
      "llama3",
      "--top-k",
      "5",
      "--data-dir",
      "/tmp/d",
    ])
    .unwrap();

    let mut settings = AppSettings::default();
    cli.apply_overrides(&mut settings);

    assert_eq!(settings.model, "llama3");
    assert_eq!(settings.top_k, 5);
    assert_eq!(settings.data_dir.as_deref(), Some("/tmp/d"));
    assert_eq!(settings.endpoint, crate::settings::DEFAULT_ENDPOINT);
  }
}
