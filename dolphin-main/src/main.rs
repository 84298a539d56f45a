//! `dolphin` - remembers what you tell it, answers from that memory.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dolphin::cli::{Cli, Commands};
use dolphin::settings::{load_settings, save_settings, settings_path, AppSettings};
use dolphin::{session, Assistant, Intent, OllamaClient};
use dolphin_memory::{EmbeddingService, MemoryStore, TranscriptLog};

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let settings_file = cli.settings.clone().unwrap_or_else(settings_path);
  let mut settings = load_settings(&settings_file);
  cli.apply_overrides(&mut settings);
  tracing::debug!(?settings, file = %settings_file.display(), "loaded settings");

  match cli.command.clone().unwrap_or(Commands::Chat) {
    Commands::Settings { write } => {
      println!("{}", serde_json::to_string_pretty(&settings)?);
      if write {
        save_settings(&settings_file, &settings)?;
        println!("Saved to {}", settings_file.display());
      }
    }
    Commands::History { limit } => {
      let transcript = TranscriptLog::new(&settings.memory_config())?;
      for message in transcript.read_last_n(limit)? {
        println!(
          "[{}] {}: {}",
          message.timestamp.format("%Y-%m-%d %H:%M:%S"),
          message.role,
          message.content
        );
      }
    }
    Commands::Status => {
      let store = open_store(&settings).await?;
      let stats = store.stats().await?;
      println!("Entries:         {}", stats.entries);
      println!("Statements:      {}", stats.statements);
      println!("Embedding model: {}", stats.embedding_model);
      println!("Generation:      {} at {}", settings.model, settings.endpoint);
      println!("Data directory:  {}", stats.data_dir.display());
    }
    Commands::Chat => {
      let assistant = build_assistant(&settings).await?;
      let stdin = tokio::io::BufReader::new(tokio::io::stdin());
      session::run_chat(&assistant, stdin, tokio::io::stdout()).await?;
    }
    Commands::Remember { text } => {
      let assistant = build_assistant(&settings).await?;
      println!("{}", assistant.respond(&text.join(" "), Intent::Remember).await);
    }
    Commands::Ask { text } => {
      let assistant = build_assistant(&settings).await?;
      println!("{}", assistant.respond(&text.join(" "), Intent::Ask).await);
    }
    Commands::Forget => {
      let assistant = build_assistant(&settings).await?;
      println!("{}", assistant.respond(&settings.reset_phrase, Intent::Forget).await);
    }
  }

  Ok(())
}

fn init_tracing(verbose: bool) {
  let default_filter = if verbose {
    "info,dolphin=debug,dolphin_memory=debug"
  } else {
    "warn"
  };

  tracing_subscriber::registry()
    .with(tracing_subscriber::EnvFilter::new(
      std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
    ))
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();
}

async fn open_store(settings: &AppSettings) -> Result<MemoryStore> {
  let config = settings.memory_config();
  let embedder = EmbeddingService::new(&config).context("Failed to load embedding model")?;
  MemoryStore::open(config, Arc::new(embedder))
    .await
    .context("Failed to open memory store")
}

async fn build_assistant(settings: &AppSettings) -> Result<Assistant> {
  let store = open_store(settings).await?;
  let transcript = TranscriptLog::new(store.config())?;
  let generator = OllamaClient::new(&settings.endpoint, &settings.model)?;

  Ok(
    Assistant::new(store, Box::new(generator), settings.reset_phrase.clone())
      .with_transcript(transcript),
  )
}
