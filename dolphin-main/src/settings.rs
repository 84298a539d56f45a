use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use dolphin_memory::Config;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "tinydolphin";
pub const DEFAULT_RESET_PHRASE: &str = "dolphin forget everything";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppSettings {
  /// Overrides the platform data directory
  pub data_dir: Option<String>,
  /// Base URL of the generation service
  pub endpoint: String,
  pub model: String,
  pub top_k: usize,
  pub reset_phrase: String,
}

impl Default for AppSettings {
  fn default() -> Self {
    Self {
      data_dir: None,
      endpoint: DEFAULT_ENDPOINT.to_string(),
      model: DEFAULT_MODEL.to_string(),
      top_k: 3,
      reset_phrase: DEFAULT_RESET_PHRASE.to_string(),
    }
  }
}

impl AppSettings {
  /// Memory store configuration for these settings
  pub fn memory_config(&self) -> Config {
    let mut config = match &self.data_dir {
      Some(dir) => Config::with_data_dir(dir),
      None => Config::default(),
    };
    config.max_retrieval_results = self.top_k;
    config
  }
}

pub fn settings_path() -> PathBuf {
  dirs::home_dir()
    .unwrap_or_else(|| PathBuf::from("."))
    .join(".dolphin")
    .join("settings.json")
}

/// Load settings from `path`, falling back to defaults when the file is missing or unreadable
pub fn load_settings(path: &Path) -> AppSettings {
  let data = match fs::read_to_string(path) {
    Ok(data) => data,
    Err(e) if e.kind() == ErrorKind::NotFound => return AppSettings::default(),
    Err(e) => {
      tracing::warn!(path = %path.display(), error = %e, "cannot read settings file, using defaults");
      return AppSettings::default();
    }
  };

  match serde_json::from_str::<AppSettings>(&data) {
    Ok(settings) => settings,
    Err(e) => {
      tracing::warn!(path = %path.display(), error = %e, "ignoring invalid settings file");
      AppSettings::default()
    }
  }
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> anyhow::Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
  }
  let data = serde_json::to_string_pretty(settings)?;
  fs::write(path, data).with_context(|| format!("writing {}", path.display()))?;
  Ok(())
}
