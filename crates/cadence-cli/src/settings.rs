//! Layered configuration: TOML file, then `CADENCE_*` environment variables.
//!
//! ```toml
//! store_path = "~/.local/share/cadence/cadence.db"
//!
//! [engine]
//! sleep_start = "23:00:00"
//! sleep_end = "06:00:00"
//! streak_reset_on_miss = false
//!
//! [telegram]
//! bot_token = "123:abc"
//! chat_id = "42"
//! ```
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `CADENCE_ENGINE__TICK_SECONDS=30`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use cadence_engine::EngineConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default)]
  pub engine:     EngineConfig,
  #[serde(default)]
  pub telegram:   Option<TelegramConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
  pub bot_token: String,
  pub chat_id:   String,
  #[serde(default = "default_api_base")]
  pub api_base:  String,
}

fn default_store_path() -> PathBuf { PathBuf::from("cadence.db") }

fn default_api_base() -> String { "https://api.telegram.org".to_string() }

impl Settings {
  /// Read `path` (if it exists) and overlay the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let mut settings: Settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("CADENCE")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .context("failed to read config")?
      .try_deserialize()
      .context("failed to deserialise settings")?;

    settings.store_path = expand_tilde(&settings.store_path);
    Ok(settings)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let settings = Settings::load(Path::new("/nonexistent/cadence.toml")).unwrap();
    assert_eq!(settings.engine, EngineConfig::default());
    assert!(settings.telegram.is_none());
  }

  #[test]
  fn tilde_is_expanded() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/cadence.db")),
      PathBuf::from(home).join("cadence.db")
    );
    assert_eq!(expand_tilde(Path::new("/tmp/x.db")), PathBuf::from("/tmp/x.db"));
  }
}
