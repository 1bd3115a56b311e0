//! Delivery through the Telegram Bot API.

use std::time::Duration;

use anyhow::Context as _;
use cadence_engine::{LogNotifier, Notifier, NotifyError};
use reqwest::Client;
use serde::Deserialize;

use crate::settings::TelegramConfig;

/// Posts each message to `sendMessage` with HTML formatting.
pub struct TelegramNotifier {
  client:  Client,
  url:     String,
  chat_id: String,
}

#[derive(Deserialize)]
struct BotResponse {
  ok:          bool,
  description: Option<String>,
}

impl TelegramNotifier {
  pub fn new(config: &TelegramConfig) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self {
      client,
      url: format!(
        "{}/bot{}/sendMessage",
        config.api_base.trim_end_matches('/'),
        config.bot_token
      ),
      chat_id: config.chat_id.clone(),
    })
  }
}

impl Notifier for TelegramNotifier {
  async fn send(&self, text: &str) -> Result<(), NotifyError> {
    let resp = self
      .client
      .post(&self.url)
      .form(&[
        ("chat_id", self.chat_id.as_str()),
        ("text", text),
        ("parse_mode", "HTML"),
      ])
      .send()
      .await
      .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;

    let status = resp.status();
    let body: BotResponse = resp
      .json()
      .await
      .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;
    if !status.is_success() || !body.ok {
      return Err(NotifyError::Rejected(format!(
        "{status}: {}",
        body.description.unwrap_or_default()
      )));
    }
    Ok(())
  }
}

/// The notifier picked at startup.
pub enum AnyNotifier {
  Log(LogNotifier),
  Telegram(TelegramNotifier),
}

impl AnyNotifier {
  pub fn from_config(config: Option<&TelegramConfig>) -> anyhow::Result<Self> {
    match config {
      Some(cfg) => Ok(Self::Telegram(TelegramNotifier::new(cfg)?)),
      None => Ok(Self::Log(LogNotifier)),
    }
  }
}

impl Notifier for AnyNotifier {
  async fn send(&self, text: &str) -> Result<(), NotifyError> {
    match self {
      Self::Log(n) => n.send(text).await,
      Self::Telegram(n) => n.send(text).await,
    }
  }
}
