//! Outbound notifications.
//!
//! Delivery is fire-and-forget from the engine's point of view: a failed send
//! is logged and never interrupts scheduling.

use std::future::Future;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
  #[error("notification transport failed: {0}")]
  Transport(String),

  #[error("notification rejected: {0}")]
  Rejected(String),
}

/// A sink for short human-readable messages. Messages may carry the HTML
/// subset understood by chat bots (`<b>`, `<i>`); use [`escape_html`] for
/// user-supplied text.
pub trait Notifier: Send + Sync {
  fn send<'a>(
    &'a self,
    text: &'a str,
  ) -> impl Future<Output = Result<(), NotifyError>> + Send + 'a;
}

/// Writes messages to the log and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  async fn send(&self, text: &str) -> Result<(), NotifyError> {
    tracing::info!(text, "notification");
    Ok(())
  }
}

/// Escape `&`, `<` and `>`.
pub fn escape_html(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      c => out.push(c),
    }
  }
  out
}
