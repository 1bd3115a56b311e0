//! The Cadence scheduling engine.
//!
//! [`Engine`] combines a [`HabitStore`], a [`Clock`] and a [`Notifier`] and
//! exposes the scheduling operations on top of them:
//!
//! - **occurrence log**: [`Engine::ensure_occurrence`],
//!   [`Engine::ensure_todays_occurrences`], [`Engine::get_next_occurrence`]
//! - **missed detection**: [`Engine::sweep`]
//! - **completion**: [`Engine::complete`], [`Engine::skip`]
//! - **driver passes**: [`Engine::tick`], [`Engine::ensure_upcoming`],
//!   [`Engine::housekeeping`], [`Engine::run`]
//!
//! - **views**: [`Engine::todays_habits`], [`Engine::history`],
//!   [`Engine::upcoming_occurrences`], [`Engine::get_habit_stats`]
//!
//! Habit CRUD rounds out the surface a caller needs.

pub mod config;
pub mod driver;
pub mod error;
pub mod habits;
pub mod notify;
pub mod occurrences;
pub mod reminders;
pub mod stats;
pub mod sweep;
pub mod today;
pub mod tracker;


use std::sync::Arc;

use cadence_core::{clock::Clock, sleep::SleepWindow, store::HabitStore};
use chrono::{DateTime, Utc};

pub use config::EngineConfig;
pub use driver::TickReport;
pub use error::{Error, Result};
pub use notify::{LogNotifier, Notifier, NotifyError};
pub use occurrences::{Ensured, TodayReport};
pub use stats::HabitStats;
pub use today::TodayHabit;

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Shared handle to the scheduling engine.
///
/// Cloning is cheap; every collaborator sits behind an `Arc`.
pub struct Engine<S, N = LogNotifier> {
  store:    Arc<S>,
  notifier: Arc<N>,
  clock:    Arc<dyn Clock>,
  config:   Arc<EngineConfig>,
  sleep:    SleepWindow,
}

impl<S, N> Clone for Engine<S, N> {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      notifier: self.notifier.clone(),
      clock:    self.clock.clone(),
      config:   self.config.clone(),
      sleep:    self.sleep,
    }
  }
}

impl<S, N> Engine<S, N>
where
  S: HabitStore,
  N: Notifier,
{
  pub fn new(
    store: Arc<S>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
  ) -> Self {
    let sleep = config.sleep_window();
    Self {
      store,
      notifier,
      clock,
      config: Arc::new(config),
      sleep,
    }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn config(&self) -> &EngineConfig { &self.config }

  /// The engine clock's current instant.
  pub fn now(&self) -> DateTime<Utc> { self.clock.now() }

  /// Send `text`, logging instead of failing.
  pub(crate) async fn notify(&self, text: &str) {
    if let Err(e) = self.notifier.send(text).await {
      tracing::warn!(error = %e, "failed to send notification");
    }
  }
}
