//! Engine tuning knobs.
//!
//! Every field has a default, so an empty `[engine]` table (or none at all)
//! yields a working configuration.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use cadence_core::{habit::DEFAULT_GRACE_MINUTES, sleep::SleepWindow};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Start of the nightly quiet period, habit-local.
  pub sleep_start:                NaiveTime,
  /// End of the nightly quiet period, habit-local.
  pub sleep_end:                  NaiveTime,
  /// Added to `sleep_end` when a daily time is snapped out of the window.
  pub sleep_buffer_minutes:       u32,
  /// Grace period for habits created without one.
  pub default_grace_minutes:      u32,
  /// Minimum gap between two missed sweeps of the same habit.
  pub sweep_interval_minutes:     u32,
  /// Occurrences older than this are purged by housekeeping.
  pub retention_days:             u32,
  pub tick_seconds:               u64,
  pub ensure_seconds:             u64,
  pub housekeeping_seconds:       u64,
  /// Upper bound on a single pass. Unbounded when absent.
  pub tick_deadline_seconds:      Option<u64>,
  pub reminder_lookahead_minutes: u32,
  /// Reset a habit's current streak when one of its occurrences is missed.
  pub streak_reset_on_miss:       bool,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      sleep_start:                NaiveTime::from_hms_opt(23, 0, 0).unwrap_or_default(),
      sleep_end:                  NaiveTime::from_hms_opt(6, 0, 0).unwrap_or_default(),
      sleep_buffer_minutes:       5,
      default_grace_minutes:      DEFAULT_GRACE_MINUTES,
      sweep_interval_minutes:     30,
      retention_days:             90,
      tick_seconds:               60,
      ensure_seconds:             3600,
      housekeeping_seconds:       86_400,
      tick_deadline_seconds:      None,
      reminder_lookahead_minutes: 15,
      streak_reset_on_miss:       false,
    }
  }
}

impl EngineConfig {
  pub fn sleep_window(&self) -> SleepWindow {
    SleepWindow::new(
      self.sleep_start,
      self.sleep_end,
      minutes(self.sleep_buffer_minutes),
    )
  }

  pub fn sweep_interval(&self) -> chrono::Duration { minutes(self.sweep_interval_minutes) }

  pub fn retention(&self) -> chrono::Duration {
    chrono::Duration::days(i64::from(self.retention_days))
  }

  pub fn reminder_lookahead(&self) -> chrono::Duration {
    minutes(self.reminder_lookahead_minutes)
  }

  /// Period of the fine tick. Never zero.
  pub fn tick_every(&self) -> std::time::Duration { seconds(self.tick_seconds) }

  pub fn ensure_every(&self) -> std::time::Duration { seconds(self.ensure_seconds) }

  pub fn housekeeping_every(&self) -> std::time::Duration {
    seconds(self.housekeeping_seconds)
  }

  pub fn tick_deadline(&self) -> Option<std::time::Duration> {
    self.tick_deadline_seconds.map(seconds)
  }
}

fn minutes(m: u32) -> chrono::Duration { chrono::Duration::minutes(i64::from(m)) }

// `tokio::time::interval` panics on a zero period.
fn seconds(s: u64) -> std::time::Duration { std::time::Duration::from_secs(s.max(1)) }
