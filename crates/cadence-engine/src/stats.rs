//! Aggregate numbers for dashboards.

use std::collections::BTreeMap;

use cadence_core::{occurrence::OccurrenceStatus, schedule::RecurrenceKind, store::HabitStore};
use chrono::{Duration, NaiveTime};
use serde::Serialize;

use crate::{Engine, Result, error::store, notify::Notifier};

/// How many of the most recent occurrences feed the outcome counts.
pub const RECENT_WINDOW: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HabitStats {
  pub total_habits:      usize,
  pub active_habits:     usize,
  pub archived_habits:   usize,
  pub completed:         usize,
  pub missed:            usize,
  pub skipped:           usize,
  /// `completed / (completed + missed + skipped)` in percent, one decimal.
  pub completion_rate:   f64,
  /// Completed occurrences scheduled on the current UTC day.
  pub completions_today: usize,
  /// Longest current streak among active habits.
  pub current_streak:    u32,
  pub best_streak:       u32,
  pub best_streak_habit: Option<String>,
  pub habits_by_kind:    BTreeMap<RecurrenceKind, usize>,
}

impl<S, N> Engine<S, N>
where
  S: HabitStore,
  N: Notifier,
{
  pub async fn get_habit_stats(&self) -> Result<HabitStats> {
    let habits = self.store.list_habits(None).await.map_err(store)?;
    let recent = self
      .store
      .recent_occurrences(RECENT_WINDOW)
      .await
      .map_err(store)?;

    let now = self.now();
    let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let completions_today = self
      .store
      .count_completed_between(midnight, midnight + Duration::days(1))
      .await
      .map_err(store)?;

    let mut stats = HabitStats {
      total_habits: habits.len(),
      completions_today,
      ..HabitStats::default()
    };

    for occurrence in &recent {
      match occurrence.status {
        OccurrenceStatus::Completed => stats.completed += 1,
        OccurrenceStatus::Missed => stats.missed += 1,
        OccurrenceStatus::Skipped => stats.skipped += 1,
        OccurrenceStatus::Pending => {}
      }
    }
    stats.completion_rate = completion_rate(stats.completed, stats.missed, stats.skipped);

    for habit in habits.iter().filter(|h| !h.archived) {
      stats.active_habits += 1;
      stats.current_streak = stats.current_streak.max(habit.streak.current);
      if stats.best_streak_habit.is_none() || habit.streak.best > stats.best_streak {
        stats.best_streak = habit.streak.best;
        stats.best_streak_habit = Some(habit.name.clone());
      }
      *stats.habits_by_kind.entry(habit.schedule.kind).or_default() += 1;
    }
    stats.archived_habits = stats.total_habits - stats.active_habits;

    Ok(stats)
  }
}

fn completion_rate(completed: usize, missed: usize, skipped: usize) -> f64 {
  let resolved = completed + missed + skipped;
  if resolved == 0 {
    return 0.0;
  }
  let pct = completed as f64 / resolved as f64 * 100.0;
  (pct * 10.0).round() / 10.0
}
