//! Missed-occurrence detection.

use cadence_core::{
  habit::Habit,
  occurrence::{Occurrence, Transition},
  store::HabitStore,
};
use tracing::{debug, info};

use crate::{Engine, Result, error::store, notify::Notifier};

impl<S, N> Engine<S, N>
where
  S: HabitStore,
  N: Notifier,
{
  /// Flag `habit`'s overdue `Pending` occurrences as `Missed`.
  ///
  /// Rate-limited per habit: a sweep within `sweep_interval` of the previous
  /// one is a no-op. Otherwise `last_checked` is saved before anything else,
  /// so a sweep that fails half-way still counts against the limit.
  ///
  /// `habit` may be a stale copy: only `last_checked`, the miss counter and
  /// (by policy) the current streak are written back.
  ///
  /// Returns the number of occurrences newly marked missed.
  pub async fn sweep(&self, habit: &mut Habit) -> Result<usize> {
    if habit.archived {
      return Ok(0);
    }

    let now = self.now();
    if let Some(last) = habit.last_checked
      && now - last < self.config.sweep_interval()
    {
      debug!(habit_id = %habit.habit_id, "sweep rate-limited");
      return Ok(0);
    }

    habit.last_checked = Some(now);
    self
      .store
      .mark_checked(habit.habit_id, now)
      .await
      .map_err(store)?;

    let grace = habit.grace();
    let candidates = self
      .store
      .find_pending_overdue(habit.habit_id, now - grace)
      .await
      .map_err(store)?;

    let mut missed: Vec<Occurrence> = Vec::new();
    for mut occurrence in candidates {
      // Stale read or clock skew.
      if occurrence.scheduled_at > now || !occurrence.is_overdue(now, grace) {
        continue;
      }
      if occurrence.mark_missed(now)? == Transition::Applied {
        self
          .store
          .save_occurrence(&occurrence)
          .await
          .map_err(store)?;
        missed.push(occurrence);
      }
    }

    if missed.is_empty() {
      return Ok(0);
    }

    self.count_misses(habit, missed.len(), now).await?;
    info!(
      habit_id = %habit.habit_id,
      missed = missed.len(),
      missed_count = habit.missed_count,
      "marked occurrences missed"
    );

    for occurrence in &missed {
      self.notify_missed(habit, occurrence).await;
    }
    Ok(missed.len())
  }
}
