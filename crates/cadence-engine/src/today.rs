//! The "today" view: what each active habit has on its local today.

use cadence_core::{
  habit::Habit,
  occurrence::{Occurrence, OccurrenceStatus},
  store::HabitStore,
};
use serde::Serialize;
use tracing::warn;

use crate::{Engine, Result, error::store, notify::Notifier};

/// One row of [`Engine::todays_habits`].
#[derive(Debug, Clone, Serialize)]
pub struct TodayHabit {
  pub habit:           Habit,
  /// Stored occurrences on the habit's local today, oldest first.
  pub occurrences:     Vec<Occurrence>,
  /// `true` once any of today's occurrences is completed.
  pub completed_today: bool,
}

impl<S, N> Engine<S, N>
where
  S: HabitStore,
  N: Notifier,
{
  /// Stored occurrences of `habit` scheduled on its local today.
  pub async fn todays_occurrences(&self, habit: &Habit) -> Result<Vec<Occurrence>> {
    let Some((start, end)) = habit.day_window(self.now()) else {
      return Ok(Vec::new());
    };
    self
      .store
      .find_occurrences_between(habit.habit_id, start, end)
      .await
      .map_err(store)
  }

  /// Active habits that are due today, each with today's occurrences and
  /// whether one of them is completed.
  ///
  /// A habit is due today when it already has an occurrence today or its
  /// next occurrence falls before the end of its local day. Read-only: run
  /// [`Engine::ensure_todays_occurrences`] first to materialise the day.
  pub async fn todays_habits(&self) -> Result<Vec<TodayHabit>> {
    let now = self.now();
    let habits = self.store.find_active_habits().await.map_err(store)?;

    let mut rows = Vec::new();
    for habit in habits {
      let Some((_, end)) = habit.day_window(now) else {
        continue;
      };
      let occurrences = self.todays_occurrences(&habit).await?;
      let due = !occurrences.is_empty()
        || match self.next_after(&habit, now) {
          Ok(next) => next.is_some_and(|at| at < end),
          Err(e) if e.is_invalid_schedule() => {
            warn!(habit_id = %habit.habit_id, error = %e, "habit is not schedulable");
            false
          }
          Err(e) => return Err(e),
        };
      if !due {
        continue;
      }

      let completed_today = occurrences
        .iter()
        .any(|o| o.status == OccurrenceStatus::Completed);
      rows.push(TodayHabit { habit, occurrences, completed_today });
    }
    Ok(rows)
  }
}
