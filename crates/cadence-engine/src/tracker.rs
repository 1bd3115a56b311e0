//! Completion and skip transitions, and the streak bookkeeping that follows a
//! completion.

use cadence_core::{
  Error as CoreError,
  occurrence::{Occurrence, Transition},
  store::HabitStore,
};
use tracing::info;
use uuid::Uuid;

use crate::{
  Engine, Result,
  error::store,
  notify::{Notifier, escape_html},
};

impl<S, N> Engine<S, N>
where
  S: HabitStore,
  N: Notifier,
{
  /// Mark `occurrence_id` of `habit_id` completed and advance the habit's
  /// streak.
  ///
  /// Completing an already-completed occurrence returns it unchanged.
  /// Missed and skipped occurrences cannot be completed. The occurrence and
  /// the streak are written in one store transaction, so a failed attempt
  /// leaves nothing behind and can simply be retried.
  pub async fn complete(&self, habit_id: Uuid, occurrence_id: Uuid) -> Result<Occurrence> {
    let mut habit = self
      .store
      .get_habit(habit_id)
      .await
      .map_err(store)?
      .ok_or(CoreError::HabitNotFound(habit_id))?;
    let mut occurrence = self
      .store
      .get_occurrence(occurrence_id)
      .await
      .map_err(store)?
      .ok_or(CoreError::OccurrenceNotFound(occurrence_id))?;
    if occurrence.habit_id != habit_id {
      return Err(
        CoreError::InvalidReference {
          occurrence: occurrence_id,
          habit:      habit_id,
        }
        .into(),
      );
    }

    let now = self.now();
    if occurrence.complete(now, habit.grace())? == Transition::Unchanged {
      return Ok(occurrence);
    }

    habit.streak.record_completion(habit.local_today(now));
    habit.updated_at = now;

    if !self
      .store
      .save_completion(&occurrence, &habit)
      .await
      .map_err(store)?
    {
      // Resolved by someone else since it was read; report what they wrote.
      let mut current = self
        .store
        .get_occurrence(occurrence_id)
        .await
        .map_err(store)?
        .ok_or(CoreError::OccurrenceNotFound(occurrence_id))?;
      current.complete(now, habit.grace())?;
      return Ok(current);
    }

    info!(
      %habit_id,
      %occurrence_id,
      on_time = occurrence.completed_in_grace_period,
      current_streak = habit.streak.current,
      "occurrence completed"
    );
    self
      .notify(&format!(
        "Completed <b>{}</b>{} (streak {})",
        escape_html(&habit.name),
        if occurrence.completed_in_grace_period { "" } else { " late" },
        habit.streak.current,
      ))
      .await;

    Ok(occurrence)
  }

  /// Mark `occurrence_id` skipped. Streaks are untouched.
  pub async fn skip(&self, occurrence_id: Uuid) -> Result<Occurrence> {
    let mut occurrence = self
      .store
      .get_occurrence(occurrence_id)
      .await
      .map_err(store)?
      .ok_or(CoreError::OccurrenceNotFound(occurrence_id))?;

    if occurrence.skip(self.now())? == Transition::Applied {
      self
        .store
        .save_occurrence(&occurrence)
        .await
        .map_err(store)?;
      info!(%occurrence_id, habit_id = %occurrence.habit_id, "occurrence skipped");
    }
    Ok(occurrence)
  }
}
