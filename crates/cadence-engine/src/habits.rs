//! Habit lifecycle.

use cadence_core::{
  Error as CoreError,
  habit::{Habit, NewHabit},
  occurrence::Occurrence,
  store::HabitStore,
};
use chrono::Duration;
use tracing::info;
use uuid::Uuid;

use crate::{Engine, Result, error::store, notify::Notifier};

impl<S, N> Engine<S, N>
where
  S: HabitStore,
  N: Notifier,
{
  /// Validate and persist a new habit. The grace period falls back to
  /// `default_grace_minutes`.
  pub async fn create_habit(&self, input: NewHabit) -> Result<Habit> {
    input.schedule.resolve()?;
    let habit = input.into_habit(self.now(), self.config.default_grace_minutes);
    self.store.insert_habit(&habit).await.map_err(store)?;
    info!(habit_id = %habit.habit_id, name = %habit.name, "habit created");
    Ok(habit)
  }

  /// Persist user edits to an existing habit.
  pub async fn update_habit(&self, mut habit: Habit) -> Result<Habit> {
    habit.schedule.resolve()?;
    self.get_habit(habit.habit_id).await?;
    habit.updated_at = self.now();
    self.store.save_habit(&habit).await.map_err(store)?;
    Ok(habit)
  }

  pub async fn archive_habit(&self, id: Uuid) -> Result<Habit> {
    self.set_archived(id, true).await
  }

  pub async fn unarchive_habit(&self, id: Uuid) -> Result<Habit> {
    self.set_archived(id, false).await
  }

  async fn set_archived(&self, id: Uuid, archived: bool) -> Result<Habit> {
    let mut habit = self.get_habit(id).await?;
    if habit.archived != archived {
      habit.archived = archived;
      habit.updated_at = self.now();
      self.store.save_habit(&habit).await.map_err(store)?;
      info!(habit_id = %id, archived, "habit archive flag changed");
    }
    Ok(habit)
  }

  /// Delete a habit together with all of its occurrences.
  pub async fn delete_habit(&self, id: Uuid) -> Result<()> {
    if !self.store.delete_habit(id).await.map_err(store)? {
      return Err(CoreError::HabitNotFound(id).into());
    }
    info!(habit_id = %id, "habit deleted");
    Ok(())
  }

  pub async fn get_habit(&self, id: Uuid) -> Result<Habit> {
    Ok(
      self
        .store
        .get_habit(id)
        .await
        .map_err(store)?
        .ok_or(CoreError::HabitNotFound(id))?,
    )
  }

  pub async fn list_habits(&self, archived: Option<bool>) -> Result<Vec<Habit>> {
    self.store.list_habits(archived).await.map_err(store)
  }

  /// Stored occurrences of a habit due within the next `days` days.
  pub async fn upcoming_occurrences(
    &self,
    habit_id: Uuid,
    days: u32,
  ) -> Result<Vec<Occurrence>> {
    self.get_habit(habit_id).await?;
    let now = self.now();
    self
      .store
      .find_occurrences_between(habit_id, now, now + Duration::days(i64::from(days)))
      .await
      .map_err(store)
  }

  /// One page of a habit's occurrence history, newest first. Pages count
  /// from zero.
  pub async fn history(
    &self,
    habit_id: Uuid,
    page: usize,
    size: usize,
  ) -> Result<Vec<Occurrence>> {
    self.get_habit(habit_id).await?;
    self
      .store
      .occurrences_page(habit_id, page.saturating_mul(size), size)
      .await
      .map_err(store)
  }
}
