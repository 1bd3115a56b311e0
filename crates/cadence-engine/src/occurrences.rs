//! The occurrence log: turning computed times into stored occurrences.
//!
//! Every write here is preceded by an existence check on
//! `(habit_id, scheduled_at)`, and the store additionally ignores duplicate
//! inserts. Re-running any operation converges on the same set of records.

use cadence_core::{
  habit::Habit,
  occurrence::Occurrence,
  recurrence::next_occurrence,
  schedule::Recurrence,
  store::HabitStore,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
  Engine, Error, Result,
  error::store,
  notify::{Notifier, escape_html},
};

/// Insert attempts before [`Engine::ensure_occurrence`] gives up on a slot
/// whose conflicting record keeps vanishing.
const INSERT_ATTEMPTS: usize = 2;

/// Outcome of [`Engine::ensure_occurrence`].
#[derive(Debug, Clone)]
pub struct Ensured {
  pub occurrence: Occurrence,
  /// `false` when the occurrence already existed.
  pub created:    bool,
}

/// Outcome of [`Engine::ensure_todays_occurrences`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TodayReport {
  pub created: usize,
  /// Past times of a multiple-daily habit recorded directly as missed.
  pub missed:  usize,
}

impl<S, N> Engine<S, N>
where
  S: HabitStore,
  N: Notifier,
{
  /// The next time `habit` is due, as seen from the clock's current instant.
  ///
  /// Fails with `InvalidSchedule` for malformed schedules; `Ok(None)` means
  /// the calendar ran out.
  pub fn get_next_occurrence(&self, habit: &Habit) -> Result<Option<DateTime<Utc>>> {
    self.next_after(habit, self.now())
  }

  pub(crate) fn next_after(
    &self,
    habit: &Habit,
    now: DateTime<Utc>,
  ) -> Result<Option<DateTime<Utc>>> {
    let recurrence = habit.schedule.resolve()?;
    Ok(
      next_occurrence(&recurrence, habit.local_now(now), &self.sleep)
        .and_then(|local| habit.resolve_local(local)),
    )
  }

  /// Return the occurrence of `habit` at `scheduled_at`, creating a `Pending`
  /// one if none exists.
  ///
  /// Fails with [`Error::Unstored`] rather than hand back a record the store
  /// never kept.
  pub async fn ensure_occurrence(
    &self,
    habit: &Habit,
    scheduled_at: DateTime<Utc>,
  ) -> Result<Ensured> {
    if let Some(occurrence) = self
      .store
      .find_occurrence(habit.habit_id, scheduled_at)
      .await
      .map_err(store)?
    {
      return Ok(Ensured { occurrence, created: false });
    }

    let occurrence = Occurrence::pending(habit, scheduled_at, self.now());
    for _ in 0..INSERT_ATTEMPTS {
      if self
        .store
        .insert_occurrence(&occurrence)
        .await
        .map_err(store)?
      {
        debug!(
          habit_id = %habit.habit_id,
          occurrence_id = %occurrence.occurrence_id,
          %scheduled_at,
          "created occurrence"
        );
        return Ok(Ensured { occurrence, created: true });
      }

      // Another writer got there between the check and the insert. If that
      // record is already gone again, insert once more.
      if let Some(existing) = self
        .store
        .find_occurrence(habit.habit_id, scheduled_at)
        .await
        .map_err(store)?
      {
        return Ok(Ensured { occurrence: existing, created: false });
      }
    }

    Err(Error::Unstored { habit_id: habit.habit_id, scheduled_at })
  }

  /// Materialise the occurrences of `habit` that fall on its local today.
  ///
  /// For a habit with several daily times, every time of today is
  /// reconciled: times still ahead (or inside their grace period) get a
  /// `Pending` occurrence, and times already past their grace period with no
  /// record at all are recorded as `Missed`. Other kinds create at most the
  /// next occurrence, and only if it falls on today.
  ///
  /// Archived habits are left alone. New misses are added to the stored
  /// counter and mirrored on `habit`.
  pub async fn ensure_todays_occurrences(&self, habit: &mut Habit) -> Result<TodayReport> {
    let mut report = TodayReport::default();
    if habit.archived {
      return Ok(report);
    }

    let now = self.now();
    let recurrence = habit.schedule.resolve()?;
    let local_now = habit.local_now(now);
    let today = local_now.date();

    if let Recurrence::DailyTimes { times } = &recurrence {
      let grace = habit.grace();
      let mut missed = Vec::new();
      for time in times {
        let Some(at) = habit.resolve_local(today.and_time(*time)) else {
          continue;
        };
        if at + grace < now {
          if !self
            .store
            .exists_occurrence(habit.habit_id, at)
            .await
            .map_err(store)?
          {
            missed.extend(self.record_missed(habit, at, now).await?);
          }
          continue;
        }
        if self.ensure_occurrence(habit, at).await?.created {
          report.created += 1;
        }
      }

      if !missed.is_empty() {
        report.missed = missed.len();
        self.count_misses(habit, missed.len(), now).await?;
        for occurrence in &missed {
          self.notify_missed(habit, occurrence).await;
        }
      }
      return Ok(report);
    }

    let next = next_occurrence(&recurrence, local_now, &self.sleep)
      .filter(|local| local.date() == today)
      .and_then(|local| habit.resolve_local(local));
    if let Some(at) = next
      && self.ensure_occurrence(habit, at).await?.created
    {
      report.created += 1;
    }
    Ok(report)
  }

  /// Make sure the next occurrence of `habit` exists, whatever day it falls
  /// on. Returns `None` for archived habits and exhausted calendars.
  pub async fn ensure_next_occurrence(&self, habit: &Habit) -> Result<Option<Ensured>> {
    if habit.archived {
      return Ok(None);
    }
    match self.next_after(habit, self.now())? {
      Some(at) => Ok(Some(self.ensure_occurrence(habit, at).await?)),
      None => Ok(None),
    }
  }

  /// Store a `Missed` occurrence for a time that never got a record. `None`
  /// if a record appeared in the meantime.
  async fn record_missed(
    &self,
    habit: &Habit,
    scheduled_at: DateTime<Utc>,
    now: DateTime<Utc>,
  ) -> Result<Option<Occurrence>> {
    let mut occurrence = Occurrence::pending(habit, scheduled_at, now);
    occurrence.mark_missed(now)?;
    if !self
      .store
      .insert_occurrence(&occurrence)
      .await
      .map_err(store)?
    {
      return Ok(None);
    }
    info!(
      habit_id = %habit.habit_id,
      %scheduled_at,
      "recorded missed occurrence"
    );
    Ok(Some(occurrence))
  }

  /// Bump the miss counter and apply the streak policy, in the store and on
  /// `habit`. Streak fields a completion may have written since `habit` was
  /// read are never overwritten.
  pub(crate) async fn count_misses(
    &self,
    habit: &mut Habit,
    count: usize,
    now: DateTime<Utc>,
  ) -> Result<()> {
    let count = u32::try_from(count).unwrap_or(u32::MAX);
    let reset = self.config.streak_reset_on_miss;
    self
      .store
      .record_misses(habit.habit_id, count, reset, now)
      .await
      .map_err(store)?;

    habit.missed_count = habit.missed_count.saturating_add(count);
    if reset {
      habit.streak.reset();
    }
    habit.updated_at = now;
    Ok(())
  }

  pub(crate) async fn notify_missed(&self, habit: &Habit, occurrence: &Occurrence) {
    let local = occurrence.scheduled_at.with_timezone(&habit.time_zone);
    self
      .notify(&format!(
        "Missed <b>{}</b> (due {})",
        escape_html(&habit.name),
        local.format("%Y-%m-%d %H:%M"),
      ))
      .await;
  }
}
