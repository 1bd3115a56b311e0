//! Habits: recurring obligations and their streak state.

use chrono::{
  DateTime, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, schedule::Schedule};

/// Grace period used when a new habit does not specify one.
pub const DEFAULT_GRACE_MINUTES: u32 = 30;

// ─── Streak ──────────────────────────────────────────────────────────────────

/// Consecutive-day completion counters.
///
/// Invariant: `current <= best`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
  pub current:        u32,
  pub best:           u32,
  pub last_completed: Option<NaiveDate>,
}

impl Streak {
  /// Apply a completion that happened on `today` (habit-local date).
  ///
  /// Completing twice on the same day counts once; completing the day after
  /// the last completion extends the run; anything else starts a new run.
  pub fn record_completion(&mut self, today: NaiveDate) {
    let yesterday = today.checked_sub_days(Days::new(1));
    match self.last_completed {
      Some(last) if last == today => {}
      Some(last) if Some(last) == yesterday => self.current += 1,
      _ => self.current = 1,
    }
    self.best = self.best.max(self.current);
    self.last_completed = Some(today);
  }

  /// Break the current run without touching the best.
  pub fn reset(&mut self) { self.current = 0; }
}

// ─── Habit ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
  pub habit_id:      Uuid,
  pub name:          String,
  pub description:   Option<String>,
  pub schedule:      Schedule,
  pub grace_minutes: u32,
  pub time_zone:     Tz,
  pub archived:      bool,
  /// When the missed-occurrence sweep last ran for this habit.
  pub last_checked:  Option<DateTime<Utc>>,
  pub missed_count:  u32,
  pub streak:        Streak,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

impl Habit {
  pub fn grace(&self) -> Duration { Duration::minutes(i64::from(self.grace_minutes)) }

  /// `now` as wall-clock time in the habit's zone.
  pub fn local_now(&self, now: DateTime<Utc>) -> NaiveDateTime {
    now.with_timezone(&self.time_zone).naive_local()
  }

  /// The habit-local calendar date of `now`.
  pub fn local_today(&self, now: DateTime<Utc>) -> NaiveDate {
    self.local_now(now).date()
  }

  /// Map habit-local wall-clock time to an instant.
  ///
  /// Ambiguous times take the earlier instant; times skipped by a DST jump
  /// move forward an hour.
  pub fn resolve_local(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    resolve_local(self.time_zone, local)
  }

  /// The half-open instant range of the habit-local day containing `now`.
  ///
  /// Follows local midnights, so DST days are 23 or 25 hours long.
  pub fn day_window(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let today = self.local_today(now);
    let tomorrow = today.checked_add_days(Days::new(1))?;
    Some((
      self.resolve_local(today.and_time(NaiveTime::MIN))?,
      self.resolve_local(tomorrow.and_time(NaiveTime::MIN))?,
    ))
  }
}

pub fn resolve_local(zone: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
  zone
    .from_local_datetime(&local)
    .earliest()
    .or_else(|| {
      zone
        .from_local_datetime(&local.checked_add_signed(Duration::hours(1))?)
        .earliest()
    })
    .map(|dt| dt.with_timezone(&Utc))
}

/// Parse an IANA zone name such as `"Europe/Berlin"`.
pub fn parse_zone(name: &str) -> Result<Tz> {
  name
    .parse::<Tz>()
    .map_err(|_| Error::UnknownTimeZone(name.to_owned()))
}

// ─── NewHabit ────────────────────────────────────────────────────────────────

/// Input to habit creation. Identity, timestamps and scheduling state are
/// assigned when it becomes a [`Habit`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHabit {
  pub name:          String,
  pub description:   Option<String>,
  pub schedule:      Schedule,
  pub grace_minutes: Option<u32>,
  pub time_zone:     Tz,
}

impl NewHabit {
  pub fn new(name: impl Into<String>, schedule: Schedule) -> Self {
    Self {
      name: name.into(),
      description: None,
      schedule,
      grace_minutes: None,
      time_zone: Tz::UTC,
    }
  }

  /// Build the initial [`Habit`]: streaks at zero, not archived.
  pub fn into_habit(self, now: DateTime<Utc>, default_grace: u32) -> Habit {
    Habit {
      habit_id:      Uuid::new_v4(),
      name:          self.name,
      description:   self.description,
      schedule:      self.schedule,
      grace_minutes: self.grace_minutes.unwrap_or(default_grace),
      time_zone:     self.time_zone,
      archived:      false,
      last_checked:  None,
      missed_count:  0,
      streak:        Streak::default(),
      created_at:    now,
      updated_at:    now,
    }
  }
}
