//! Occurrences: single scheduled instances of a habit.
//!
//! Status forms a small state machine. `Pending` is the only state with
//! outgoing transitions; the three resolutions are terminal:
//!
//! ```text
//! Pending ──complete──▶ Completed
//!    │ ────miss──────▶ Missed
//!    └────skip──────▶ Skipped
//! ```

use chrono::{DateTime, Duration, FixedOffset, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result, habit::Habit};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OccurrenceStatus {
  Pending,
  Completed,
  Missed,
  Skipped,
}

impl OccurrenceStatus {
  pub fn is_terminal(self) -> bool { self != Self::Pending }
}

/// What a transition request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  /// The occurrence moved to the requested state.
  Applied,
  /// The occurrence was already in the requested state; nothing changed.
  Unchanged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occurrence {
  pub occurrence_id:             Uuid,
  pub habit_id:                  Uuid,
  /// Together with `habit_id`, the deduplication key.
  pub scheduled_at:              DateTime<Utc>,
  pub status:                    OccurrenceStatus,
  pub completed_at:              Option<DateTime<Utc>>,
  pub missed_at:                 Option<DateTime<Utc>>,
  pub completed_in_grace_period: bool,
  /// Whether an upcoming-reminder has gone out.
  pub notified:                  bool,
  /// The habit's zone when this occurrence was created.
  pub time_zone:                 Tz,
  /// Stamped in the habit's zone.
  pub created_at:                DateTime<FixedOffset>,
  pub updated_at:                DateTime<FixedOffset>,
}

impl Occurrence {
  /// A fresh `Pending` occurrence of `habit` at `scheduled_at`.
  pub fn pending(habit: &Habit, scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
    let stamp = now.with_timezone(&habit.time_zone).fixed_offset();
    Self {
      occurrence_id: Uuid::new_v4(),
      habit_id: habit.habit_id,
      scheduled_at,
      status: OccurrenceStatus::Pending,
      completed_at: None,
      missed_at: None,
      completed_in_grace_period: false,
      notified: false,
      time_zone: habit.time_zone,
      created_at: stamp,
      updated_at: stamp,
    }
  }

  /// `Pending → Completed`. On-time iff `now < scheduled_at + grace`.
  pub fn complete(&mut self, now: DateTime<Utc>, grace: Duration) -> Result<Transition> {
    match self.status {
      OccurrenceStatus::Completed => Ok(Transition::Unchanged),
      OccurrenceStatus::Pending => {
        self.status = OccurrenceStatus::Completed;
        self.completed_at = Some(now);
        self.completed_in_grace_period = now < self.scheduled_at + grace;
        self.touch(now);
        Ok(Transition::Applied)
      }
      from => Err(Error::InvalidTransition { from, to: OccurrenceStatus::Completed }),
    }
  }

  /// `Pending → Missed`.
  pub fn mark_missed(&mut self, now: DateTime<Utc>) -> Result<Transition> {
    match self.status {
      OccurrenceStatus::Missed => Ok(Transition::Unchanged),
      OccurrenceStatus::Pending => {
        self.status = OccurrenceStatus::Missed;
        self.missed_at = Some(now);
        self.touch(now);
        Ok(Transition::Applied)
      }
      from => Err(Error::InvalidTransition { from, to: OccurrenceStatus::Missed }),
    }
  }

  /// `Pending → Skipped`.
  pub fn skip(&mut self, now: DateTime<Utc>) -> Result<Transition> {
    match self.status {
      OccurrenceStatus::Skipped => Ok(Transition::Unchanged),
      OccurrenceStatus::Pending => {
        self.status = OccurrenceStatus::Skipped;
        self.touch(now);
        Ok(Transition::Applied)
      }
      from => Err(Error::InvalidTransition { from, to: OccurrenceStatus::Skipped }),
    }
  }

  /// `scheduled_at + grace < now`, the missed-detection boundary.
  pub fn is_overdue(&self, now: DateTime<Utc>, grace: Duration) -> bool {
    self.scheduled_at + grace < now
  }

  fn touch(&mut self, now: DateTime<Utc>) {
    self.updated_at = now.with_timezone(&self.time_zone).fixed_offset();
  }
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveTime, TimeZone};

  use super::*;
  use crate::{habit::NewHabit, schedule::Schedule};

  fn fixture() -> (Habit, Occurrence, DateTime<Utc>) {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    let habit = NewHabit::new(
      "Read",
      Schedule::daily(NaiveTime::from_hms_opt(9, 0, 0).unwrap()),
    )
    .into_habit(t0, 30);
    let occ = Occurrence::pending(&habit, t0, t0);
    (habit, occ, t0)
  }

  #[test]
  fn complete_within_grace() {
    let (habit, mut occ, t0) = fixture();
    let at = t0 + Duration::minutes(20);
    assert_eq!(occ.complete(at, habit.grace()).unwrap(), Transition::Applied);
    assert_eq!(occ.status, OccurrenceStatus::Completed);
    assert!(occ.completed_in_grace_period);
    assert_eq!(occ.completed_at, Some(at));
  }

  #[test]
  fn complete_at_grace_boundary_is_late() {
    let (habit, mut occ, t0) = fixture();
    occ.complete(t0 + Duration::minutes(30), habit.grace()).unwrap();
    assert!(!occ.completed_in_grace_period);
  }

  #[test]
  fn completing_twice_is_a_no_op() {
    let (habit, mut occ, t0) = fixture();
    occ.complete(t0, habit.grace()).unwrap();
    let first = occ.completed_at;
    let again = occ.complete(t0 + Duration::hours(2), habit.grace()).unwrap();
    assert_eq!(again, Transition::Unchanged);
    assert_eq!(occ.completed_at, first);
  }

  #[test]
  fn terminal_states_do_not_transition() {
    let (habit, mut occ, t0) = fixture();
    occ.mark_missed(t0 + Duration::hours(1)).unwrap();
    assert!(matches!(
      occ.complete(t0, habit.grace()),
      Err(Error::InvalidTransition {
        from: OccurrenceStatus::Missed,
        to:   OccurrenceStatus::Completed,
      })
    ));
    assert!(occ.skip(t0).is_err());
    assert_eq!(occ.status, OccurrenceStatus::Missed);
  }

  #[test]
  fn completed_never_becomes_missed() {
    let (habit, mut occ, t0) = fixture();
    occ.complete(t0, habit.grace()).unwrap();
    assert!(occ.mark_missed(t0 + Duration::hours(3)).is_err());
    assert_eq!(occ.status, OccurrenceStatus::Completed);
    assert!(occ.missed_at.is_none());
  }

  #[test]
  fn overdue_is_strictly_after_grace() {
    let (habit, occ, t0) = fixture();
    assert!(!occ.is_overdue(t0 + Duration::minutes(10), habit.grace()));
    assert!(!occ.is_overdue(t0 + Duration::minutes(30), habit.grace()));
    assert!(occ.is_overdue(t0 + Duration::minutes(31), habit.grace()));
  }
}
