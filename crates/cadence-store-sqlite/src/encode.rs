//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Instants are stored as fixed-width RFC 3339 UTC strings (microsecond
//! precision, `Z` suffix) so that lexical order equals chronological order and
//! range queries can compare strings directly. Local stamps keep their offset.
//! UUIDs are stored as hyphenated lowercase strings.

use std::str::FromStr;

use cadence_core::{
  habit::{Habit, Streak},
  occurrence::{Occurrence, OccurrenceStatus},
  schedule::{RecurrenceKind, Schedule},
};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, Utc, Weekday};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── DateTime<FixedOffset> ────────────────────────────────────────────────────

pub fn encode_local_dt(dt: DateTime<FixedOffset>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, false)
}

pub fn decode_local_dt(s: &str) -> Result<DateTime<FixedOffset>> {
  DateTime::parse_from_rfc3339(s)
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── Calendar values ──────────────────────────────────────────────────────────

pub fn encode_time(t: NaiveTime) -> String { t.format("%H:%M:%S").to_string() }

pub fn decode_time(s: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(s, "%H:%M:%S")
    .map_err(|e| Error::Decode(format!("time {s:?}: {e}")))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

pub fn encode_weekday(w: Weekday) -> String { w.to_string().to_lowercase() }

pub fn decode_weekday(s: &str) -> Result<Weekday> {
  Weekday::from_str(s).map_err(|_| Error::Decode(format!("unknown weekday: {s:?}")))
}

pub fn encode_times(times: &[NaiveTime]) -> Result<String> {
  Ok(serde_json::to_string(times)?)
}

pub fn decode_times(s: &str) -> Result<Vec<NaiveTime>> { Ok(serde_json::from_str(s)?) }

// ─── Enums ────────────────────────────────────────────────────────────────────

pub fn decode_kind(s: &str) -> Result<RecurrenceKind> {
  RecurrenceKind::from_str(s)
    .map_err(|_| Error::Decode(format!("unknown recurrence kind: {s:?}")))
}

pub fn decode_status(s: &str) -> Result<OccurrenceStatus> {
  OccurrenceStatus::from_str(s)
    .map_err(|_| Error::Decode(format!("unknown occurrence status: {s:?}")))
}

pub fn decode_zone(s: &str) -> Result<Tz> {
  Ok(cadence_core::habit::parse_zone(s)?)
}

// ─── Column lists ─────────────────────────────────────────────────────────────

pub const HABIT_COLUMNS: &str = "habit_id, name, description, kind, time_of_day,
  weekday, day_of_month, month, daily_times, grace_minutes, time_zone,
  archived, last_checked, missed_count, current_streak, best_streak,
  last_completed, created_at, updated_at";

pub const OCCURRENCE_COLUMNS: &str = "occurrence_id, habit_id, scheduled_at,
  status, completed_at, missed_at, completed_in_grace_period, notified,
  time_zone, created_at, updated_at";

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `habits` row.
pub struct RawHabit {
  pub habit_id:       String,
  pub name:           String,
  pub description:    Option<String>,
  pub kind:           String,
  pub time_of_day:    String,
  pub weekday:        Option<String>,
  pub day_of_month:   Option<u32>,
  pub month:          Option<u32>,
  pub daily_times:    String,
  pub grace_minutes:  u32,
  pub time_zone:      String,
  pub archived:       bool,
  pub last_checked:   Option<String>,
  pub missed_count:   u32,
  pub current_streak: u32,
  pub best_streak:    u32,
  pub last_completed: Option<String>,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawHabit {
  /// Map a row selected with [`HABIT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      habit_id:       row.get(0)?,
      name:           row.get(1)?,
      description:    row.get(2)?,
      kind:           row.get(3)?,
      time_of_day:    row.get(4)?,
      weekday:        row.get(5)?,
      day_of_month:   row.get(6)?,
      month:          row.get(7)?,
      daily_times:    row.get(8)?,
      grace_minutes:  row.get(9)?,
      time_zone:      row.get(10)?,
      archived:       row.get(11)?,
      last_checked:   row.get(12)?,
      missed_count:   row.get(13)?,
      current_streak: row.get(14)?,
      best_streak:    row.get(15)?,
      last_completed: row.get(16)?,
      created_at:     row.get(17)?,
      updated_at:     row.get(18)?,
    })
  }

  pub fn from_habit(h: &Habit) -> Result<Self> {
    Ok(Self {
      habit_id:       encode_uuid(h.habit_id),
      name:           h.name.clone(),
      description:    h.description.clone(),
      kind:           h.schedule.kind.to_string(),
      time_of_day:    encode_time(h.schedule.time_of_day),
      weekday:        h.schedule.weekday.map(encode_weekday),
      day_of_month:   h.schedule.day_of_month,
      month:          h.schedule.month,
      daily_times:    encode_times(&h.schedule.daily_times)?,
      grace_minutes:  h.grace_minutes,
      time_zone:      h.time_zone.name().to_owned(),
      archived:       h.archived,
      last_checked:   h.last_checked.map(encode_dt),
      missed_count:   h.missed_count,
      current_streak: h.streak.current,
      best_streak:    h.streak.best,
      last_completed: h.streak.last_completed.map(encode_date),
      created_at:     encode_dt(h.created_at),
      updated_at:     encode_dt(h.updated_at),
    })
  }

  pub fn into_habit(self) -> Result<Habit> {
    let schedule = Schedule {
      kind:         decode_kind(&self.kind)?,
      time_of_day:  decode_time(&self.time_of_day)?,
      weekday:      self.weekday.as_deref().map(decode_weekday).transpose()?,
      day_of_month: self.day_of_month,
      month:        self.month,
      daily_times:  decode_times(&self.daily_times)?,
    };

    Ok(Habit {
      habit_id: decode_uuid(&self.habit_id)?,
      name: self.name,
      description: self.description,
      schedule,
      grace_minutes: self.grace_minutes,
      time_zone: decode_zone(&self.time_zone)?,
      archived: self.archived,
      last_checked: self.last_checked.as_deref().map(decode_dt).transpose()?,
      missed_count: self.missed_count,
      streak: Streak {
        current:        self.current_streak,
        best:           self.best_streak,
        last_completed: self.last_completed.as_deref().map(decode_date).transpose()?,
      },
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from an `occurrences` row.
pub struct RawOccurrence {
  pub occurrence_id:             String,
  pub habit_id:                  String,
  pub scheduled_at:              String,
  pub status:                    String,
  pub completed_at:              Option<String>,
  pub missed_at:                 Option<String>,
  pub completed_in_grace_period: bool,
  pub notified:                  bool,
  pub time_zone:                 String,
  pub created_at:                String,
  pub updated_at:                String,
}

impl RawOccurrence {
  /// Map a row selected with [`OCCURRENCE_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      occurrence_id:             row.get(0)?,
      habit_id:                  row.get(1)?,
      scheduled_at:              row.get(2)?,
      status:                    row.get(3)?,
      completed_at:              row.get(4)?,
      missed_at:                 row.get(5)?,
      completed_in_grace_period: row.get(6)?,
      notified:                  row.get(7)?,
      time_zone:                 row.get(8)?,
      created_at:                row.get(9)?,
      updated_at:                row.get(10)?,
    })
  }

  pub fn from_occurrence(o: &Occurrence) -> Self {
    Self {
      occurrence_id:             encode_uuid(o.occurrence_id),
      habit_id:                  encode_uuid(o.habit_id),
      scheduled_at:              encode_dt(o.scheduled_at),
      status:                    o.status.to_string(),
      completed_at:              o.completed_at.map(encode_dt),
      missed_at:                 o.missed_at.map(encode_dt),
      completed_in_grace_period: o.completed_in_grace_period,
      notified:                  o.notified,
      time_zone:                 o.time_zone.name().to_owned(),
      created_at:                encode_local_dt(o.created_at),
      updated_at:                encode_local_dt(o.updated_at),
    }
  }

  pub fn into_occurrence(self) -> Result<Occurrence> {
    Ok(Occurrence {
      occurrence_id:             decode_uuid(&self.occurrence_id)?,
      habit_id:                  decode_uuid(&self.habit_id)?,
      scheduled_at:              decode_dt(&self.scheduled_at)?,
      status:                    decode_status(&self.status)?,
      completed_at:              self.completed_at.as_deref().map(decode_dt).transpose()?,
      missed_at:                 self.missed_at.as_deref().map(decode_dt).transpose()?,
      completed_in_grace_period: self.completed_in_grace_period,
      notified:                  self.notified,
      time_zone:                 decode_zone(&self.time_zone)?,
      created_at:                decode_local_dt(&self.created_at)?,
      updated_at:                decode_local_dt(&self.updated_at)?,
    })
  }
}
