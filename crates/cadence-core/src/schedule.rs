//! Schedule descriptors.
//!
//! A [`Schedule`] is the flat, persisted shape of a habit's recurrence: a kind
//! plus whichever optional parameters that kind needs. Before any calculation
//! it is resolved into a [`Recurrence`], the tagged form the calculator
//! dispatches on. Resolution is where missing or contradictory parameters are
//! rejected.

use chrono::{NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Error, Result, recurrence::days_in_month};

// ─── Kind ────────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString,
  Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RecurrenceKind {
  Hourly,
  Daily,
  Weekly,
  Monthly,
  Yearly,
}

// ─── Flat descriptor ─────────────────────────────────────────────────────────

/// The persisted schedule of a habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
  pub kind:         RecurrenceKind,
  /// For `Hourly` only the minute is used.
  pub time_of_day:  NaiveTime,
  /// Required for `Weekly`.
  pub weekday:      Option<Weekday>,
  /// Required for `Monthly` and `Yearly` (1–31).
  pub day_of_month: Option<u32>,
  /// Required for `Yearly` (1–12).
  pub month:        Option<u32>,
  /// Non-empty turns a `Daily` schedule into the multiple-times variant.
  #[serde(default)]
  pub daily_times:  Vec<NaiveTime>,
}

impl Schedule {
  pub fn hourly(minute: u32) -> Self {
    Self::bare(
      RecurrenceKind::Hourly,
      NaiveTime::from_hms_opt(0, minute.min(59), 0).unwrap_or(NaiveTime::MIN),
    )
  }

  pub fn daily(at: NaiveTime) -> Self { Self::bare(RecurrenceKind::Daily, at) }

  pub fn daily_at_times(times: Vec<NaiveTime>) -> Self {
    let first = times.iter().min().copied().unwrap_or(NaiveTime::MIN);
    Self { daily_times: times, ..Self::bare(RecurrenceKind::Daily, first) }
  }

  pub fn weekly(weekday: Weekday, at: NaiveTime) -> Self {
    Self { weekday: Some(weekday), ..Self::bare(RecurrenceKind::Weekly, at) }
  }

  pub fn monthly(day: u32, at: NaiveTime) -> Self {
    Self {
      day_of_month: Some(day),
      ..Self::bare(RecurrenceKind::Monthly, at)
    }
  }

  pub fn yearly(month: u32, day: u32, at: NaiveTime) -> Self {
    Self {
      month: Some(month),
      day_of_month: Some(day),
      ..Self::bare(RecurrenceKind::Yearly, at)
    }
  }

  fn bare(kind: RecurrenceKind, time_of_day: NaiveTime) -> Self {
    Self {
      kind,
      time_of_day,
      weekday: None,
      day_of_month: None,
      month: None,
      daily_times: Vec::new(),
    }
  }

  /// Resolve into the tagged form, rejecting missing or contradictory
  /// parameters with [`Error::InvalidSchedule`].
  pub fn resolve(&self) -> Result<Recurrence> {
    let at = self.time_of_day;
    if self.kind != RecurrenceKind::Daily && !self.daily_times.is_empty() {
      return Err(invalid(format!(
        "{} schedule cannot carry daily times",
        self.kind
      )));
    }
    if self.kind != RecurrenceKind::Weekly && self.weekday.is_some() {
      return Err(invalid(format!("{} schedule cannot carry a weekday", self.kind)));
    }
    if self.kind != RecurrenceKind::Yearly && self.month.is_some() {
      return Err(invalid(format!("{} schedule cannot carry a month", self.kind)));
    }
    if !matches!(self.kind, RecurrenceKind::Monthly | RecurrenceKind::Yearly)
      && self.day_of_month.is_some()
    {
      return Err(invalid(format!(
        "{} schedule cannot carry a day of month",
        self.kind
      )));
    }

    match self.kind {
      RecurrenceKind::Hourly => Ok(Recurrence::Hourly { minute: at.minute() }),
      RecurrenceKind::Daily if self.daily_times.is_empty() => {
        Ok(Recurrence::Daily { at })
      }
      RecurrenceKind::Daily => {
        let mut times = self.daily_times.clone();
        times.sort();
        times.dedup();
        Ok(Recurrence::DailyTimes { times })
      }
      RecurrenceKind::Weekly => {
        let weekday = self
          .weekday
          .ok_or_else(|| invalid("weekly schedule without a weekday".into()))?;
        Ok(Recurrence::Weekly { weekday, at })
      }
      RecurrenceKind::Monthly => {
        let day = self
          .day_of_month
          .ok_or_else(|| invalid("monthly schedule without a day of month".into()))?;
        check_day(day)?;
        Ok(Recurrence::Monthly { day, at })
      }
      RecurrenceKind::Yearly => {
        let month = self
          .month
          .ok_or_else(|| invalid("yearly schedule without a month".into()))?;
        let day = self
          .day_of_month
          .ok_or_else(|| invalid("yearly schedule without a day of month".into()))?;
        if !(1..=12).contains(&month) {
          return Err(invalid(format!("month {month} is out of range")));
        }
        check_day(day)?;
        // Longest the month ever gets (leap year).
        let longest = days_in_month(2000, month).unwrap_or(31);
        if day > longest {
          return Err(invalid(format!("month {month} never has a day {day}")));
        }
        Ok(Recurrence::Yearly { month, day, at })
      }
    }
  }
}

fn check_day(day: u32) -> Result<()> {
  if (1..=31).contains(&day) {
    Ok(())
  } else {
    Err(invalid(format!("day of month {day} is out of range")))
  }
}

fn invalid(msg: String) -> Error { Error::InvalidSchedule(msg) }

// ─── Tagged form ─────────────────────────────────────────────────────────────

/// A validated recurrence, one variant per kind with exactly the parameters it
/// needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
  Hourly { minute: u32 },
  Daily { at: NaiveTime },
  /// Several fixed times every day; sorted and deduplicated.
  DailyTimes { times: Vec<NaiveTime> },
  Weekly { weekday: Weekday, at: NaiveTime },
  Monthly { day: u32, at: NaiveTime },
  Yearly { month: u32, day: u32, at: NaiveTime },
}

impl Recurrence {
  pub fn kind(&self) -> RecurrenceKind {
    match self {
      Self::Hourly { .. } => RecurrenceKind::Hourly,
      Self::Daily { .. } | Self::DailyTimes { .. } => RecurrenceKind::Daily,
      Self::Weekly { .. } => RecurrenceKind::Weekly,
      Self::Monthly { .. } => RecurrenceKind::Monthly,
      Self::Yearly { .. } => RecurrenceKind::Yearly,
    }
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  fn nine() -> NaiveTime { NaiveTime::from_hms_opt(9, 0, 0).unwrap() }

  #[test]
  fn weekly_without_weekday_is_invalid() {
    let mut s = Schedule::weekly(Weekday::Mon, nine());
    s.weekday = None;
    assert!(matches!(s.resolve(), Err(Error::InvalidSchedule(_))));
  }

  #[test]
  fn monthly_day_out_of_range_is_invalid() {
    assert!(Schedule::monthly(0, nine()).resolve().is_err());
    assert!(Schedule::monthly(32, nine()).resolve().is_err());
    assert!(Schedule::monthly(31, nine()).resolve().is_ok());
  }

  #[test]
  fn yearly_impossible_date_is_invalid() {
    assert!(Schedule::yearly(2, 30, nine()).resolve().is_err());
    assert!(Schedule::yearly(13, 1, nine()).resolve().is_err());
    assert!(Schedule::yearly(2, 29, nine()).resolve().is_ok());
  }

  #[test]
  fn contradictory_parameters_are_invalid() {
    let mut s = Schedule::daily(nine());
    s.weekday = Some(Weekday::Tue);
    assert!(s.resolve().is_err());

    let mut s = Schedule::weekly(Weekday::Tue, nine());
    s.daily_times = vec![nine()];
    assert!(s.resolve().is_err());
  }

  #[test]
  fn daily_times_are_sorted_and_deduplicated() {
    let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
    let s = Schedule::daily_at_times(vec![t(18), t(8), t(18), t(12)]);
    assert_eq!(s.time_of_day, t(8));
    assert_eq!(
      s.resolve().unwrap(),
      Recurrence::DailyTimes { times: vec![t(8), t(12), t(18)] }
    );
  }

  #[test]
  fn hourly_keeps_only_the_minute() {
    assert_eq!(
      Schedule::hourly(15).resolve().unwrap(),
      Recurrence::Hourly { minute: 15 }
    );
  }

  #[test]
  fn kind_parses_case_insensitively() {
    assert_eq!(RecurrenceKind::from_str("WEEKLY").unwrap(), RecurrenceKind::Weekly);
    assert_eq!(RecurrenceKind::Monthly.to_string(), "monthly");
  }
}
