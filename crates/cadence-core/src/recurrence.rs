//! The recurrence calculator.
//!
//! Everything here operates on naive wall-clock time in the habit's own zone.
//! Turning the result into an absolute instant is the caller's job (see
//! [`crate::habit::Habit::resolve_local`]).
//!
//! Boundary rule: a candidate exactly equal to `now` has not passed yet and is
//! returned as-is.

use chrono::{Datelike, Days, Duration, Months, NaiveDate, NaiveDateTime, Timelike};

use crate::{
  schedule::{Recurrence, Schedule},
  sleep::SleepWindow,
};

/// Next occurrence for a raw schedule. Malformed schedules produce `None`.
pub fn next_for_schedule(
  schedule: &Schedule,
  now: NaiveDateTime,
  sleep: &SleepWindow,
) -> Option<NaiveDateTime> {
  let recurrence = schedule.resolve().ok()?;
  next_occurrence(&recurrence, now, sleep)
}

/// Next occurrence at or after `now`. `None` only on calendar overflow.
pub fn next_occurrence(
  recurrence: &Recurrence,
  now: NaiveDateTime,
  sleep: &SleepWindow,
) -> Option<NaiveDateTime> {
  match recurrence {
    Recurrence::Hourly { minute } => next_hourly(*minute, now, sleep),
    Recurrence::Daily { at } => {
      let mut next = now.date().and_time(*at);
      if next < now {
        next = next.checked_add_days(Days::new(1))?;
      }
      if sleep.is_quiet(next.time()) {
        next = after_sleep(next, sleep)?;
      }
      Some(next)
    }
    Recurrence::DailyTimes { times } => {
      let today = now.date();
      if let Some(t) = times.iter().find(|t| today.and_time(**t) >= now) {
        return Some(today.and_time(*t));
      }
      let first = times.first()?;
      Some(today.checked_add_days(Days::new(1))?.and_time(*first))
    }
    Recurrence::Weekly { weekday, at } => {
      let today = now.date();
      let ahead = (7 + weekday.num_days_from_monday()
        - today.weekday().num_days_from_monday())
        % 7;
      let mut next = today
        .checked_add_days(Days::new(u64::from(ahead)))?
        .and_time(*at);
      if next < now {
        next = next.checked_add_days(Days::new(7))?;
      }
      Some(next)
    }
    Recurrence::Monthly { day, at } => {
      let this_month = clamped_date(now.year(), now.month(), *day)?.and_time(*at);
      if this_month >= now {
        return Some(this_month);
      }
      let first_of_next = now
        .date()
        .with_day(1)?
        .checked_add_months(Months::new(1))?;
      Some(
        clamped_date(first_of_next.year(), first_of_next.month(), *day)?
          .and_time(*at),
      )
    }
    Recurrence::Yearly { month, day, at } => {
      let this_year = clamped_date(now.year(), *month, *day)?.and_time(*at);
      if this_year >= now {
        return Some(this_year);
      }
      Some(clamped_date(now.year() + 1, *month, *day)?.and_time(*at))
    }
  }
}

/// The hour after the current one at `minute`, stepping forward an hour at a
/// time while inside the sleep window. A window covering every candidate in a
/// day leaves the first candidate in place.
fn next_hourly(
  minute: u32,
  now: NaiveDateTime,
  sleep: &SleepWindow,
) -> Option<NaiveDateTime> {
  let first = now
    .date()
    .and_hms_opt(now.hour(), 0, 0)?
    .checked_add_signed(Duration::hours(1))?
    .with_minute(minute)?;

  let mut next = first;
  for _ in 0..24 {
    if !sleep.is_quiet(next.time()) {
      return Some(next);
    }
    next = next.checked_add_signed(Duration::hours(1))?;
  }
  Some(first)
}

/// Push a quiet candidate to the end of the quiet period it falls in, plus the
/// window's buffer. For a window crossing midnight, a candidate in the evening
/// part belongs to the period ending the next morning.
fn after_sleep(candidate: NaiveDateTime, sleep: &SleepWindow) -> Option<NaiveDateTime> {
  let date = if sleep.crosses_midnight() && candidate.time() > sleep.start {
    candidate.date().checked_add_days(Days::new(1))?
  } else {
    candidate.date()
  };
  date
    .and_time(sleep.end)
    .checked_add_signed(sleep.buffer)
}

/// Number of days in `month` of `year`.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
  let first = NaiveDate::from_ymd_opt(year, month, 1)?;
  let next = first.checked_add_months(Months::new(1))?;
  u32::try_from(next.signed_duration_since(first).num_days()).ok()
}

/// `day` of the given month, clamped to the month's length.
pub fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
  let last = days_in_month(year, month)?;
  NaiveDate::from_ymd_opt(year, month, day.clamp(1, last))
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveTime, Weekday};

  use super::*;

  fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
      .unwrap()
      .and_hms_opt(h, mi, 0)
      .unwrap()
  }

  fn t(h: u32, m: u32) -> NaiveTime { NaiveTime::from_hms_opt(h, m, 0).unwrap() }

  fn night() -> SleepWindow { SleepWindow::new(t(23, 0), t(6, 0), Duration::minutes(5)) }

  // ── Hourly ──────────────────────────────────────────────────────────────

  #[test]
  fn hourly_moves_to_next_hour_at_minute() {
    let r = Recurrence::Hourly { minute: 30 };
    let next = next_occurrence(&r, at(2024, 5, 1, 10, 5), &night()).unwrap();
    assert_eq!(next, at(2024, 5, 1, 11, 30));
  }

  #[test]
  fn hourly_skips_sleep_hours() {
    let r = Recurrence::Hourly { minute: 0 };
    // 23:00 is on the open boundary, so it is allowed.
    let next = next_occurrence(&r, at(2024, 5, 1, 22, 10), &night()).unwrap();
    assert_eq!(next, at(2024, 5, 1, 23, 0));

    let r = Recurrence::Hourly { minute: 15 };
    let next = next_occurrence(&r, at(2024, 5, 1, 22, 10), &night()).unwrap();
    assert_eq!(next, at(2024, 5, 2, 6, 15));
  }

  #[test]
  fn hourly_with_all_day_window_keeps_first_candidate() {
    let always = SleepWindow::new(t(0, 0), t(0, 0), Duration::minutes(5));
    let r = Recurrence::Hourly { minute: 10 };
    let next = next_occurrence(&r, at(2024, 5, 1, 8, 0), &always).unwrap();
    assert_eq!(next, at(2024, 5, 1, 9, 10));
  }

  // ── Daily ───────────────────────────────────────────────────────────────

  #[test]
  fn daily_later_today() {
    let r = Recurrence::Daily { at: t(9, 0) };
    let next = next_occurrence(&r, at(2024, 5, 1, 8, 0), &night()).unwrap();
    assert_eq!(next, at(2024, 5, 1, 9, 0));
  }

  #[test]
  fn daily_equal_to_now_is_not_passed() {
    let r = Recurrence::Daily { at: t(9, 0) };
    let next = next_occurrence(&r, at(2024, 5, 1, 9, 0), &night()).unwrap();
    assert_eq!(next, at(2024, 5, 1, 9, 0));
  }

  #[test]
  fn daily_passed_moves_to_tomorrow() {
    let r = Recurrence::Daily { at: t(9, 0) };
    let next = next_occurrence(&r, at(2024, 5, 1, 9, 1), &night()).unwrap();
    assert_eq!(next, at(2024, 5, 2, 9, 0));
  }

  #[test]
  fn daily_inside_sleep_snaps_to_wake_up() {
    let r = Recurrence::Daily { at: t(3, 0) };
    let next = next_occurrence(&r, at(2024, 5, 1, 1, 0), &night()).unwrap();
    assert_eq!(next, at(2024, 5, 1, 6, 5));
  }

  #[test]
  fn daily_late_evening_snaps_to_next_morning() {
    let r = Recurrence::Daily { at: t(23, 30) };
    let next = next_occurrence(&r, at(2024, 5, 1, 20, 0), &night()).unwrap();
    assert_eq!(next, at(2024, 5, 2, 6, 5));
  }

  #[test]
  fn daily_times_picks_next_slot() {
    let r = Recurrence::DailyTimes { times: vec![t(8, 0), t(12, 0), t(18, 0)] };
    assert_eq!(
      next_occurrence(&r, at(2024, 5, 1, 9, 0), &night()).unwrap(),
      at(2024, 5, 1, 12, 0)
    );
    assert_eq!(
      next_occurrence(&r, at(2024, 5, 1, 19, 0), &night()).unwrap(),
      at(2024, 5, 2, 8, 0)
    );
  }

  // ── Weekly ──────────────────────────────────────────────────────────────

  #[test]
  fn weekly_finds_next_matching_weekday() {
    // 2024-05-01 is a Wednesday.
    let r = Recurrence::Weekly { weekday: Weekday::Fri, at: t(7, 0) };
    let next = next_occurrence(&r, at(2024, 5, 1, 12, 0), &night()).unwrap();
    assert_eq!(next, at(2024, 5, 3, 7, 0));
  }

  #[test]
  fn weekly_same_day_later_is_today() {
    let r = Recurrence::Weekly { weekday: Weekday::Wed, at: t(18, 0) };
    let next = next_occurrence(&r, at(2024, 5, 1, 12, 0), &night()).unwrap();
    assert_eq!(next, at(2024, 5, 1, 18, 0));
  }

  #[test]
  fn weekly_same_day_passed_is_seven_days_out() {
    let r = Recurrence::Weekly { weekday: Weekday::Wed, at: t(7, 0) };
    let next = next_occurrence(&r, at(2024, 5, 1, 12, 0), &night()).unwrap();
    assert_eq!(next, at(2024, 5, 8, 7, 0));
  }

  // ── Monthly ─────────────────────────────────────────────────────────────

  #[test]
  fn monthly_day_31_in_april_is_april_30() {
    let r = Recurrence::Monthly { day: 31, at: t(9, 0) };
    let next = next_occurrence(&r, at(2024, 4, 10, 9, 0), &night()).unwrap();
    assert_eq!(next, at(2024, 4, 30, 9, 0));
  }

  #[test]
  fn monthly_passed_reclamps_in_next_month() {
    let r = Recurrence::Monthly { day: 31, at: t(9, 0) };
    let next = next_occurrence(&r, at(2024, 1, 31, 10, 0), &night()).unwrap();
    assert_eq!(next, at(2024, 2, 29, 9, 0));

    let next = next_occurrence(&r, at(2023, 1, 31, 10, 0), &night()).unwrap();
    assert_eq!(next, at(2023, 2, 28, 9, 0));

    let next = next_occurrence(&r, at(2024, 4, 30, 10, 0), &night()).unwrap();
    assert_eq!(next, at(2024, 5, 31, 9, 0));
  }

  #[test]
  fn monthly_december_rolls_into_january() {
    let r = Recurrence::Monthly { day: 15, at: t(9, 0) };
    let next = next_occurrence(&r, at(2024, 12, 20, 9, 0), &night()).unwrap();
    assert_eq!(next, at(2025, 1, 15, 9, 0));
  }

  // ── Yearly ──────────────────────────────────────────────────────────────

  #[test]
  fn yearly_feb_29_in_non_leap_year_is_feb_28() {
    let r = Recurrence::Yearly { month: 2, day: 29, at: t(9, 0) };
    let next = next_occurrence(&r, at(2023, 1, 10, 9, 0), &night()).unwrap();
    assert_eq!(next, at(2023, 2, 28, 9, 0));
  }

  #[test]
  fn yearly_passed_moves_to_next_year_and_reclamps() {
    let r = Recurrence::Yearly { month: 2, day: 29, at: t(9, 0) };
    let next = next_occurrence(&r, at(2023, 3, 1, 9, 0), &night()).unwrap();
    assert_eq!(next, at(2024, 2, 29, 9, 0));

    let next = next_occurrence(&r, at(2024, 3, 1, 9, 0), &night()).unwrap();
    assert_eq!(next, at(2025, 2, 28, 9, 0));
  }

  // ── Properties ──────────────────────────────────────────────────────────

  #[test]
  fn never_before_now() {
    let recurrences = [
      Recurrence::Hourly { minute: 45 },
      Recurrence::Daily { at: t(0, 30) },
      Recurrence::DailyTimes { times: vec![t(7, 0), t(21, 0)] },
      Recurrence::Weekly { weekday: Weekday::Sun, at: t(23, 59) },
      Recurrence::Monthly { day: 31, at: t(0, 0) },
      Recurrence::Yearly { month: 12, day: 31, at: t(12, 0) },
    ];
    let mut now = at(2023, 12, 25, 0, 0);
    let end = at(2024, 3, 5, 0, 0);
    while now < end {
      for r in &recurrences {
        let next = next_occurrence(r, now, &night()).unwrap();
        assert!(next >= now, "{r:?} at {now} gave {next}");
      }
      now += Duration::minutes(397);
    }
  }

  #[test]
  fn malformed_schedule_yields_no_occurrence() {
    let mut s = Schedule::weekly(Weekday::Mon, t(9, 0));
    s.weekday = None;
    assert!(next_for_schedule(&s, at(2024, 5, 1, 9, 0), &night()).is_none());
  }

  #[test]
  fn month_lengths() {
    assert_eq!(days_in_month(2024, 2), Some(29));
    assert_eq!(days_in_month(2023, 2), Some(28));
    assert_eq!(days_in_month(2024, 4), Some(30));
    assert_eq!(days_in_month(2024, 12), Some(31));
    assert_eq!(days_in_month(2024, 13), None);
  }
}
