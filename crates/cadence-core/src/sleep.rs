//! Quiet-period filter.

use chrono::{Duration, NaiveTime};

/// A daily quiet period, possibly crossing midnight.
///
/// `start < end` is a same-day window; `start >= end` wraps past midnight.
/// Both boundaries are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepWindow {
  pub start:  NaiveTime,
  pub end:    NaiveTime,
  /// Added to `end` when a daily occurrence is pushed out of the window.
  pub buffer: Duration,
}

impl SleepWindow {
  pub fn new(start: NaiveTime, end: NaiveTime, buffer: Duration) -> Self {
    Self { start, end, buffer }
  }

  pub fn is_quiet(&self, time: NaiveTime) -> bool {
    is_quiet(time, self.start, self.end)
  }

  /// `true` when the window wraps past midnight.
  pub fn crosses_midnight(&self) -> bool { self.start >= self.end }
}

impl Default for SleepWindow {
  fn default() -> Self {
    Self {
      start:  NaiveTime::from_hms_opt(23, 0, 0).unwrap_or(NaiveTime::MIN),
      end:    NaiveTime::from_hms_opt(6, 0, 0).unwrap_or(NaiveTime::MIN),
      buffer: Duration::minutes(5),
    }
  }
}

/// Whether `time` falls strictly inside the window `start..end`.
pub fn is_quiet(time: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
  if start < end {
    start < time && time < end
  } else {
    time > start || time < end
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn t(h: u32, m: u32) -> NaiveTime { NaiveTime::from_hms_opt(h, m, 0).unwrap() }

  #[test]
  fn overnight_window() {
    let (start, end) = (t(23, 0), t(6, 0));
    assert!(is_quiet(t(23, 30), start, end));
    assert!(is_quiet(t(3, 0), start, end));
    assert!(!is_quiet(t(12, 0), start, end));
  }

  #[test]
  fn overnight_window_boundaries_are_open() {
    let (start, end) = (t(23, 0), t(6, 0));
    assert!(!is_quiet(t(23, 0), start, end));
    assert!(!is_quiet(t(6, 0), start, end));
  }

  #[test]
  fn same_day_window() {
    let (start, end) = (t(13, 0), t(15, 0));
    assert!(is_quiet(t(14, 0), start, end));
    assert!(!is_quiet(t(13, 0), start, end));
    assert!(!is_quiet(t(15, 0), start, end));
    assert!(!is_quiet(t(23, 0), start, end));
  }

  #[test]
  fn default_window_crosses_midnight() {
    let w = SleepWindow::default();
    assert!(w.crosses_midnight());
    assert!(w.is_quiet(t(2, 0)));
    assert_eq!(w.buffer, Duration::minutes(5));
  }
}
