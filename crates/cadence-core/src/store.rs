//! The `HabitStore` trait.
//!
//! Implemented by storage backends (e.g. `cadence-store-sqlite`). The engine
//! depends on this abstraction only. Writes are plain reads and upserts; the
//! engine's idempotence comes from checking existence before inserting, not
//! from locking.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{habit::Habit, occurrence::Occurrence};

/// Abstraction over a habit/occurrence store backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait HabitStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Habits ────────────────────────────────────────────────────────────

  /// Persist a freshly built habit.
  fn insert_habit<'a>(
    &'a self,
    habit: &'a Habit,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Overwrite every mutable field of an existing habit.
  ///
  /// Meant for user edits. Scheduling passes and completions go through the
  /// narrower writes below so they never clobber each other's fields.
  fn save_habit<'a>(
    &'a self,
    habit: &'a Habit,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Set `last_checked` and nothing else.
  fn mark_checked(
    &self,
    habit_id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Add `count` to the stored miss counter, zeroing the current streak when
  /// `reset_streak` is set. The best streak and last completion are kept.
  fn record_misses(
    &self,
    habit_id: Uuid,
    count: u32,
    reset_streak: bool,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Store a completed occurrence together with its habit's streak, in one
  /// transaction.
  ///
  /// Returns `false` (and writes nothing) when the stored occurrence is no
  /// longer `Pending`.
  fn save_completion<'a>(
    &'a self,
    occurrence: &'a Occurrence,
    habit: &'a Habit,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Retrieve a habit by UUID. Returns `None` if not found.
  fn get_habit(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Habit>, Self::Error>> + Send + '_;

  /// List habits, optionally filtered by the archived flag.
  fn list_habits(
    &self,
    archived: Option<bool>,
  ) -> impl Future<Output = Result<Vec<Habit>, Self::Error>> + Send + '_;

  /// All habits that are not archived.
  fn find_active_habits(
    &self,
  ) -> impl Future<Output = Result<Vec<Habit>, Self::Error>> + Send + '_;

  /// Delete a habit's occurrences, then the habit itself. Returns `false` if
  /// the habit did not exist.
  fn delete_habit(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Occurrences ───────────────────────────────────────────────────────

  fn exists_occurrence(
    &self,
    habit_id: Uuid,
    scheduled_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn find_occurrence(
    &self,
    habit_id: Uuid,
    scheduled_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Occurrence>, Self::Error>> + Send + '_;

  fn get_occurrence(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Occurrence>, Self::Error>> + Send + '_;

  /// Insert a new occurrence. Returns `false` (and writes nothing) when an
  /// occurrence with the same `(habit_id, scheduled_at)` already exists.
  fn insert_occurrence<'a>(
    &'a self,
    occurrence: &'a Occurrence,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Overwrite the mutable fields of an existing occurrence.
  fn save_occurrence<'a>(
    &'a self,
    occurrence: &'a Occurrence,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Occurrences of a habit with `from <= scheduled_at < to`, oldest first.
  fn find_occurrences_between(
    &self,
    habit_id: Uuid,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Occurrence>, Self::Error>> + Send + '_;

  /// `Pending` occurrences of a habit with `scheduled_at < before`.
  fn find_pending_overdue(
    &self,
    habit_id: Uuid,
    before: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Occurrence>, Self::Error>> + Send + '_;

  /// `Pending`, not-yet-notified occurrences (any habit) with
  /// `from < scheduled_at <= to`.
  fn find_due_reminders(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Occurrence>, Self::Error>> + Send + '_;

  /// One page of a habit's occurrences, newest first.
  fn occurrences_page(
    &self,
    habit_id: Uuid,
    offset: usize,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Occurrence>, Self::Error>> + Send + '_;

  /// The `limit` most recently scheduled occurrences across all habits.
  fn recent_occurrences(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Occurrence>, Self::Error>> + Send + '_;

  /// Number of `Completed` occurrences (any habit) with
  /// `from <= scheduled_at < to`.
  fn count_completed_between(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Delete every occurrence scheduled before `cutoff`; returns the count.
  fn delete_occurrences_older_than(
    &self,
    cutoff: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
