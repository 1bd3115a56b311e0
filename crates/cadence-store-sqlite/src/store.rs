//! [`SqliteStore`], the SQLite implementation of [`HabitStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use cadence_core::{habit::Habit, occurrence::Occurrence, store::HabitStore};

use crate::{
  Result,
  encode::{
    HABIT_COLUMNS, OCCURRENCE_COLUMNS, RawHabit, RawOccurrence, encode_dt,
    encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Cadence store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a `SELECT` over `occurrences` and decode every row.
  async fn query_occurrences(
    &self,
    where_clause: &'static str,
    params: Vec<String>,
  ) -> Result<Vec<Occurrence>> {
    let raws: Vec<RawOccurrence> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {OCCURRENCE_COLUMNS} FROM occurrences {where_clause}"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params_from_iter(params.iter()),
            RawOccurrence::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawOccurrence::into_occurrence).collect()
  }
}

// ─── HabitStore impl ─────────────────────────────────────────────────────────

impl HabitStore for SqliteStore {
  type Error = crate::Error;

  // ── Habits ────────────────────────────────────────────────────────────────

  async fn insert_habit(&self, habit: &Habit) -> Result<()> {
    let raw = RawHabit::from_habit(habit)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO habits ({HABIT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                     ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
          ),
          rusqlite::params![
            raw.habit_id,
            raw.name,
            raw.description,
            raw.kind,
            raw.time_of_day,
            raw.weekday,
            raw.day_of_month,
            raw.month,
            raw.daily_times,
            raw.grace_minutes,
            raw.time_zone,
            raw.archived,
            raw.last_checked,
            raw.missed_count,
            raw.current_streak,
            raw.best_streak,
            raw.last_completed,
            raw.created_at,
            raw.updated_at,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn save_habit(&self, habit: &Habit) -> Result<()> {
    let raw = RawHabit::from_habit(habit)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE habits SET
             name = ?2, description = ?3, kind = ?4, time_of_day = ?5,
             weekday = ?6, day_of_month = ?7, month = ?8, daily_times = ?9,
             grace_minutes = ?10, time_zone = ?11, archived = ?12,
             last_checked = ?13, missed_count = ?14, current_streak = ?15,
             best_streak = ?16, last_completed = ?17, updated_at = ?18
           WHERE habit_id = ?1",
          rusqlite::params![
            raw.habit_id,
            raw.name,
            raw.description,
            raw.kind,
            raw.time_of_day,
            raw.weekday,
            raw.day_of_month,
            raw.month,
            raw.daily_times,
            raw.grace_minutes,
            raw.time_zone,
            raw.archived,
            raw.last_checked,
            raw.missed_count,
            raw.current_streak,
            raw.best_streak,
            raw.last_completed,
            raw.updated_at,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn mark_checked(&self, habit_id: Uuid, at: DateTime<Utc>) -> Result<()> {
    let id_str = encode_uuid(habit_id);
    let at_str = encode_dt(at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE habits SET last_checked = ?2 WHERE habit_id = ?1",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn record_misses(
    &self,
    habit_id:     Uuid,
    count:        u32,
    reset_streak: bool,
    at:           DateTime<Utc>,
  ) -> Result<()> {
    let id_str = encode_uuid(habit_id);
    let at_str = encode_dt(at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE habits SET
             missed_count = missed_count + ?2,
             current_streak = CASE WHEN ?3 THEN 0 ELSE current_streak END,
             updated_at = ?4
           WHERE habit_id = ?1",
          rusqlite::params![id_str, count, reset_streak, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn save_completion(
    &self,
    occurrence: &Occurrence,
    habit:      &Habit,
  ) -> Result<bool> {
    let occ = RawOccurrence::from_occurrence(occurrence);
    let raw = RawHabit::from_habit(habit)?;

    let saved = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let n = tx.execute(
          "UPDATE occurrences SET
             status = ?2, completed_at = ?3, missed_at = ?4,
             completed_in_grace_period = ?5, notified = ?6, updated_at = ?7
           WHERE occurrence_id = ?1 AND status = 'pending'",
          rusqlite::params![
            occ.occurrence_id,
            occ.status,
            occ.completed_at,
            occ.missed_at,
            occ.completed_in_grace_period,
            occ.notified,
            occ.updated_at,
          ],
        )?;
        if n == 0 {
          return Ok(false);
        }
        tx.execute(
          "UPDATE habits SET
             current_streak = ?2, best_streak = ?3, last_completed = ?4,
             updated_at = ?5
           WHERE habit_id = ?1",
          rusqlite::params![
            raw.habit_id,
            raw.current_streak,
            raw.best_streak,
            raw.last_completed,
            raw.updated_at,
          ],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(saved)
  }

  async fn get_habit(&self, id: Uuid) -> Result<Option<Habit>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawHabit> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE habit_id = ?1"),
              rusqlite::params![id_str],
              RawHabit::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawHabit::into_habit).transpose()
  }

  async fn list_habits(&self, archived: Option<bool>) -> Result<Vec<Habit>> {
    let raws: Vec<RawHabit> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(flag) = archived {
          let mut stmt = conn.prepare(&format!(
            "SELECT {HABIT_COLUMNS} FROM habits WHERE archived = ?1
             ORDER BY created_at"
          ))?;
          stmt
            .query_map(rusqlite::params![flag], RawHabit::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {HABIT_COLUMNS} FROM habits ORDER BY created_at"
          ))?;
          stmt
            .query_map([], RawHabit::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawHabit::into_habit).collect()
  }

  async fn find_active_habits(&self) -> Result<Vec<Habit>> {
    self.list_habits(Some(false)).await
  }

  async fn delete_habit(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM occurrences WHERE habit_id = ?1",
          rusqlite::params![id_str],
        )?;
        let n = tx.execute(
          "DELETE FROM habits WHERE habit_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok(n > 0)
      })
      .await?;

    Ok(deleted)
  }

  // ── Occurrences ───────────────────────────────────────────────────────────

  async fn exists_occurrence(
    &self,
    habit_id:     Uuid,
    scheduled_at: DateTime<Utc>,
  ) -> Result<bool> {
    let habit_str = encode_uuid(habit_id);
    let at_str    = encode_dt(scheduled_at);

    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM occurrences WHERE habit_id = ?1 AND scheduled_at = ?2",
              rusqlite::params![habit_str, at_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;

    Ok(exists)
  }

  async fn find_occurrence(
    &self,
    habit_id:     Uuid,
    scheduled_at: DateTime<Utc>,
  ) -> Result<Option<Occurrence>> {
    let mut found = self
      .query_occurrences(
        "WHERE habit_id = ?1 AND scheduled_at = ?2",
        vec![encode_uuid(habit_id), encode_dt(scheduled_at)],
      )
      .await?;
    Ok(found.pop())
  }

  async fn get_occurrence(&self, id: Uuid) -> Result<Option<Occurrence>> {
    let mut found = self
      .query_occurrences("WHERE occurrence_id = ?1", vec![encode_uuid(id)])
      .await?;
    Ok(found.pop())
  }

  async fn insert_occurrence(&self, occurrence: &Occurrence) -> Result<bool> {
    let raw = RawOccurrence::from_occurrence(occurrence);

    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          &format!(
            "INSERT OR IGNORE INTO occurrences ({OCCURRENCE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
          ),
          rusqlite::params![
            raw.occurrence_id,
            raw.habit_id,
            raw.scheduled_at,
            raw.status,
            raw.completed_at,
            raw.missed_at,
            raw.completed_in_grace_period,
            raw.notified,
            raw.time_zone,
            raw.created_at,
            raw.updated_at,
          ],
        )?;
        Ok(n > 0)
      })
      .await?;

    Ok(inserted)
  }

  async fn save_occurrence(&self, occurrence: &Occurrence) -> Result<()> {
    let raw = RawOccurrence::from_occurrence(occurrence);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE occurrences SET
             status = ?2, completed_at = ?3, missed_at = ?4,
             completed_in_grace_period = ?5, notified = ?6, updated_at = ?7
           WHERE occurrence_id = ?1",
          rusqlite::params![
            raw.occurrence_id,
            raw.status,
            raw.completed_at,
            raw.missed_at,
            raw.completed_in_grace_period,
            raw.notified,
            raw.updated_at,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn find_occurrences_between(
    &self,
    habit_id: Uuid,
    from:     DateTime<Utc>,
    to:       DateTime<Utc>,
  ) -> Result<Vec<Occurrence>> {
    self
      .query_occurrences(
        "WHERE habit_id = ?1 AND scheduled_at >= ?2 AND scheduled_at < ?3
         ORDER BY scheduled_at",
        vec![encode_uuid(habit_id), encode_dt(from), encode_dt(to)],
      )
      .await
  }

  async fn find_pending_overdue(
    &self,
    habit_id: Uuid,
    before:   DateTime<Utc>,
  ) -> Result<Vec<Occurrence>> {
    self
      .query_occurrences(
        "WHERE habit_id = ?1 AND status = 'pending' AND scheduled_at < ?2
         ORDER BY scheduled_at",
        vec![encode_uuid(habit_id), encode_dt(before)],
      )
      .await
  }

  async fn find_due_reminders(
    &self,
    from: DateTime<Utc>,
    to:   DateTime<Utc>,
  ) -> Result<Vec<Occurrence>> {
    self
      .query_occurrences(
        "WHERE status = 'pending' AND notified = 0
           AND scheduled_at > ?1 AND scheduled_at <= ?2
         ORDER BY scheduled_at",
        vec![encode_dt(from), encode_dt(to)],
      )
      .await
  }

  async fn occurrences_page(
    &self,
    habit_id: Uuid,
    offset:   usize,
    limit:    usize,
  ) -> Result<Vec<Occurrence>> {
    let id_str = encode_uuid(habit_id);
    let offset_val = i64::try_from(offset).unwrap_or(i64::MAX);
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawOccurrence> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {OCCURRENCE_COLUMNS} FROM occurrences WHERE habit_id = ?1
           ORDER BY scheduled_at DESC LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![id_str, limit_val, offset_val],
            RawOccurrence::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawOccurrence::into_occurrence).collect()
  }

  async fn recent_occurrences(&self, limit: usize) -> Result<Vec<Occurrence>> {
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawOccurrence> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {OCCURRENCE_COLUMNS} FROM occurrences
           ORDER BY scheduled_at DESC LIMIT ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val], RawOccurrence::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawOccurrence::into_occurrence).collect()
  }

  async fn count_completed_between(
    &self,
    from: DateTime<Utc>,
    to:   DateTime<Utc>,
  ) -> Result<usize> {
    let from_str = encode_dt(from);
    let to_str = encode_dt(to);

    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM occurrences
           WHERE status = 'completed' AND scheduled_at >= ?1 AND scheduled_at < ?2",
          rusqlite::params![from_str, to_str],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(usize::try_from(n).unwrap_or_default())
  }

  async fn delete_occurrences_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
    let cutoff_str = encode_dt(cutoff);

    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM occurrences WHERE scheduled_at < ?1",
          rusqlite::params![cutoff_str],
        )?)
      })
      .await?;

    Ok(n)
  }
}
