//! Integration tests for `SqliteStore` against an in-memory database.

use cadence_core::{
  habit::{Habit, NewHabit, parse_zone},
  occurrence::{Occurrence, OccurrenceStatus},
  schedule::Schedule,
  store::HabitStore,
};
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc, Weekday};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap() }

fn nine() -> NaiveTime { NaiveTime::from_hms_opt(9, 0, 0).unwrap() }

async fn add(s: &SqliteStore, input: NewHabit) -> Habit {
  let habit = input.into_habit(t0(), 30);
  s.insert_habit(&habit).await.unwrap();
  habit
}

// ─── Habits ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get_habit() {
  let s = store().await;
  let mut input = NewHabit::new("Run", Schedule::weekly(Weekday::Sat, nine()));
  input.time_zone = parse_zone("America/New_York").unwrap();
  input.description = Some("5k".into());
  let habit = add(&s, input).await;

  let fetched = s.get_habit(habit.habit_id).await.unwrap().unwrap();
  assert_eq!(fetched.habit_id, habit.habit_id);
  assert_eq!(fetched.name, "Run");
  assert_eq!(fetched.description.as_deref(), Some("5k"));
  assert_eq!(fetched.schedule, habit.schedule);
  assert_eq!(fetched.time_zone.name(), "America/New_York");
  assert_eq!(fetched.created_at, habit.created_at);
  assert!(!fetched.archived);
}

#[tokio::test]
async fn get_habit_missing_returns_none() {
  let s = store().await;
  assert!(s.get_habit(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn daily_times_roundtrip() {
  let s = store().await;
  let t = |h| NaiveTime::from_hms_opt(h, 30, 0).unwrap();
  let habit = add(&s, NewHabit::new("Water", Schedule::daily_at_times(vec![t(8), t(14)])))
    .await;

  let fetched = s.get_habit(habit.habit_id).await.unwrap().unwrap();
  assert_eq!(fetched.schedule.daily_times, vec![t(8), t(14)]);
}

#[tokio::test]
async fn save_habit_persists_scheduling_and_streak_state() {
  let s = store().await;
  let mut habit = add(&s, NewHabit::new("Read", Schedule::daily(nine()))).await;

  habit.last_checked = Some(t0());
  habit.missed_count = 3;
  habit.streak.record_completion(t0().date_naive());
  habit.archived = true;
  s.save_habit(&habit).await.unwrap();

  let fetched = s.get_habit(habit.habit_id).await.unwrap().unwrap();
  assert_eq!(fetched.last_checked, Some(t0()));
  assert_eq!(fetched.missed_count, 3);
  assert_eq!(fetched.streak, habit.streak);
  assert!(fetched.archived);
}

#[tokio::test]
async fn active_habits_exclude_archived() {
  let s = store().await;
  add(&s, NewHabit::new("A", Schedule::daily(nine()))).await;
  let mut b = add(&s, NewHabit::new("B", Schedule::daily(nine()))).await;
  b.archived = true;
  s.save_habit(&b).await.unwrap();

  let active = s.find_active_habits().await.unwrap();
  assert_eq!(active.len(), 1);
  assert_eq!(active[0].name, "A");

  assert_eq!(s.list_habits(None).await.unwrap().len(), 2);
  assert_eq!(s.list_habits(Some(true)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_habit_removes_its_occurrences() {
  let s = store().await;
  let habit = add(&s, NewHabit::new("Read", Schedule::daily(nine()))).await;
  let other = add(&s, NewHabit::new("Other", Schedule::daily(nine()))).await;
  s.insert_occurrence(&Occurrence::pending(&habit, t0(), t0())).await.unwrap();
  s.insert_occurrence(&Occurrence::pending(&other, t0(), t0())).await.unwrap();

  assert!(s.delete_habit(habit.habit_id).await.unwrap());
  assert!(s.get_habit(habit.habit_id).await.unwrap().is_none());
  assert!(!s.exists_occurrence(habit.habit_id, t0()).await.unwrap());
  assert!(s.exists_occurrence(other.habit_id, t0()).await.unwrap());

  assert!(!s.delete_habit(habit.habit_id).await.unwrap());
}

#[tokio::test]
async fn scheduling_writes_leave_the_streak_alone() {
  let s = store().await;
  let mut habit = add(&s, NewHabit::new("Read", Schedule::daily(nine()))).await;
  habit.streak.record_completion(t0().date_naive());
  s.save_habit(&habit).await.unwrap();

  s.mark_checked(habit.habit_id, t0()).await.unwrap();
  s.record_misses(habit.habit_id, 2, false, t0()).await.unwrap();
  s.record_misses(habit.habit_id, 1, false, t0()).await.unwrap();

  let fetched = s.get_habit(habit.habit_id).await.unwrap().unwrap();
  assert_eq!(fetched.last_checked, Some(t0()));
  assert_eq!(fetched.missed_count, 3);
  assert_eq!(fetched.streak, habit.streak);

  s.record_misses(habit.habit_id, 1, true, t0()).await.unwrap();
  let fetched = s.get_habit(habit.habit_id).await.unwrap().unwrap();
  assert_eq!(fetched.missed_count, 4);
  assert_eq!(fetched.streak.current, 0);
  assert_eq!(fetched.streak.best, 1);
  assert_eq!(fetched.streak.last_completed, Some(t0().date_naive()));
}

#[tokio::test]
async fn save_completion_writes_occurrence_and_streak_together() {
  let s = store().await;
  let mut habit = add(&s, NewHabit::new("Read", Schedule::daily(nine()))).await;
  let mut occ = Occurrence::pending(&habit, t0(), t0());
  s.insert_occurrence(&occ).await.unwrap();

  occ.complete(t0() + Duration::minutes(5), Duration::minutes(30)).unwrap();
  habit.streak.record_completion(t0().date_naive());
  assert!(s.save_completion(&occ, &habit).await.unwrap());

  let stored = s.get_occurrence(occ.occurrence_id).await.unwrap().unwrap();
  assert_eq!(stored.status, OccurrenceStatus::Completed);
  let fetched = s.get_habit(habit.habit_id).await.unwrap().unwrap();
  assert_eq!(fetched.streak.current, 1);

  // Already resolved: nothing is written.
  habit.streak.current = 7;
  assert!(!s.save_completion(&occ, &habit).await.unwrap());
  let fetched = s.get_habit(habit.habit_id).await.unwrap().unwrap();
  assert_eq!(fetched.streak.current, 1);
}

// ─── Occurrences ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_occurrence_is_unique_per_habit_and_time() {
  let s = store().await;
  let habit = add(&s, NewHabit::new("Read", Schedule::daily(nine()))).await;

  let first = Occurrence::pending(&habit, t0(), t0());
  assert!(s.insert_occurrence(&first).await.unwrap());

  let dup = Occurrence::pending(&habit, t0(), t0());
  assert!(!s.insert_occurrence(&dup).await.unwrap());

  let stored = s.find_occurrence(habit.habit_id, t0()).await.unwrap().unwrap();
  assert_eq!(stored.occurrence_id, first.occurrence_id);
  assert!(s.get_occurrence(dup.occurrence_id).await.unwrap().is_none());
}

#[tokio::test]
async fn occurrence_roundtrip_keeps_local_stamps() {
  let s = store().await;
  let mut input = NewHabit::new("Read", Schedule::daily(nine()));
  input.time_zone = parse_zone("Asia/Kolkata").unwrap();
  let habit = add(&s, input).await;

  let occ = Occurrence::pending(&habit, t0(), t0());
  s.insert_occurrence(&occ).await.unwrap();

  let fetched = s.get_occurrence(occ.occurrence_id).await.unwrap().unwrap();
  assert_eq!(fetched.scheduled_at, t0());
  assert_eq!(fetched.status, OccurrenceStatus::Pending);
  assert_eq!(fetched.time_zone.name(), "Asia/Kolkata");
  assert_eq!(fetched.created_at, occ.created_at);
  assert_eq!(fetched.created_at.offset().local_minus_utc(), 5 * 3600 + 1800);
}

#[tokio::test]
async fn save_occurrence_updates_status() {
  let s = store().await;
  let habit = add(&s, NewHabit::new("Read", Schedule::daily(nine()))).await;
  let mut occ = Occurrence::pending(&habit, t0(), t0());
  s.insert_occurrence(&occ).await.unwrap();

  occ.complete(t0() + Duration::minutes(5), habit.grace()).unwrap();
  s.save_occurrence(&occ).await.unwrap();

  let fetched = s.get_occurrence(occ.occurrence_id).await.unwrap().unwrap();
  assert_eq!(fetched.status, OccurrenceStatus::Completed);
  assert_eq!(fetched.completed_at, Some(t0() + Duration::minutes(5)));
  assert!(fetched.completed_in_grace_period);
}

#[tokio::test]
async fn pending_overdue_filters_status_and_time() {
  let s = store().await;
  let habit = add(&s, NewHabit::new("Read", Schedule::daily(nine()))).await;

  let old = Occurrence::pending(&habit, t0() - Duration::days(1), t0());
  let mut done = Occurrence::pending(&habit, t0() - Duration::hours(2), t0());
  done.complete(t0(), habit.grace()).unwrap();
  let future = Occurrence::pending(&habit, t0() + Duration::hours(1), t0());
  for o in [&old, &done, &future] {
    s.insert_occurrence(o).await.unwrap();
  }

  let overdue = s.find_pending_overdue(habit.habit_id, t0()).await.unwrap();
  assert_eq!(overdue.len(), 1);
  assert_eq!(overdue[0].occurrence_id, old.occurrence_id);
}

#[tokio::test]
async fn occurrences_between_is_half_open_and_ordered() {
  let s = store().await;
  let habit = add(&s, NewHabit::new("Sip", Schedule::hourly(0))).await;
  for h in [3, 0, 1, 2] {
    s.insert_occurrence(&Occurrence::pending(&habit, t0() + Duration::hours(h), t0()))
      .await
      .unwrap();
  }

  let found = s
    .find_occurrences_between(habit.habit_id, t0(), t0() + Duration::hours(3))
    .await
    .unwrap();
  let hours: Vec<_> = found
    .iter()
    .map(|o| (o.scheduled_at - t0()).num_hours())
    .collect();
  assert_eq!(hours, vec![0, 1, 2]);
}

#[tokio::test]
async fn due_reminders_skip_notified() {
  let s = store().await;
  let habit = add(&s, NewHabit::new("Read", Schedule::daily(nine()))).await;
  let soon = Occurrence::pending(&habit, t0() + Duration::minutes(10), t0());
  let mut told = Occurrence::pending(&habit, t0() + Duration::minutes(12), t0());
  told.notified = true;
  let later = Occurrence::pending(&habit, t0() + Duration::hours(2), t0());
  for o in [&soon, &told, &later] {
    s.insert_occurrence(o).await.unwrap();
  }

  let due = s
    .find_due_reminders(t0(), t0() + Duration::minutes(15))
    .await
    .unwrap();
  assert_eq!(due.len(), 1);
  assert_eq!(due[0].occurrence_id, soon.occurrence_id);
}

#[tokio::test]
async fn recent_occurrences_are_newest_first() {
  let s = store().await;
  let habit = add(&s, NewHabit::new("Read", Schedule::daily(nine()))).await;
  for d in 0..5 {
    s.insert_occurrence(&Occurrence::pending(&habit, t0() + Duration::days(d), t0()))
      .await
      .unwrap();
  }

  let recent = s.recent_occurrences(2).await.unwrap();
  assert_eq!(recent.len(), 2);
  assert_eq!(recent[0].scheduled_at, t0() + Duration::days(4));
  assert_eq!(recent[1].scheduled_at, t0() + Duration::days(3));
}

#[tokio::test]
async fn occurrences_page_walks_one_habit_newest_first() {
  let s = store().await;
  let habit = add(&s, NewHabit::new("Read", Schedule::daily(nine()))).await;
  let other = add(&s, NewHabit::new("Other", Schedule::daily(nine()))).await;
  for d in 0..5 {
    s.insert_occurrence(&Occurrence::pending(&habit, t0() + Duration::days(d), t0()))
      .await
      .unwrap();
  }
  s.insert_occurrence(&Occurrence::pending(&other, t0(), t0()))
    .await
    .unwrap();

  let page = |offset| s.occurrences_page(habit.habit_id, offset, 2);
  let days = |occs: Vec<Occurrence>| -> Vec<_> {
    occs.iter().map(|o| (o.scheduled_at - t0()).num_days()).collect()
  };
  assert_eq!(days(page(0).await.unwrap()), vec![4, 3]);
  assert_eq!(days(page(2).await.unwrap()), vec![2, 1]);
  assert_eq!(days(page(4).await.unwrap()), vec![0]);
  assert!(page(6).await.unwrap().is_empty());
}

#[tokio::test]
async fn count_completed_between_counts_only_completed() {
  let s = store().await;
  let habit = add(&s, NewHabit::new("Sip", Schedule::hourly(0))).await;
  for h in 0..3 {
    let mut occ = Occurrence::pending(&habit, t0() + Duration::hours(h), t0());
    if h < 2 {
      occ.complete(t0() + Duration::hours(h), habit.grace()).unwrap();
    }
    s.insert_occurrence(&occ).await.unwrap();
  }
  let mut yesterday = Occurrence::pending(&habit, t0() - Duration::days(1), t0());
  yesterday.complete(t0(), habit.grace()).unwrap();
  s.insert_occurrence(&yesterday).await.unwrap();

  let n = s
    .count_completed_between(t0(), t0() + Duration::days(1))
    .await
    .unwrap();
  assert_eq!(n, 2);
}

#[tokio::test]
async fn purge_deletes_only_old_occurrences() {
  let s = store().await;
  let habit = add(&s, NewHabit::new("Read", Schedule::daily(nine()))).await;
  s.insert_occurrence(&Occurrence::pending(&habit, t0() - Duration::days(100), t0()))
    .await
    .unwrap();
  s.insert_occurrence(&Occurrence::pending(&habit, t0() - Duration::days(10), t0()))
    .await
    .unwrap();

  let n = s
    .delete_occurrences_older_than(t0() - Duration::days(90))
    .await
    .unwrap();
  assert_eq!(n, 1);
  assert!(s.exists_occurrence(habit.habit_id, t0() - Duration::days(10)).await.unwrap());
}

#[tokio::test]
async fn file_store_persists_across_reopen() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("cadence.db");

  let habit_id = {
    let s = SqliteStore::open(&path).await.unwrap();
    add(&s, NewHabit::new("Read", Schedule::daily(nine()))).await.habit_id
  };

  let s = SqliteStore::open(&path).await.unwrap();
  assert!(s.get_habit(habit_id).await.unwrap().is_some());
}
