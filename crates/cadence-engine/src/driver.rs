//! The scheduling driver: periodic passes over every active habit.
//!
//! Habits are processed one after another. A failure while handling one
//! habit is logged with its id and counted in the [`TickReport`]; the pass
//! moves on to the next habit. Idempotent writes mean the next pass simply
//! retries whatever was left undone.

use std::future::Future;

use cadence_core::{habit::Habit, store::HabitStore};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::{Engine, Error, Result, error::store, notify::Notifier};

/// Counters for one driver pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
  /// Habits handled without error.
  pub processed:             usize,
  pub created:               usize,
  pub missed:                usize,
  /// Habits skipped because their schedule is invalid.
  pub skipped_unschedulable: usize,
  /// Habits whose processing failed for any other reason.
  pub failed:                usize,
  pub reminded:              usize,
  pub purged:                usize,
}

impl TickReport {
  /// Fold one habit's outcome into the report.
  fn record(&mut self, habit: &Habit, outcome: Result<(usize, usize)>) {
    match outcome {
      Ok((created, missed)) => {
        self.processed += 1;
        self.created += created;
        self.missed += missed;
      }
      Err(e) if e.is_invalid_schedule() => {
        self.skipped_unschedulable += 1;
        warn!(habit_id = %habit.habit_id, error = %e, "habit is not schedulable; skipping");
      }
      Err(e) => {
        self.failed += 1;
        error!(habit_id = %habit.habit_id, error = %e, "failed to process habit");
      }
    }
  }
}

impl<S, N> Engine<S, N>
where
  S: HabitStore,
  N: Notifier,
{
  /// The fine-grained pass: today's occurrences and a missed sweep for every
  /// active habit, then reminders.
  pub async fn tick(&self) -> Result<TickReport> {
    let habits = self.store.find_active_habits().await.map_err(store)?;
    let mut report = TickReport::default();

    for mut habit in habits {
      let outcome = self.tick_habit(&mut habit).await;
      report.record(&habit, outcome);
    }

    match self.send_reminders().await {
      Ok(n) => report.reminded = n,
      Err(e) => error!(error = %e, "reminder pass failed"),
    }
    Ok(report)
  }

  async fn tick_habit(&self, habit: &mut Habit) -> Result<(usize, usize)> {
    let today = self.ensure_todays_occurrences(habit).await?;
    let swept = self.sweep(habit).await?;
    Ok((today.created, today.missed + swept))
  }

  /// The coarse pass: make sure every active habit has its next occurrence
  /// stored.
  pub async fn ensure_upcoming(&self) -> Result<TickReport> {
    let habits = self.store.find_active_habits().await.map_err(store)?;
    let mut report = TickReport::default();

    for habit in habits {
      let outcome = self
        .ensure_next_occurrence(&habit)
        .await
        .map(|ensured| (usize::from(ensured.is_some_and(|e| e.created)), 0));
      report.record(&habit, outcome);
    }
    Ok(report)
  }

  /// Purge occurrences older than the retention window.
  pub async fn housekeeping(&self) -> Result<TickReport> {
    let purged = self.purge().await?;
    Ok(TickReport { purged, ..TickReport::default() })
  }

  /// Delete occurrences scheduled before `now - retention`.
  pub async fn purge(&self) -> Result<usize> {
    let cutoff = self.now() - self.config.retention();
    let n = self
      .store
      .delete_occurrences_older_than(cutoff)
      .await
      .map_err(store)?;
    info!(purged = n, %cutoff, "purged old occurrences");
    Ok(n)
  }

  /// Drive all three passes on their intervals until `shutdown` resolves.
  ///
  /// `shutdown` is checked before each pass is started. A pass in flight is
  /// never cut short by it.
  pub async fn run(&self, shutdown: impl Future<Output = ()>) {
    let mut tick = time::interval(self.config.tick_every());
    let mut ensure = time::interval(self.config.ensure_every());
    let mut housekeeping = time::interval(self.config.housekeeping_every());
    for interval in [&mut tick, &mut ensure, &mut housekeeping] {
      interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    }

    tokio::pin!(shutdown);
    info!("scheduler started");
    loop {
      tokio::select! {
        biased;
        _ = &mut shutdown => break,
        _ = tick.tick() => {
          self.bounded("tick", self.tick()).await;
        }
        _ = ensure.tick() => {
          self.bounded("ensure", self.ensure_upcoming()).await;
        }
        _ = housekeeping.tick() => {
          self.bounded("housekeeping", self.housekeeping()).await;
        }
      }
    }
    info!("scheduler stopped");
  }

  /// Run one pass under the configured deadline and log its outcome.
  /// `None` when the pass timed out or failed as a whole.
  pub(crate) async fn bounded(
    &self,
    pass: &'static str,
    fut: impl Future<Output = Result<TickReport>>,
  ) -> Option<TickReport> {
    let outcome = match self.config.tick_deadline() {
      Some(deadline) => match time::timeout(deadline, fut).await {
        Ok(outcome) => outcome,
        Err(_) => {
          warn!(pass, ?deadline, "pass exceeded its deadline");
          return None;
        }
      },
      None => fut.await,
    };

    match outcome {
      Ok(report) => {
        if report.failed > 0 {
          warn!(pass, ?report, "pass finished with failures");
        } else {
          debug!(pass, ?report, "pass finished");
        }
        Some(report)
      }
      Err(Error::Store(e)) => {
        error!(pass, error = %e, "pass aborted by store error");
        None
      }
      Err(e) => {
        error!(pass, error = %e, "pass failed");
        None
      }
    }
  }
}
