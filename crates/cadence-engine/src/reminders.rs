//! Heads-up messages for occurrences that are about to come due.

use std::collections::HashMap;

use cadence_core::store::HabitStore;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
  Engine, Result,
  error::store,
  notify::{Notifier, escape_html},
};

impl<S, N> Engine<S, N>
where
  S: HabitStore,
  N: Notifier,
{
  /// Send one digest listing every `Pending` occurrence due within the
  /// reminder lookahead that has not been announced yet, then flag them as
  /// announced. Returns the number of occurrences listed.
  pub async fn send_reminders(&self) -> Result<usize> {
    let now = self.now();
    let due = self
      .store
      .find_due_reminders(now, now + self.config.reminder_lookahead())
      .await
      .map_err(store)?;
    if due.is_empty() {
      return Ok(0);
    }

    let mut names: HashMap<Uuid, Option<String>> = HashMap::new();
    let mut lines = Vec::with_capacity(due.len());
    for occurrence in &due {
      if !names.contains_key(&occurrence.habit_id) {
        let habit = self
          .store
          .get_habit(occurrence.habit_id)
          .await
          .map_err(store)?;
        names.insert(
          occurrence.habit_id,
          habit.filter(|h| !h.archived).map(|h| h.name),
        );
      }
      let Some(Some(name)) = names.get(&occurrence.habit_id) else {
        continue;
      };
      let local = occurrence.scheduled_at.with_timezone(&occurrence.time_zone);
      lines.push(format!(" • {} at {}", escape_html(name), local.format("%H:%M")));
    }

    if !lines.is_empty() {
      self
        .notify(&format!("<b>Upcoming habits</b>\n\n{}", lines.join("\n")))
        .await;
    }

    let mut marked = 0;
    for mut occurrence in due {
      occurrence.notified = true;
      match self.store.save_occurrence(&occurrence).await {
        Ok(()) => marked += 1,
        Err(e) => warn!(
          occurrence_id = %occurrence.occurrence_id,
          error = %e,
          "failed to flag reminder as sent"
        ),
      }
    }
    debug!(listed = lines.len(), marked, "reminders sent");
    Ok(lines.len())
  }
}
