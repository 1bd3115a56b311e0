//! `cadence`: habit scheduling daemon and command-line client.
//!
//! # Usage
//!
//! ```
//! cadence habit add "Read" --kind daily --at 21:00:00 --zone Europe/Berlin
//! cadence run
//! cadence today
//! cadence complete <HABIT_ID> <OCCURRENCE_ID>
//! ```

mod settings;
mod telegram;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use cadence_core::{
  clock::SystemClock,
  habit::{Habit, NewHabit, parse_zone},
  occurrence::Occurrence,
  schedule::{RecurrenceKind, Schedule},
};
use cadence_engine::Engine;
use cadence_store_sqlite::SqliteStore;
use chrono::{NaiveTime, Weekday};
use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use settings::Settings;
use telegram::AnyNotifier;

type App = Engine<SqliteStore, AnyNotifier>;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Habit scheduling engine")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "cadence.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Run the scheduler until interrupted.
  Run,
  /// Run a single scheduling pass and print its report.
  Tick,
  /// Manage habits.
  #[command(subcommand)]
  Habit(HabitCommand),
  /// Print the next time a habit is due.
  Next { habit: Uuid },
  /// Materialise and list today's occurrences of a habit, or list every
  /// habit due today when no habit is given.
  Today { habit: Option<Uuid> },
  /// Page through a habit's occurrences, newest first.
  History {
    habit: Uuid,
    #[arg(long, default_value_t = 0)]
    page:  usize,
    #[arg(long, default_value_t = 20)]
    size:  usize,
  },
  /// List stored occurrences due in the next few days.
  Upcoming {
    habit: Uuid,
    #[arg(long, default_value_t = 7)]
    days:  u32,
  },
  /// Mark an occurrence completed.
  Complete { habit: Uuid, occurrence: Uuid },
  /// Mark an occurrence skipped.
  Skip { occurrence: Uuid },
  /// Print aggregate statistics as JSON.
  Stats,
}

#[derive(Subcommand)]
enum HabitCommand {
  Add(AddArgs),
  List {
    /// Include archived habits.
    #[arg(long)]
    all:      bool,
    /// Only archived habits.
    #[arg(long, conflicts_with = "all")]
    archived: bool,
  },
  Show { id: Uuid },
  Archive { id: Uuid },
  Unarchive { id: Uuid },
  Delete { id: Uuid },
}

#[derive(Args)]
struct AddArgs {
  name: String,

  #[arg(long)]
  description: Option<String>,

  /// hourly, daily, weekly, monthly or yearly.
  #[arg(long)]
  kind: RecurrenceKind,

  /// Time of day, `HH:MM:SS`. For hourly habits only the minute is used.
  #[arg(long, default_value = "09:00:00")]
  at: NaiveTime,

  /// Several daily times, comma separated. Daily habits only.
  #[arg(long, value_delimiter = ',')]
  times: Vec<NaiveTime>,

  #[arg(long)]
  weekday: Option<Weekday>,

  #[arg(long)]
  day: Option<u32>,

  #[arg(long)]
  month: Option<u32>,

  /// Grace period in minutes.
  #[arg(long)]
  grace: Option<u32>,

  /// IANA time zone name.
  #[arg(long, default_value = "UTC")]
  zone: String,
}

impl AddArgs {
  fn into_new_habit(self) -> anyhow::Result<NewHabit> {
    let time_of_day = self.times.iter().min().copied().unwrap_or(self.at);
    let schedule = Schedule {
      kind: self.kind,
      time_of_day,
      weekday: self.weekday,
      day_of_month: self.day,
      month: self.month,
      daily_times: self.times,
    };
    Ok(NewHabit {
      name: self.name,
      description: self.description,
      schedule,
      grace_minutes: self.grace,
      time_zone: parse_zone(&self.zone)?,
    })
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  let store = SqliteStore::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))?;
  let notifier = AnyNotifier::from_config(settings.telegram.as_ref())?;
  let engine: App = Engine::new(
    Arc::new(store),
    Arc::new(notifier),
    Arc::new(SystemClock),
    settings.engine,
  );

  match cli.command {
    Command::Run => {
      engine
        .run(async {
          if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
          }
        })
        .await;
    }
    Command::Tick => {
      let report = engine.tick().await.context("tick failed")?;
      println!("{report:?}");
    }
    Command::Habit(cmd) => habit_command(&engine, cmd).await?,
    Command::Next { habit } => {
      let habit = engine.get_habit(habit).await?;
      match engine.get_next_occurrence(&habit)? {
        Some(at) => println!("{}", at.with_timezone(&habit.time_zone).to_rfc3339()),
        None => println!("no upcoming occurrence"),
      }
    }
    Command::Today { habit: Some(habit) } => {
      let mut habit = engine.get_habit(habit).await?;
      let report = engine.ensure_todays_occurrences(&mut habit).await?;
      println!("created {}, missed {}", report.created, report.missed);
      print_occurrences(&habit, &engine.todays_occurrences(&habit).await?);
    }
    Command::Today { habit: None } => {
      for row in engine.todays_habits().await? {
        println!(
          "[{}] {}",
          if row.completed_today { "x" } else { " " },
          row.habit.name,
        );
        print_occurrences(&row.habit, &row.occurrences);
      }
    }
    Command::History { habit, page, size } => {
      let occurrences = engine.history(habit, page, size).await?;
      let habit = engine.get_habit(habit).await?;
      print_occurrences(&habit, &occurrences);
    }
    Command::Upcoming { habit, days } => {
      let habit = engine.get_habit(habit).await?;
      let occurrences = engine.upcoming_occurrences(habit.habit_id, days).await?;
      print_occurrences(&habit, &occurrences);
    }
    Command::Complete { habit, occurrence } => {
      let occurrence = engine
        .complete(habit, occurrence)
        .await
        .context("failed to complete occurrence")?;
      println!("{}", serde_json::to_string_pretty(&occurrence)?);
    }
    Command::Skip { occurrence } => {
      let occurrence = engine
        .skip(occurrence)
        .await
        .context("failed to skip occurrence")?;
      println!("{}", serde_json::to_string_pretty(&occurrence)?);
    }
    Command::Stats => {
      let stats = engine.get_habit_stats().await?;
      println!("{}", serde_json::to_string_pretty(&stats)?);
    }
  }

  Ok(())
}

async fn habit_command(engine: &App, cmd: HabitCommand) -> anyhow::Result<()> {
  match cmd {
    HabitCommand::Add(args) => {
      let habit = engine.create_habit(args.into_new_habit()?).await?;
      println!("{}", habit.habit_id);
    }
    HabitCommand::List { all, archived } => {
      let filter = if all { None } else { Some(archived) };
      for habit in engine.list_habits(filter).await? {
        print_habit_line(&habit);
      }
    }
    HabitCommand::Show { id } => {
      let habit = engine.get_habit(id).await?;
      println!("{}", serde_json::to_string_pretty(&habit)?);
    }
    HabitCommand::Archive { id } => {
      engine.archive_habit(id).await?;
    }
    HabitCommand::Unarchive { id } => {
      engine.unarchive_habit(id).await?;
    }
    HabitCommand::Delete { id } => {
      engine.delete_habit(id).await?;
    }
  }
  Ok(())
}

// ─── Output ───────────────────────────────────────────────────────────────────

fn print_habit_line(habit: &Habit) {
  println!(
    "{}  {:<7}  {:<24}  streak {}/{}{}",
    habit.habit_id,
    habit.schedule.kind,
    habit.name,
    habit.streak.current,
    habit.streak.best,
    if habit.archived { "  (archived)" } else { "" },
  );
}

fn print_occurrences(habit: &Habit, occurrences: &[Occurrence]) {
  for o in occurrences {
    println!(
      "{}  {}  {}",
      o.occurrence_id,
      o.scheduled_at
        .with_timezone(&habit.time_zone)
        .format("%Y-%m-%d %H:%M %Z"),
      o.status,
    );
  }
}
