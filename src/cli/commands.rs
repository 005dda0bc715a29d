use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Subcommand};
use tracing::info;

use crate::{
    planner::{
        day_window::COMMON_TIME_ZONES,
        entities::{CategoryId, EntryId},
        prompt::CategoryPrompt,
        Planner,
    },
    utils::time::format_seconds,
};

use super::status::{
    render_categories, render_config, render_history, render_status, render_tasks,
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Show the day window, remaining workload and the timer")]
    Status,
    #[command(about = "Keep the status on screen, refreshed every second. Stop with Ctrl-C")]
    Watch,
    #[command(subcommand, about = "Day start, time zone and display settings")]
    Config(ConfigCommand),
    #[command(subcommand, about = "Manage categories and their daily targets")]
    Category(CategoryCommand),
    #[command(subcommand, about = "Manage tasks")]
    Task(TaskCommand),
    #[command(about = "Log finished time to a category without a task")]
    Log {
        #[arg(help = "Category id, name or id prefix")]
        category: String,
        #[arg(long, default_value_t = 0)]
        hours: i64,
        #[arg(long, short, default_value_t = 0)]
        minutes: i64,
    },
    #[command(subcommand, about = "Manage logged time entries")]
    Entry(EntryCommand),
    #[command(subcommand, about = "Stopwatch timer")]
    Timer(TimerCommand),
    #[command(subcommand, about = "Stopped timer sessions")]
    History(HistoryCommand),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    #[command(about = "Print the current configuration")]
    Show,
    #[command(about = "Set the time of day at which a new day starts")]
    DayStart {
        #[arg(allow_negative_numbers = true, help = "Hour, 0-23")]
        hour: i64,
        #[arg(allow_negative_numbers = true, default_value_t = 0, help = "Minute, 0-59")]
        minute: i64,
    },
    #[command(about = "Set the IANA time zone, for example Europe/London")]
    TimeZone { zone: String },
    #[command(about = "Show seconds in clock times")]
    ShowSeconds {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
    #[command(about = "List commonly used time zones")]
    Zones,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    #[command(about = "List categories with today's progress")]
    List,
    #[command(about = "Add a category with a 1 hour target")]
    Add { name: String },
    #[command(about = "Remove a category with all of its tasks and entries")]
    Remove { category: String },
    #[command(about = "Rename a category. Its id stays the same")]
    Rename { category: String, name: String },
    #[command(about = "Set the daily target in hours")]
    Target { category: String, hours: f64 },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    #[command(about = "List tasks and logged entries per category")]
    List,
    #[command(about = "Add a task")]
    Add {
        title: String,
        #[arg(long, short, default_value_t = 30, allow_negative_numbers = true)]
        minutes: i64,
        #[arg(long, short, help = "Category id, name or id prefix. Defaults to the first one")]
        category: Option<String>,
    },
    #[command(about = "Mark a task done or not done")]
    Toggle { id: String },
    #[command(about = "Remove a task")]
    Remove { id: String },
}

#[derive(Subcommand, Debug)]
pub enum EntryCommand {
    #[command(about = "Remove a logged time entry")]
    Remove { id: String },
}

#[derive(Subcommand, Debug)]
pub enum TimerCommand {
    #[command(about = "Start or resume the timer")]
    Start,
    #[command(about = "Pause the timer")]
    Pause,
    #[command(about = "Stop the timer and record the session")]
    Stop,
    #[command(about = "Show the timer")]
    Show,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    #[command(about = "List recorded timer sessions, newest first")]
    List,
    #[command(about = "Credit a recorded session to a category")]
    Assign {
        id: String,
        #[arg(long, short, help = "Skip the interactive choice")]
        category: Option<String>,
    },
    #[command(about = "Remove a recorded session")]
    Remove { id: String },
}

impl Commands {
    /// Whether the command can change state and so has to be persisted afterwards.
    pub fn mutates(&self) -> bool {
        !matches!(
            self,
            Commands::Status
                | Commands::Watch
                | Commands::Config(ConfigCommand::Show | ConfigCommand::Zones)
                | Commands::Category(CategoryCommand::List)
                | Commands::Task(TaskCommand::List)
                | Commands::Timer(TimerCommand::Show)
                | Commands::History(HistoryCommand::List)
        )
    }
}

/// Applies `command` to `planner` and returns the text to print. Rejected input becomes an error
/// and leaves the planner untouched.
pub fn execute(
    planner: &mut Planner,
    command: Commands,
    now: DateTime<Utc>,
    colored: bool,
    prompt: &mut impl CategoryPrompt,
) -> Result<String> {
    match command {
        Commands::Status | Commands::Watch => Ok(render_status(planner, now, colored)),
        Commands::Config(command) => execute_config(planner, command),
        Commands::Category(command) => execute_category(planner, command, now),
        Commands::Task(command) => execute_task(planner, command, now),
        Commands::Log {
            category,
            hours,
            minutes,
        } => {
            let category_id = resolve_category(planner, &category)?;
            let total = hours.saturating_mul(60).saturating_add(minutes);
            planner
                .add_manual_entry(&category_id, total)
                .ok_or_else(|| anyhow!("Logged time has to be at least one minute"))?;
            Ok(format!("Logged {total}m to {category_id}\n"))
        }
        Commands::Entry(EntryCommand::Remove { id }) => {
            let id = resolve_entry(
                planner.manual_entries().iter().map(|e| &e.id),
                &id,
                "entry",
            )?;
            planner.delete_manual_entry(&id);
            Ok(format!("Removed entry {id}\n"))
        }
        Commands::Timer(command) => Ok(execute_timer(planner, command, now)),
        Commands::History(command) => execute_history(planner, command, prompt),
    }
}

fn execute_config(planner: &mut Planner, command: ConfigCommand) -> Result<String> {
    match command {
        ConfigCommand::Show => Ok(render_config(planner)),
        ConfigCommand::DayStart { hour, minute } => {
            planner.set_day_start(hour, minute);
            Ok(format!("Day starts at {}\n", planner.config().day_start))
        }
        ConfigCommand::TimeZone { zone } => {
            if !planner.set_time_zone(&zone) {
                bail!("Unknown time zone {zone}. Try `config zones` for examples");
            }
            Ok(format!("Time zone set to {}\n", planner.config().time_zone))
        }
        ConfigCommand::ShowSeconds { enabled } => {
            planner.set_show_seconds(enabled);
            Ok(format!("Show seconds: {enabled}\n"))
        }
        ConfigCommand::Zones => Ok(COMMON_TIME_ZONES.map(|z| format!("{z}\n")).concat()),
    }
}

fn execute_category(
    planner: &mut Planner,
    command: CategoryCommand,
    now: DateTime<Utc>,
) -> Result<String> {
    match command {
        CategoryCommand::List => Ok(render_categories(planner, now)),
        CategoryCommand::Add { name } => {
            let id = planner.add_category(&name);
            Ok(format!("Added category {id}\n"))
        }
        CategoryCommand::Remove { category } => {
            let id = resolve_category(planner, &category)?;
            planner.remove_category(&id);
            Ok(format!("Removed category {id} with its tasks and entries\n"))
        }
        CategoryCommand::Rename { category, name } => {
            let id = resolve_category(planner, &category)?;
            if !planner.rename_category(&id, &name) {
                bail!("Category name can't be empty");
            }
            Ok(format!("Renamed {id} to {}\n", name.trim()))
        }
        CategoryCommand::Target { category, hours } => {
            let id = resolve_category(planner, &category)?;
            planner.set_category_target(&id, hours);
            let target = planner.category(&id).map_or(0., |c| c.target_hours);
            Ok(format!("Target of {id} set to {target}h\n"))
        }
    }
}

fn execute_task(
    planner: &mut Planner,
    command: TaskCommand,
    now: DateTime<Utc>,
) -> Result<String> {
    match command {
        TaskCommand::List => Ok(render_tasks(planner, now)),
        TaskCommand::Add {
            title,
            minutes,
            category,
        } => {
            let category_id = match category {
                Some(category) => resolve_category(planner, &category)?,
                None => planner
                    .categories()
                    .first()
                    .map(|c| c.id.clone())
                    .ok_or_else(|| anyhow!("No categories exist, create one first"))?,
            };
            let id = planner
                .add_task(&title, minutes, &category_id)
                .ok_or_else(|| anyhow!("A task needs a title and at least one minute"))?;
            Ok(format!("Added task {} to {category_id}\n", short_id(&id)))
        }
        TaskCommand::Toggle { id } => {
            let id = resolve_entry(planner.tasks().iter().map(|t| &t.id), &id, "task")?;
            planner.toggle_task(&id);
            let completed = planner
                .tasks()
                .iter()
                .find(|t| t.id == id)
                .is_some_and(|t| t.completed);
            let state = if completed { "done" } else { "not done" };
            Ok(format!("Task {} marked {state}\n", short_id(&id)))
        }
        TaskCommand::Remove { id } => {
            let id = resolve_entry(planner.tasks().iter().map(|t| &t.id), &id, "task")?;
            planner.delete_task(&id);
            Ok(format!("Removed task {}\n", short_id(&id)))
        }
    }
}

fn execute_timer(planner: &mut Planner, command: TimerCommand, now: DateTime<Utc>) -> String {
    match command {
        TimerCommand::Start => planner.start_timer(now),
        TimerCommand::Pause => planner.pause_timer(now),
        TimerCommand::Stop => {
            if let Some(record) = planner.stop_timer(now) {
                info!("Timer stopped");
                return format!(
                    "Recorded {} as {}. Save it with `history assign {}`\n",
                    format_seconds(record.duration_seconds),
                    short_id(&record.id),
                    short_id(&record.id)
                );
            }
        }
        TimerCommand::Show => {}
    }
    format!("Timer: {}\n", planner.timer().display(now))
}

fn execute_history(
    planner: &mut Planner,
    command: HistoryCommand,
    prompt: &mut impl CategoryPrompt,
) -> Result<String> {
    match command {
        HistoryCommand::List => Ok(render_history(planner)),
        HistoryCommand::Assign { id, category } => {
            let id = resolve_entry(planner.history().iter().map(|r| &r.id), &id, "record")?;
            let entry = match category {
                Some(category) => {
                    let category_id = resolve_category(planner, &category)?;
                    Some(planner.assign_record(&id, &category_id)?)
                }
                None => planner.assign_with_prompt(&id, prompt)?,
            };
            Ok(match entry {
                Some(entry) => {
                    let name = planner
                        .category(&entry.category_id)
                        .map_or(entry.category_id.as_str(), |c| c.name.as_str());
                    format!("Saved {}m to {name}\n", entry.minutes)
                }
                None => "Cancelled\n".to_string(),
            })
        }
        HistoryCommand::Remove { id } => {
            let id = resolve_entry(planner.history().iter().map(|r| &r.id), &id, "record")?;
            planner.delete_record(&id);
            Ok(format!("Removed record {}\n", short_id(&id)))
        }
    }
}

/// Ids are long UUIDs. Listings show this many leading characters, which is what users type.
pub const SHORT_ID_LEN: usize = 8;

pub fn short_id(id: &EntryId) -> &str {
    let s = id.as_str();
    s.get(..SHORT_ID_LEN).unwrap_or(s)
}

/// Finds the one id that equals `input` or starts with it.
fn resolve_entry<'a>(
    ids: impl Iterator<Item = &'a EntryId>,
    input: &str,
    what: &str,
) -> Result<EntryId> {
    let input = input.trim();
    if input.is_empty() {
        bail!("Empty {what} id");
    }
    let matches = ids
        .filter(|id| id.as_str().starts_with(input))
        .collect::<Vec<_>>();
    if let Some(exact) = matches.iter().find(|id| id.as_str() == input) {
        return Ok((*exact).clone());
    }
    match matches.as_slice() {
        [id] => Ok((*id).clone()),
        [] => bail!("No {what} matches {input}"),
        _ => bail!("{input} matches several {what}s, use a longer prefix"),
    }
}

/// Accepts a category id, a case-insensitive name or a unique id prefix.
fn resolve_category(planner: &Planner, input: &str) -> Result<CategoryId> {
    let input = input.trim();
    let categories = planner.categories();
    if let Some(category) = categories.iter().find(|c| c.id.as_str() == input) {
        return Ok(category.id.clone());
    }
    if let Some(category) = categories
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(input))
    {
        return Ok(category.id.clone());
    }
    let prefixed = categories
        .iter()
        .filter(|c| !input.is_empty() && c.id.as_str().starts_with(input))
        .collect::<Vec<_>>();
    match prefixed.as_slice() {
        [category] => Ok(category.id.clone()),
        [] => bail!("No category matches {input}"),
        _ => bail!("{input} matches several categories"),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::planner::{
        entities::CategoryId, prompt::MockCategoryPrompt, timer::TimerSession, Planner,
    };

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 8, 15, 0, 0).unwrap()
    }

    fn run(planner: &mut Planner, command: Commands) -> Result<String> {
        let mut prompt = MockCategoryPrompt::new();
        prompt.expect_choose_category().never();
        execute(planner, command, now(), false, &mut prompt)
    }

    #[test]
    fn test_log_combines_hours_and_minutes() -> Result<()> {
        let mut planner = Planner::new();
        run(
            &mut planner,
            Commands::Log {
                category: "Study".into(),
                hours: 1,
                minutes: 15,
            },
        )?;

        assert_eq!(planner.manual_entries()[0].minutes, 75);
        assert_eq!(planner.manual_entries()[0].category_id, CategoryId::new("study"));
        Ok(())
    }

    #[test]
    fn test_log_rejects_zero() {
        let mut planner = Planner::new();
        let result = run(
            &mut planner,
            Commands::Log {
                category: "work".into(),
                hours: 0,
                minutes: 0,
            },
        );
        assert!(result.is_err());
        assert!(planner.manual_entries().is_empty());
    }

    #[test]
    fn test_task_add_defaults_to_first_category_and_toggle_by_prefix() -> Result<()> {
        let mut planner = Planner::new();
        run(
            &mut planner,
            Commands::Task(TaskCommand::Add {
                title: "inbox zero".into(),
                minutes: 20,
                category: None,
            }),
        )?;
        let task = planner.tasks()[0].clone();
        assert_eq!(task.category_id, CategoryId::new("work"));

        let prefix = short_id(&task.id).to_string();
        run(&mut planner, Commands::Task(TaskCommand::Toggle { id: prefix }))?;
        assert!(planner.tasks()[0].completed);
        Ok(())
    }

    #[test]
    fn test_unknown_category_is_an_error() {
        let mut planner = Planner::new();
        let result = run(
            &mut planner,
            Commands::Category(CategoryCommand::Target {
                category: "gardening".into(),
                hours: 2.,
            }),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_category_resolution() -> Result<()> {
        let mut planner = Planner::new();
        planner.add_category("Writing");
        assert_eq!(resolve_category(&planner, "WORK")?, CategoryId::new("work"));
        assert_eq!(resolve_category(&planner, "stu")?, CategoryId::new("study"));
        // "w" is a prefix of both work and writing
        assert!(resolve_category(&planner, "w").is_err());
        assert!(resolve_category(&planner, "").is_err());
        Ok(())
    }

    #[test]
    fn test_timer_flow_through_commands() -> Result<()> {
        let mut planner = Planner::new();
        let start = now();
        let mut prompt = MockCategoryPrompt::new();
        prompt
            .expect_choose_category()
            .times(1)
            .returning(|_, _| Some(CategoryId::new("work")));

        execute(
            &mut planner,
            Commands::Timer(TimerCommand::Start),
            start,
            false,
            &mut prompt,
        )?;
        let stopped = execute(
            &mut planner,
            Commands::Timer(TimerCommand::Stop),
            start + Duration::seconds(125),
            false,
            &mut prompt,
        )?;
        assert!(stopped.starts_with("Recorded 2m 5s"));
        assert_eq!(planner.timer(), &TimerSession::Idle);

        let id = planner.history().iter().next().unwrap().id.clone();
        let saved = execute(
            &mut planner,
            Commands::History(HistoryCommand::Assign {
                id: short_id(&id).to_string(),
                category: None,
            }),
            start,
            false,
            &mut prompt,
        )?;
        assert_eq!(saved, "Saved 2m to Work\n");

        let again = run(
            &mut planner,
            Commands::History(HistoryCommand::Assign {
                id: id.to_string(),
                category: Some("study".into()),
            }),
        );
        assert!(again.is_err());
        assert_eq!(planner.manual_entries().len(), 1);
        Ok(())
    }

    #[test]
    fn test_config_commands() -> Result<()> {
        let mut planner = Planner::new();
        run(
            &mut planner,
            Commands::Config(ConfigCommand::DayStart {
                hour: 27,
                minute: 30,
            }),
        )?;
        assert_eq!(planner.config().day_start.to_string(), "23:30");

        assert!(run(
            &mut planner,
            Commands::Config(ConfigCommand::TimeZone {
                zone: "Moon/Base".into()
            })
        )
        .is_err());

        let zones = run(&mut planner, Commands::Config(ConfigCommand::Zones))?;
        assert!(zones.contains("Asia/Kolkata\n"));
        Ok(())
    }

    #[test]
    fn test_read_only_commands() {
        assert!(!Commands::Status.mutates());
        assert!(!Commands::History(HistoryCommand::List).mutates());
        assert!(Commands::Timer(TimerCommand::Start).mutates());
        assert!(Commands::Config(ConfigCommand::ShowSeconds { enabled: true }).mutates());
    }
}
