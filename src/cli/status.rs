use ansi_term::Colour;
use chrono::{DateTime, Utc};

use crate::{
    planner::{day_window::ReminderLevel, Planner},
    utils::time::{format_clock, format_date_time, format_minutes, format_seconds},
};

use super::commands::short_id;

/// Main screen of the planner. Used by `status` and on every `watch` tick.
pub fn render_status(planner: &Planner, now: DateTime<Utc>, colored: bool) -> String {
    let config = planner.config();
    let zone = config.time_zone;
    let show_seconds = planner.preferences().show_seconds;
    let workload = planner.workload(now);
    let clock = |instant| format_clock(instant, zone, show_seconds);

    let mut lines = vec![
        format!(
            "Day window:\t{} -> {} ({zone}, starts {})",
            format_date_time(workload.window.start, zone),
            format_date_time(workload.window.end, zone),
            config.day_start
        ),
        format!("Now:\t\t{}", clock(now)),
        format!(
            "Time left:\t{} ({:.1}h)",
            format_minutes(workload.minutes_left),
            workload.hours_left()
        ),
        format!(
            "Workload left:\t{} (needed {}, planned {})",
            format_minutes(workload.workload_minutes),
            format_minutes(workload.total_needed),
            format_minutes(workload.total_planned_remaining)
        ),
        format!(
            "Latest start:\t{} ({})",
            clock(workload.latest_start),
            if workload.can_finish {
                "Still possible"
            } else {
                "Not enough time"
            }
        ),
        format!("Status:\t\t{}", reminder(workload.reminder, colored)),
        format!("Timer:\t\t{}", planner.timer().display(now)),
        String::new(),
    ];

    if workload.categories.is_empty() {
        lines.push("No categories. Add one with `category add NAME`".to_string());
    }
    for stats in &workload.categories {
        lines.push(format!(
            "{}\t{} / {}\t{}\tneeds {}\tplanned {}",
            stats.name,
            format_minutes(stats.done_minutes),
            format_minutes(stats.target_minutes),
            stats.progress,
            format_minutes(stats.needed_minutes),
            format_minutes(stats.planned_remaining_minutes)
        ));
    }

    lines.join("\n") + "\n"
}

fn reminder(level: ReminderLevel, colored: bool) -> String {
    if !colored {
        return level.message().to_string();
    }
    let colour = match level {
        ReminderLevel::Relaxed => Colour::Green,
        ReminderLevel::Caution => Colour::Yellow,
        ReminderLevel::Urgent => Colour::Red,
    };
    colour.bold().paint(level.message()).to_string()
}

pub fn render_config(planner: &Planner) -> String {
    let config = planner.config();
    format!(
        "Day start:\t{}\nTime zone:\t{}\nShow seconds:\t{}\n",
        config.day_start,
        config.time_zone,
        planner.preferences().show_seconds
    )
}

pub fn render_categories(planner: &Planner, now: DateTime<Utc>) -> String {
    let workload = planner.workload(now);
    workload
        .categories
        .iter()
        .zip(planner.categories())
        .map(|(stats, category)| {
            format!(
                "{}\t{}\t{}h\t{} done\t{}\n",
                category.id,
                category.name,
                category.target_hours,
                format_minutes(stats.done_minutes),
                stats.progress
            )
        })
        .collect()
}

pub fn render_tasks(planner: &Planner, now: DateTime<Utc>) -> String {
    let workload = planner.workload(now);
    let mut out = String::new();
    for stats in &workload.categories {
        out.push_str(&format!(
            "{} ({} / {})\n",
            stats.name,
            format_minutes(stats.done_minutes),
            format_minutes(stats.target_minutes)
        ));
        for task in planner
            .tasks()
            .iter()
            .filter(|t| t.category_id == stats.category_id)
        {
            let mark = if task.completed { "x" } else { " " };
            out.push_str(&format!(
                "  [{mark}] {}\t{}\t{}\n",
                short_id(&task.id),
                format_minutes(u64::from(task.minutes)),
                task.title
            ));
        }
        for entry in planner
            .manual_entries()
            .iter()
            .filter(|e| e.category_id == stats.category_id)
        {
            out.push_str(&format!(
                "  log {}\t{}\n",
                short_id(&entry.id),
                format_minutes(u64::from(entry.minutes))
            ));
        }
    }
    out
}

pub fn render_history(planner: &Planner) -> String {
    let zone = planner.config().time_zone;
    if planner.history().is_empty() {
        return "No recorded sessions\n".to_string();
    }
    planner
        .history()
        .iter()
        .map(|record| {
            let saved = match &record.saved_category_id {
                Some(id) => planner
                    .category(id)
                    .map_or_else(|| format!("saved to {id}"), |c| format!("saved to {}", c.name)),
                None => "unassigned".to_string(),
            };
            format!(
                "{}\t{}\t{}\t{}\n",
                short_id(&record.id),
                format_date_time(record.end, zone),
                format_seconds(record.duration_seconds),
                saved
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use chrono_tz::Tz;

    use crate::planner::{entities::CategoryId, Planner};

    use super::{render_history, render_status, render_tasks};

    fn planner() -> Planner {
        let mut planner = Planner::new();
        planner.set_time_zone("UTC");
        planner.set_day_start(5, 0);
        planner
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 8, 20, 0, 0).unwrap()
    }

    #[test]
    fn test_status_lines() {
        let mut planner = planner();
        planner.add_manual_entry(&CategoryId::new("work"), 60);
        let status = render_status(&planner, now(), false);

        assert_eq!(planner.config().time_zone, Tz::UTC);
        assert!(status.contains("Time left:\t9h (9.0h)"));
        // 5h work and 8h study still needed
        assert!(status.contains("Workload left:\t13h (needed 13h, planned 0m)"));
        assert!(status.contains("Not enough time"));
        assert!(status.contains("Good, lots of time"));
        assert!(status.contains("Timer:\t\tIdle 0s"));
        assert!(status.contains("Work\t1h / 6h\t17%"));
    }

    #[test]
    fn test_colored_status_keeps_message() {
        let status = render_status(&planner(), now() + Duration::hours(8), true);
        assert!(status.contains("Urgent, very little time"));
        assert!(status.contains("\u{1b}["));
    }

    #[test]
    fn test_tasks_grouped_by_category() {
        let mut planner = planner();
        planner.add_task("read paper", 45, &CategoryId::new("study"));
        let tasks = render_tasks(&planner, now());
        let study = tasks.find("Study").unwrap();
        let task = tasks.find("read paper").unwrap();
        assert!(task > study);
        assert!(tasks.contains("[ ]"));
    }

    #[test]
    fn test_huge_target_still_renders() {
        let mut planner = planner();
        planner.set_category_target(&CategoryId::new("work"), 1e10);
        planner.set_category_target(&CategoryId::new("study"), 1e300);

        let status = render_status(&planner, now(), false);
        assert!(status.contains("Not enough time"));
        assert!(render_tasks(&planner, now()).contains("Work"));
    }

    #[test]
    fn test_history_listing() {
        let mut planner = planner();
        assert_eq!(render_history(&planner), "No recorded sessions\n");
        planner.start_timer(now());
        planner.stop_timer(now() + Duration::seconds(90));
        let history = render_history(&planner);
        assert!(history.contains("1m 30s\tunassigned"));
    }
}
