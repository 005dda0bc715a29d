use chrono_tz::Tz;
use tracing::{error, warn};

use crate::planner::{
    day_window::{parse_time_zone, DayStart, DayWindowConfig},
    entities::{default_categories, Category, ManualEntry, Preferences, Task},
    timer::{TimerHistory, TimerSession},
    Planner, PlannerState,
};

use super::{load_value, save_value, StateStorage};

/// Logical names under which each part of the state is stored.
pub mod keys {
    pub const DAY_START: &str = "dayStart";
    pub const TIME_ZONE: &str = "timeZone";
    pub const SHOW_SECONDS: &str = "showSeconds";
    pub const CATEGORIES: &str = "categories";
    pub const TASKS: &str = "tasks";
    pub const MANUAL_ENTRIES: &str = "manualEntries";
    pub const TIMER: &str = "timer";
    pub const TIMER_HISTORY: &str = "timerHistory";
}

/// Loads every key, defaulting whatever is missing or broken. Never fails.
pub async fn load_planner(storage: &impl StateStorage) -> Planner {
    let day_start = load_value::<DayStart>(storage, keys::DAY_START)
        .await
        .unwrap_or_default();
    let time_zone = load_time_zone(storage).await;
    let show_seconds = load_value::<bool>(storage, keys::SHOW_SECONDS)
        .await
        .unwrap_or_default();
    // An empty list is a deliberate choice, only a missing one gets the defaults.
    let categories = load_value::<Vec<Category>>(storage, keys::CATEGORIES)
        .await
        .unwrap_or_else(default_categories);

    let state = PlannerState {
        config: DayWindowConfig {
            day_start,
            time_zone,
        },
        preferences: Preferences { show_seconds },
        categories,
        tasks: load_value::<Vec<Task>>(storage, keys::TASKS)
            .await
            .unwrap_or_default(),
        manual_entries: load_value::<Vec<ManualEntry>>(storage, keys::MANUAL_ENTRIES)
            .await
            .unwrap_or_default(),
        timer: load_value::<TimerSession>(storage, keys::TIMER)
            .await
            .unwrap_or_default(),
        history: load_value::<TimerHistory>(storage, keys::TIMER_HISTORY)
            .await
            .unwrap_or_default(),
    };
    Planner::restore(state)
}

async fn load_time_zone(storage: &impl StateStorage) -> Tz {
    let default = DayWindowConfig::default().time_zone;
    match load_value::<String>(storage, keys::TIME_ZONE).await {
        Some(name) => parse_time_zone(&name).unwrap_or_else(|| {
            warn!("Stored time zone {name} is unknown, using {default}");
            default
        }),
        None => default,
    }
}

/// Writes every key. Failures are logged and swallowed; returns how many keys failed so callers
/// can mention it if they want to.
pub async fn save_planner(storage: &impl StateStorage, planner: &Planner) -> usize {
    let state = planner.state();
    let results = [
        save_value(storage, keys::DAY_START, &state.config.day_start).await,
        save_value(storage, keys::TIME_ZONE, &state.config.time_zone.name()).await,
        save_value(storage, keys::SHOW_SECONDS, &state.preferences.show_seconds).await,
        save_value(storage, keys::CATEGORIES, &state.categories).await,
        save_value(storage, keys::TASKS, &state.tasks).await,
        save_value(storage, keys::MANUAL_ENTRIES, &state.manual_entries).await,
        save_value(storage, keys::TIMER, &state.timer).await,
        save_value(storage, keys::TIMER_HISTORY, &state.history).await,
    ];

    let mut failed = 0;
    for result in results {
        if let Err(e) = result {
            error!("Failed to persist planner state: {e:?}");
            failed += 1;
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use chrono_tz::Tz;

    use crate::{
        planner::{entities::CategoryId, timer::TimerSession, Planner},
        storage::memory::MemoryStorage,
    };

    use super::{keys, load_planner, save_planner};

    #[tokio::test]
    async fn test_empty_storage_gives_defaults() {
        let storage = MemoryStorage::default();
        let planner = load_planner(&storage).await;

        assert_eq!(planner.categories().len(), 2);
        assert_eq!(planner.config().day_start.hour(), 5);
        assert!(!planner.preferences().show_seconds);
        assert_eq!(planner.timer(), &TimerSession::Idle);
    }

    #[tokio::test]
    async fn test_state_survives_save_and_load() {
        let storage = MemoryStorage::default();
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap();

        let mut planner = Planner::new();
        planner.set_time_zone("Asia/Tokyo");
        planner.set_day_start(6, 15);
        planner.set_show_seconds(true);
        let reading = planner.add_category("Reading");
        planner.add_task("chapter 3", 40, &reading).unwrap();
        planner.add_manual_entry(&CategoryId::new("work"), 25).unwrap();
        planner.start_timer(now);
        planner.stop_timer(now + Duration::seconds(95)).unwrap();
        planner.start_timer(now + Duration::seconds(200));

        assert_eq!(save_planner(&storage, &planner).await, 0);
        let loaded = load_planner(&storage).await;

        assert_eq!(loaded, planner);
        assert_eq!(loaded.config().time_zone, Tz::Asia__Tokyo);
        assert!(loaded.timer().is_running());
    }

    #[tokio::test]
    async fn test_malformed_keys_fall_back_individually() {
        let storage = MemoryStorage::default();
        storage.insert(keys::CATEGORIES, r#"[{"id":"art","name":"Art","targetHours":1.5}]"#);
        storage.insert(keys::TASKS, "definitely not json");
        storage.insert(keys::TIME_ZONE, r#""Nowhere/Special""#);
        storage.insert(keys::DAY_START, r#"{"hour":40,"minute":10}"#);

        let planner = load_planner(&storage).await;

        assert_eq!(planner.categories().len(), 1);
        assert_eq!(planner.categories()[0].target_minutes(), 90);
        assert!(planner.tasks().is_empty());
        assert_eq!(planner.config().day_start.hour(), 23);
        assert_eq!(planner.config().day_start.minute(), 10);
    }

    #[tokio::test]
    async fn test_deleted_categories_stay_deleted() {
        let storage = MemoryStorage::default();
        let mut planner = Planner::new();
        planner.remove_category(&CategoryId::new("work"));
        planner.remove_category(&CategoryId::new("study"));
        save_planner(&storage, &planner).await;

        let loaded = load_planner(&storage).await;
        assert!(loaded.categories().is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_is_swallowed() {
        let storage = MemoryStorage::failing();
        let mut planner = Planner::new();
        planner.add_category("Music");

        assert_eq!(save_planner(&storage, &planner).await, 8);
        assert_eq!(planner.categories().len(), 3);
    }

    #[tokio::test]
    async fn test_oversized_stored_values_stay_usable() {
        let storage = MemoryStorage::default();
        storage.insert(keys::TIMER, r#"{"elapsedSeconds":10000000000000}"#);
        storage.insert(
            keys::CATEGORIES,
            r#"[{"id":"work","name":"Work","targetHours":1e10}]"#,
        );
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap();

        let mut planner = load_planner(&storage).await;
        assert_eq!(planner.timer(), &TimerSession::Idle);

        planner.start_timer(now);
        assert!(planner.timer().is_running());
        assert!(!planner.workload(now).can_finish);
    }

    #[tokio::test]
    async fn test_duplicate_stored_ids_keep_first() {
        let storage = MemoryStorage::default();
        storage.insert(
            keys::TASKS,
            r#"[{"id":"t1","title":"first","minutes":10,"categoryId":"work"},
                {"id":"t1","title":"second","minutes":20,"categoryId":"work"}]"#,
        );
        storage.insert(
            keys::MANUAL_ENTRIES,
            r#"[{"id":"m1","categoryId":"work","minutes":5},
                {"id":"m1","categoryId":"study","minutes":7}]"#,
        );
        storage.insert(
            keys::TIMER_HISTORY,
            r#"[{"id":"r1","end":1700000000000,"durationSeconds":60},
                {"id":"r1","end":1700000001000,"durationSeconds":90}]"#,
        );

        let planner = load_planner(&storage).await;

        assert_eq!(planner.tasks().len(), 1);
        assert_eq!(planner.tasks()[0].title, "first");
        assert_eq!(planner.manual_entries().len(), 1);
        assert_eq!(planner.manual_entries()[0].minutes, 5);
        assert_eq!(planner.history().len(), 1);
        assert_eq!(planner.history().iter().next().unwrap().duration_seconds, 60);
    }
}
