//! Integration tests for the derived read models.
//!
//! Goals, the day view and momentum are exercised against a file-backed
//! SQLite store; batch fetch counts are checked against the in-memory store.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use habitflow_core::goal::GoalType;
use habitflow_core::repository::Repositories;
use habitflow_core::{
    compute_streak, CompletionEngine, CoreError, DayKey, DayLog, DayViewService, Goal, GoalManualLog, GoalService,
    GoalWarning, Habit, HabitEntry, HabitIndex, HabitStore, MemoryStore, MomentumService, MomentumState,
    TruthQuery, EntryViewOptions,
};

const USER: &str = "user-1";
const TZ: Tz = chrono_tz::Europe::Berlin;

// ============================================================================
// Test Helpers
// ============================================================================

fn day(s: &str) -> DayKey {
    DayKey::parse(s).unwrap()
}

fn at(d: &str, hour: u32) -> DateTime<Utc> {
    day(d).date().and_hms_opt(hour, 0, 0).unwrap().and_utc()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 20, 18, 0, 0).unwrap()
}

fn completed(habit: &str, date: &str) -> DayLog {
    DayLog {
        habit_id: habit.into(),
        date: date.into(),
        value: 0.0,
        completed: true,
        source: None,
    }
}

fn open_store(dir: &tempfile::TempDir) -> Arc<HabitStore> {
    Arc::new(HabitStore::open_at(dir.path().join("habitflow.db")).unwrap())
}

/// Habits, goals and activity shared by the goal tests.
fn seed_goals(store: &HabitStore) {
    store.create_habit(USER, &Habit::new("meditate", "Meditate")).unwrap();
    store
        .create_habit(USER, &Habit::new("run", "Run").numeric(Some(3.0), Some("miles")))
        .unwrap();
    store.create_habit(USER, &Habit::new("walk", "Walk")).unwrap();
    store
        .create_habit(USER, &Habit::new("cardio", "Cardio").checklist(&["run", "walk"]))
        .unwrap();

    let mut onetime = Goal::new("marathon", "Marathon", GoalType::Onetime);
    onetime.completed_at = Some(at("2025-01-10", 9));
    onetime.sort_order = Some(1);
    let mut miles = Goal::new("miles", "Run 100 miles", GoalType::Cumulative)
        .with_target(100.0)
        .with_unit("miles")
        .linked_to(&["cardio"]);
    miles.sort_order = Some(2);
    let sits = Goal::new("sit", "Sit five times", GoalType::Frequency)
        .with_target(5.0)
        .linked_to(&["meditate"]);
    store.create_goal(USER, &sits).unwrap();
    store.create_goal(USER, &miles).unwrap();
    store.create_goal(USER, &onetime).unwrap();

    for (d, h) in [("2025-01-18", 7), ("2025-01-18", 20), ("2025-01-19", 7), ("2025-01-20", 7)] {
        store
            .log_entry(USER, &HabitEntry::new("meditate", day(d), at(d, h)))
            .unwrap();
    }

    let runs = [
        ("2025-01-18", 10.0, "miles"),
        ("2025-01-19", 5.0, "Mile"),
        ("2025-01-20", 3.0, "km"),
    ];
    for (d, value, unit) in runs {
        store
            .log_entry(
                USER,
                &HabitEntry::new("run", day(d), at(d, 8)).with_value(value).with_unit(unit),
            )
            .unwrap();
    }
    // boolean child of the bundle: never summed
    store
        .log_entry(USER, &HabitEntry::new("walk", day("2025-01-19"), at("2025-01-19", 9)).with_value(4.0))
        .unwrap();

    store
        .add_manual_log(
            USER,
            &GoalManualLog {
                id: "m1".into(),
                goal_id: "miles".into(),
                value: 2.0,
                logged_at: at("2025-01-20", 12),
            },
        )
        .unwrap();
}

// ============================================================================
// Goals
// ============================================================================

#[tokio::test]
async fn test_goal_progress_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    seed_goals(&store);
    let service = GoalService::new(Repositories::from_store(store));

    let sit = service.goal_progress("sit", USER, TZ, now()).await.unwrap();
    assert_eq!(sit.progress.current_value, 3.0);
    assert_eq!(sit.progress.percent, 60);
    assert!(sit.progress.inactivity_warning);

    let miles = service.goal_progress("miles", USER, TZ, now()).await.unwrap();
    assert_eq!(miles.progress.current_value, 20.0);
    assert_eq!(miles.progress.percent, 20);
    assert_eq!(
        miles.progress.warnings,
        vec![GoalWarning::UnitMismatch {
            habit_id: "run".into(),
            expected_unit: "miles".into(),
            found_unit: "km".into(),
        }]
    );
    assert_eq!(miles.progress.last_seven_days[0].date, day("2025-01-20"));
    assert_eq!(miles.progress.last_seven_days[0].value, 5.0);
    assert_eq!(miles.progress.last_thirty_days.len(), 30);
}

#[tokio::test]
async fn test_unknown_goal_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let service = GoalService::new(Repositories::from_store(store));

    let err = service.goal_progress("nope", USER, TZ, now()).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { kind: "goal", .. }));
}

#[tokio::test]
async fn test_goals_batch_is_ordered_and_matches_single_lookups() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    seed_goals(&store);
    let service = GoalService::new(Repositories::from_store(store));

    let batch = service.goals_with_progress(USER, TZ, now()).await.unwrap();
    let ids: Vec<&str> = batch.iter().map(|g| g.goal.id.as_str()).collect();
    assert_eq!(ids, vec!["marathon", "miles", "sit"]);

    assert_eq!(batch[0].progress.percent, 100);
    assert!(!batch[0].progress.inactivity_warning);

    for item in &batch {
        let single = service.goal_progress(&item.goal.id, USER, TZ, now()).await.unwrap();
        assert_eq!(single.progress, item.progress);
    }
}

#[tokio::test]
async fn test_goals_batch_prefetches_once() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..10 {
        store
            .insert_goal(
                USER,
                Goal::new(format!("g{i}"), format!("Goal {i}"), GoalType::Frequency)
                    .with_target(3.0)
                    .linked_to(&["h1"]),
            )
            .unwrap();
    }
    store.insert_habit(USER, Habit::new("h1", "Stretch")).unwrap();
    store
        .insert_entry(USER, HabitEntry::new("h1", day("2025-01-20"), at("2025-01-20", 7)))
        .unwrap();

    let service = GoalService::new(Repositories::from_store(store.clone()));
    let batch = service.goals_with_progress(USER, TZ, now()).await.unwrap();

    assert_eq!(batch.len(), 10);
    assert!(batch.iter().all(|g| g.progress.current_value == 1.0));
    // goals, habits, entries, day logs, manual logs
    assert_eq!(store.fetch_count(), 5);
}

// ============================================================================
// Day view and streaks
// ============================================================================

#[tokio::test]
async fn test_day_view_resolves_weekly_and_bundles() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    store.create_habit(USER, &Habit::new("gym", "Gym").weekly(3.0)).unwrap();
    store.create_habit(USER, &Habit::new("floss", "Floss")).unwrap();
    store.create_habit(USER, &Habit::new("brush", "Brush")).unwrap();
    store
        .create_habit(USER, &Habit::new("teeth", "Teeth").checklist(&["floss", "brush"]))
        .unwrap();
    store
        .create_habit(
            USER,
            &Habit::new("lunch", "Lunch").choice(&[("salad", "Salad"), ("soup", "Soup")]),
        )
        .unwrap();

    // Mon 13th .. Wed 15th, the view day
    for d in ["2025-01-13", "2025-01-14", "2025-01-15"] {
        store.log_entry(USER, &HabitEntry::new("gym", day(d), at(d, 17))).unwrap();
    }
    store.import_day_log(USER, &completed("floss", "2025-01-15")).unwrap();
    store
        .log_entry(USER, &HabitEntry::new("brush", day("2025-01-15"), at("2025-01-15", 7)))
        .unwrap();
    store
        .log_entry(
            USER,
            &HabitEntry::new("lunch", day("2025-01-15"), at("2025-01-15", 11)).with_option("soup"),
        )
        .unwrap();

    let view = DayViewService::new(Repositories::from_store(store))
        .compute_day_view(USER, day("2025-01-15"), TZ)
        .await
        .unwrap();

    let status = |id: &str| view.habits.iter().find(|h| h.habit.id == id).unwrap();
    assert!(status("gym").completion.is_complete);
    assert_eq!(status("gym").completion.week_complete, Some(true));
    assert!(status("teeth").completion.is_complete);
    assert_eq!(status("teeth").completion.completed_children_count, Some(2));
    let lunch = &status("lunch").completion;
    assert!(lunch.is_complete);
    assert_eq!(lunch.selected_option.as_ref().and_then(|o| o.label.as_deref()), Some("Soup"));
    assert_eq!(view.completed_count(), 5);

    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["dayKey"], "2025-01-15");
    assert_eq!(json["habits"][0]["habit"]["id"], "gym");
}

#[tokio::test]
async fn test_streak_from_stored_history() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    store.create_habit(USER, &Habit::new("read", "Read")).unwrap();
    for d in ["2025-01-16", "2025-01-17", "2025-01-18", "2025-01-19"] {
        store.import_day_log(USER, &completed("read", d)).unwrap();
    }
    store
        .log_entry(USER, &HabitEntry::new("read", day("2025-01-20"), at("2025-01-20", 8)))
        .unwrap();
    let repos = Repositories::from_store(store);

    let habits = HabitIndex::new(repos.habits.habits_by_user(USER).await.unwrap());
    let views = TruthQuery::from_repositories(&repos)
        .entry_views_for_habit("read", USER, &EntryViewOptions::new(TZ))
        .await
        .unwrap();
    let engine = CompletionEngine::new(&habits, &views);

    let summary = compute_streak(habits.get("read").unwrap(), &engine, day("2025-01-21"));
    assert_eq!(summary.current, 5);
    assert_eq!(summary.best, 5);
}

// ============================================================================
// Momentum
// ============================================================================

#[tokio::test]
async fn test_momentum_global_and_category() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    store
        .create_habit(USER, &Habit::new("yoga", "Yoga").in_category("body"))
        .unwrap();
    store
        .create_habit(USER, &Habit::new("journal", "Journal").in_category("mind"))
        .unwrap();

    for d in ["2025-01-14", "2025-01-16", "2025-01-18", "2025-01-20"] {
        store.import_day_log(USER, &completed("journal", d)).unwrap();
    }
    store.import_day_log(USER, &completed("yoga", "2025-01-20")).unwrap();
    // outside the window
    store.import_day_log(USER, &completed("yoga", "2025-01-01")).unwrap();
    store
        .import_day_log(
            USER,
            &DayLog {
                completed: false,
                ..completed("yoga", "2025-01-19")
            },
        )
        .unwrap();

    let service = MomentumService::new(Repositories::from_store(store));
    let global = service.global(USER, day("2025-01-20"), TZ).await.unwrap();
    assert_eq!(global.active_days, 4);
    assert_eq!(global.state, MomentumState::Steady);

    let body = service.category(USER, "body", day("2025-01-20"), TZ).await.unwrap();
    assert_eq!(body.active_days, 1);
    assert_eq!(body.state, MomentumState::Building);

    let empty = service.category(USER, "sleep", day("2025-01-20"), TZ).await.unwrap();
    assert_eq!(empty.state, MomentumState::Paused);
}

#[tokio::test]
async fn test_momentum_counts_logged_entries() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    store
        .create_habit(USER, &Habit::new("read", "Read").in_category("mind"))
        .unwrap();
    for d in 14..=20 {
        let key = day(&format!("2025-01-{d}"));
        store
            .log_entry(USER, &HabitEntry::new("read", key, at(&key.to_string(), 9)))
            .unwrap();
    }
    // deleted entries do not count
    let stale = HabitEntry::new("read", day("2025-01-10"), at("2025-01-10", 9));
    store.log_entry(USER, &stale).unwrap();
    store.soft_delete_entry(USER, &stale.id, now()).unwrap();

    let service = MomentumService::new(Repositories::from_store(store));
    let global = service.global(USER, day("2025-01-20"), TZ).await.unwrap();
    assert_eq!(global.active_days, 7);
    assert_eq!(global.state, MomentumState::Strong);

    let mind = service.category(USER, "mind", day("2025-01-20"), TZ).await.unwrap();
    assert_eq!(mind.state, MomentumState::Strong);

    let earlier = service.global(USER, day("2025-01-11"), TZ).await.unwrap();
    assert_eq!(earlier.state, MomentumState::Ready);
}
