use habitflow_core::repository::HabitRepository;
use habitflow_core::{compute_streak, CompletionEngine, CoreError, EntryViewOptions, HabitIndex, TruthQuery};

use super::{print_json, CliResult, Session};

pub async fn run(habit_id: &str, date: Option<&str>, tz: Option<&str>) -> CliResult {
    let session = Session::open(tz)?;
    let today = session.day_or_today(date)?;
    let opts = EntryViewOptions::new(session.tz).with_legacy_fallback(session.include_legacy_fallback());

    // bundles need their children's history too
    let truth = TruthQuery::from_repositories(&session.repos());
    let (habits, views) = tokio::try_join!(
        session.store.habits_by_user(session.user_id()),
        truth.entry_views_for_user(session.user_id(), &opts),
    )?;
    let habits = HabitIndex::new(habits);
    let habit = habits.get(habit_id).ok_or_else(|| CoreError::NotFound {
        kind: "habit",
        id: habit_id.to_string(),
    })?;

    let engine = CompletionEngine::new(&habits, &views);
    print_json(&compute_streak(habit, &engine, today))
}
