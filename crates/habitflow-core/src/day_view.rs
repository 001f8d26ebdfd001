//! Per-day status of every active habit.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::completion::{CompletionEngine, HabitCompletion};
use crate::day_key::DayKey;
use crate::entry::EntryView;
use crate::error::Result;
use crate::habit::{Habit, HabitIndex};
use crate::repository::Repositories;
use crate::truth::{EntryViewOptions, TruthQuery};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayViewHabitStatus {
    pub habit: Habit,
    #[serde(flatten)]
    pub completion: HabitCompletion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayView {
    pub day_key: DayKey,
    pub habits: Vec<DayViewHabitStatus>,
}

impl DayView {
    pub fn completed_count(&self) -> usize {
        self.habits.iter().filter(|h| h.completion.is_complete).count()
    }
}

/// Build the day view from a fetched snapshot.
///
/// Archived habits are left out of the list but still resolve as bundle
/// children; order follows `habits`.
pub fn build_day_view(habits: Vec<Habit>, views: &[EntryView], day_key: DayKey) -> DayView {
    let index = HabitIndex::new(habits.iter().cloned());
    let engine = CompletionEngine::new(&index, views);

    let habits = habits
        .into_iter()
        .filter(|h| !h.archived)
        .map(|habit| {
            let completion = engine.habit_completion(&habit, day_key);
            DayViewHabitStatus { habit, completion }
        })
        .collect();

    DayView { day_key, habits }
}

/// Repository-backed day view.
#[derive(Clone)]
pub struct DayViewService {
    repos: Repositories,
    truth: TruthQuery,
    include_legacy_fallback: bool,
}

impl DayViewService {
    pub fn new(repos: Repositories) -> Self {
        let truth = TruthQuery::from_repositories(&repos);
        Self {
            repos,
            truth,
            include_legacy_fallback: true,
        }
    }

    pub fn with_legacy_fallback(mut self, include: bool) -> Self {
        self.include_legacy_fallback = include;
        self
    }

    /// Status of every active habit on `day_key`.
    ///
    /// Views are fetched for the whole ISO week so weekly habits resolve.
    pub async fn compute_day_view(&self, user_id: &str, day_key: DayKey, tz: Tz) -> Result<DayView> {
        let (week_start, week_end) = day_key.week_bounds();
        let opts = EntryViewOptions::new(tz)
            .with_range(Some(week_start), Some(week_end))
            .with_legacy_fallback(self.include_legacy_fallback);

        let (habits, views) = tokio::try_join!(
            self.repos.habits.habits_by_user(user_id),
            self.truth.entry_views_for_user(user_id, &opts),
        )?;

        Ok(build_day_view(habits, &views, day_key))
    }
}
