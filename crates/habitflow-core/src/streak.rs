//! Streaks of consecutive completed periods.
//!
//! Daily habits (and bundles) count days, weekly habits count ISO weeks. The
//! running period does not break a streak until it is over: an incomplete
//! today still reports the run that ended yesterday.

use serde::{Deserialize, Serialize};

use crate::completion::CompletionEngine;
use crate::day_key::DayKey;
use crate::habit::Habit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakPeriod {
    Day,
    Week,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakSummary {
    pub habit_id: String,
    pub period: StreakPeriod,
    pub current: u32,
    pub best: u32,
    /// First day of the most recent completed period.
    pub last_completed: Option<DayKey>,
}

/// Current and best streak of `habit` as of `today`.
pub fn compute_streak(habit: &Habit, engine: &CompletionEngine<'_>, today: DayKey) -> StreakSummary {
    let period = if habit.is_weekly() && !habit.is_bundle() {
        StreakPeriod::Week
    } else {
        StreakPeriod::Day
    };

    let mut summary = StreakSummary {
        habit_id: habit.id.clone(),
        period,
        current: 0,
        best: 0,
        last_completed: None,
    };

    let Some(first) = first_activity(habit, engine) else {
        return summary;
    };
    if first > today {
        return summary;
    }

    let (start, step, end) = match period {
        StreakPeriod::Day => (first, 1, today),
        StreakPeriod::Week => (first.week_start(), 7, today.week_start()),
    };

    let mut periods = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        let done = engine.habit_completion(habit, cursor).is_complete;
        if done {
            summary.last_completed = Some(cursor);
        }
        periods.push(done);
        cursor = cursor.add_days(step);
    }

    let mut run = 0u32;
    for &done in &periods {
        run = if done { run + 1 } else { 0 };
        summary.best = summary.best.max(run);
    }

    // an unfinished current period does not reset the streak
    let closed = match periods.last() {
        Some(false) => &periods[..periods.len() - 1],
        _ => &periods[..],
    };
    summary.current = closed.iter().rev().take_while(|&&done| done).count() as u32;
    summary
}

fn first_activity(habit: &Habit, engine: &CompletionEngine<'_>) -> Option<DayKey> {
    let mut ids = engine.habits().expand_linked(&[habit.id.clone()]);
    ids.push(habit.id.clone());
    ids.iter().filter_map(|id| engine.entries().first_day(id)).min()
}
