//! Goal progress aggregation.
//!
//! Expects views already limited to non-deleted entries of the goal's
//! bundle-expanded habits; the filtering below only re-applies that scope.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::{AggregationMode, CountMode, Goal, GoalManualLog, GoalType};
use crate::completion::percent_of;
use crate::day_key::DayKey;
use crate::entry::EntryView;
use crate::habit::{GoalValueType, HabitIndex};

/// Length of the trend window, most recent day first.
pub const TREND_WINDOW_DAYS: usize = 30;

/// Prefix of the trend window used for the weekly view and inactivity.
pub const RECENT_WINDOW_DAYS: usize = 7;

/// Days without progress (out of the recent window) that trigger a warning.
pub const INACTIVITY_THRESHOLD: usize = 4;

/// One day of a goal's trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPoint {
    pub date: DayKey,
    pub value: f64,
    pub has_progress: bool,
}

/// Advisory findings attached to a progress result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GoalWarning {
    #[serde(rename = "UNIT_MISMATCH", rename_all = "camelCase")]
    UnitMismatch {
        habit_id: String,
        expected_unit: String,
        found_unit: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub current_value: f64,
    pub percent: u8,
    pub last_seven_days: Vec<ProgressPoint>,
    pub last_thirty_days: Vec<ProgressPoint>,
    pub inactivity_warning: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<GoalWarning>,
}

fn normalize_unit(unit: &str) -> String {
    let lower = unit.trim().to_lowercase();
    match lower.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => lower,
    }
}

/// Case-insensitive unit comparison tolerating a plural trailing `s`.
pub fn units_match(expected: &str, found: &str) -> bool {
    normalize_unit(expected) == normalize_unit(found)
}

/// Per-day buckets of the goal's qualifying contributions.
#[derive(Default)]
struct DailyTotals {
    sums: HashMap<DayKey, f64>,
    counts: HashMap<DayKey, usize>,
}

impl DailyTotals {
    fn value_on(&self, day: DayKey, mode: AggregationMode, count_mode: CountMode) -> f64 {
        match mode {
            AggregationMode::Sum => self.sums.get(&day).copied().unwrap_or(0.0),
            AggregationMode::Count => {
                let count = self.counts.get(&day).copied().unwrap_or(0);
                match count_mode {
                    CountMode::Entries => count as f64,
                    CountMode::DistinctDays if count > 0 => 1.0,
                    CountMode::DistinctDays => 0.0,
                }
            }
        }
    }
}

/// Aggregate a goal's progress at `now` in `tz`.
pub fn compute_goal_progress(
    goal: &Goal,
    entry_views: &[EntryView],
    manual_logs: &[GoalManualLog],
    habits: &HabitIndex,
    tz: Tz,
    now: DateTime<Utc>,
) -> GoalProgress {
    let linked: HashSet<String> = habits.expand_linked(&goal.linked_habit_ids).into_iter().collect();
    let qualifying: Vec<&EntryView> = entry_views
        .iter()
        .filter(|v| !v.is_deleted() && linked.contains(&v.habit_id))
        .collect();

    let mode = goal.aggregation_mode();
    let count_mode = goal.count_mode();
    let mut totals = DailyTotals::default();
    let mut warnings = Vec::new();

    let current_value = match mode {
        AggregationMode::Sum => {
            let mut sum = 0.0;
            for view in &qualifying {
                let is_boolean_habit = habits
                    .get(&view.habit_id)
                    .is_some_and(|h| h.goal.goal_type == GoalValueType::Boolean);
                if is_boolean_habit {
                    continue;
                }

                if let (Some(expected), Some(found)) = (goal.unit.as_deref(), view.unit.as_deref()) {
                    if !units_match(expected, found) {
                        warnings.push(GoalWarning::UnitMismatch {
                            habit_id: view.habit_id.clone(),
                            expected_unit: expected.to_string(),
                            found_unit: found.to_string(),
                        });
                    }
                }

                let value = view.value.unwrap_or(0.0);
                sum += value;
                *totals.sums.entry(view.day_key).or_default() += value;
            }

            for log in manual_logs.iter().filter(|l| l.goal_id == goal.id) {
                sum += log.value;
                let day = DayKey::from_instant(log.logged_at, tz);
                *totals.sums.entry(day).or_default() += log.value;
            }
            sum
        }
        AggregationMode::Count => {
            for view in &qualifying {
                *totals.counts.entry(view.day_key).or_default() += 1;
            }
            match count_mode {
                CountMode::Entries => qualifying.len() as f64,
                CountMode::DistinctDays => totals.counts.len() as f64,
            }
        }
    };

    let percent = match goal.goal_type {
        GoalType::Onetime => {
            if goal.is_completed() {
                100
            } else {
                0
            }
        }
        GoalType::Cumulative | GoalType::Frequency => {
            percent_of(current_value, goal.target_value.unwrap_or(0.0))
        }
    };

    let today = DayKey::from_instant(now, tz);
    let last_thirty_days: Vec<ProgressPoint> = (0..TREND_WINDOW_DAYS as i64)
        .map(|offset| {
            let date = today.add_days(-offset);
            let value = totals.value_on(date, mode, count_mode);
            ProgressPoint {
                date,
                value,
                has_progress: value > 0.0,
            }
        })
        .collect();
    let last_seven_days = last_thirty_days[..RECENT_WINDOW_DAYS].to_vec();

    let idle_days = last_seven_days.iter().filter(|p| !p.has_progress).count();
    let inactivity_warning = !goal.is_completed() && idle_days >= INACTIVITY_THRESHOLD;

    GoalProgress {
        current_value,
        percent,
        last_seven_days,
        last_thirty_days,
        inactivity_warning,
        warnings,
    }
}
