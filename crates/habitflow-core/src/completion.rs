//! Completion derivation for daily, weekly and bundle habits.
//!
//! Nothing here is stored. Every status is recomputed from EntryViews and the
//! habit configuration; soft-deleted views never count.
//!
//! A checklist bundle is complete only when **all** of its children are
//! complete. The same predicate backs the day view, streaks and goal
//! evaluation.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::day_key::DayKey;
use crate::entry::EntryView;
use crate::habit::{GoalValueType, Habit, HabitIndex};

/// Rounded percentage of `current` over `target`, clamped to 0..=100.
pub fn percent_of(current: f64, target: f64) -> u8 {
    if target <= 0.0 || !target.is_finite() {
        return 0;
    }
    (current / target * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Sub-mode of a weekly habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeeklyMode {
    /// Sum of values against a numeric target
    Quantity,
    /// Distinct active days against a target count
    Frequency,
    /// Any activity in the week
    Binary,
}

impl WeeklyMode {
    pub fn for_habit(habit: &Habit) -> Self {
        if habit.goal.goal_type == GoalValueType::Number {
            WeeklyMode::Quantity
        } else if habit.weekly_target() > 1.0 {
            WeeklyMode::Frequency
        } else {
            WeeklyMode::Binary
        }
    }
}

/// The option picked for a choice bundle on a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedOption {
    pub key: String,
    pub label: Option<String>,
}

/// Derived status of one habit on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitCompletion {
    pub is_complete: bool,
    pub current_value: f64,
    pub target_value: f64,
    pub progress_percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_complete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_children_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_children_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_option: Option<SelectedOption>,
}

impl HabitCompletion {
    fn simple(current: f64, target: f64, is_complete: bool) -> Self {
        Self {
            is_complete,
            current_value: current,
            target_value: target,
            progress_percent: percent_of(current, target),
            week_complete: None,
            completed_children_count: None,
            total_children_count: None,
            selected_option: None,
        }
    }

    fn incomplete() -> Self {
        Self::simple(0.0, 1.0, false)
    }
}

/// Non-deleted views grouped by habit, in input order.
#[derive(Debug, Default)]
pub struct EntryIndex<'a> {
    by_habit: HashMap<&'a str, Vec<&'a EntryView>>,
}

impl<'a> EntryIndex<'a> {
    pub fn new(views: &'a [EntryView]) -> Self {
        let mut by_habit: HashMap<&str, Vec<&EntryView>> = HashMap::new();
        for view in views.iter().filter(|v| !v.is_deleted()) {
            by_habit.entry(view.habit_id.as_str()).or_default().push(view);
        }
        Self { by_habit }
    }

    pub fn for_habit(&self, habit_id: &str) -> &[&'a EntryView] {
        self.by_habit.get(habit_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn in_range(
        &self,
        habit_id: &str,
        start: DayKey,
        end: DayKey,
    ) -> impl Iterator<Item = &'a EntryView> + '_ {
        self.for_habit(habit_id)
            .iter()
            .copied()
            .filter(move |v| v.day_key >= start && v.day_key <= end)
    }

    pub fn on_day(&self, habit_id: &str, day: DayKey) -> impl Iterator<Item = &'a EntryView> + '_ {
        self.in_range(habit_id, day, day)
    }

    /// Earliest day any view exists for the habit.
    pub fn first_day(&self, habit_id: &str) -> Option<DayKey> {
        self.for_habit(habit_id).iter().map(|v| v.day_key).min()
    }
}

/// Resolves completion for any habit shape over a fixed snapshot.
pub struct CompletionEngine<'a> {
    habits: &'a HabitIndex,
    entries: EntryIndex<'a>,
}

impl<'a> CompletionEngine<'a> {
    pub fn new(habits: &'a HabitIndex, views: &'a [EntryView]) -> Self {
        Self {
            habits,
            entries: EntryIndex::new(views),
        }
    }

    pub fn habits(&self) -> &HabitIndex {
        self.habits
    }

    pub fn entries(&self) -> &EntryIndex<'a> {
        &self.entries
    }

    /// Status of `habit` on `day`.
    pub fn habit_completion(&self, habit: &Habit, day: DayKey) -> HabitCompletion {
        let mut path = HashSet::new();
        self.resolve(habit, day, &mut path)
    }

    /// Completion predicate by id; unknown habits are never complete.
    pub fn is_complete(&self, habit_id: &str, day: DayKey) -> bool {
        self.habits
            .get(habit_id)
            .is_some_and(|h| self.habit_completion(h, day).is_complete)
    }

    fn resolve(&self, habit: &Habit, day: DayKey, path: &mut HashSet<String>) -> HabitCompletion {
        if habit.is_choice_bundle() {
            self.choice_bundle(habit, day)
        } else if habit.is_bundle() {
            self.checklist_bundle(habit, day, path)
        } else if habit.is_weekly() {
            self.weekly(habit, day)
        } else {
            self.daily(habit, day)
        }
    }

    fn daily(&self, habit: &Habit, day: DayKey) -> HabitCompletion {
        let done = self.entries.on_day(&habit.id, day).next().is_some();
        HabitCompletion::simple(if done { 1.0 } else { 0.0 }, 1.0, done)
    }

    fn weekly(&self, habit: &Habit, day: DayKey) -> HabitCompletion {
        let (start, end) = day.week_bounds();
        let target = habit.weekly_target();
        let in_week = || self.entries.in_range(&habit.id, start, end);

        let (current, target, done) = match WeeklyMode::for_habit(habit) {
            WeeklyMode::Quantity => {
                let sum: f64 = in_week().map(|v| v.value.unwrap_or(0.0)).sum();
                (sum, target, sum >= target)
            }
            WeeklyMode::Frequency => {
                let days: HashSet<DayKey> = in_week().map(|v| v.day_key).collect();
                let count = days.len() as f64;
                (count, target, count >= target)
            }
            WeeklyMode::Binary => {
                let any = in_week().next().is_some();
                (if any { 1.0 } else { 0.0 }, 1.0, any)
            }
        };

        let mut status = HabitCompletion::simple(current, target, done);
        status.week_complete = Some(done);
        status
    }

    fn checklist_bundle(&self, bundle: &Habit, day: DayKey, path: &mut HashSet<String>) -> HabitCompletion {
        let total = bundle.sub_habit_ids.len();
        path.insert(bundle.id.clone());

        let mut completed = 0;
        for child_id in &bundle.sub_habit_ids {
            if path.contains(child_id) {
                tracing::warn!(
                    bundle_id = %bundle.id,
                    child_id = %child_id,
                    "bundle cycle detected, treating child as incomplete"
                );
                continue;
            }
            let Some(child) = self.habits.get(child_id) else {
                tracing::warn!(bundle_id = %bundle.id, child_id = %child_id, "bundle child not found");
                continue;
            };
            if self.resolve(child, day, path).is_complete {
                completed += 1;
            }
        }

        path.remove(&bundle.id);

        let done = total > 0 && completed == total;
        let mut status = HabitCompletion::simple(completed as f64, total as f64, done);
        status.completed_children_count = Some(completed);
        status.total_children_count = Some(total);
        status
    }

    fn choice_bundle(&self, bundle: &Habit, day: DayKey) -> HabitCompletion {
        let chosen = self
            .entries
            .on_day(&bundle.id, day)
            .filter_map(|v| v.option_key.as_deref())
            .last();

        match chosen {
            Some(key) => {
                let mut status = HabitCompletion::simple(1.0, 1.0, true);
                status.selected_option = Some(SelectedOption {
                    key: key.to_string(),
                    label: bundle.option_label(key).map(str::to_string),
                });
                status
            }
            None => HabitCompletion::incomplete(),
        }
    }
}
