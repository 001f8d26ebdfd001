//! Habit definitions and the id-indexed habit arena.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Value shape of a habit's own goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GoalValueType {
    #[default]
    Boolean,
    Number,
}

/// How often a habit is meant to be done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Total,
}

/// Tracking type of a habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitType {
    Boolean,
    Number,
    Time,
    Bundle,
}

/// Completion semantics of a bundle habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BundleType {
    /// Children are ticked off individually
    #[default]
    Checklist,
    /// One option is chosen per day
    Choice,
}

/// A selectable option of a choice bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleOption {
    #[serde(alias = "id")]
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HabitGoal {
    #[serde(rename = "type", default)]
    pub goal_type: GoalValueType,
    #[serde(default)]
    pub target: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub frequency: Frequency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    #[serde(default)]
    pub category_id: String,
    pub name: String,
    #[serde(default)]
    pub goal: HabitGoal,
    #[serde(default)]
    pub archived: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub habit_type: Option<HabitType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_habit_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_type: Option<BundleType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bundle_options: Vec<BundleOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_target: Option<f64>,
}

impl Habit {
    /// A plain daily yes/no habit.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category_id: String::new(),
            name: name.into(),
            goal: HabitGoal::default(),
            archived: false,
            habit_type: None,
            sub_habit_ids: Vec::new(),
            bundle_type: None,
            bundle_options: Vec::new(),
            weekly_target: None,
        }
    }

    pub fn in_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = category_id.into();
        self
    }

    pub fn weekly(mut self, target: f64) -> Self {
        self.goal.frequency = Frequency::Weekly;
        self.weekly_target = Some(target);
        self
    }

    pub fn numeric(mut self, target: Option<f64>, unit: Option<&str>) -> Self {
        self.goal.goal_type = GoalValueType::Number;
        self.goal.target = target;
        self.goal.unit = unit.map(str::to_string);
        self.habit_type = Some(HabitType::Number);
        self
    }

    pub fn checklist(mut self, children: &[&str]) -> Self {
        self.habit_type = Some(HabitType::Bundle);
        self.bundle_type = Some(BundleType::Checklist);
        self.sub_habit_ids = children.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn choice(mut self, options: &[(&str, &str)]) -> Self {
        self.habit_type = Some(HabitType::Bundle);
        self.bundle_type = Some(BundleType::Choice);
        self.bundle_options = options
            .iter()
            .map(|(key, label)| BundleOption {
                key: key.to_string(),
                label: label.to_string(),
            })
            .collect();
        self
    }

    pub fn is_bundle(&self) -> bool {
        self.habit_type == Some(HabitType::Bundle)
    }

    pub fn is_choice_bundle(&self) -> bool {
        self.is_bundle() && self.bundle_type == Some(BundleType::Choice)
    }

    pub fn is_weekly(&self) -> bool {
        self.goal.frequency == Frequency::Weekly
    }

    /// Weekly target, defaulting to once a week.
    pub fn weekly_target(&self) -> f64 {
        self.weekly_target.or(self.goal.target).unwrap_or(1.0)
    }

    pub fn option_label(&self, key: &str) -> Option<&str> {
        self.bundle_options
            .iter()
            .find(|o| o.key == key)
            .map(|o| o.label.as_str())
    }
}

/// Habits indexed by id.
#[derive(Debug, Clone, Default)]
pub struct HabitIndex {
    by_id: HashMap<String, Habit>,
}

impl HabitIndex {
    pub fn new(habits: impl IntoIterator<Item = Habit>) -> Self {
        Self {
            by_id: habits.into_iter().map(|h| (h.id.clone(), h)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Habit> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Habit> {
        self.by_id.values()
    }

    /// Replace bundle ids with their (transitive) children.
    ///
    /// Order follows first appearance; each id is emitted once. Unknown ids
    /// pass through untouched since entries may still reference them.
    pub fn expand_linked(&self, ids: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for id in ids {
            self.expand_into(id, &mut seen, &mut out);
        }
        out
    }

    fn expand_into(&self, id: &str, seen: &mut HashSet<String>, out: &mut Vec<String>) {
        if !seen.insert(id.to_string()) {
            return;
        }
        match self.get(id) {
            Some(habit) if habit.is_bundle() => {
                for child in &habit.sub_habit_ids {
                    self.expand_into(child, seen, out);
                }
            }
            _ => out.push(id.to_string()),
        }
    }
}
