//! Goals linked to habits and their progress.

mod progress;
mod service;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use progress::{
    compute_goal_progress, units_match, GoalProgress, GoalWarning, ProgressPoint, INACTIVITY_THRESHOLD,
    RECENT_WINDOW_DAYS, TREND_WINDOW_DAYS,
};
pub use service::{GoalService, GoalWithProgress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    /// Accumulate a quantity (e.g. 100 miles)
    Cumulative,
    /// Show up a number of times
    Frequency,
    /// Done once, marked by hand
    Onetime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    Count,
    Sum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum CountMode {
    #[default]
    DistinctDays,
    Entries,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub goal_type: GoalType,
    #[serde(default)]
    pub target_value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub linked_habit_ids: Vec<String>,
    #[serde(default)]
    pub aggregation_mode: Option<AggregationMode>,
    #[serde(default)]
    pub count_mode: Option<CountMode>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sort_order: Option<i64>,
}

impl Goal {
    pub fn new(id: impl Into<String>, title: impl Into<String>, goal_type: GoalType) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            goal_type,
            target_value: None,
            unit: None,
            linked_habit_ids: Vec::new(),
            aggregation_mode: None,
            count_mode: None,
            completed_at: None,
            sort_order: None,
        }
    }

    pub fn with_target(mut self, target: f64) -> Self {
        self.target_value = Some(target);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn linked_to(mut self, habit_ids: &[&str]) -> Self {
        self.linked_habit_ids = habit_ids.iter().map(|h| h.to_string()).collect();
        self
    }

    /// Explicit mode, else `sum` for cumulative goals and `count` otherwise.
    pub fn aggregation_mode(&self) -> AggregationMode {
        self.aggregation_mode.unwrap_or(match self.goal_type {
            GoalType::Cumulative => AggregationMode::Sum,
            GoalType::Frequency | GoalType::Onetime => AggregationMode::Count,
        })
    }

    pub fn count_mode(&self) -> CountMode {
        self.count_mode.unwrap_or_default()
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// A hand-entered contribution to a cumulative goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalManualLog {
    pub id: String,
    pub goal_id: String,
    pub value: f64,
    pub logged_at: DateTime<Utc>,
}
