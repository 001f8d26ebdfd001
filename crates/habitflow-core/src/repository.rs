//! Storage collaborator traits.
//!
//! Every derivation reads through these; the workspace ships a SQLite
//! ([`crate::storage::HabitStore`]) and an in-memory
//! ([`crate::storage::MemoryStore`]) implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::entry::{DayLog, HabitEntry};
use crate::error::Result;
use crate::goal::{Goal, GoalManualLog};
use crate::habit::Habit;

#[async_trait]
pub trait HabitEntryRepository: Send + Sync {
    /// All entries for one habit, soft-deleted ones included.
    async fn habit_entries_by_habit(&self, habit_id: &str, user_id: &str) -> Result<Vec<HabitEntry>>;

    /// All entries for every habit of a user, soft-deleted ones included.
    async fn habit_entries_by_user(&self, user_id: &str) -> Result<Vec<HabitEntry>>;
}

/// Legacy per-day logs keyed by `"{habitId}-{date}"`.
#[async_trait]
pub trait DayLogRepository: Send + Sync {
    async fn day_logs_by_habit(&self, habit_id: &str, user_id: &str) -> Result<HashMap<String, DayLog>>;

    async fn day_logs_by_user(&self, user_id: &str) -> Result<HashMap<String, DayLog>>;
}

#[async_trait]
pub trait HabitRepository: Send + Sync {
    async fn habits_by_user(&self, user_id: &str) -> Result<Vec<Habit>>;
}

#[async_trait]
pub trait GoalRepository: Send + Sync {
    async fn goal_by_id(&self, goal_id: &str, user_id: &str) -> Result<Option<Goal>>;

    async fn goals_by_user(&self, user_id: &str) -> Result<Vec<Goal>>;
}

#[async_trait]
pub trait GoalManualLogRepository: Send + Sync {
    async fn manual_logs_by_goal(&self, goal_id: &str, user_id: &str) -> Result<Vec<GoalManualLog>>;

    async fn manual_logs_by_goals(&self, goal_ids: &[String], user_id: &str) -> Result<Vec<GoalManualLog>>;
}

/// Bundle of repository handles shared by the query services.
#[derive(Clone)]
pub struct Repositories {
    pub entries: Arc<dyn HabitEntryRepository>,
    pub day_logs: Arc<dyn DayLogRepository>,
    pub habits: Arc<dyn HabitRepository>,
    pub goals: Arc<dyn GoalRepository>,
    pub manual_logs: Arc<dyn GoalManualLogRepository>,
}

impl Repositories {
    /// Use one store for every collaborator.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: HabitEntryRepository
            + DayLogRepository
            + HabitRepository
            + GoalRepository
            + GoalManualLogRepository
            + 'static,
    {
        Self {
            entries: store.clone(),
            day_logs: store.clone(),
            habits: store.clone(),
            goals: store.clone(),
            manual_logs: store,
        }
    }
}
