//! In-memory store implementing every repository trait.
//!
//! Used by tests and by embedders that keep their own persistence. Each
//! repository call bumps a fetch counter so batching can be asserted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::entry::{DayLog, HabitEntry};
use crate::error::{Result, StorageError};
use crate::goal::{Goal, GoalManualLog};
use crate::habit::Habit;
use crate::repository::{
    DayLogRepository, GoalManualLogRepository, GoalRepository, HabitEntryRepository, HabitRepository,
};

#[derive(Default)]
struct UserData {
    habits: Vec<Habit>,
    entries: Vec<HabitEntry>,
    day_logs: HashMap<String, DayLog>,
    goals: Vec<Goal>,
    manual_logs: Vec<GoalManualLog>,
}

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, UserData>>,
    fetches: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of repository reads served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn reset_fetch_count(&self) {
        self.fetches.store(0, Ordering::SeqCst);
    }

    fn write<T>(&self, user_id: &str, f: impl FnOnce(&mut UserData) -> T) -> Result<T> {
        let mut users = self.users.write().map_err(|_| StorageError::Locked)?;
        Ok(f(users.entry(user_id.to_string()).or_default()))
    }

    fn read<T: Default>(&self, user_id: &str, f: impl FnOnce(&UserData) -> T) -> Result<T> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let users = self.users.read().map_err(|_| StorageError::Locked)?;
        Ok(users.get(user_id).map(f).unwrap_or_default())
    }

    /// Insert a habit, replacing one with the same id.
    pub fn insert_habit(&self, user_id: &str, habit: Habit) -> Result<()> {
        self.write(user_id, |data| {
            data.habits.retain(|h| h.id != habit.id);
            data.habits.push(habit);
        })
    }

    pub fn insert_entry(&self, user_id: &str, entry: HabitEntry) -> Result<()> {
        self.write(user_id, |data| data.entries.push(entry))
    }

    /// Insert a legacy day log under its `"{habitId}-{date}"` key.
    pub fn insert_day_log(&self, user_id: &str, log: DayLog) -> Result<()> {
        self.write(user_id, |data| {
            data.day_logs.insert(log.map_key(), log);
        })
    }

    /// Insert a goal, replacing one with the same id.
    pub fn insert_goal(&self, user_id: &str, goal: Goal) -> Result<()> {
        self.write(user_id, |data| {
            data.goals.retain(|g| g.id != goal.id);
            data.goals.push(goal);
        })
    }

    pub fn insert_manual_log(&self, user_id: &str, log: GoalManualLog) -> Result<()> {
        self.write(user_id, |data| data.manual_logs.push(log))
    }
}

#[async_trait]
impl HabitEntryRepository for MemoryStore {
    async fn habit_entries_by_habit(&self, habit_id: &str, user_id: &str) -> Result<Vec<HabitEntry>> {
        self.read(user_id, |data| {
            data.entries
                .iter()
                .filter(|e| e.habit_id == habit_id)
                .cloned()
                .collect()
        })
    }

    async fn habit_entries_by_user(&self, user_id: &str) -> Result<Vec<HabitEntry>> {
        self.read(user_id, |data| data.entries.clone())
    }
}

#[async_trait]
impl DayLogRepository for MemoryStore {
    async fn day_logs_by_habit(&self, habit_id: &str, user_id: &str) -> Result<HashMap<String, DayLog>> {
        self.read(user_id, |data| {
            data.day_logs
                .iter()
                .filter(|(_, log)| log.habit_id == habit_id)
                .map(|(key, log)| (key.clone(), log.clone()))
                .collect()
        })
    }

    async fn day_logs_by_user(&self, user_id: &str) -> Result<HashMap<String, DayLog>> {
        self.read(user_id, |data| data.day_logs.clone())
    }
}

#[async_trait]
impl HabitRepository for MemoryStore {
    async fn habits_by_user(&self, user_id: &str) -> Result<Vec<Habit>> {
        self.read(user_id, |data| data.habits.clone())
    }
}

#[async_trait]
impl GoalRepository for MemoryStore {
    async fn goal_by_id(&self, goal_id: &str, user_id: &str) -> Result<Option<Goal>> {
        self.read(user_id, |data| data.goals.iter().find(|g| g.id == goal_id).cloned())
    }

    async fn goals_by_user(&self, user_id: &str) -> Result<Vec<Goal>> {
        self.read(user_id, |data| data.goals.clone())
    }
}

#[async_trait]
impl GoalManualLogRepository for MemoryStore {
    async fn manual_logs_by_goal(&self, goal_id: &str, user_id: &str) -> Result<Vec<GoalManualLog>> {
        self.read(user_id, |data| {
            data.manual_logs
                .iter()
                .filter(|l| l.goal_id == goal_id)
                .cloned()
                .collect()
        })
    }

    async fn manual_logs_by_goals(&self, goal_ids: &[String], user_id: &str) -> Result<Vec<GoalManualLog>> {
        self.read(user_id, |data| {
            data.manual_logs
                .iter()
                .filter(|l| goal_ids.contains(&l.goal_id))
                .cloned()
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::day_key::DayKey;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn reads_are_scoped_and_counted() {
        let store = MemoryStore::new();
        let day = DayKey::parse("2025-01-15").unwrap();
        let at = Utc.with_ymd_and_hms(2025, 1, 15, 8, 0, 0).unwrap();
        store.insert_entry("u1", HabitEntry::new("h1", day, at)).unwrap();
        store.insert_entry("u1", HabitEntry::new("h2", day, at)).unwrap();
        store.insert_entry("u2", HabitEntry::new("h1", day, at)).unwrap();

        assert_eq!(store.habit_entries_by_habit("h1", "u1").await.unwrap().len(), 1);
        assert_eq!(store.habit_entries_by_user("u1").await.unwrap().len(), 2);
        assert!(store.habit_entries_by_user("nobody").await.unwrap().is_empty());
        assert_eq!(store.fetch_count(), 3);

        store.reset_fetch_count();
        assert_eq!(store.fetch_count(), 0);
    }

    #[tokio::test]
    async fn insert_habit_replaces_same_id() {
        let store = MemoryStore::new();
        store.insert_habit("u1", Habit::new("h1", "Run")).unwrap();
        store.insert_habit("u1", Habit::new("h1", "Run far")).unwrap();
        let habits = store.habits_by_user("u1").await.unwrap();
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].name, "Run far");
    }
}
