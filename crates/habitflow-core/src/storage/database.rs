//! SQLite-backed habit store.
//!
//! Provides persistent storage for:
//! - Habits and goals (JSON documents per user)
//! - Canonical habit entries, soft deletes included
//! - Legacy day logs
//! - Manual goal logs
//!
//! Every repository trait is implemented here so one store backs all the
//! query services.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::migrations;
use super::Config;
use crate::entry::{DayLog, EntrySource, HabitEntry, Provenance};
use crate::error::{Result, StorageError};
use crate::goal::{Goal, GoalManualLog};
use crate::habit::Habit;
use crate::repository::{
    DayLogRepository, GoalManualLogRepository, GoalRepository, HabitEntryRepository, HabitRepository,
};

const ENTRY_COLUMNS: &str = "id, habit_id, timestamp_utc, day_key, date, date_key, value, unit, \
                             source, routine_id, deleted_at, option_key";

/// SQLite store for habits, entries, day logs and goals.
pub struct HabitStore {
    conn: Mutex<Connection>,
}

fn parse_instant(column: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            StorageError::CorruptColumn {
                column: column.to_string(),
                message: format!("'{raw}': {e}"),
            }
            .into()
        })
}

fn parse_document<T: serde::de::DeserializeOwned>(column: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| {
        StorageError::CorruptColumn {
            column: column.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

/// Raw `habit_entries` row before timestamp columns are decoded.
struct EntryRow {
    entry: HabitEntry,
    deleted_at: Option<String>,
}

fn entry_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryRow> {
    let source: String = row.get(8)?;
    Ok(EntryRow {
        entry: HabitEntry {
            id: row.get(0)?,
            habit_id: row.get(1)?,
            timestamp_utc: row.get(2)?,
            day_key: row.get(3)?,
            date: row.get(4)?,
            date_key: row.get(5)?,
            value: row.get(6)?,
            unit: row.get(7)?,
            source: EntrySource::from_raw(&source),
            provenance: Provenance {
                routine_id: row.get(9)?,
            },
            deleted_at: None,
            option_key: row.get(11)?,
        },
        deleted_at: row.get(10)?,
    })
}

fn finish_entries(rows: Vec<EntryRow>) -> Result<Vec<HabitEntry>> {
    rows.into_iter()
        .map(|EntryRow { mut entry, deleted_at }| {
            if let Some(raw) = deleted_at {
                entry.deleted_at = Some(parse_instant("deleted_at", &raw)?);
            }
            Ok(entry)
        })
        .collect()
}

fn day_log_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DayLog> {
    Ok(DayLog {
        habit_id: row.get(0)?,
        date: row.get(1)?,
        value: row.get(2)?,
        completed: row.get::<_, i64>(3)? != 0,
        source: row.get(4)?,
    })
}

fn keyed(logs: Vec<DayLog>) -> HashMap<String, DayLog> {
    logs.into_iter().map(|log| (log.map_key(), log)).collect()
}

impl HabitStore {
    /// Open the database configured in `config` under the data directory.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(config: &Config) -> Result<Self> {
        let path = config.database_path()?;
        Self::open_at(path)
    }

    /// Open (creating if needed) the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|source| StorageError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), "opened habit store");
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn).map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        tracing::info!(
            version = migrations::get_schema_version(&conn),
            "habit store schema ready"
        );
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Locked.into())
    }

    /// Insert or replace one of the user's habits. Ids are scoped per user.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn create_habit(&self, user_id: &str, habit: &Habit) -> Result<()> {
        let data = serde_json::to_string(habit)?;
        self.conn()?.execute(
            "INSERT INTO habits (id, user_id, data, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, id) DO UPDATE SET data = excluded.data",
            params![habit.id, user_id, data, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Record a habit entry.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn log_entry(&self, user_id: &str, entry: &HabitEntry) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO habit_entries (id, user_id, habit_id, timestamp_utc, day_key, date, date_key,
                                        value, unit, source, routine_id, deleted_at, option_key)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                entry.id,
                user_id,
                entry.habit_id,
                entry.timestamp_utc,
                entry.day_key,
                entry.date,
                entry.date_key,
                entry.value,
                entry.unit,
                entry.source.as_str(),
                entry.provenance.routine_id,
                entry.deleted_at.map(|at| at.to_rfc3339()),
                entry.option_key,
            ],
        )?;
        Ok(())
    }

    /// Mark an entry deleted at `at`. Returns `false` when no live entry matched.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub fn soft_delete_entry(&self, user_id: &str, entry_id: &str, at: DateTime<Utc>) -> Result<bool> {
        let changed = self.conn()?.execute(
            "UPDATE habit_entries SET deleted_at = ?1
             WHERE id = ?2 AND user_id = ?3 AND deleted_at IS NULL",
            params![at.to_rfc3339(), entry_id, user_id],
        )?;
        Ok(changed > 0)
    }

    /// Insert or replace one of the user's goals. Ids are scoped per user.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn create_goal(&self, user_id: &str, goal: &Goal) -> Result<()> {
        let data = serde_json::to_string(goal)?;
        self.conn()?.execute(
            "INSERT INTO goals (id, user_id, data, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, id) DO UPDATE SET data = excluded.data",
            params![goal.id, user_id, data, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Record a manual contribution to a goal.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn add_manual_log(&self, user_id: &str, log: &GoalManualLog) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO goal_manual_logs (id, user_id, goal_id, value, logged_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![log.id, user_id, log.goal_id, log.value, log.logged_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Write a legacy day log, replacing any existing row for the same day.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn import_day_log(&self, user_id: &str, log: &DayLog) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO day_logs (user_id, habit_id, date, value, completed, source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                log.habit_id,
                log.date,
                log.value,
                i64::from(log.completed),
                log.source
            ],
        )?;
        Ok(())
    }

    fn query_entries(&self, user_id: &str, habit_id: Option<&str>) -> Result<Vec<HabitEntry>> {
        let conn = self.conn()?;
        let rows = match habit_id {
            Some(habit_id) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM habit_entries
                     WHERE user_id = ?1 AND habit_id = ?2 ORDER BY rowid"
                ))?;
                let rows = stmt
                    .query_map(params![user_id, habit_id], entry_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM habit_entries WHERE user_id = ?1 ORDER BY rowid"
                ))?;
                let rows = stmt
                    .query_map(params![user_id], entry_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        finish_entries(rows)
    }

    fn query_day_logs(&self, user_id: &str, habit_id: Option<&str>) -> Result<HashMap<String, DayLog>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT habit_id, date, value, completed, source FROM day_logs
             WHERE user_id = ?1 AND (?2 IS NULL OR habit_id = ?2)",
        )?;
        let logs = stmt
            .query_map(params![user_id, habit_id], day_log_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keyed(logs))
    }

    fn query_habits(&self, user_id: &str) -> Result<Vec<Habit>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT data FROM habits WHERE user_id = ?1 ORDER BY rowid")?;
        let docs = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        docs.iter().map(|raw| parse_document("habits.data", raw)).collect()
    }

    fn query_goal(&self, user_id: &str, goal_id: &str) -> Result<Option<Goal>> {
        let conn = self.conn()?;
        let doc: Option<String> = conn
            .query_row(
                "SELECT data FROM goals WHERE user_id = ?1 AND id = ?2",
                params![user_id, goal_id],
                |row| row.get(0),
            )
            .optional()?;
        doc.map(|raw| parse_document("goals.data", &raw)).transpose()
    }

    fn query_goals(&self, user_id: &str) -> Result<Vec<Goal>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT data FROM goals WHERE user_id = ?1 ORDER BY rowid")?;
        let docs = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        docs.iter().map(|raw| parse_document("goals.data", raw)).collect()
    }

    fn query_manual_logs(&self, user_id: &str, goal_ids: &[String]) -> Result<Vec<GoalManualLog>> {
        if goal_ids.is_empty() {
            return Ok(Vec::new());
        }
        let unique: Vec<&String> = {
            let mut seen = HashSet::new();
            goal_ids.iter().filter(|id| seen.insert(id.as_str())).collect()
        };
        let placeholders = (0..unique.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT id, goal_id, value, logged_at FROM goal_manual_logs
             WHERE user_id = ?1 AND goal_id IN ({placeholders}) ORDER BY rowid"
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let bind = std::iter::once(user_id).chain(unique.iter().map(|id| id.as_str()));
        let rows = stmt
            .query_map(params_from_iter(bind), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, goal_id, value, logged_at)| {
                Ok(GoalManualLog {
                    id,
                    goal_id,
                    value,
                    logged_at: parse_instant("logged_at", &logged_at)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl HabitEntryRepository for HabitStore {
    async fn habit_entries_by_habit(&self, habit_id: &str, user_id: &str) -> Result<Vec<HabitEntry>> {
        self.query_entries(user_id, Some(habit_id))
    }

    async fn habit_entries_by_user(&self, user_id: &str) -> Result<Vec<HabitEntry>> {
        self.query_entries(user_id, None)
    }
}

#[async_trait]
impl DayLogRepository for HabitStore {
    async fn day_logs_by_habit(&self, habit_id: &str, user_id: &str) -> Result<HashMap<String, DayLog>> {
        self.query_day_logs(user_id, Some(habit_id))
    }

    async fn day_logs_by_user(&self, user_id: &str) -> Result<HashMap<String, DayLog>> {
        self.query_day_logs(user_id, None)
    }
}

#[async_trait]
impl HabitRepository for HabitStore {
    async fn habits_by_user(&self, user_id: &str) -> Result<Vec<Habit>> {
        self.query_habits(user_id)
    }
}

#[async_trait]
impl GoalRepository for HabitStore {
    async fn goal_by_id(&self, goal_id: &str, user_id: &str) -> Result<Option<Goal>> {
        self.query_goal(user_id, goal_id)
    }

    async fn goals_by_user(&self, user_id: &str) -> Result<Vec<Goal>> {
        self.query_goals(user_id)
    }
}

#[async_trait]
impl GoalManualLogRepository for HabitStore {
    async fn manual_logs_by_goal(&self, goal_id: &str, user_id: &str) -> Result<Vec<GoalManualLog>> {
        self.query_manual_logs(user_id, &[goal_id.to_string()])
    }

    async fn manual_logs_by_goals(&self, goal_ids: &[String], user_id: &str) -> Result<Vec<GoalManualLog>> {
        self.query_manual_logs(user_id, goal_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::day_key::DayKey;
    use crate::error::CoreError;
    use crate::goal::GoalType;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, h, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn entries_roundtrip_with_provenance() {
        let store = HabitStore::open_memory().unwrap();
        let day = DayKey::parse("2025-01-15").unwrap();
        let mut entry = HabitEntry::new("h1", day, at(8))
            .with_value(2.5)
            .with_unit("miles")
            .with_source(EntrySource::Routine);
        entry.provenance.routine_id = Some("r1".into());
        store.log_entry("u1", &entry).unwrap();
        store
            .log_entry("u1", &HabitEntry::new("h2", day, at(9)))
            .unwrap();
        store
            .log_entry("u2", &HabitEntry::new("h1", day, at(9)))
            .unwrap();

        let got = store.habit_entries_by_habit("h1", "u1").await.unwrap();
        assert_eq!(got, vec![entry]);
        assert_eq!(store.habit_entries_by_user("u1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn soft_delete_keeps_row() {
        let store = HabitStore::open_memory().unwrap();
        let entry = HabitEntry::new("h1", DayKey::parse("2025-01-15").unwrap(), at(8));
        store.log_entry("u1", &entry).unwrap();

        assert!(store.soft_delete_entry("u1", &entry.id, at(10)).unwrap());
        assert!(!store.soft_delete_entry("u1", &entry.id, at(11)).unwrap());
        assert!(!store.soft_delete_entry("u2", &entry.id, at(11)).unwrap());

        let got = store.habit_entries_by_habit("h1", "u1").await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].deleted_at, Some(at(10)));
    }

    #[tokio::test]
    async fn day_logs_are_keyed_by_habit_and_date() {
        let store = HabitStore::open_memory().unwrap();
        let log = DayLog {
            habit_id: "h1".into(),
            date: "2025-01-15".into(),
            value: 5.0,
            completed: true,
            source: Some("routine".into()),
        };
        store.import_day_log("u1", &log).unwrap();
        store
            .import_day_log(
                "u1",
                &DayLog {
                    habit_id: "h2".into(),
                    date: "2025-01-15".into(),
                    value: 0.0,
                    completed: true,
                    source: None,
                },
            )
            .unwrap();

        let by_habit = store.day_logs_by_habit("h1", "u1").await.unwrap();
        assert_eq!(by_habit.len(), 1);
        assert_eq!(by_habit.get("h1-2025-01-15"), Some(&log));
        assert_eq!(store.day_logs_by_user("u1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn habits_and_goals_are_scoped_by_user() {
        let store = HabitStore::open_memory().unwrap();
        store.create_habit("u1", &Habit::new("h1", "Run")).unwrap();
        store.create_habit("u2", &Habit::new("h2", "Swim")).unwrap();
        let goal = Goal::new("g1", "Miles", GoalType::Cumulative)
            .with_target(100.0)
            .linked_to(&["h1"]);
        store.create_goal("u1", &goal).unwrap();

        let habits = store.habits_by_user("u1").await.unwrap();
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].name, "Run");
        assert_eq!(store.goal_by_id("g1", "u1").await.unwrap(), Some(goal));
        assert_eq!(store.goal_by_id("g1", "u2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn same_id_in_two_users_stays_separate() {
        let store = HabitStore::open_memory().unwrap();
        store.create_habit("alice", &Habit::new("h1", "Alice habit")).unwrap();
        store.create_habit("bob", &Habit::new("h1", "Bob habit")).unwrap();
        let goal = |title: &str| Goal::new("g1", title, GoalType::Cumulative).with_target(10.0);
        store.create_goal("alice", &goal("Alice goal")).unwrap();
        store.create_goal("bob", &goal("Bob goal")).unwrap();

        let names = |habits: Vec<Habit>| habits.into_iter().map(|h| h.name).collect::<Vec<_>>();
        assert_eq!(names(store.habits_by_user("alice").await.unwrap()), vec!["Alice habit"]);
        assert_eq!(names(store.habits_by_user("bob").await.unwrap()), vec!["Bob habit"]);
        assert_eq!(store.goal_by_id("g1", "alice").await.unwrap(), Some(goal("Alice goal")));
        assert_eq!(store.goal_by_id("g1", "bob").await.unwrap(), Some(goal("Bob goal")));

        // same user, same id still updates in place
        store.create_habit("alice", &Habit::new("h1", "Renamed")).unwrap();
        assert_eq!(names(store.habits_by_user("alice").await.unwrap()), vec!["Renamed"]);
    }

    #[tokio::test]
    async fn manual_logs_batch_by_goal_ids() {
        let store = HabitStore::open_memory().unwrap();
        for (id, goal) in [("m1", "g1"), ("m2", "g2"), ("m3", "g3")] {
            store
                .add_manual_log(
                    "u1",
                    &GoalManualLog {
                        id: id.into(),
                        goal_id: goal.into(),
                        value: 1.0,
                        logged_at: at(8),
                    },
                )
                .unwrap();
        }

        let logs = store
            .manual_logs_by_goals(&["g1".into(), "g3".into(), "g1".into()], "u1")
            .await
            .unwrap();
        let ids: Vec<_> = logs.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m3"]);
        assert!(store.manual_logs_by_goals(&[], "u1").await.unwrap().is_empty());
        assert_eq!(store.manual_logs_by_goal("g2", "u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn corrupt_deleted_at_is_reported() {
        let store = HabitStore::open_memory().unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO habit_entries (id, user_id, habit_id, timestamp_utc, deleted_at)
                 VALUES ('e1', 'u1', 'h1', '2025-01-15T08:00:00Z', 'yesterday')",
                [],
            )
            .unwrap();

        let err = store.habit_entries_by_user("u1").await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Storage(StorageError::CorruptColumn { ref column, .. }) if column == "deleted_at"
        ));
    }
}
