//! Database schema migrations for habitflow.
//!
//! Migrations are versioned and applied automatically when opening the store.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const CURRENT_SCHEMA_VERSION: i32 = 3;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| row.get::<_, i32>(0))
        .unwrap_or_else(|e| {
            if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
                tracing::warn!("failed to read schema_version: {}", e);
            }
            0
        })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: baseline tables.
///
/// Habits and goals are user-managed documents and are stored as JSON.
/// Entries keep the legacy `date`/`date_key` columns next to `day_key`.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS habits (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            data        TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS habit_entries (
            id            TEXT PRIMARY KEY,
            user_id       TEXT NOT NULL,
            habit_id      TEXT NOT NULL,
            timestamp_utc TEXT NOT NULL,
            day_key       TEXT,
            date          TEXT,
            date_key      TEXT,
            value         REAL,
            unit          TEXT,
            source        TEXT NOT NULL DEFAULT 'manual',
            routine_id    TEXT,
            deleted_at    TEXT
        );

        CREATE TABLE IF NOT EXISTS day_logs (
            user_id    TEXT NOT NULL,
            habit_id   TEXT NOT NULL,
            date       TEXT NOT NULL,
            value      REAL NOT NULL DEFAULT 0,
            completed  INTEGER NOT NULL DEFAULT 0,
            source     TEXT,
            PRIMARY KEY (user_id, habit_id, date)
        );

        CREATE TABLE IF NOT EXISTS goals (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            data        TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS goal_manual_logs (
            id         TEXT PRIMARY KEY,
            user_id    TEXT NOT NULL,
            goal_id    TEXT NOT NULL,
            value      REAL NOT NULL,
            logged_at  TEXT NOT NULL
        );",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: choice-bundle selections and lookup indexes.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "ALTER TABLE habit_entries ADD COLUMN option_key TEXT;

        CREATE INDEX IF NOT EXISTS idx_entries_user_habit ON habit_entries(user_id, habit_id);
        CREATE INDEX IF NOT EXISTS idx_entries_day_key ON habit_entries(day_key);
        CREATE INDEX IF NOT EXISTS idx_day_logs_user ON day_logs(user_id);
        CREATE INDEX IF NOT EXISTS idx_manual_logs_goal ON goal_manual_logs(user_id, goal_id);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}

/// Migration v3: habit and goal ids are unique per user, not globally.
///
/// SQLite cannot alter a primary key, so both tables are rebuilt with
/// insertion order kept.
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE habits_v3 (
            id          TEXT NOT NULL,
            user_id     TEXT NOT NULL,
            data        TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            PRIMARY KEY (user_id, id)
        );
        INSERT INTO habits_v3 (id, user_id, data, created_at)
            SELECT id, user_id, data, created_at FROM habits ORDER BY rowid;
        DROP TABLE habits;
        ALTER TABLE habits_v3 RENAME TO habits;

        CREATE TABLE goals_v3 (
            id          TEXT NOT NULL,
            user_id     TEXT NOT NULL,
            data        TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            PRIMARY KEY (user_id, id)
        );
        INSERT INTO goals_v3 (id, user_id, data, created_at)
            SELECT id, user_id, data, created_at FROM goals ORDER BY rowid;
        DROP TABLE goals;
        ALTER TABLE goals_v3 RENAME TO goals;",
    )?;
    set_schema_version(&tx, 3)?;
    tx.commit()?;
    Ok(())
}
