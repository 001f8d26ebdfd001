//! Truth query: the canonical EntryView read path.
//!
//! ## Usage
//! ```rust,ignore
//! let truth = TruthQuery::new(repos.entries.clone(), repos.day_logs.clone());
//! let opts = EntryViewOptions::new(chrono_tz::Europe::Berlin)
//!     .with_range(Some(start), Some(end));
//! let views = truth.entry_views_for_habit("h1", "user-1", &opts).await?;
//! ```

pub mod merge;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono_tz::Tz;

use crate::day_key::DayKey;
use crate::entry::{DayLog, EntryView, HabitEntry};
use crate::error::Result;
use crate::repository::{DayLogRepository, HabitEntryRepository, Repositories};

pub use merge::{day_log_to_view, detect_conflict, entry_to_view, merge_views, reconcile, sort_views};

/// Scope and behavior of an entry-view query.
///
/// There is no default timezone; callers always name one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryViewOptions {
    pub start_day_key: Option<DayKey>,
    pub end_day_key: Option<DayKey>,
    pub time_zone: Tz,
    /// When false, legacy day logs are neither fetched nor merged.
    pub include_legacy_fallback: bool,
}

impl EntryViewOptions {
    pub fn new(time_zone: Tz) -> Self {
        Self {
            start_day_key: None,
            end_day_key: None,
            time_zone,
            include_legacy_fallback: true,
        }
    }

    pub fn with_range(mut self, start: Option<DayKey>, end: Option<DayKey>) -> Self {
        self.start_day_key = start;
        self.end_day_key = end;
        self
    }

    pub fn with_legacy_fallback(mut self, include: bool) -> Self {
        self.include_legacy_fallback = include;
        self
    }
}

/// Reads entries and legacy logs and reconciles them into EntryViews.
#[derive(Clone)]
pub struct TruthQuery {
    entries: Arc<dyn HabitEntryRepository>,
    day_logs: Arc<dyn DayLogRepository>,
}

impl TruthQuery {
    pub fn new(entries: Arc<dyn HabitEntryRepository>, day_logs: Arc<dyn DayLogRepository>) -> Self {
        Self { entries, day_logs }
    }

    pub fn from_repositories(repos: &Repositories) -> Self {
        Self::new(repos.entries.clone(), repos.day_logs.clone())
    }

    /// EntryViews of a single habit.
    pub async fn entry_views_for_habit(
        &self,
        habit_id: &str,
        user_id: &str,
        opts: &EntryViewOptions,
    ) -> Result<Vec<EntryView>> {
        let (entries, logs) = if opts.include_legacy_fallback {
            let (entries, logs) = tokio::try_join!(
                self.entries.habit_entries_by_habit(habit_id, user_id),
                self.day_logs.day_logs_by_habit(habit_id, user_id),
            )?;
            (entries, Some(logs))
        } else {
            (self.entries.habit_entries_by_habit(habit_id, user_id).await?, None)
        };

        let views = reconcile(
            &entries,
            logs.as_ref(),
            opts.time_zone,
            opts.start_day_key,
            opts.end_day_key,
        )?;
        Ok(views)
    }

    /// EntryViews of several habits from one user-wide fetch.
    pub async fn entry_views_for_habits(
        &self,
        habit_ids: &[String],
        user_id: &str,
        opts: &EntryViewOptions,
    ) -> Result<Vec<EntryView>> {
        let wanted: HashSet<&str> = habit_ids.iter().map(String::as_str).collect();
        let (entries, logs) = self.fetch_user_rows(user_id, opts.include_legacy_fallback).await?;

        let entries: Vec<HabitEntry> = entries
            .into_iter()
            .filter(|e| wanted.contains(e.habit_id.as_str()))
            .collect();
        let logs = logs.map(|logs| {
            logs.into_iter()
                .filter(|(_, log)| wanted.contains(log.habit_id.as_str()))
                .collect::<HashMap<_, _>>()
        });

        let views = reconcile(
            &entries,
            logs.as_ref(),
            opts.time_zone,
            opts.start_day_key,
            opts.end_day_key,
        )?;
        Ok(views)
    }

    /// EntryViews of every habit a user has logged against.
    pub async fn entry_views_for_user(&self, user_id: &str, opts: &EntryViewOptions) -> Result<Vec<EntryView>> {
        let (entries, logs) = self.fetch_user_rows(user_id, opts.include_legacy_fallback).await?;
        let views = reconcile(
            &entries,
            logs.as_ref(),
            opts.time_zone,
            opts.start_day_key,
            opts.end_day_key,
        )?;
        Ok(views)
    }

    async fn fetch_user_rows(
        &self,
        user_id: &str,
        include_legacy: bool,
    ) -> Result<(Vec<HabitEntry>, Option<HashMap<String, DayLog>>)> {
        if include_legacy {
            let (entries, logs) = tokio::try_join!(
                self.entries.habit_entries_by_user(user_id),
                self.day_logs.day_logs_by_user(user_id),
            )?;
            Ok((entries, Some(logs)))
        } else {
            Ok((self.entries.habit_entries_by_user(user_id).await?, None))
        }
    }
}
