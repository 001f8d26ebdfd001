pub mod config;
pub mod day;
pub mod entry;
pub mod goal;
pub mod habit;
pub mod momentum;
pub mod streak;

use std::error::Error;
use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use habitflow_core::repository::Repositories;
use habitflow_core::{Config, DayKey, HabitStore};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn Error>>;

/// Loaded config, open store and resolved timezone for one invocation.
pub struct Session {
    pub config: Config,
    pub store: Arc<HabitStore>,
    pub tz: Tz,
}

impl Session {
    /// Fails when neither `--tz` nor the config names a timezone.
    pub fn open(tz_override: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let config = Config::load()?;
        let tz = config.resolve_timezone(tz_override)?;
        let store = Arc::new(HabitStore::open(&config)?);
        tracing::debug!(user_id = %config.user_id, tz = %tz, "session opened");
        Ok(Self { config, store, tz })
    }

    pub fn user_id(&self) -> &str {
        &self.config.user_id
    }

    pub fn repos(&self) -> Repositories {
        Repositories::from_store(self.store.clone())
    }

    pub fn include_legacy_fallback(&self) -> bool {
        self.config.truth.include_legacy_fallback
    }

    /// Parse `--date`, defaulting to today in the session timezone.
    pub fn day_or_today(&self, date: Option<&str>) -> Result<DayKey, Box<dyn Error>> {
        match date {
            Some(raw) => Ok(DayKey::parse(raw)?),
            None => Ok(DayKey::from_instant(Utc::now(), self.tz)),
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Split a comma-separated flag value, dropping empty items.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
