//! Activity records: canonical entries, legacy day logs and the merged view.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::day_key::DayKey;

/// Where a logged contribution came from.
///
/// Stored data types this loosely as a string; unknown values collapse to
/// [`EntrySource::Manual`] with a warning instead of leaking an open string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    #[default]
    Manual,
    Routine,
    Quick,
    Import,
    Legacy,
    Test,
}

impl EntrySource {
    /// Map a stored source string onto the closed set.
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "manual" => EntrySource::Manual,
            "routine" => EntrySource::Routine,
            "quick" => EntrySource::Quick,
            "import" => EntrySource::Import,
            "legacy" => EntrySource::Legacy,
            "test" => EntrySource::Test,
            other => {
                tracing::warn!(source = other, "unknown entry source, treating as manual");
                EntrySource::Manual
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntrySource::Manual => "manual",
            EntrySource::Routine => "routine",
            EntrySource::Quick => "quick",
            EntrySource::Import => "import",
            EntrySource::Legacy => "legacy",
            EntrySource::Test => "test",
        }
    }
}

impl fmt::Display for EntrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EntrySource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(EntrySource::from_raw(&raw))
    }
}

/// Origin details for an entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routine_id: Option<String>,
}

/// A canonical per-event log record.
///
/// Older rows may carry `date` or `dateKey` instead of `dayKey`; the merge
/// resolves whichever is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitEntry {
    pub id: String,
    pub habit_id: String,
    pub timestamp_utc: String,
    #[serde(default)]
    pub day_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_key: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub source: EntrySource,
    #[serde(default)]
    pub provenance: Provenance,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Chosen option for a choice bundle.
    #[serde(default, alias = "bundleOptionId")]
    pub option_key: Option<String>,
}

impl HabitEntry {
    /// A fresh manual entry stamped at `at`.
    pub fn new(habit_id: impl Into<String>, day_key: DayKey, at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            habit_id: habit_id.into(),
            timestamp_utc: at.to_rfc3339(),
            day_key: Some(day_key.to_string()),
            date: None,
            date_key: None,
            value: None,
            unit: None,
            source: EntrySource::Manual,
            provenance: Provenance::default(),
            deleted_at: None,
            option_key: None,
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_source(mut self, source: EntrySource) -> Self {
        self.source = source;
        self
    }

    pub fn with_option(mut self, option_key: impl Into<String>) -> Self {
        self.option_key = Some(option_key.into());
        self
    }
}

/// Deprecated one-row-per-day completion record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayLog {
    pub habit_id: String,
    pub date: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub source: Option<String>,
}

impl DayLog {
    /// Key used by day-log repositories: `"{habitId}-{date}"`.
    pub fn map_key(&self) -> String {
        format!("{}-{}", self.habit_id, self.date)
    }
}

/// Merged, conflict-annotated read model of one contribution to a habit.
///
/// This is the only record shape downstream derivations read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryView {
    /// Backing entry id; `None` for views synthesized from a day log.
    pub entry_id: Option<String>,
    pub habit_id: String,
    pub day_key: DayKey,
    pub timestamp_utc: DateTime<Utc>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub source: EntrySource,
    pub provenance: Provenance,
    pub deleted_at: Option<DateTime<Utc>>,
    pub conflict: bool,
    pub legacy_value: Option<f64>,
    pub option_key: Option<String>,
}

impl EntryView {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_legacy(&self) -> bool {
        self.entry_id.is_none()
    }
}
