//! Pure reconciliation of canonical entries and legacy day logs.
//!
//! Entries are never dropped or deduplicated against each other. A legacy log
//! only becomes a view of its own when no entry exists for its
//! (habit, day); otherwise it annotates that day's entries.

use std::collections::HashMap;

use chrono_tz::Tz;

use crate::day_key::{parse_utc_instant, DayKey};
use crate::entry::{DayLog, EntrySource, EntryView, HabitEntry};
use crate::error::IntegrityError;

/// Build the view of a canonical entry.
///
/// Day resolution order: `dayKey`, `date`, `dateKey`, then the timestamp
/// projected through `tz`.
pub fn entry_to_view(entry: &HabitEntry, tz: Tz) -> Result<EntryView, IntegrityError> {
    let instant = parse_utc_instant(&entry.timestamp_utc);
    let day_key = resolve_entry_day(entry, instant, tz)?;

    let timestamp_utc = match instant {
        Some(ts) => ts,
        None => {
            tracing::warn!(
                entry_id = %entry.id,
                timestamp = %entry.timestamp_utc,
                "unparseable entry timestamp, ordering at noon of its day"
            );
            day_key.noon_utc()
        }
    };

    Ok(EntryView {
        entry_id: Some(entry.id.clone()),
        habit_id: entry.habit_id.clone(),
        day_key,
        timestamp_utc,
        value: entry.value,
        unit: entry.unit.clone(),
        source: entry.source,
        provenance: entry.provenance.clone(),
        deleted_at: entry.deleted_at,
        conflict: false,
        legacy_value: None,
        option_key: entry.option_key.clone(),
    })
}

fn resolve_entry_day(
    entry: &HabitEntry,
    instant: Option<chrono::DateTime<chrono::Utc>>,
    tz: Tz,
) -> Result<DayKey, IntegrityError> {
    let candidates = [
        ("dayKey", entry.day_key.as_deref()),
        ("date", entry.date.as_deref()),
        ("dateKey", entry.date_key.as_deref()),
    ];

    for (field, raw) in candidates {
        let Some(raw) = raw else { continue };
        match DayKey::parse(raw) {
            Ok(key) => return Ok(key),
            Err(_) => tracing::warn!(
                entry_id = %entry.id,
                field,
                value = raw,
                "ignoring malformed day field on entry"
            ),
        }
    }

    match instant {
        Some(ts) => {
            let key = DayKey::from_instant(ts, tz);
            tracing::warn!(
                entry_id = %entry.id,
                day_key = %key,
                "entry has no day key, derived from timestamp"
            );
            Ok(key)
        }
        None => Err(IntegrityError::UnresolvableEntryDay {
            entry_id: entry.id.clone(),
            timestamp: entry.timestamp_utc.clone(),
        }),
    }
}

/// Build the synthetic view of a legacy day log.
///
/// A completed log with value `0` is a pure boolean completion: its view
/// value is `None` while `legacy_value` keeps the `0` for conflict checks.
pub fn day_log_to_view(log: &DayLog) -> Result<EntryView, IntegrityError> {
    let day_key = DayKey::parse(&log.date).map_err(|_| IntegrityError::InvalidLegacyDate {
        habit_id: log.habit_id.clone(),
        date: log.date.clone(),
    })?;

    let (value, legacy_value) = if log.completed && log.value == 0.0 {
        (None, Some(0.0))
    } else {
        (Some(log.value), None)
    };

    let source = match log.source.as_deref() {
        Some("routine") => EntrySource::Routine,
        _ => EntrySource::Legacy,
    };

    Ok(EntryView {
        entry_id: None,
        habit_id: log.habit_id.clone(),
        day_key,
        timestamp_utc: day_key.noon_utc(),
        value,
        unit: None,
        source,
        provenance: Default::default(),
        deleted_at: None,
        conflict: false,
        legacy_value,
        option_key: None,
    })
}

/// Whether a legacy view contradicts an entry view for the same day.
pub fn detect_conflict(entry: &EntryView, legacy: &EntryView) -> bool {
    match (entry.value, legacy.value) {
        (Some(a), Some(b)) => a != b,
        (Some(a), None) => legacy.legacy_value.is_some_and(|original| original != a),
        (None, Some(_)) => true,
        (None, None) => false,
    }
}

/// Fold legacy views into entry views.
pub fn merge_views(mut entry_views: Vec<EntryView>, legacy_views: Vec<EntryView>) -> Vec<EntryView> {
    let mut by_day: HashMap<(String, DayKey), Vec<usize>> = HashMap::new();
    for (idx, view) in entry_views.iter().enumerate() {
        by_day
            .entry((view.habit_id.clone(), view.day_key))
            .or_default()
            .push(idx);
    }

    let mut appended = Vec::new();
    for legacy in legacy_views {
        match by_day.get(&(legacy.habit_id.clone(), legacy.day_key)) {
            None => appended.push(legacy),
            Some(indices) => {
                for &idx in indices {
                    let view = &mut entry_views[idx];
                    if detect_conflict(view, &legacy) {
                        tracing::debug!(
                            habit_id = %view.habit_id,
                            day_key = %view.day_key,
                            "entry conflicts with legacy day log"
                        );
                        view.conflict = true;
                        view.legacy_value = legacy.legacy_value.or(legacy.value);
                    }
                }
            }
        }
    }

    entry_views.extend(appended);
    entry_views
}

/// Ascending by day, then timestamp, then habit id. Stable for full ties.
pub fn sort_views(views: &mut [EntryView]) {
    views.sort_by(|a, b| {
        a.day_key
            .cmp(&b.day_key)
            .then(a.timestamp_utc.cmp(&b.timestamp_utc))
            .then_with(|| a.habit_id.cmp(&b.habit_id))
    });
}

/// Full reconciliation over fetched rows.
///
/// `day_logs` is `None` when legacy fallback is disabled.
pub fn reconcile(
    entries: &[HabitEntry],
    day_logs: Option<&HashMap<String, DayLog>>,
    tz: Tz,
    start: Option<DayKey>,
    end: Option<DayKey>,
) -> Result<Vec<EntryView>, IntegrityError> {
    let entry_views = entries
        .iter()
        .map(|e| entry_to_view(e, tz))
        .collect::<Result<Vec<_>, _>>()?;

    let mut views = match day_logs {
        Some(logs) => {
            let mut keyed: Vec<(&String, &DayLog)> = logs.iter().collect();
            keyed.sort_by(|a, b| a.0.cmp(b.0));
            let legacy_views = keyed
                .into_iter()
                .map(|(_, log)| day_log_to_view(log))
                .collect::<Result<Vec<_>, _>>()?;
            merge_views(entry_views, legacy_views)
        }
        None => entry_views,
    };

    views.retain(|v| v.day_key.within(start, end));
    sort_views(&mut views);
    Ok(views)
}
