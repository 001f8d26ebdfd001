//! Property tests for entry/day-log reconciliation.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use habitflow_core::truth::reconcile;
use habitflow_core::{DayKey, DayLog, EntrySource, HabitEntry, Provenance};
use proptest::prelude::*;

const HABITS: [&str; 3] = ["h1", "h2", "h3"];

fn day_key(offset: u32) -> DayKey {
    let base = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    DayKey::from_date(base + chrono::Duration::days(i64::from(offset)))
}

fn arb_entry() -> impl Strategy<Value = HabitEntry> {
    (0usize..3, 0u32..14, 0u32..24, prop::option::of(0u8..20), any::<u32>()).prop_map(
        |(habit, offset, hour, value, id)| {
            let key = day_key(offset);
            HabitEntry {
                id: format!("e{id}"),
                habit_id: HABITS[habit].to_string(),
                timestamp_utc: key
                    .date()
                    .and_hms_opt(hour, 0, 0)
                    .unwrap()
                    .and_utc()
                    .to_rfc3339(),
                day_key: Some(key.to_string()),
                date: None,
                date_key: None,
                value: value.map(f64::from),
                unit: None,
                source: EntrySource::Manual,
                provenance: Provenance::default(),
                deleted_at: None,
                option_key: None,
            }
        },
    )
}

fn arb_day_logs() -> impl Strategy<Value = HashMap<String, DayLog>> {
    prop::collection::vec((0usize..3, 0u32..14, 0u8..5, any::<bool>()), 0..20).prop_map(|rows| {
        rows.into_iter()
            .map(|(habit, offset, value, completed)| {
                let log = DayLog {
                    habit_id: HABITS[habit].to_string(),
                    date: day_key(offset).to_string(),
                    value: f64::from(value),
                    completed,
                    source: None,
                };
                (log.map_key(), log)
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn output_is_sorted_by_day_then_time(
        entries in prop::collection::vec(arb_entry(), 0..30),
        logs in arb_day_logs(),
    ) {
        let views = reconcile(&entries, Some(&logs), chrono_tz::UTC, None, None).unwrap();
        for pair in views.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!((a.day_key, a.timestamp_utc) <= (b.day_key, b.timestamp_utc));
        }
    }

    #[test]
    fn reconcile_is_idempotent(
        entries in prop::collection::vec(arb_entry(), 0..30),
        logs in arb_day_logs(),
    ) {
        let first = reconcile(&entries, Some(&logs), chrono_tz::UTC, None, None).unwrap();
        let second = reconcile(&entries, Some(&logs), chrono_tz::UTC, None, None).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn every_entry_kept_and_legacy_only_fills_gaps(
        entries in prop::collection::vec(arb_entry(), 0..30),
        logs in arb_day_logs(),
    ) {
        let views = reconcile(&entries, Some(&logs), chrono_tz::UTC, None, None).unwrap();

        let entry_days: HashSet<(String, DayKey)> = views
            .iter()
            .filter(|v| !v.is_legacy())
            .map(|v| (v.habit_id.clone(), v.day_key))
            .collect();
        let legacy: Vec<_> = views.iter().filter(|v| v.is_legacy()).collect();

        prop_assert_eq!(views.len() - legacy.len(), entries.len());
        for view in &legacy {
            prop_assert!(!entry_days.contains(&(view.habit_id.clone(), view.day_key)));
        }

        let legacy_days: HashSet<(String, DayKey)> =
            legacy.iter().map(|v| (v.habit_id.clone(), v.day_key)).collect();
        prop_assert_eq!(legacy_days.len(), legacy.len());
    }

    #[test]
    fn range_filter_keeps_only_days_inside(
        entries in prop::collection::vec(arb_entry(), 0..30),
        logs in arb_day_logs(),
        lo in 0u32..14,
        span in 0u32..7,
    ) {
        let (start, end) = (day_key(lo), day_key(lo + span));
        let views = reconcile(&entries, Some(&logs), chrono_tz::UTC, Some(start), Some(end)).unwrap();
        prop_assert!(views.iter().all(|v| v.day_key >= start && v.day_key <= end));
    }
}
