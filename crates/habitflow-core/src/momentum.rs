//! Momentum: a qualitative read of recent consistency.
//!
//! Counts distinct active days over a trailing window of completion logs and
//! maps the count onto a state. The reference day and phrase selection are
//! always passed in, so the same inputs give the same answer.

use std::collections::HashSet;

use chrono_tz::Tz;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::day_key::DayKey;
use crate::entry::{DayLog, EntryView};
use crate::error::Result;
use crate::repository::Repositories;
use crate::truth::{EntryViewOptions, TruthQuery};

/// Trailing window, reference day included.
pub const MOMENTUM_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentumState {
    Strong,
    Steady,
    Building,
    GentleRestart,
    Paused,
    Ready,
}

impl MomentumState {
    /// User-wide thresholds.
    pub fn global(active_days: usize) -> Self {
        match active_days {
            6.. => MomentumState::Strong,
            4..=5 => MomentumState::Steady,
            2..=3 => MomentumState::Building,
            1 => MomentumState::GentleRestart,
            0 => MomentumState::Ready,
        }
    }

    /// Per-category thresholds.
    pub fn category(active_days: usize) -> Self {
        match active_days {
            5.. => MomentumState::Strong,
            3..=4 => MomentumState::Steady,
            1..=2 => MomentumState::Building,
            0 => MomentumState::Paused,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MomentumState::Strong => "Strong",
            MomentumState::Steady => "Steady",
            MomentumState::Building => "Building",
            MomentumState::GentleRestart => "Gentle Restart",
            MomentumState::Paused => "Paused",
            MomentumState::Ready => "Ready",
        }
    }

    pub fn phrases(&self) -> &'static [&'static str] {
        match self {
            MomentumState::Strong => &[
                "You're on a roll.",
                "This rhythm is working. Keep it going.",
                "Consistency looks good on you.",
            ],
            MomentumState::Steady => &[
                "Solid week so far.",
                "Showing up most days adds up.",
                "Steady wins. Nice work.",
            ],
            MomentumState::Building => &[
                "Momentum is building.",
                "A few good days in. Stack another one.",
                "Small steps are still steps.",
            ],
            MomentumState::GentleRestart => &[
                "One day counts. Tomorrow can count too.",
                "Good to see you back.",
                "Restarting is part of the process.",
            ],
            MomentumState::Paused => &[
                "This area is resting for now.",
                "Pick it back up whenever you're ready.",
            ],
            MomentumState::Ready => &[
                "A fresh start is one check-in away.",
                "Ready when you are.",
                "Today is a good day to begin.",
            ],
        }
    }
}

/// How a copy phrase is picked from a state's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PhraseMode {
    #[default]
    Random,
    Rotating,
}

/// Picks an index in `0..count`.
pub trait PhraseSelector {
    fn select(&mut self, count: usize) -> usize;
}

/// Uniform pick from an injected RNG.
pub struct RandomSelector<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomSelector<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> PhraseSelector for RandomSelector<R> {
    fn select(&mut self, count: usize) -> usize {
        if count == 0 {
            0
        } else {
            self.rng.gen_range(0..count)
        }
    }
}

/// Deterministic round-robin starting at a caller-chosen offset.
#[derive(Debug, Clone, Default)]
pub struct RotatingSelector {
    next: usize,
}

impl RotatingSelector {
    pub fn starting_at(offset: usize) -> Self {
        Self { next: offset }
    }
}

impl PhraseSelector for RotatingSelector {
    fn select(&mut self, count: usize) -> usize {
        if count == 0 {
            return 0;
        }
        let idx = self.next % count;
        self.next = self.next.wrapping_add(1);
        idx
    }
}

/// Copy line for a state.
pub fn momentum_copy(state: MomentumState, selector: &mut dyn PhraseSelector) -> &'static str {
    let phrases = state.phrases();
    phrases
        .get(selector.select(phrases.len()))
        .copied()
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MomentumSummary {
    pub state: MomentumState,
    pub label: String,
    pub active_days: usize,
    pub window_days: i64,
    pub reference_day: DayKey,
}

impl MomentumSummary {
    fn new(state: MomentumState, active_days: usize, reference_day: DayKey) -> Self {
        Self {
            state,
            label: state.label().to_string(),
            active_days,
            window_days: MOMENTUM_WINDOW_DAYS,
            reference_day,
        }
    }
}

/// Distinct days in the window ending at `reference` with a completed log.
///
/// Logs with malformed dates are skipped; momentum is advisory.
pub fn active_days<'a>(
    logs: impl IntoIterator<Item = &'a DayLog>,
    reference: DayKey,
    window_days: i64,
    habit_filter: Option<&HashSet<String>>,
) -> usize {
    let start = reference.add_days(-(window_days - 1));
    let mut days = HashSet::new();
    for log in logs {
        if !log.completed {
            continue;
        }
        if habit_filter.is_some_and(|ids| !ids.contains(&log.habit_id)) {
            continue;
        }
        match DayKey::parse(&log.date) {
            Ok(day) if day >= start && day <= reference => {
                days.insert(day);
            }
            Ok(_) => {}
            Err(_) => tracing::warn!(habit_id = %log.habit_id, date = %log.date, "skipping malformed day log"),
        }
    }
    days.len()
}

pub fn global_momentum<'a>(logs: impl IntoIterator<Item = &'a DayLog>, reference: DayKey) -> MomentumSummary {
    let active = active_days(logs, reference, MOMENTUM_WINDOW_DAYS, None);
    MomentumSummary::new(MomentumState::global(active), active, reference)
}

pub fn category_momentum<'a>(
    logs: impl IntoIterator<Item = &'a DayLog>,
    category_habit_ids: &HashSet<String>,
    reference: DayKey,
) -> MomentumSummary {
    let active = active_days(logs, reference, MOMENTUM_WINDOW_DAYS, Some(category_habit_ids));
    MomentumSummary::new(MomentumState::category(active), active, reference)
}

/// One completed record per live entry view, shaped like a legacy day log.
///
/// Lets momentum count activity logged as entries alongside imported logs.
pub fn completion_records<'a>(views: impl IntoIterator<Item = &'a EntryView>) -> Vec<DayLog> {
    let mut seen = HashSet::new();
    views
        .into_iter()
        .filter(|v| !v.is_deleted())
        .filter(|v| seen.insert((v.habit_id.clone(), v.day_key)))
        .map(|v| DayLog {
            habit_id: v.habit_id.clone(),
            date: v.day_key.to_string(),
            value: v.value.unwrap_or_default(),
            completed: true,
            source: Some(v.source.as_str().to_string()),
        })
        .collect()
}

/// Repository-backed momentum lookups.
#[derive(Clone)]
pub struct MomentumService {
    repos: Repositories,
    truth: TruthQuery,
    include_legacy_fallback: bool,
}

impl MomentumService {
    pub fn new(repos: Repositories) -> Self {
        let truth = TruthQuery::from_repositories(&repos);
        Self {
            repos,
            truth,
            include_legacy_fallback: true,
        }
    }

    pub fn with_legacy_fallback(mut self, include: bool) -> Self {
        self.include_legacy_fallback = include;
        self
    }

    pub async fn global(&self, user_id: &str, reference: DayKey, tz: Tz) -> Result<MomentumSummary> {
        let logs = self.window_logs(user_id, reference, tz).await?;
        Ok(global_momentum(&logs, reference))
    }

    pub async fn category(
        &self,
        user_id: &str,
        category_id: &str,
        reference: DayKey,
        tz: Tz,
    ) -> Result<MomentumSummary> {
        let (habits, logs) = tokio::try_join!(
            self.repos.habits.habits_by_user(user_id),
            self.window_logs(user_id, reference, tz),
        )?;
        let ids: HashSet<String> = habits
            .into_iter()
            .filter(|h| h.category_id == category_id)
            .map(|h| h.id)
            .collect();
        Ok(category_momentum(&logs, &ids, reference))
    }

    /// Entry-backed records in the window plus the raw legacy logs.
    ///
    /// Legacy logs are read raw rather than through the merge so their
    /// `completed` flag still gates activity.
    async fn window_logs(&self, user_id: &str, reference: DayKey, tz: Tz) -> Result<Vec<DayLog>> {
        let start = reference.add_days(-(MOMENTUM_WINDOW_DAYS - 1));
        let opts = EntryViewOptions::new(tz)
            .with_range(Some(start), Some(reference))
            .with_legacy_fallback(false);
        let include_legacy = self.include_legacy_fallback;
        let (views, legacy) = tokio::try_join!(self.truth.entry_views_for_user(user_id, &opts), async {
            if include_legacy {
                self.repos.day_logs.day_logs_by_user(user_id).await
            } else {
                Ok(Default::default())
            }
        })?;

        let mut logs = completion_records(&views);
        logs.extend(legacy.into_values());
        Ok(logs)
    }
}
