//! Repository-backed goal evaluation.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::{compute_goal_progress, Goal, GoalProgress};
use crate::entry::EntryView;
use crate::error::{CoreError, Result};
use crate::habit::HabitIndex;
use crate::repository::Repositories;
use crate::truth::{EntryViewOptions, TruthQuery};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalWithProgress {
    pub goal: Goal,
    pub progress: GoalProgress,
}

/// Fetches goal inputs and runs the progress engine.
#[derive(Clone)]
pub struct GoalService {
    repos: Repositories,
    truth: TruthQuery,
    include_legacy_fallback: bool,
}

impl GoalService {
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

    fn view_options(&self, tz: Tz) -> EntryViewOptions {
        EntryViewOptions::new(tz).with_legacy_fallback(self.include_legacy_fallback)
    }

    /// Progress of a single goal.
    pub async fn goal_progress(
        &self,
        goal_id: &str,
        user_id: &str,
        tz: Tz,
        now: DateTime<Utc>,
    ) -> Result<GoalWithProgress> {
        let goal = self
            .repos
            .goals
            .goal_by_id(goal_id, user_id)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                kind: "goal",
                id: goal_id.to_string(),
            })?;

        let (habits, manual_logs) = tokio::try_join!(
            self.repos.habits.habits_by_user(user_id),
            self.repos.manual_logs.manual_logs_by_goal(goal_id, user_id),
        )?;
        let habits = HabitIndex::new(habits);

        let linked = habits.expand_linked(&goal.linked_habit_ids);
        let mut views = self
            .truth
            .entry_views_for_habits(&linked, user_id, &self.view_options(tz))
            .await?;
        views.retain(|v| !v.is_deleted());

        let progress = compute_goal_progress(&goal, &views, &manual_logs, &habits, tz, now);
        Ok(GoalWithProgress { goal, progress })
    }

    /// Progress of every goal of a user.
    ///
    /// All habits, views and manual logs are fetched once up front and shared
    /// by every goal, so bundle expansion sees one consistent habit set.
    pub async fn goals_with_progress(
        &self,
        user_id: &str,
        tz: Tz,
        now: DateTime<Utc>,
    ) -> Result<Vec<GoalWithProgress>> {
        let opts = self.view_options(tz);
        let (mut goals, habits, views) = tokio::try_join!(
            self.repos.goals.goals_by_user(user_id),
            self.repos.habits.habits_by_user(user_id),
            self.truth.entry_views_for_user(user_id, &opts),
        )?;

        // Manual logs are keyed by goal id, so this one fetch waits on the goal list.
        let goal_ids: Vec<String> = goals.iter().map(|g| g.id.clone()).collect();
        let manual_logs = if goal_ids.is_empty() {
            Vec::new()
        } else {
            self.repos
                .manual_logs
                .manual_logs_by_goals(&goal_ids, user_id)
                .await?
        };

        let habits = HabitIndex::new(habits);
        let views: Vec<EntryView> = views.into_iter().filter(|v| !v.is_deleted()).collect();

        goals.sort_by(goal_order);
        let results = goals
            .into_iter()
            .map(|goal| {
                let progress = compute_goal_progress(&goal, &views, &manual_logs, &habits, tz, now);
                GoalWithProgress { goal, progress }
            })
            .collect();
        Ok(results)
    }
}

/// `sortOrder` ascending with unset last, then title.
fn goal_order(a: &Goal, b: &Goal) -> Ordering {
    match (a.sort_order, b.sort_order) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.title.cmp(&b.title))
}
