use chrono::Utc;
use clap::{Subcommand, ValueEnum};
use habitflow_core::goal::{AggregationMode, CountMode, GoalType};
use habitflow_core::{Goal, GoalManualLog, GoalService};

use super::{print_json, split_list, CliResult, Session};

#[derive(Clone, Copy, ValueEnum)]
pub enum GoalKind {
    Cumulative,
    Frequency,
    Onetime,
}

impl From<GoalKind> for GoalType {
    fn from(kind: GoalKind) -> Self {
        match kind {
            GoalKind::Cumulative => GoalType::Cumulative,
            GoalKind::Frequency => GoalType::Frequency,
            GoalKind::Onetime => GoalType::Onetime,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Aggregation {
    Count,
    Sum,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Counting {
    DistinctDays,
    Entries,
}

#[derive(Subcommand)]
pub enum GoalAction {
    /// Create a goal
    Add {
        /// Goal title
        title: String,
        /// Goal type
        #[arg(long = "type", value_enum)]
        kind: GoalKind,
        /// Goal ID (default: generated)
        #[arg(long)]
        id: Option<String>,
        /// Target value
        #[arg(long)]
        target: Option<f64>,
        /// Unit (e.g. "miles")
        #[arg(long)]
        unit: Option<String>,
        /// Comma-separated linked habit IDs (bundles expand to children)
        #[arg(long)]
        link: Option<String>,
        /// Override the aggregation mode
        #[arg(long, value_enum)]
        aggregation: Option<Aggregation>,
        /// How count-mode goals count
        #[arg(long, value_enum)]
        count_mode: Option<Counting>,
        /// Position in goal lists
        #[arg(long)]
        sort_order: Option<i64>,
    },
    /// Progress of one goal, or every goal when no ID is given
    Progress {
        /// Goal ID
        id: Option<String>,
    },
    /// Add a manual contribution to a goal
    LogManual {
        /// Goal ID
        goal_id: String,
        /// Contributed value
        value: f64,
    },
}

pub async fn run(action: GoalAction, tz: Option<&str>) -> CliResult {
    let session = Session::open(tz)?;

    match action {
        GoalAction::Add {
            title,
            kind,
            id,
            target,
            unit,
            link,
            aggregation,
            count_mode,
            sort_order,
        } => {
            let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let mut goal = Goal::new(id, title, kind.into());
            goal.target_value = target;
            goal.unit = unit;
            goal.linked_habit_ids = link.as_deref().map(split_list).unwrap_or_default();
            goal.aggregation_mode = aggregation.map(|a| match a {
                Aggregation::Count => AggregationMode::Count,
                Aggregation::Sum => AggregationMode::Sum,
            });
            goal.count_mode = count_mode.map(|c| match c {
                Counting::DistinctDays => CountMode::DistinctDays,
                Counting::Entries => CountMode::Entries,
            });
            goal.sort_order = sort_order;

            session.store.create_goal(session.user_id(), &goal)?;
            print_json(&goal)?;
        }
        GoalAction::Progress { id } => {
            let service =
                GoalService::new(session.repos()).with_legacy_fallback(session.include_legacy_fallback());
            let now = Utc::now();
            match id {
                Some(goal_id) => {
                    let result = service.goal_progress(&goal_id, session.user_id(), session.tz, now).await?;
                    print_json(&result)?;
                }
                None => {
                    let results = service.goals_with_progress(session.user_id(), session.tz, now).await?;
                    print_json(&results)?;
                }
            }
        }
        GoalAction::LogManual { goal_id, value } => {
            let log = GoalManualLog {
                id: uuid::Uuid::new_v4().to_string(),
                goal_id,
                value,
                logged_at: Utc::now(),
            };
            session.store.add_manual_log(session.user_id(), &log)?;
            print_json(&log)?;
        }
    }
    Ok(())
}
