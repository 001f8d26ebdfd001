use chrono::Datelike;
use clap::Subcommand;
use habitflow_core::momentum::{momentum_copy, PhraseSelector, RandomSelector, RotatingSelector};
use habitflow_core::{DayKey, MomentumService, MomentumSummary, PhraseMode};
use serde::Serialize;

use super::{print_json, CliResult, Session};

#[derive(Subcommand)]
pub enum MomentumAction {
    /// Momentum across all habits
    Global {
        /// Reference day as YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Momentum within one category
    Category {
        /// Category ID
        id: String,
        /// Reference day as YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MomentumOutput {
    #[serde(flatten)]
    summary: MomentumSummary,
    copy: &'static str,
}

/// Rotating copy advances once per reference day.
fn selector(mode: PhraseMode, reference: DayKey) -> Box<dyn PhraseSelector> {
    match mode {
        PhraseMode::Random => Box::new(RandomSelector::new(rand::thread_rng())),
        PhraseMode::Rotating => {
            let offset = usize::try_from(reference.date().num_days_from_ce()).unwrap_or_default();
            Box::new(RotatingSelector::starting_at(offset))
        }
    }
}

pub async fn run(action: MomentumAction, tz: Option<&str>) -> CliResult {
    let session = Session::open(tz)?;
    let service =
        MomentumService::new(session.repos()).with_legacy_fallback(session.include_legacy_fallback());

    let summary = match action {
        MomentumAction::Global { date } => {
            let reference = session.day_or_today(date.as_deref())?;
            service.global(session.user_id(), reference, session.tz).await?
        }
        MomentumAction::Category { id, date } => {
            let reference = session.day_or_today(date.as_deref())?;
            service.category(session.user_id(), &id, reference, session.tz).await?
        }
    };

    let mut picker = selector(session.config.momentum.phrase_mode, summary.reference_day);
    let copy = momentum_copy(summary.state, picker.as_mut());
    print_json(&MomentumOutput { summary, copy })
}
