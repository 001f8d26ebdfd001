use chrono::Utc;
use clap::Args;
use habitflow_core::{DayKey, EntryViewOptions, HabitEntry, TruthQuery};

use super::{print_json, CliResult, Session};

#[derive(Args)]
pub struct LogArgs {
    /// Habit ID
    pub habit: String,
    /// Logged quantity
    #[arg(long)]
    pub value: Option<f64>,
    /// Unit of the value
    #[arg(long)]
    pub unit: Option<String>,
    /// Option key for a choice bundle
    #[arg(long)]
    pub option: Option<String>,
    /// Day as YYYY-MM-DD (default: today)
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Args)]
pub struct EntriesArgs {
    /// Habit ID
    pub habit: String,
    /// First day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,
    /// Last day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,
    /// Ignore legacy day logs
    #[arg(long)]
    pub no_legacy: bool,
}

pub fn log(args: LogArgs, tz: Option<&str>) -> CliResult {
    let session = Session::open(tz)?;
    let day_key = session.day_or_today(args.date.as_deref())?;

    let mut entry = HabitEntry::new(args.habit, day_key, Utc::now());
    entry.value = args.value;
    entry.unit = args.unit;
    entry.option_key = args.option;

    session.store.log_entry(session.user_id(), &entry)?;
    print_json(&entry)
}

pub fn delete(id: &str, tz: Option<&str>) -> CliResult {
    let session = Session::open(tz)?;
    if session.store.soft_delete_entry(session.user_id(), id, Utc::now())? {
        println!("deleted {id}");
        Ok(())
    } else {
        Err(format!("entry not found: {id}").into())
    }
}

pub async fn entries(args: EntriesArgs, tz: Option<&str>) -> CliResult {
    let session = Session::open(tz)?;
    let start = args.start.as_deref().map(DayKey::parse).transpose()?;
    let end = args.end.as_deref().map(DayKey::parse).transpose()?;

    let opts = EntryViewOptions::new(session.tz)
        .with_range(start, end)
        .with_legacy_fallback(session.include_legacy_fallback() && !args.no_legacy);

    let views = TruthQuery::from_repositories(&session.repos())
        .entry_views_for_habit(&args.habit, session.user_id(), &opts)
        .await?;
    print_json(&views)
}
