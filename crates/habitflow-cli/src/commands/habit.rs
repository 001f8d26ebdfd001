use clap::Subcommand;
use habitflow_core::repository::HabitRepository;
use habitflow_core::Habit;

use super::{print_json, split_list, CliResult, Session};

#[derive(Subcommand)]
pub enum HabitAction {
    /// Create a habit
    Add {
        /// Habit name
        name: String,
        /// Habit ID (default: generated)
        #[arg(long)]
        id: Option<String>,
        /// Category ID
        #[arg(long)]
        category: Option<String>,
        /// Weekly habit with this many completions per week
        #[arg(long)]
        weekly: Option<f64>,
        /// Numeric habit with this daily target
        #[arg(long)]
        target: Option<f64>,
        /// Unit for a numeric habit (e.g. "miles")
        #[arg(long)]
        unit: Option<String>,
        /// Checklist bundle over these comma-separated habit IDs
        #[arg(long, conflicts_with = "choice")]
        checklist: Option<String>,
        /// Choice bundle with comma-separated key=label options
        #[arg(long)]
        choice: Option<String>,
    },
    /// List habits
    List {
        /// Include archived habits
        #[arg(long)]
        all: bool,
    },
}

fn parse_options(raw: &str) -> Result<Vec<(String, String)>, String> {
    split_list(raw)
        .into_iter()
        .map(|item| match item.split_once('=') {
            Some((key, label)) if !key.trim().is_empty() => Ok((key.trim().to_string(), label.trim().to_string())),
            _ => Err(format!("invalid option '{item}', expected key=label")),
        })
        .collect()
}

pub async fn run(action: HabitAction, tz: Option<&str>) -> CliResult {
    let session = Session::open(tz)?;

    match action {
        HabitAction::Add {
            name,
            id,
            category,
            weekly,
            target,
            unit,
            checklist,
            choice,
        } => {
            let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let mut habit = Habit::new(id, name);
            if let Some(category) = category {
                habit = habit.in_category(category);
            }
            if target.is_some() || unit.is_some() {
                habit = habit.numeric(target, unit.as_deref());
            }
            if let Some(per_week) = weekly {
                habit = habit.weekly(per_week);
            }
            if let Some(children) = checklist {
                let children = split_list(&children);
                let refs: Vec<&str> = children.iter().map(String::as_str).collect();
                habit = habit.checklist(&refs);
            }
            if let Some(raw) = choice {
                let options = parse_options(&raw)?;
                let refs: Vec<(&str, &str)> = options.iter().map(|(k, l)| (k.as_str(), l.as_str())).collect();
                habit = habit.choice(&refs);
            }

            session.store.create_habit(session.user_id(), &habit)?;
            print_json(&habit)?;
        }
        HabitAction::List { all } => {
            let mut habits = session.store.habits_by_user(session.user_id()).await?;
            if !all {
                habits.retain(|h| !h.archived);
            }
            print_json(&habits)?;
        }
    }
    Ok(())
}
