use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "habitflow-cli", version, about = "HabitFlow CLI")]
struct Cli {
    /// IANA timezone for day boundaries (overrides config `timezone`)
    #[arg(long, global = true)]
    tz: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Habit management
    Habit {
        #[command(subcommand)]
        action: commands::habit::HabitAction,
    },
    /// Log an entry for a habit
    Log(commands::entry::LogArgs),
    /// Soft-delete an entry
    DeleteEntry {
        /// Entry ID
        id: String,
    },
    /// Reconciled entry views for a habit
    Entries(commands::entry::EntriesArgs),
    /// Status of every habit on a day
    Day {
        /// Day as YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Goal management and progress
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Rolling 7-day momentum
    Momentum {
        #[command(subcommand)]
        action: commands::momentum::MomentumAction,
    },
    /// Current and best streak of a habit
    Streak {
        /// Habit ID
        habit: String,
        /// Reference day as YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("HABITFLOW_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let tz = cli.tz.as_deref();
    let result = match cli.command {
        Commands::Config { action } => commands::config::run(action),
        Commands::Habit { action } => commands::habit::run(action, tz).await,
        Commands::Log(args) => commands::entry::log(args, tz),
        Commands::DeleteEntry { id } => commands::entry::delete(&id, tz),
        Commands::Entries(args) => commands::entry::entries(args, tz).await,
        Commands::Day { date } => commands::day::run(date.as_deref(), tz).await,
        Commands::Goal { action } => commands::goal::run(action, tz).await,
        Commands::Momentum { action } => commands::momentum::run(action, tz).await,
        Commands::Streak { habit, date } => commands::streak::run(&habit, date.as_deref(), tz).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
