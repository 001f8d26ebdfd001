//! # HabitFlow Core Library
//!
//! Read-side engine for a habit tracker. Raw activity (canonical entries plus
//! deprecated per-day logs) is reconciled into one conflict-annotated stream
//! of [`EntryView`]s, and every derived answer is computed from that stream:
//! per-day completion, goal progress, momentum and streaks.
//!
//! ## Architecture
//!
//! - **Truth query**: merges entries and day logs, entries winning per day
//! - **Completion**: daily, weekly and bundle (checklist/choice) resolution
//! - **Goals**: cumulative/frequency progress with 7/30-day trends
//! - **Momentum**: rolling 7-day activity state with human copy
//! - **Storage**: repository traits, SQLite and in-memory stores, TOML config
//!
//! ## Key Components
//!
//! - [`TruthQuery`]: entry-view reconciliation over the repositories
//! - [`CompletionEngine`]: habit completion for a day
//! - [`GoalService`]: single and batched goal progress
//! - [`HabitStore`]: SQLite persistence
//! - [`Config`]: application configuration management

pub mod completion;
pub mod day_key;
pub mod day_view;
pub mod entry;
pub mod error;
pub mod goal;
pub mod habit;
pub mod momentum;
pub mod repository;
pub mod storage;
pub mod streak;
pub mod truth;

pub use completion::{CompletionEngine, HabitCompletion, SelectedOption, WeeklyMode};
pub use day_key::DayKey;
pub use day_view::{build_day_view, DayView, DayViewHabitStatus, DayViewService};
pub use entry::{DayLog, EntrySource, EntryView, HabitEntry, Provenance};
pub use error::{ConfigError, CoreError, IntegrityError, StorageError};
pub use goal::{Goal, GoalManualLog, GoalProgress, GoalService, GoalType, GoalWarning, GoalWithProgress};
pub use habit::{Habit, HabitIndex};
pub use momentum::{MomentumService, MomentumState, MomentumSummary, PhraseMode};
pub use repository::Repositories;
pub use storage::{Config, HabitStore, MemoryStore};
pub use streak::{compute_streak, StreakSummary};
pub use truth::{EntryViewOptions, TruthQuery};
