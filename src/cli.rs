// src/cli.rs
use clap::{Command, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "A CLI tool to plan workouts and track progression", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Print listings as CSV instead of tables
    #[arg(long, global = true)]
    pub export_csv: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitsCli {
    Metric,
    Imperial,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartMetricCli {
    Weight,
    Volume,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new workout plan
    CreatePlan {
        /// Name of the plan (e.g., "Push Day")
        name: String,
    },
    /// Rename a plan; its log entries keep their plan name in sync
    RenamePlan {
        /// Plan id or name
        plan: String,
        new_name: String,
    },
    /// Delete a plan and every log entry recorded against it
    DeletePlan {
        /// Plan id or name
        plan: String,
    },
    /// Add an exercise to a plan
    AddExercise {
        /// Plan id or name
        plan: String,
        /// Name of the exercise (e.g., "Bench Press")
        name: String,
    },
    /// Rename an exercise; its log entries keep their name in sync
    RenameExercise {
        plan: String,
        /// Exercise id or name within the plan
        exercise: String,
        new_name: String,
    },
    /// Delete an exercise and every log entry recorded against it
    DeleteExercise {
        plan: String,
        exercise: String,
    },
    /// Record a set: weight and reps for an exercise
    Log {
        /// Plan id or name
        plan: String,
        /// Exercise id or name within the plan
        exercise: String,
        /// Weight used
        #[arg(short, long)]
        weight: f64,
        /// Repetitions performed
        #[arg(short, long)]
        reps: i64,
    },
    DeleteLog {
        /// ID of the log entry to delete
        id: String,
    },
    /// Delete all log entries (plans and exercises stay)
    ClearLogs,
    /// List log entries, newest first
    List {
        /// Only logs for this plan (id or name)
        #[arg(long)]
        plan: Option<String>,
        /// Only logs for this exercise (name needs --plan; a bare id works alone)
        #[arg(long)]
        exercise: Option<String>,
        /// Only logs whose exercise or plan name contains this text
        #[arg(long)]
        search: Option<String>,
    },
    /// List plans and their exercises
    ListPlans,
    /// Aggregate statistics over the matching log entries
    Stats {
        #[arg(long)]
        plan: Option<String>,
        #[arg(long)]
        exercise: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Suggest the next session for an exercise based on its history
    Suggest {
        plan: String,
        exercise: String,
    },
    /// Print the progress series for an exercise
    Chart {
        plan: String,
        exercise: String,
        /// Metric to plot (defaults to the configured one)
        #[arg(long, value_enum)]
        metric: Option<ChartMetricCli>,
    },
    /// Write all plans and logs to a backup file
    Export {
        /// Output path (defaults to workout_planner_export.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace all plans and logs with a backup file's contents
    Import {
        file: PathBuf,
    },
    /// Delete all plans, exercises and logs
    Reset,
    /// Show the path to the data directory
    DataPath,
    /// Show the path to the config file
    ConfigPath,
    SetUnits {
        #[arg(value_enum)]
        units: UnitsCli,
    },
    SetChartMetric {
        #[arg(value_enum)]
        metric: ChartMetricCli,
    },
    /// Generate shell completion scripts
    GenerateCompletion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

// Function to parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

// Used by completion generation, which needs the underlying command
pub fn build_cli_command() -> Command {
    Cli::command()
}
