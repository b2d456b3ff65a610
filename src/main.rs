//! # schedulr
//!
//! A terminal task and schedule manager. A quick CLI for scripted entry and
//! a TUI dashboard for day-to-day use, both working on the same store.
//!
//! ## Features
//!
//! *   **Recurring tasks**: daily, weekly, monthly or yearly, with an interval
//!     and an optional end date. Month-end and leap-day anchors clamp to the
//!     last valid day without drifting.
//! *   **Views**: today, this week, upcoming, overdue, a month calendar and
//!     aggregate stats.
//! *   **Filtering**: search by name or description, filter by priority and
//!     status, sort by deadline, priority, name or creation time.
//! *   **Per-user data**: every user has their own task file; settings are shared.
//!
//! ## Usage
//!
//! ```bash
//! # Interactive dashboard
//! schedulr
//!
//! # One-off task
//! schedulr add "Write report" --due 2025-12-01 --priority high
//!
//! # Every second Monday until the end of the year
//! schedulr add "Sprint review" --due 2025-10-06 --recur weekly --every 2 --until 2025-12-31
//!
//! # Drop one occurrence, keep the series
//! schedulr skip 3 2025-10-20
//!
//! # Filtered list
//! schedulr list --search report --priority high --sort name
//! ```
//!
//! ## Data Storage
//!
//! Tasks live in `<data dir>/schedulr/users/<user>/tasks.json`, settings in
//! `<data dir>/schedulr/settings.json`. Set `SCHEDULR_DATA_DIR` to move the
//! root and `SCHEDULR_USER` (or `--user`) to switch users.
//!
//! Logging is off unless `RUST_LOG` is set, e.g. `RUST_LOG=schedulr=debug`.

use std::io;
use std::path::PathBuf;

use chrono::Local;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use schedulr::commands::*;
use schedulr::error::{exit_codes, Result};
use schedulr::models::{Priority, Status, TaskId};
use schedulr::storage::Storage;
use schedulr::tui::run_tui;

#[derive(Parser)]
#[command(name = "schedulr")]
#[command(about = "Terminal task and schedule manager", long_about = None)]
struct Cli {
    /// Whose tasks to work on
    #[arg(long, global = true, env = "SCHEDULR_USER", default_value = "default")]
    user: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task name (quoted if it has spaces)
        name: String,
        /// Longer description
        #[arg(short = 'D', long)]
        description: Option<String>,
        /// Due date (first occurrence for recurring tasks) in YYYY-MM-DD
        #[arg(short, long)]
        due: String,
        /// low, medium or high (default from settings)
        #[arg(short, long)]
        priority: Option<Priority>,
        /// pending, in-progress or completed
        #[arg(short, long)]
        status: Option<Status>,
        /// Recurrence (daily, weekly, monthly, yearly)
        #[arg(short, long)]
        recur: Option<String>,
        /// Repeat every N periods
        #[arg(short, long)]
        every: Option<u32>,
        /// Last possible occurrence date in YYYY-MM-DD
        #[arg(short = 'u', long)]
        until: Option<String>,
    },
    /// List tasks, with recurring tasks expanded into occurrences
    List {
        /// Text to look for in name or description
        #[arg(short = 'q', long, default_value = "")]
        search: String,
        /// low, medium, high or all
        #[arg(short, long, default_value = "all")]
        priority: String,
        /// pending, in-progress, completed or all
        #[arg(short, long, default_value = "all")]
        status: String,
        /// deadline, priority, name or created (default from settings)
        #[arg(short = 'o', long)]
        sort: Option<String>,
        /// Show completed tasks even if settings hide them
        #[arg(short, long)]
        all: bool,
        /// List stored tasks, one row per series
        #[arg(long)]
        series: bool,
    },
    /// Edit a task
    Edit {
        id: TaskId,
        /// New task name
        #[arg(short, long)]
        name: Option<String>,
        /// New description (empty to clear)
        #[arg(short = 'D', long)]
        description: Option<String>,
        /// New due date
        #[arg(short, long)]
        due: Option<String>,
        /// New priority
        #[arg(short, long)]
        priority: Option<Priority>,
        /// New status
        #[arg(short, long)]
        status: Option<Status>,
        /// New recurrence type
        #[arg(short, long)]
        recur: Option<String>,
        /// New interval
        #[arg(short, long)]
        every: Option<u32>,
        /// New end date (empty to clear)
        #[arg(short = 'u', long)]
        until: Option<String>,
        /// Make the task one-off
        #[arg(long, conflicts_with = "recur")]
        no_recur: bool,
    },
    /// Set the status of a task
    Status {
        id: TaskId,
        status: Status,
    },
    /// Toggle a task between completed and pending
    Toggle {
        id: TaskId,
    },
    /// Remove a task (recurring tasks are removed with all occurrences)
    Remove {
        id: TaskId,
    },
    /// Skip a single occurrence of a recurring task
    Skip {
        id: TaskId,
        /// Occurrence date in YYYY-MM-DD
        date: String,
    },
    /// Bring back a skipped occurrence
    Restore {
        id: TaskId,
        /// Occurrence date in YYYY-MM-DD
        date: String,
    },
    /// Tasks due today
    Today,
    /// Tasks in a week
    Week {
        /// Any date in the week (default: today)
        date: Option<String>,
    },
    /// Next unfinished tasks
    Upcoming {
        /// How many to show (default from settings)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Unfinished tasks past their deadline
    Overdue,
    /// Task counts by status
    Stats,
    /// Month calendar with task counts
    Calendar {
        /// Month in YYYY-MM (default: this month)
        month: Option<String>,
    },
    /// Manage settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Reset the database (delete all tasks of the user)
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
    /// Open interactive TUI
    Ui,
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show current settings
    Show,
    /// Write settings to a file
    Export {
        path: PathBuf,
    },
    /// Load settings from a file
    Import {
        path: PathBuf,
    },
    /// Restore default settings
    Reset,
}

fn init_tracing() {
    // Tracing is opt-in via RUST_LOG.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Tells the user about stored tasks that could not be read. They are kept in
/// the file as is, but would otherwise be invisible in every listing.
fn report_unreadable(ctx: &Context) -> Result<()> {
    let file = ctx.store.load()?;
    for rejected in &file.rejected {
        eprintln!(
            "Warning: {} (left unchanged in {})",
            rejected,
            ctx.store.tasks_path().display()
        );
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "schedulr", &mut io::stdout());
        return Ok(());
    }

    let ctx = Context::new(Storage::from_env(&cli.user)?, Local::now())?;
    // The TUI shows this in its status bar; reset and settings never read tasks.
    let reads_tasks = !matches!(
        cli.command,
        Some(Commands::Ui) | None | Some(Commands::Reset { .. }) | Some(Commands::Settings { .. })
    );
    if reads_tasks {
        report_unreadable(&ctx)?;
    }
    match cli.command {
        Some(Commands::Add { name, description, due, priority, status, recur, every, until }) => {
            let args = AddArgs { name, description, due, priority, status, recur, every, until };
            cmd_add(&ctx, args, false).map(|_| ())
        }
        Some(Commands::List { search, priority, status, sort, all, series }) => {
            cmd_list(&ctx, ListArgs { search, priority, status, sort, all, series })
        }
        Some(Commands::Edit { id, name, description, due, priority, status, recur, every, until, no_recur }) => {
            let args = EditArgs { name, description, due, priority, status, recur, every, until, no_recur };
            cmd_edit(&ctx, &id, args, false)
        }
        Some(Commands::Status { id, status }) => cmd_status(&ctx, &id, status, false),
        Some(Commands::Toggle { id }) => cmd_toggle(&ctx, &id, false).map(|_| ()),
        Some(Commands::Remove { id }) => cmd_remove(&ctx, &id, false),
        Some(Commands::Skip { id, date }) => cmd_skip(&ctx, &id, &date, false),
        Some(Commands::Restore { id, date }) => cmd_restore(&ctx, &id, &date, false),
        Some(Commands::Today) => cmd_today(&ctx),
        Some(Commands::Week { date }) => cmd_week(&ctx, date.as_deref()),
        Some(Commands::Upcoming { limit }) => cmd_upcoming(&ctx, limit),
        Some(Commands::Overdue) => cmd_overdue(&ctx),
        Some(Commands::Stats) => cmd_stats(&ctx),
        Some(Commands::Calendar { month }) => cmd_calendar(&ctx, month.as_deref()),
        Some(Commands::Settings { command }) => match command {
            SettingsCommands::Show => cmd_settings_show(&ctx),
            SettingsCommands::Export { path } => cmd_settings_export(&ctx, &path, false),
            SettingsCommands::Import { path } => cmd_settings_import(&ctx, &path, false).map(|_| ()),
            SettingsCommands::Reset => cmd_settings_reset(&ctx, false),
        },
        Some(Commands::Reset { force }) => cmd_reset(&ctx, force),
        Some(Commands::Completions { .. }) => Ok(()),
        Some(Commands::Ui) | None => {
            if let Err(e) = run_tui(ctx) {
                eprintln!("Error running TUI: {}", e);
                std::process::exit(exit_codes::OPERATION_FAILED);
            }
            Ok(())
        }
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {}", err);
        std::process::exit(err.exit_code());
    }
}
