use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use tracing::{debug, info};

use crate::dates::{date_key, parse_date, parse_month, week_start, WeekStart};
use crate::due::{due_state, DueState};
use crate::error::{Error, Result};
use crate::filter::{apply, TaskFilter};
use crate::models::{Occurrence, Priority, Recurrence, RecurrenceKind, Status, Task, TaskId};
use crate::query::{calendar_counts, overdue, stats, tasks_for_date, tasks_for_week, upcoming};
use crate::recurrence::{cap_reaching, expand, Window};
use crate::settings::Settings;
use crate::storage::{Storage, TaskFile};
use crate::tasks::{self, NewTask, TaskPatch};

/// Everything a command needs: the store, preferences and a fixed "now".
#[derive(Debug, Clone)]
pub struct Context {
    pub store: Storage,
    pub settings: Settings,
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
}

impl Context {
    /// Loads settings for `store` and pins the clock to `now`.
    pub fn new(store: Storage, now: DateTime<Local>) -> Result<Self> {
        let settings = Settings::load(&store.settings_path())?;
        Ok(Context {
            store,
            settings,
            now: now.with_timezone(&Utc),
            today: now.date_naive(),
        })
    }

    /// Occurrences of every stored task inside `window`.
    pub fn occurrences(&self, window: &Window) -> Result<Vec<Occurrence>> {
        let tasks = self.store.load_tasks()?;
        self.expand_tasks(&tasks, window)
    }

    /// Expands `tasks` into `window`.
    ///
    /// `max_instances` is counted from today or the window start, whichever
    /// is later, so series anchored long ago still show current dates.
    pub fn expand_tasks(&self, tasks: &[Task], window: &Window) -> Result<Vec<Occurrence>> {
        let from = window.start.max(self.today);
        let mut all = Vec::with_capacity(tasks.len());
        for task in tasks {
            let cap = cap_reaching(task, from, self.settings.max_instances);
            all.extend(expand(task, window, cap)?);
        }
        debug!(tasks = tasks.len(), occurrences = all.len(), "expanded stored tasks");
        Ok(all)
    }

    // Entries that could not be decoded ride along in `file.kept` and are
    // written back untouched.
    fn mutate<T>(&self, f: impl FnOnce(&mut TaskFile) -> Result<T>) -> Result<T> {
        let mut file = self.store.load()?;
        let out = f(&mut file)?;
        self.store.save(&file)?;
        Ok(out)
    }
}

/// Raw options for `add`, as typed on the command line.
#[derive(Debug, Clone, Default)]
pub struct AddArgs {
    pub name: String,
    pub description: Option<String>,
    pub due: String,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub recur: Option<String>,
    pub every: Option<u32>,
    pub until: Option<String>,
}

/// Raw options for `edit`.
#[derive(Debug, Clone, Default)]
pub struct EditArgs {
    pub name: Option<String>,
    pub description: Option<String>,
    pub due: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub recur: Option<String>,
    pub every: Option<u32>,
    pub until: Option<String>,
    pub no_recur: bool,
}

/// Raw options for `list`.
#[derive(Debug, Clone)]
pub struct ListArgs {
    pub search: String,
    pub priority: String,
    pub status: String,
    pub sort: Option<String>,
    pub all: bool,
    pub series: bool,
}

impl Default for ListArgs {
    fn default() -> Self {
        ListArgs {
            search: String::new(),
            priority: "all".into(),
            status: "all".into(),
            sort: None,
            all: false,
            series: false,
        }
    }
}

/// Builds a repeat rule from `--recur`, `--every` and `--until`.
pub fn build_rule(recur: Option<&str>, every: Option<u32>, until: Option<&str>) -> Result<Option<Recurrence>> {
    let kind = match recur {
        Some(r) => r.parse::<RecurrenceKind>()?,
        None if every.is_some() || until.is_some() => {
            return Err(Error::Validation(
                "--every and --until need --recur (daily, weekly, monthly, yearly)".into(),
            ))
        }
        None => return Ok(None),
    };
    let end_date = until.map(parse_date).transpose()?;
    Ok(Some(Recurrence::new(kind, every.unwrap_or(1), end_date)))
}

/// Adds a new task and returns its id.
pub fn cmd_add(ctx: &Context, args: AddArgs, silent: bool) -> Result<TaskId> {
    let new = NewTask {
        name: args.name,
        description: args.description,
        deadline: parse_date(&args.due)?,
        priority: args.priority.unwrap_or(ctx.settings.default_priority),
        status: args.status.unwrap_or(Status::Pending),
        recurrence: build_rule(args.recur.as_deref(), args.every, args.until.as_deref())?,
    };
    let id = ctx.mutate(|file| {
        let id = file.next_id();
        tasks::insert_task(&mut file.tasks, id, new, ctx.now, ctx.today)
    })?;
    info!(task = %id, "task added");
    if !silent {
        println!("Task added (id = {})", id);
    }
    Ok(id)
}

/// Edits an existing task's details.
pub fn cmd_edit(ctx: &Context, id: &TaskId, args: EditArgs, silent: bool) -> Result<()> {
    let recurrence = match args.recur.as_deref() {
        Some(_) => build_rule(args.recur.as_deref(), args.every, args.until.as_deref())?,
        None if args.every.is_some() || args.until.is_some() => {
            // Adjust the existing rule in place.
            let current = ctx
                .store
                .load_task(id)?
                .ok_or_else(|| Error::TaskNotFound(id.clone()))?;
            let mut rule = current.rule()?.cloned().ok_or_else(|| {
                Error::Validation(format!("task {} is not recurring; pass --recur", id))
            })?;
            if let Some(every) = args.every {
                rule.interval = every;
            }
            if let Some(until) = args.until.as_deref() {
                rule.end_date = if until.trim().is_empty() { None } else { Some(parse_date(until)?) };
            }
            Some(rule)
        }
        None => None,
    };
    let patch = TaskPatch {
        name: args.name,
        description: args.description,
        deadline: args.due.as_deref().map(parse_date).transpose()?,
        priority: args.priority,
        status: args.status,
        recurrence,
        clear_recurrence: args.no_recur,
    };
    ctx.mutate(|file| tasks::update_task(&mut file.tasks, id, patch, ctx.now))?;
    if !silent {
        println!("Task {} updated.", id);
    }
    Ok(())
}

/// Sets the status of a task.
pub fn cmd_status(ctx: &Context, id: &TaskId, status: Status, silent: bool) -> Result<()> {
    ctx.mutate(|file| tasks::set_status(&mut file.tasks, id, status, ctx.now))?;
    if !silent {
        println!("Task {} marked as {}.", id, status);
    }
    Ok(())
}

/// Toggles a task between completed and pending.
pub fn cmd_toggle(ctx: &Context, id: &TaskId, silent: bool) -> Result<Status> {
    let status = ctx.mutate(|file| tasks::toggle_status(&mut file.tasks, id, ctx.now))?;
    if !silent {
        println!("Task {} marked as {}.", id, status);
    }
    Ok(status)
}

/// Removes a task. A recurring task is removed with its whole series.
pub fn cmd_remove(ctx: &Context, id: &TaskId, silent: bool) -> Result<()> {
    let removed = ctx.mutate(|file| tasks::delete_task(&mut file.tasks, id))?;
    info!(task = %id, "task removed");
    if !silent {
        if removed.is_recurring {
            println!("Task {} and all its occurrences removed.", id);
        } else {
            println!("Task {} removed.", id);
        }
    }
    Ok(())
}

/// Removes only the occurrence of series `id` on `date`.
pub fn cmd_skip(ctx: &Context, id: &TaskId, date: &str, silent: bool) -> Result<()> {
    let date = parse_date(date)?;
    let max = ctx.settings.max_instances;
    ctx.mutate(|file| tasks::skip_occurrence(&mut file.tasks, id, date, max, ctx.now))?;
    if !silent {
        println!("Occurrence of task {} on {} skipped.", id, date_key(date));
    }
    Ok(())
}

/// Brings back a skipped occurrence.
pub fn cmd_restore(ctx: &Context, id: &TaskId, date: &str, silent: bool) -> Result<()> {
    let date = parse_date(date)?;
    ctx.mutate(|file| tasks::restore_occurrence(&mut file.tasks, id, date, ctx.now))?;
    if !silent {
        println!("Occurrence of task {} on {} restored.", id, date_key(date));
    }
    Ok(())
}

/// Returns the filtered list shown by `list`.
///
/// Completed entries are hidden unless `--all` is given, the settings show
/// them, or the status filter asks for them explicitly.
pub fn list_occurrences(ctx: &Context, args: &ListArgs) -> Result<Vec<Occurrence>> {
    let filter = list_filter(ctx, args)?;
    let occurrences = ctx.occurrences(&Window::unbounded())?;
    let mut selected = apply(&occurrences, &filter);
    if hides_completed(ctx, args, &filter) {
        selected.retain(|o| o.status != Status::Completed);
    }
    Ok(selected)
}

fn list_filter(ctx: &Context, args: &ListArgs) -> Result<TaskFilter> {
    let sort = args.sort.as_deref().unwrap_or(ctx.settings.task_sort_by.as_str());
    TaskFilter::parse(&args.search, &args.priority, &args.status, sort)
}

fn hides_completed(ctx: &Context, args: &ListArgs, filter: &TaskFilter) -> bool {
    !args.all && !ctx.settings.show_completed_tasks && filter.status.is_none()
}

/// Lists tasks in a formatted table.
pub fn cmd_list(ctx: &Context, args: ListArgs) -> Result<()> {
    if args.series {
        let filter = list_filter(ctx, &args)?;
        let mut base = apply(&ctx.store.load_tasks()?, &filter);
        if hides_completed(ctx, &args, &filter) {
            base.retain(|t| t.status != Status::Completed);
        }
        if base.is_empty() {
            println!("No tasks found.");
            return Ok(());
        }
        println!("{}", series_table(&base, ctx.today));
        return Ok(());
    }

    let list = list_occurrences(ctx, &args)?;
    if list.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }
    println!("{}", occurrence_table(&list, ctx.today));
    Ok(())
}

/// Tasks due today.
pub fn cmd_today(ctx: &Context) -> Result<()> {
    let occurrences = ctx.occurrences(&Window::new(ctx.today, ctx.today))?;
    let list = tasks_for_date(&occurrences, ctx.today);
    print_section(&format!("Today, {}", ctx.today.format("%A %Y-%m-%d")), &list, ctx.today);
    Ok(())
}

/// Tasks in the week containing `start` (default: this week).
pub fn cmd_week(ctx: &Context, start: Option<&str>) -> Result<()> {
    let anchor = match start {
        Some(s) => parse_date(s)?,
        None => ctx.today,
    };
    let first = week_start(anchor, ctx.settings.week_starts_on);
    let window = Window::week(first);
    let mut list = tasks_for_week(&ctx.occurrences(&window)?, first);
    list.sort_by_key(|o| o.deadline);
    print_section(
        &format!("Week of {} to {}", date_key(window.start), date_key(window.end)),
        &list,
        ctx.today,
    );
    Ok(())
}

/// Unfinished tasks due from today on.
pub fn cmd_upcoming(ctx: &Context, limit: Option<usize>) -> Result<()> {
    let window = Window::new(ctx.today, NaiveDate::MAX);
    let limit = limit.unwrap_or(ctx.settings.upcoming_limit);
    let list = upcoming(&ctx.occurrences(&window)?, ctx.today, limit);
    print_section("Upcoming", &list, ctx.today);
    Ok(())
}

/// Unfinished tasks past their deadline.
pub fn cmd_overdue(ctx: &Context) -> Result<()> {
    let window = Window::new(NaiveDate::MIN, ctx.today);
    let mut list = overdue(&ctx.occurrences(&window)?, ctx.today);
    list.sort_by_key(|o| o.deadline);
    print_section("Overdue", &list, ctx.today);
    Ok(())
}

/// Aggregate counts over every occurrence.
pub fn cmd_stats(ctx: &Context) -> Result<()> {
    let s = stats(&ctx.occurrences(&Window::unbounded())?, ctx.today);
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec![
            Cell::new("Total").add_attribute(Attribute::Bold),
            Cell::new("Pending").add_attribute(Attribute::Bold),
            Cell::new("In Progress").add_attribute(Attribute::Bold),
            Cell::new("Completed").add_attribute(Attribute::Bold),
            Cell::new("Overdue").add_attribute(Attribute::Bold),
        ])
        .add_row(vec![
            Cell::new(s.total),
            Cell::new(s.pending).fg(Color::Yellow),
            Cell::new(s.in_progress).fg(Color::Blue),
            Cell::new(s.completed).fg(Color::Green),
            Cell::new(s.overdue).fg(if s.overdue > 0 { Color::Red } else { Color::Reset }),
        ]);
    println!("{table}");
    Ok(())
}

/// Month grid with the number of tasks due on each day.
pub fn cmd_calendar(ctx: &Context, month: Option<&str>) -> Result<()> {
    let (year, month) = match month {
        Some(m) => parse_month(m)?,
        None => (ctx.today.year(), ctx.today.month()),
    };
    let window = Window::month(year, month)?;
    let occurrences = ctx.occurrences(&window)?;
    let counts = calendar_counts(&occurrences, &window);
    println!("{}", window.start.format("%B %Y"));
    println!("{}", calendar_table(&window, &counts, ctx.settings.week_starts_on, ctx.today));
    let total: usize = counts.values().sum();
    println!("{} task(s) this month.", total);
    Ok(())
}

/// Prints the current settings.
pub fn cmd_settings_show(ctx: &Context) -> Result<()> {
    let value = serde_json::to_value(&ctx.settings)?;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Setting", "Value"]);
    if let Some(map) = value.as_object() {
        for (key, val) in map {
            let shown = match val {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            table.add_row(vec![key.clone(), shown]);
        }
    }
    println!("{table}");
    Ok(())
}

/// Writes the current settings to `path`.
pub fn cmd_settings_export(ctx: &Context, path: &Path, silent: bool) -> Result<()> {
    ctx.settings.save(path)?;
    if !silent {
        println!("Settings exported to {}.", path.display());
    }
    Ok(())
}

/// Replaces the settings with those in `path`.
pub fn cmd_settings_import(ctx: &Context, path: &Path, silent: bool) -> Result<Settings> {
    let settings = Settings::import(path, &ctx.store.settings_path())?;
    if !silent {
        println!("Settings imported from {}.", path.display());
    }
    Ok(settings)
}

/// Restores default settings.
pub fn cmd_settings_reset(ctx: &Context, silent: bool) -> Result<()> {
    Settings::reset(&ctx.store.settings_path())?;
    if !silent {
        println!("Settings reset to defaults.");
    }
    Ok(())
}

/// Deletes every task of the current user.
pub fn cmd_reset(ctx: &Context, force: bool) -> Result<()> {
    if !force {
        print!(
            "Are you sure you want to delete all tasks for '{}'? This cannot be undone. [y/N] ",
            ctx.store.user()
        );
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }
    ctx.store.delete_database()?;
    println!("Database reset successfully.");
    Ok(())
}

fn print_section(title: &str, list: &[Occurrence], today: NaiveDate) {
    println!("{}", title);
    if list.is_empty() {
        println!("No tasks.");
    } else {
        println!("{}", occurrence_table(list, today));
    }
}

fn priority_color(p: Priority) -> Color {
    match p {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Green,
    }
}

fn status_color(s: Status) -> Color {
    match s {
        Status::Completed => Color::Green,
        Status::InProgress => Color::Blue,
        Status::Pending => Color::Yellow,
    }
}

fn due_color(state: DueState) -> Color {
    match state {
        DueState::Overdue(_) => Color::Red,
        DueState::Done => Color::Grey,
        s if s.is_pressing() => Color::Yellow,
        _ => Color::Reset,
    }
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|n| Cell::new(n).add_attribute(Attribute::Bold))
        .collect()
}

/// Table of dated occurrences.
pub fn occurrence_table(list: &[Occurrence], today: NaiveDate) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["ID", "Name", "Due", "When", "Priority", "Status", "Repeats"]));

    for o in list {
        let state = due_state(o.deadline, o.status, today);
        let repeats = match (&o.recurrence, o.is_instance) {
            (Some(rule), true) => rule.describe(),
            _ => "-".to_string(),
        };
        table.add_row(vec![
            Cell::new(&o.id),
            Cell::new(&o.name),
            Cell::new(date_key(o.deadline)),
            Cell::new(state).fg(due_color(state)),
            Cell::new(o.priority).fg(priority_color(o.priority)),
            Cell::new(o.status).fg(status_color(o.status)),
            Cell::new(repeats),
        ]);
    }
    table
}

/// Table of base tasks, one row per series.
pub fn series_table(list: &[Task], today: NaiveDate) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["ID", "Name", "Starts / Due", "Priority", "Status", "Rule", "Skipped"]));

    for t in list {
        let rule = match t.rule() {
            Ok(Some(r)) => r.describe(),
            Ok(None) => "-".to_string(),
            Err(_) => "invalid".to_string(),
        };
        let deadline = if t.is_recurring {
            Cell::new(date_key(t.deadline))
        } else {
            let state = due_state(t.deadline, t.status, today);
            Cell::new(format!("{} ({})", date_key(t.deadline), state)).fg(due_color(state))
        };
        table.add_row(vec![
            Cell::new(&t.id),
            Cell::new(&t.name),
            deadline,
            Cell::new(t.priority).fg(priority_color(t.priority)),
            Cell::new(t.status).fg(status_color(t.status)),
            Cell::new(rule),
            Cell::new(t.skipped_dates.len()),
        ]);
    }
    table
}

/// Month grid; each cell shows the day and how many tasks fall on it.
pub fn calendar_table(
    window: &Window,
    counts: &std::collections::BTreeMap<NaiveDate, usize>,
    start: WeekStart,
    today: NaiveDate,
) -> Table {
    let names = match start {
        WeekStart::Monday => ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"],
        WeekStart::Sunday => ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"],
    };
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header(&names));

    let mut day = week_start(window.start, start);
    while day <= window.end {
        let mut row = Vec::with_capacity(7);
        for _ in 0..7 {
            let cell = if window.contains(day) {
                let text = match counts.get(&day) {
                    Some(n) => format!("{:>2} •{}", day.day(), n),
                    None => format!("{:>2}", day.day()),
                };
                let mut cell = Cell::new(text);
                if counts.contains_key(&day) {
                    cell = cell.fg(Color::Cyan);
                }
                if day == today {
                    cell = cell.add_attribute(Attribute::Bold).add_attribute(Attribute::Underlined);
                }
                cell
            } else {
                Cell::new("")
            };
            row.push(cell);
            day = match day.succ_opt() {
                Some(next) => next,
                None => return table,
            };
        }
        table.add_row(row);
    }
    table
}
