use ratatui::widgets::TableState;
use tracing::warn;

use crate::commands::{build_rule, cmd_add, cmd_remove, cmd_skip, cmd_toggle, AddArgs, Context};
use crate::dates::date_key;
use crate::error::{Error, Result};
use crate::filter::{apply, SortKey, TaskFilter};
use crate::models::{Occurrence, Priority, Status};
use crate::query::{overdue, stats, tasks_for_date, upcoming, TaskStats};
use crate::recurrence::Window;

#[derive(PartialEq, Debug)]
pub enum InputMode {
    Normal,
    Search,
    Adding,
}

#[derive(PartialEq, Debug)]
pub enum ViewMode {
    Dashboard,
    Tasks,
}

/// State for the multi-step "Add Task" wizard.
#[derive(Default, Debug)]
pub struct AddState {
    pub name: String,
    pub due: String,
    pub priority: Option<Priority>,
    pub step: usize, // 0: Name, 1: Due, 2: Priority, 3: Recur
}

pub struct App {
    pub ctx: Context,
    /// Every occurrence of every stored task.
    pub occurrences: Vec<Occurrence>,
    /// Filtered, sorted occurrences shown in the task view.
    pub visible: Vec<Occurrence>,
    pub stats: TaskStats,
    pub today_tasks: Vec<Occurrence>,
    pub upcoming_tasks: Vec<Occurrence>,
    pub overdue_tasks: Vec<Occurrence>,
    pub filter: TaskFilter,
    pub show_completed: bool,
    pub state: TableState,
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub add_state: AddState,
    /// Feedback for the last action, shown in the status line.
    pub message: Option<String>,
    /// Stored records that could not be read and are left as they are.
    pub unreadable: usize,
}

fn next_in<T: Copy + PartialEq>(all: &[T], current: T) -> T {
    let idx = all.iter().position(|x| *x == current).unwrap_or(0);
    all[(idx + 1) % all.len()]
}

fn next_choice<T: Copy + PartialEq>(all: &[T], current: Option<T>) -> Option<T> {
    match current {
        None => all.first().copied(),
        Some(c) => match all.iter().position(|x| *x == c) {
            Some(i) if i + 1 < all.len() => Some(all[i + 1]),
            _ => None,
        },
    }
}

impl App {
    /// Creates a new App instance and loads initial data.
    pub fn new(ctx: Context) -> App {
        let filter = TaskFilter { sort_by: ctx.settings.task_sort_by, ..TaskFilter::default() };
        let show_completed = ctx.settings.show_completed_tasks;
        let mut app = App {
            ctx,
            occurrences: Vec::new(),
            visible: Vec::new(),
            stats: TaskStats::default(),
            today_tasks: Vec::new(),
            upcoming_tasks: Vec::new(),
            overdue_tasks: Vec::new(),
            filter,
            show_completed,
            state: TableState::default(),
            view_mode: ViewMode::Dashboard,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            add_state: AddState::default(),
            message: None,
            unreadable: 0,
        };
        app.reload();
        app
    }

    /// Re-expands the stored tasks and refreshes every derived list.
    pub fn reload(&mut self) {
        let loaded = self.ctx.store.load().and_then(|file| {
            let all = self.ctx.expand_tasks(&file.tasks, &Window::unbounded())?;
            Ok((all, file.rejected.len()))
        });
        match loaded {
            Ok((all, unreadable)) => {
                self.occurrences = all;
                self.unreadable = unreadable;
            }
            Err(e) => {
                warn!(error = %e, "failed to load tasks");
                self.message = Some(format!("Error: {}", e));
                self.occurrences.clear();
            }
        }
        let today = self.ctx.today;
        self.stats = stats(&self.occurrences, today);
        self.today_tasks = tasks_for_date(&self.occurrences, today);
        self.upcoming_tasks = upcoming(&self.occurrences, today, self.ctx.settings.upcoming_limit);
        self.overdue_tasks = overdue(&self.occurrences, today);
        self.overdue_tasks.sort_by_key(|o| o.deadline);
        self.refilter();
    }

    /// Text for the status line: the last action's feedback, else a note
    /// about unreadable records.
    pub fn status_line(&self) -> String {
        match (&self.message, self.unreadable) {
            (Some(msg), _) => msg.clone(),
            (None, 0) => String::new(),
            (None, n) => format!(
                "{} stored task(s) could not be read; they are kept unchanged in {}",
                n,
                self.ctx.store.tasks_path().display()
            ),
        }
    }

    /// Recomputes the task view from the current occurrences and filter.
    pub fn refilter(&mut self) {
        let mut visible = apply(&self.occurrences, &self.filter);
        if !self.show_completed && self.filter.status.is_none() {
            visible.retain(|o| o.status != Status::Completed);
        }
        self.visible = visible;

        if self.visible.is_empty() {
            self.state.select(None);
        } else if let Some(i) = self.state.selected() {
            if i >= self.visible.len() {
                self.state.select(Some(self.visible.len() - 1));
            }
        } else {
            self.state.select(Some(0));
        }
    }

    pub fn selected(&self) -> Option<&Occurrence> {
        self.state.selected().and_then(|i| self.visible.get(i))
    }

    /// Selects the next item in the task list.
    pub fn next(&mut self) {
        if self.visible.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < self.visible.len() => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    /// Selects the previous item in the task list.
    pub fn previous(&mut self) {
        if self.visible.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => self.visible.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    fn report(&mut self, result: Result<String>) {
        self.message = Some(match result {
            Ok(msg) => msg,
            Err(e) => format!("Error: {}", e),
        });
        self.reload();
    }

    /// Toggles the selected task between completed and pending.
    ///
    /// Occurrences of a recurring series always start pending and cannot be
    /// completed one by one; they can only be skipped.
    pub fn toggle_selected(&mut self) {
        if self.view_mode != ViewMode::Tasks {
            return;
        }
        let Some(o) = self.selected().cloned() else { return };
        if o.is_instance {
            self.message = Some("Recurring occurrences stay pending; press x to skip one.".into());
            return;
        }
        let result = cmd_toggle(&self.ctx, &o.id, true).map(|s| format!("'{}' is now {}.", o.name, s));
        self.report(result);
    }

    /// Deletes the selected task, or the whole series it belongs to.
    pub fn delete_selected(&mut self) {
        if self.view_mode != ViewMode::Tasks {
            return;
        }
        let Some(o) = self.selected().cloned() else { return };
        let result = cmd_remove(&self.ctx, o.base_id(), true).map(|_| {
            if o.is_instance {
                format!("Removed series '{}'.", o.name)
            } else {
                format!("Removed '{}'.", o.name)
            }
        });
        self.report(result);
    }

    /// Skips only the selected occurrence of a recurring series.
    pub fn skip_selected(&mut self) {
        if self.view_mode != ViewMode::Tasks {
            return;
        }
        let Some(o) = self.selected().cloned() else { return };
        if !o.is_instance {
            self.message = Some("Only occurrences of recurring tasks can be skipped.".into());
            return;
        }
        let date = date_key(o.deadline);
        let result = cmd_skip(&self.ctx, o.base_id(), &date, true)
            .map(|_| format!("Skipped '{}' on {}.", o.name, date));
        self.report(result);
    }

    pub fn cycle_priority_filter(&mut self) {
        self.filter.priority = next_choice(&Priority::ALL, self.filter.priority);
        self.refilter();
    }

    pub fn cycle_status_filter(&mut self) {
        self.filter.status = next_choice(&Status::ALL, self.filter.status);
        self.refilter();
    }

    pub fn cycle_sort(&mut self) {
        self.filter.sort_by = next_in(&SortKey::ALL, self.filter.sort_by);
        self.refilter();
    }

    /// Toggles the visibility of completed tasks.
    pub fn toggle_completed(&mut self) {
        self.show_completed = !self.show_completed;
        self.refilter();
    }

    /// Switches between the dashboard and the task list.
    pub fn toggle_view(&mut self) {
        self.view_mode = match self.view_mode {
            ViewMode::Dashboard => ViewMode::Tasks,
            ViewMode::Tasks => ViewMode::Dashboard,
        };
    }

    /// Starts editing the search text; the list narrows as you type.
    pub fn start_search(&mut self) {
        self.view_mode = ViewMode::Tasks;
        self.input_mode = InputMode::Search;
        self.input_buffer = self.filter.search.clone();
    }

    /// Initiates the "Add Task" wizard.
    pub fn start_add(&mut self) {
        self.input_mode = InputMode::Adding;
        self.add_state = AddState::default();
        self.input_buffer.clear();
    }

    pub fn push_char(&mut self, c: char) {
        self.input_buffer.push(c);
        if self.input_mode == InputMode::Search {
            self.filter.search = self.input_buffer.clone();
            self.refilter();
        }
    }

    pub fn pop_char(&mut self) {
        self.input_buffer.pop();
        if self.input_mode == InputMode::Search {
            self.filter.search = self.input_buffer.clone();
            self.refilter();
        }
    }

    pub fn cancel_input(&mut self) {
        if self.input_mode == InputMode::Search {
            self.filter.search.clear();
            self.refilter();
        }
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
    }

    /// Handles Enter based on the current mode.
    pub fn handle_input(&mut self) {
        match self.input_mode {
            InputMode::Adding => self.handle_adding_input(),
            InputMode::Search => {
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
            }
            InputMode::Normal => {}
        }
    }

    /// Handles input for the "Add Task" wizard.
    fn handle_adding_input(&mut self) {
        let input = self.input_buffer.trim().to_string();
        match self.add_state.step {
            0 => {
                // Name
                if !input.is_empty() {
                    self.add_state.name = input;
                    self.add_state.step += 1;
                    self.input_buffer.clear();
                }
            }
            1 => {
                // Due
                if !input.is_empty() {
                    self.add_state.due = input;
                    self.add_state.step += 1;
                    self.input_buffer.clear();
                }
            }
            2 => {
                // Priority, empty keeps the default
                if input.is_empty() {
                    self.add_state.step += 1;
                    self.input_buffer.clear();
                } else if let Ok(p) = input.parse::<Priority>() {
                    self.add_state.priority = Some(p);
                    self.add_state.step += 1;
                    self.input_buffer.clear();
                } else {
                    self.message = Some(format!("Unknown priority '{}'.", input));
                }
            }
            3 => {
                // Recur: "<type> [interval] [end date]", empty for a one-off task
                let result = self.finish_add(&input);
                self.input_mode = InputMode::Normal;
                self.input_buffer.clear();
                self.report(result);
            }
            _ => {}
        }
    }

    fn finish_add(&mut self, recur: &str) -> Result<String> {
        let mut parts = recur.split_whitespace();
        let kind = parts.next();
        let every = match parts.next() {
            Some(n) => Some(n.parse::<u32>().map_err(|_| {
                Error::Validation(format!("invalid interval '{}'", n))
            })?),
            None => None,
        };
        let until = parts.next();
        // Validate the rule before touching storage.
        build_rule(kind, every, until)?;
        let args = AddArgs {
            name: self.add_state.name.clone(),
            due: self.add_state.due.clone(),
            priority: self.add_state.priority,
            recur: kind.map(str::to_string),
            every,
            until: until.map(str::to_string),
            ..AddArgs::default()
        };
        let id = cmd_add(&self.ctx, args, true)?;
        Ok(format!("Task added (id = {}).", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use chrono::{Local, TimeZone};

    fn app(dir: &std::path::Path) -> App {
        let now = Local.with_ymd_and_hms(2025, 10, 1, 9, 0, 0).unwrap();
        let ctx = Context::new(Storage::at(dir, "tui").unwrap(), now).unwrap();
        App::new(ctx)
    }

    fn add(app: &mut App, lines: &[&str]) {
        app.start_add();
        for line in lines {
            for c in line.chars() {
                app.push_char(c);
            }
            app.handle_input();
        }
    }

    #[test]
    fn wizard_adds_recurring_task() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = app(dir.path());
        add(&mut app, &["Standup", "2025-10-01", "high", "daily 1 2025-10-03"]);

        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.occurrences.len(), 3);
        assert_eq!(app.today_tasks.len(), 1);
        assert_eq!(app.stats.pending, 3);
        assert!(app.occurrences.iter().all(|o| o.priority == Priority::High));
    }

    #[test]
    fn skip_removes_one_occurrence_and_delete_removes_series() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = app(dir.path());
        add(&mut app, &["Standup", "2025-10-01", "", "daily 1 2025-10-03"]);
        app.toggle_view();
        app.next();
        app.skip_selected();
        assert_eq!(app.occurrences.len(), 2);

        app.toggle_selected();
        assert!(app.message.as_deref().unwrap_or("").contains("stay pending"));

        app.delete_selected();
        assert!(app.occurrences.is_empty());
        assert_eq!(app.state.selected(), None);
    }

    #[test]
    fn search_and_filters_narrow_the_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = app(dir.path());
        add(&mut app, &["Write report", "2025-10-05", "low", ""]);
        add(&mut app, &["Review design", "2025-10-06", "high", ""]);

        app.start_search();
        for c in "REPORT".chars() {
            app.push_char(c);
        }
        assert_eq!(app.visible.len(), 1);
        app.cancel_input();
        assert_eq!(app.visible.len(), 2);

        app.cycle_priority_filter(); // low
        assert_eq!(app.visible.len(), 1);
        app.cycle_priority_filter(); // medium
        assert!(app.visible.is_empty());
        app.cycle_priority_filter(); // high
        app.cycle_priority_filter(); // all
        assert_eq!(app.visible.len(), 2);

        app.cycle_sort();
        assert_eq!(app.filter.sort_by, SortKey::Priority);
        assert_eq!(app.visible[0].name, "Review design");
    }

    #[test]
    fn toggling_one_off_task_hides_it_when_completed_hidden() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = app(dir.path());
        add(&mut app, &["Write report", "2025-10-05", "", ""]);
        app.view_mode = ViewMode::Tasks;
        app.show_completed = false;
        app.toggle_selected();
        assert_eq!(app.stats.completed, 1);
        assert!(app.visible.is_empty());
        app.toggle_completed();
        assert_eq!(app.visible.len(), 1);
    }

    #[test]
    fn bad_recurrence_reports_error_without_saving() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = app(dir.path());
        add(&mut app, &["Odd", "2025-10-05", "", "hourly"]);
        assert!(app.message.as_deref().unwrap_or("").contains("unknown recurrence type"));
        assert!(app.occurrences.is_empty());
    }

    #[test]
    fn unreadable_records_are_announced_and_survive_edits() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Storage::at(dir.path(), "tui").unwrap();
        let bad = serde_json::json!({
            "id": 9, "name": "Fortnightly sync", "deadline": "2025-10-02",
            "isRecurring": true, "recurrence": { "type": "fortnightly", "interval": 1 }
        });
        std::fs::create_dir_all(store.tasks_path().parent().unwrap()).unwrap();
        std::fs::write(store.tasks_path(), serde_json::to_string(&[&bad]).unwrap()).unwrap();

        let mut app = app(dir.path());
        assert_eq!(app.unreadable, 1);
        assert!(app.status_line().contains("1 stored task(s) could not be read"));

        add(&mut app, &["Write report", "2025-10-05", "", ""]);
        assert!(app.status_line().contains("Task added (id = 10)"));
        let raw = std::fs::read_to_string(store.tasks_path()).unwrap();
        assert!(raw.contains("fortnightly"));
    }
}
