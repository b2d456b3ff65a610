use chrono::NaiveDate;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use super::app::{App, InputMode, ViewMode};
use crate::dates::date_key;
use crate::due::{due_state, DueState};
use crate::models::{Occurrence, Priority};

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Body
            Constraint::Length(1), // Status line
            Constraint::Length(3), // Help
        ])
        .split(f.area());

    match app.view_mode {
        ViewMode::Dashboard => render_dashboard(f, app, chunks[0]),
        ViewMode::Tasks => render_tasks(f, app, chunks[0]),
    }

    let status = Paragraph::new(app.status_line())
        .style(Style::default().fg(Color::Yellow));
    f.render_widget(status, chunks[1]);

    let help_text = match app.input_mode {
        InputMode::Normal => match app.view_mode {
            ViewMode::Dashboard => "q: Quit | v: Task List | a: Add | /: Search",
            ViewMode::Tasks => "q: Quit | v: Dashboard | a: Add | Space: Toggle Done | x: Skip Occurrence | d: Del Series | /: Search | p: Priority | s: Status | o: Sort | c: Show Done",
        },
        InputMode::Search => "Enter: Keep Filter | Esc: Clear",
        InputMode::Adding => "Enter: Next Step | Esc: Cancel",
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(help, chunks[2]);

    if app.input_mode != InputMode::Normal {
        let area = centered_rect(60, 3, f.area());
        f.render_widget(Clear, area);

        let title = match app.input_mode {
            InputMode::Search => "Search name or description",
            InputMode::Adding => match app.add_state.step {
                0 => "Add Task: Enter Name",
                1 => "Add Task: Enter Due Date (YYYY-MM-DD)",
                2 => "Add Task: Enter Priority (low/medium/high, optional)",
                3 => "Add Task: Repeat as '<daily|weekly|monthly|yearly> [every] [until]' (optional)",
                _ => "Add Task",
            },
            InputMode::Normal => "",
        };

        let input = Paragraph::new(app.input_buffer.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(title));

        f.render_widget(input, area);
    }
}

fn priority_style(p: Priority) -> Style {
    match p {
        Priority::High => Style::default().fg(Color::Red),
        Priority::Medium => Style::default().fg(Color::Yellow),
        Priority::Low => Style::default().fg(Color::Green),
    }
}

fn row_style(state: DueState) -> Style {
    match state {
        DueState::Overdue(_) => Style::default().fg(Color::Red),
        DueState::Done => Style::default().fg(Color::DarkGray),
        s if s.is_pressing() => Style::default().fg(Color::Yellow),
        _ => Style::default(),
    }
}

fn header(names: &[&'static str]) -> Row<'static> {
    Row::new(names.to_vec())
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .bottom_margin(1)
}

fn render_dashboard(f: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let s = app.stats;
    let summary = format!(
        "Total {}  |  Pending {}  |  In Progress {}  |  Completed {}  |  Overdue {}",
        s.total, s.pending, s.in_progress, s.completed, s.overdue
    );
    let summary = Paragraph::new(summary).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Schedulr - {} ({})", app.ctx.store.user(), app.ctx.today)),
    );
    f.render_widget(summary, rows[0]);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(33),
            Constraint::Percentage(34),
            Constraint::Percentage(33),
        ])
        .split(rows[1]);

    let today = app.ctx.today;
    render_compact(f, panes[0], "Today's Tasks", &app.today_tasks, today);
    render_compact(f, panes[1], "Upcoming", &app.upcoming_tasks, today);
    render_compact(
        f,
        panes[2],
        &format!("Overdue ({})", app.overdue_tasks.len()),
        &app.overdue_tasks,
        today,
    );
}

fn render_compact(f: &mut Frame, area: Rect, title: &str, list: &[Occurrence], today: NaiveDate) {
    let rows: Vec<Row> = list
        .iter()
        .map(|o| {
            let state = due_state(o.deadline, o.status, today);
            Row::new(vec![
                Cell::from(o.name.clone()),
                Cell::from(state.to_string()),
                Cell::from(o.priority.to_string()).style(priority_style(o.priority)),
            ])
            .style(row_style(state))
        })
        .collect();

    let widths = [Constraint::Min(12), Constraint::Length(16), Constraint::Length(7)];
    let table = Table::new(rows, widths)
        .header(header(&["Name", "When", "Prio"]))
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(table, area);
}

fn render_tasks(f: &mut Frame, app: &mut App, area: Rect) {
    let today = app.ctx.today;
    let rows: Vec<Row> = app
        .visible
        .iter()
        .map(|o| {
            let state = due_state(o.deadline, o.status, today);
            let repeats = match (&o.recurrence, o.is_instance) {
                (Some(rule), true) => rule.describe(),
                _ => String::new(),
            };
            Row::new(vec![
                Cell::from(o.base_id().to_string()),
                Cell::from(o.name.clone()),
                Cell::from(date_key(o.deadline)),
                Cell::from(state.to_string()),
                Cell::from(o.priority.to_string()).style(priority_style(o.priority)),
                Cell::from(o.status.to_string()),
                Cell::from(repeats),
            ])
            .style(row_style(state))
        })
        .collect();

    let widths = [
        Constraint::Length(6),
        Constraint::Min(20),
        Constraint::Length(12),
        Constraint::Length(16),
        Constraint::Length(8),
        Constraint::Length(12),
        Constraint::Length(24),
    ];

    let f_prio = app.filter.priority.map_or("all".to_string(), |p| p.to_string());
    let f_status = app.filter.status.map_or("all".to_string(), |s| s.to_string());
    let title = format!(
        "Tasks ({}) - search '{}' | priority {} | status {} | sort {}{}",
        app.visible.len(),
        app.filter.search,
        f_prio,
        f_status,
        app.filter.sort_by,
        if app.show_completed { "" } else { " | hiding done" }
    );

    let table = Table::new(rows, widths)
        .header(header(&["ID", "Name", "Due", "When", "Priority", "Status", "Repeats"]))
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
