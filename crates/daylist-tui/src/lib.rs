// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use daylist_app::{
    AppCommand, AppEvent, AppState, InputFocus, NewTask, Priority, Task, TaskCounts, TaskFilter,
    TaskId, format_task_date, local_today,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::{Date, Month};
use tracing::{debug, warn};

const APP_TITLE: &str = "Task Manager";
const ORANGE: Color = Color::Rgb(255, 165, 0);
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);

/// Store operations the UI needs. The CLI backs this with the SQLite store;
/// tests back it with an in-memory list.
pub trait AppRuntime {
    fn load_tasks(&mut self, date: Date, filter: TaskFilter) -> Result<Vec<Task>>;
    fn load_counts(&mut self, date: Date) -> Result<TaskCounts>;
    fn add_task(&mut self, task: &NewTask) -> Result<TaskId>;
    /// `Ok(false)` when the task no longer exists.
    fn set_task_completed(&mut self, id: TaskId, completed: bool) -> Result<bool>;
    /// `Ok(false)` when the task no longer exists.
    fn delete_task(&mut self, id: TaskId) -> Result<bool>;
}

/// One visible row of the task list. Rebuilt from the store on every reload;
/// holds nothing beyond what it displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub id: TaskId,
    pub title: String,
    pub priority: Priority,
    pub completed: bool,
}

impl TaskRow {
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            priority: task.priority,
            completed: task.completed,
        }
    }

    pub fn label(&self) -> String {
        format!("[{}] {}", self.priority.as_str(), self.title)
    }

    pub const fn checkbox(&self) -> &'static str {
        if self.completed { "[x]" } else { "[ ]" }
    }

    pub fn style(&self) -> Style {
        let style = Style::default().fg(priority_color(self.priority));
        if self.completed {
            style.add_modifier(Modifier::CROSSED_OUT)
        } else {
            style
        }
    }

    /// Persists the flipped completion flag.
    pub fn toggle<R: AppRuntime>(&self, runtime: &mut R) -> Result<bool> {
        runtime.set_task_completed(self.id, !self.completed)
    }

    pub fn delete<R: AppRuntime>(&self, runtime: &mut R) -> Result<bool> {
        runtime.delete_task(self.id)
    }
}

pub const fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::Low => Color::Green,
        Priority::Medium => ORANGE,
        Priority::High => Color::Red,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, PartialEq, Default)]
struct DatePickerUiState {
    visible: bool,
    original: Option<Date>,
    selected: Option<Date>,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct ViewData {
    rows: Vec<TaskRow>,
    counts: TaskCounts,
    selected_row: usize,
    pending_selection: Option<TaskId>,
    date_picker: DatePickerUiState,
    help_visible: bool,
    status_token: u64,
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    if let Err(error) = refresh_view_data(state, runtime, &mut view_data) {
        warn!(error = %format!("{error:#}"), "initial load failed");
        state.dispatch(AppCommand::SetStatus(format!("load failed: {error}")));
    }

    let result = event_loop(
        &mut terminal,
        state,
        runtime,
        &mut view_data,
        &internal_tx,
        &internal_rx,
    );

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn event_loop<R: AppRuntime>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    internal_rx: &Receiver<InternalEvent>,
) -> Result<()> {
    loop {
        process_internal_events(state, view_data, internal_rx);

        terminal
            .draw(|frame| render(frame, state, view_data))
            .context("draw frame")?;

        if !event::poll(Duration::from_millis(120)).context("poll event")? {
            continue;
        }
        if let Event::Key(key) = event::read().context("read event")?
            && handle_key_event(state, runtime, view_data, internal_tx, key)
        {
            return Ok(());
        }
    }
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            view_data.help_visible = false;
        }
        return false;
    }

    if view_data.date_picker.visible {
        handle_date_picker_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    match state.focus {
        InputFocus::Draft => {
            handle_draft_key(state, runtime, view_data, internal_tx, key);
            false
        }
        InputFocus::List => handle_list_key(state, runtime, view_data, internal_tx, key),
    }
}

fn handle_draft_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let command = match (key.code, key.modifiers) {
        (KeyCode::Enter, _) => {
            submit_draft(state, runtime, view_data, internal_tx);
            return;
        }
        (KeyCode::Esc, _) | (KeyCode::Tab, _) => AppCommand::FocusList,
        (KeyCode::Backspace, _) => AppCommand::DeleteChar,
        (KeyCode::Char('p'), KeyModifiers::CONTROL) => AppCommand::CyclePriority,
        (KeyCode::Char('u'), KeyModifiers::CONTROL) => AppCommand::ClearDraft,
        (KeyCode::Char(ch), modifiers)
            if modifiers == KeyModifiers::NONE || modifiers == KeyModifiers::SHIFT =>
        {
            AppCommand::InsertChar(ch)
        }
        _ => return,
    };
    dispatch_and_refresh(state, runtime, view_data, command, internal_tx);
}

fn handle_list_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let command = match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('j') | KeyCode::Down => {
            move_row(view_data, 1);
            return false;
        }
        KeyCode::Char('k') | KeyCode::Up => {
            move_row(view_data, -1);
            return false;
        }
        KeyCode::Char('g') | KeyCode::Home => {
            view_data.selected_row = 0;
            return false;
        }
        KeyCode::Char('G') | KeyCode::End => {
            view_data.selected_row = view_data.rows.len().saturating_sub(1);
            return false;
        }
        KeyCode::Char(' ') | KeyCode::Enter => {
            toggle_selected_row(state, runtime, view_data, internal_tx);
            return false;
        }
        KeyCode::Char('x') | KeyCode::Delete => {
            delete_selected_row(state, runtime, view_data, internal_tx);
            return false;
        }
        KeyCode::Char('d') => {
            open_date_picker(state, view_data);
            return false;
        }
        KeyCode::Char('?') => {
            view_data.help_visible = true;
            return false;
        }
        KeyCode::Char('a') | KeyCode::Char('i') | KeyCode::Tab => AppCommand::FocusDraft,
        KeyCode::Char('h') | KeyCode::Left => AppCommand::ShiftDate(-1),
        KeyCode::Char('l') | KeyCode::Right => AppCommand::ShiftDate(1),
        KeyCode::Char('t') => AppCommand::SelectDate(local_today()),
        KeyCode::Char('f') => AppCommand::NextFilter,
        KeyCode::Char('b') => AppCommand::PrevFilter,
        KeyCode::Char('p') => AppCommand::CyclePriority,
        KeyCode::Char(digit @ '1'..='3') => {
            AppCommand::SelectFilterTab(usize::from(digit as u8 - b'1'))
        }
        _ => return false,
    };
    dispatch_and_refresh(state, runtime, view_data, command, internal_tx);
    false
}

fn submit_draft<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(task) = state.pending_task() else {
        return;
    };

    match runtime.add_task(&task) {
        Ok(id) => {
            view_data.pending_selection = Some(id);
            dispatch_and_refresh(
                state,
                runtime,
                view_data,
                AppCommand::TaskAdded(id),
                internal_tx,
            );
        }
        Err(error) => {
            warn!(error = %format!("{error:#}"), "add task failed");
            emit_status(state, view_data, internal_tx, format!("add failed: {error}"));
        }
    }
}

fn toggle_selected_row<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(row) = view_data.rows.get(view_data.selected_row).cloned() else {
        emit_status(state, view_data, internal_tx, "no task selected");
        return;
    };

    match row.toggle(runtime) {
        Ok(true) => {
            view_data.pending_selection = Some(row.id);
            dispatch_and_refresh(
                state,
                runtime,
                view_data,
                AppCommand::TaskToggled {
                    id: row.id,
                    completed: !row.completed,
                },
                internal_tx,
            );
        }
        Ok(false) => report_missing_row(state, runtime, view_data, internal_tx, row.id),
        Err(error) => {
            warn!(id = %row.id, error = %format!("{error:#}"), "toggle task failed");
            emit_status(
                state,
                view_data,
                internal_tx,
                format!("toggle failed: {error}"),
            );
        }
    }
}

fn delete_selected_row<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(row) = view_data.rows.get(view_data.selected_row).cloned() else {
        emit_status(state, view_data, internal_tx, "no task selected");
        return;
    };

    match row.delete(runtime) {
        Ok(true) => dispatch_and_refresh(
            state,
            runtime,
            view_data,
            AppCommand::TaskDeleted(row.id),
            internal_tx,
        ),
        Ok(false) => report_missing_row(state, runtime, view_data, internal_tx, row.id),
        Err(error) => {
            warn!(id = %row.id, error = %format!("{error:#}"), "delete task failed");
            emit_status(
                state,
                view_data,
                internal_tx,
                format!("delete failed: {error}"),
            );
        }
    }
}

fn report_missing_row<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    id: TaskId,
) {
    debug!(%id, "row vanished before action");
    let message = match refresh_view_data(state, runtime, view_data) {
        Ok(()) => format!("task {id} no longer exists"),
        Err(error) => format!("load failed: {error}"),
    };
    emit_status(state, view_data, internal_tx, message);
}

fn open_date_picker(state: &AppState, view_data: &mut ViewData) {
    view_data.date_picker = DatePickerUiState {
        visible: true,
        original: Some(state.selected_date),
        selected: Some(state.selected_date),
    };
}

fn handle_date_picker_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(current) = view_data.date_picker.selected else {
        view_data.date_picker = DatePickerUiState::default();
        return;
    };

    let next = match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            view_data.date_picker = DatePickerUiState::default();
            emit_status(state, view_data, internal_tx, "date change canceled");
            return;
        }
        (KeyCode::Enter, _) => {
            view_data.date_picker = DatePickerUiState::default();
            dispatch_and_refresh(
                state,
                runtime,
                view_data,
                AppCommand::SelectDate(current),
                internal_tx,
            );
            return;
        }
        (KeyCode::Char('h'), _) | (KeyCode::Left, _) => shift_date_by_days(current, -1),
        (KeyCode::Char('l'), _) | (KeyCode::Right, _) => shift_date_by_days(current, 1),
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => shift_date_by_days(current, 7),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => shift_date_by_days(current, -7),
        (KeyCode::Char('H'), _) => shift_date_by_months(current, -1),
        (KeyCode::Char('L'), _) => shift_date_by_months(current, 1),
        (KeyCode::Char('['), _) => shift_date_by_years(current, -1),
        (KeyCode::Char(']'), _) => shift_date_by_years(current, 1),
        (KeyCode::Char('t'), _) => Some(local_today()),
        _ => None,
    };

    if let Some(date) = next {
        view_data.date_picker.selected = Some(date);
    }
}

fn shift_date_by_days(date: Date, days: i64) -> Option<Date> {
    date.checked_add(time::Duration::days(days))
}

fn shift_date_by_years(date: Date, years: i32) -> Option<Date> {
    shift_date_by_months(date, years.saturating_mul(12))
}

fn shift_date_by_months(date: Date, months: i32) -> Option<Date> {
    let base_month = i32::from(date.month() as u8);
    let total_month = base_month - 1 + months;
    let year = date.year() + total_month.div_euclid(12);
    let month_number = (total_month.rem_euclid(12) + 1) as u8;
    let month = Month::try_from(month_number).ok()?;
    let max_day = month_length(year, month)?;
    Date::from_calendar_date(year, month, date.day().min(max_day)).ok()
}

fn month_length(year: i32, month: Month) -> Option<u8> {
    let (next_year, next_month) = match month {
        Month::December => (year + 1, Month::January),
        other => (year, other.next()),
    };
    let first_of_next = Date::from_calendar_date(next_year, next_month, 1).ok()?;
    Some(first_of_next.previous_day()?.day())
}

fn move_row(view_data: &mut ViewData, delta: isize) {
    if view_data.rows.is_empty() {
        view_data.selected_row = 0;
        return;
    }
    let last = view_data.rows.len() - 1;
    let next = view_data.selected_row.saturating_add_signed(delta);
    view_data.selected_row = next.min(last);
}

fn dispatch_and_refresh<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    command: AppCommand,
    internal_tx: &Sender<InternalEvent>,
) {
    let events = state.dispatch(command);
    if events.iter().any(AppEvent::requires_reload)
        && let Err(error) = refresh_view_data(state, runtime, view_data)
    {
        warn!(error = %format!("{error:#}"), "reload failed");
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("load failed: {error}"),
        );
        return;
    }
    if events
        .iter()
        .any(|event| matches!(event, AppEvent::StatusUpdated(_)))
    {
        view_data.status_token = view_data.status_token.saturating_add(1);
        schedule_status_clear(internal_tx, view_data.status_token);
    }
}

/// Re-queries the store for the current (date, filter) pair and rebuilds
/// every row from scratch.
fn refresh_view_data<R: AppRuntime>(
    state: &AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    let tasks = runtime.load_tasks(state.selected_date, state.filter)?;
    view_data.counts = runtime.load_counts(state.selected_date)?;
    view_data.rows = tasks.iter().map(TaskRow::from_task).collect();

    if let Some(id) = view_data.pending_selection.take()
        && let Some(index) = view_data.rows.iter().position(|row| row.id == id)
    {
        view_data.selected_row = index;
    }
    view_data.selected_row = view_data
        .selected_row
        .min(view_data.rows.len().saturating_sub(1));

    debug!(
        date = %state.selected_date,
        filter = state.filter.as_str(),
        rows = view_data.rows.len(),
        "reloaded task list"
    );
    Ok(())
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(render_date_line(state)).block(
        Block::default()
            .title(APP_TITLE)
            .borders(Borders::ALL)
            .title_style(Style::default().add_modifier(Modifier::BOLD)),
    );
    frame.render_widget(header, layout[0]);

    let draft_focused = state.focus == InputFocus::Draft;
    let draft = Paragraph::new(render_draft_line(state)).block(
        Block::default()
            .title("new task")
            .borders(Borders::ALL)
            .border_style(focus_style(draft_focused)),
    );
    frame.render_widget(draft, layout[1]);

    let tabs = Tabs::new(filter_tab_titles(view_data.counts))
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(state.filter.tab_index());
    frame.render_widget(tabs, layout[2]);

    render_task_list(frame, layout[3], state, view_data);

    let status_widget = Paragraph::new(status_text(state))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[4]);

    if view_data.date_picker.visible {
        let area = centered_rect(48, 40, frame.area());
        frame.render_widget(Clear, area);
        let picker = Paragraph::new(render_date_picker_overlay_text(&view_data.date_picker))
            .block(Block::default().title("select date").borders(Borders::ALL));
        frame.render_widget(picker, area);
    }

    if view_data.help_visible {
        let area = centered_rect(70, 70, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_task_list(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    view_data: &ViewData,
) {
    let block = Block::default()
        .title(format!("tasks for {}", state.selected_date_label()))
        .borders(Borders::ALL)
        .border_style(focus_style(state.focus == InputFocus::List));

    if view_data.rows.is_empty() {
        let empty = Paragraph::new(empty_list_text(state))
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items = view_data
        .rows
        .iter()
        .map(|row| {
            ListItem::new(Line::from(vec![
                Span::raw(format!("{} ", row.checkbox())),
                Span::styled(row.label(), row.style()),
            ]))
        })
        .collect::<Vec<_>>();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut list_state = ListState::default().with_selected(Some(view_data.selected_row));
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_date_line(state: &AppState) -> String {
    format!(
        "date: {}   (d pick | h/l day | t today)",
        state.selected_date_label()
    )
}

fn render_draft_line(state: &AppState) -> Line<'static> {
    let cursor = if state.focus == InputFocus::Draft {
        "_"
    } else {
        ""
    };
    Line::from(vec![
        Span::styled(
            format!("[{}] ", state.draft_priority.as_str()),
            Style::default().fg(priority_color(state.draft_priority)),
        ),
        Span::raw(format!("{}{cursor}", state.draft_title)),
    ])
}

fn filter_tab_titles(counts: TaskCounts) -> Vec<String> {
    TaskFilter::ALL
        .iter()
        .map(|filter| format!("{} ({})", filter.label(), counts.for_filter(*filter)))
        .collect()
}

fn empty_list_text(state: &AppState) -> String {
    match state.filter {
        TaskFilter::All => format!("no tasks for {}", state.selected_date_label()),
        filter => format!(
            "no {} tasks for {}",
            filter.label().to_ascii_lowercase(),
            state.selected_date_label()
        ),
    }
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn status_text(state: &AppState) -> String {
    if let Some(status) = &state.status_line {
        return status.clone();
    }
    match state.focus {
        InputFocus::Draft => "enter add | ctrl+p priority | esc list | ctrl+q quit".to_owned(),
        InputFocus::List => {
            "space toggle | x delete | a add | d date | f/b filter | ? help | q quit".to_owned()
        }
    }
}

fn render_date_picker_overlay_text(date_picker: &DatePickerUiState) -> String {
    let selected = date_picker
        .selected
        .map(format_task_date)
        .unwrap_or_else(|| "-".to_owned());
    let original = date_picker
        .original
        .map(format_task_date)
        .unwrap_or_else(|| "-".to_owned());
    let weekday = date_picker
        .selected
        .map(|date| date.weekday().to_string())
        .unwrap_or_default();

    [
        format!("from: {original}"),
        format!("pick: {selected} {weekday}"),
        String::new(),
        "h/l day | j/k week | H/L month | [/] year | t today".to_owned(),
        "enter pick | esc cancel".to_owned(),
    ]
    .join("\n")
}

fn help_overlay_text() -> &'static str {
    "list\n  j/k        move\n  space      toggle done\n  x / del    delete task\n  a / i      type a new task\n  p          cycle priority\n  h/l        previous/next day\n  t          today\n  d          pick a date\n  f/b 1-3    filter all/completed/pending\n  q          quit\n\nnew task\n  enter      add\n  ctrl+p     cycle priority\n  ctrl+u     clear\n  esc        back to list\n\nesc or ? closes this help"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, InternalEvent, ORANGE, TaskRow, ViewData, filter_tab_titles,
        handle_key_event, priority_color, process_internal_events, refresh_view_data, render,
        render_date_picker_overlay_text, shift_date_by_months, shift_date_by_years, status_text,
    };
    use anyhow::{Result, anyhow};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use daylist_app::{
        AppState, InputFocus, NewTask, Priority, Task, TaskCounts, TaskFilter, TaskId,
    };
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::style::{Color, Modifier};
    use std::sync::mpsc;
    use time::{Date, Month, OffsetDateTime};

    #[derive(Debug, Default)]
    struct TestRuntime {
        tasks: Vec<Task>,
        next_id: i64,
        add_count: usize,
        fail_writes: Option<String>,
        forget_on_write: bool,
    }

    impl TestRuntime {
        fn with_tasks(tasks: &[(&str, Priority, bool, Date)]) -> Self {
            let mut runtime = Self::default();
            for (title, priority, completed, date) in tasks {
                let id = runtime.insert(title, *priority, *date);
                if *completed {
                    runtime.find_mut(id).expect("inserted task").completed = true;
                }
            }
            runtime
        }

        fn insert(&mut self, title: &str, priority: Priority, date: Date) -> TaskId {
            self.next_id += 1;
            let id = TaskId::new(self.next_id);
            self.tasks.push(Task {
                id,
                title: title.to_owned(),
                priority,
                completed: false,
                date,
                created_at: OffsetDateTime::UNIX_EPOCH,
            });
            id
        }

        fn find_mut(&mut self, id: TaskId) -> Option<&mut Task> {
            self.tasks.iter_mut().find(|task| task.id == id)
        }

        fn check_write(&mut self) -> Result<()> {
            match &self.fail_writes {
                Some(message) => Err(anyhow!("{message}")),
                None => Ok(()),
            }
        }
    }

    impl AppRuntime for TestRuntime {
        fn load_tasks(&mut self, date: Date, filter: TaskFilter) -> Result<Vec<Task>> {
            Ok(self
                .tasks
                .iter()
                .filter(|task| task.date == date && filter.matches(task.completed))
                .cloned()
                .collect())
        }

        fn load_counts(&mut self, date: Date) -> Result<TaskCounts> {
            let mut counts = TaskCounts::default();
            for task in self.tasks.iter().filter(|task| task.date == date) {
                if task.completed {
                    counts.completed += 1;
                } else {
                    counts.pending += 1;
                }
            }
            Ok(counts)
        }

        fn add_task(&mut self, task: &NewTask) -> Result<TaskId> {
            self.check_write()?;
            self.add_count += 1;
            Ok(self.insert(&task.title, task.priority, task.date))
        }

        fn set_task_completed(&mut self, id: TaskId, completed: bool) -> Result<bool> {
            self.check_write()?;
            if self.forget_on_write {
                self.tasks.retain(|task| task.id != id);
            }
            Ok(match self.find_mut(id) {
                Some(task) => {
                    task.completed = completed;
                    true
                }
                None => false,
            })
        }

        fn delete_task(&mut self, id: TaskId) -> Result<bool> {
            self.check_write()?;
            if self.forget_on_write {
                self.tasks.retain(|task| task.id != id);
                return Ok(false);
            }
            let before = self.tasks.len();
            self.tasks.retain(|task| task.id != id);
            Ok(self.tasks.len() < before)
        }
    }

    fn new_year() -> Date {
        Date::from_calendar_date(2024, Month::January, 1).expect("valid date")
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    fn internal_tx() -> mpsc::Sender<InternalEvent> {
        let (tx, _rx) = mpsc::channel();
        tx
    }

    fn loaded(state: &AppState, runtime: &mut TestRuntime) -> Result<ViewData> {
        let mut view_data = ViewData::default();
        refresh_view_data(state, runtime, &mut view_data)?;
        Ok(view_data)
    }

    fn press(
        state: &mut AppState,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        keys: &[KeyEvent],
    ) -> bool {
        let tx = internal_tx();
        let mut quit = false;
        for key in keys {
            quit = handle_key_event(state, runtime, view_data, &tx, *key);
        }
        quit
    }

    fn type_text(state: &mut AppState, runtime: &mut TestRuntime, view_data: &mut ViewData, text: &str) {
        let keys = text
            .chars()
            .map(|ch| key(KeyCode::Char(ch)))
            .collect::<Vec<_>>();
        press(state, runtime, view_data, &keys);
    }

    fn titles(view_data: &ViewData) -> Vec<&str> {
        view_data.rows.iter().map(|row| row.title.as_str()).collect()
    }

    #[test]
    fn row_label_and_checkbox_follow_task() {
        let row = TaskRow {
            id: TaskId::new(1),
            title: "Buy milk".to_owned(),
            priority: Priority::Medium,
            completed: false,
        };
        assert_eq!(row.label(), "[Medium] Buy milk");
        assert_eq!(row.checkbox(), "[ ]");

        let done = TaskRow {
            completed: true,
            ..row
        };
        assert_eq!(done.checkbox(), "[x]");
    }

    #[test]
    fn priority_maps_to_fixed_colors() {
        assert_eq!(priority_color(Priority::Low), Color::Green);
        assert_eq!(priority_color(Priority::Medium), ORANGE);
        assert_eq!(priority_color(Priority::High), Color::Red);
    }

    #[test]
    fn completed_rows_render_struck_through() {
        let pending = TaskRow {
            id: TaskId::new(1),
            title: "Call plumber".to_owned(),
            priority: Priority::High,
            completed: false,
        };
        assert!(!pending.style().add_modifier.contains(Modifier::CROSSED_OUT));
        assert_eq!(pending.style().fg, Some(Color::Red));

        let done = TaskRow {
            completed: true,
            ..pending
        };
        assert!(done.style().add_modifier.contains(Modifier::CROSSED_OUT));
        assert_eq!(done.style().fg, Some(Color::Red));
    }

    #[test]
    fn typing_and_enter_adds_task_and_clears_draft() -> Result<()> {
        let mut state = AppState::new(new_year());
        let mut runtime = TestRuntime::default();
        let mut view_data = loaded(&state, &mut runtime)?;

        type_text(&mut state, &mut runtime, &mut view_data, "  Buy milk  ");
        press(&mut state, &mut runtime, &mut view_data, &[key(KeyCode::Enter)]);

        assert_eq!(runtime.add_count, 1);
        assert!(state.draft_title.is_empty());
        assert_eq!(titles(&view_data), vec!["Buy milk"]);
        assert_eq!(view_data.rows[0].priority, Priority::Medium);
        assert!(!view_data.rows[0].completed);
        assert_eq!(view_data.counts.pending, 1);
        Ok(())
    }

    #[test]
    fn whitespace_only_draft_is_ignored() -> Result<()> {
        let mut state = AppState::new(new_year());
        let mut runtime =
            TestRuntime::with_tasks(&[("Existing", Priority::Low, false, new_year())]);
        let mut view_data = loaded(&state, &mut runtime)?;
        let before = view_data.rows.clone();

        type_text(&mut state, &mut runtime, &mut view_data, "   ");
        press(&mut state, &mut runtime, &mut view_data, &[key(KeyCode::Enter)]);

        assert_eq!(runtime.add_count, 0);
        assert_eq!(view_data.rows, before);
        assert!(state.status_line.is_none());
        Ok(())
    }

    #[test]
    fn priority_cycles_before_submit() -> Result<()> {
        let mut state = AppState::new(new_year());
        let mut runtime = TestRuntime::default();
        let mut view_data = loaded(&state, &mut runtime)?;

        type_text(&mut state, &mut runtime, &mut view_data, "Fix sink");
        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[ctrl('p'), key(KeyCode::Enter)],
        );

        assert_eq!(view_data.rows[0].priority, Priority::High);
        assert_eq!(state.draft_priority, Priority::High);
        Ok(())
    }

    #[test]
    fn q_types_into_draft_but_quits_from_list() -> Result<()> {
        let mut state = AppState::new(new_year());
        let mut runtime = TestRuntime::default();
        let mut view_data = loaded(&state, &mut runtime)?;

        let quit = press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Char('q'))],
        );
        assert!(!quit);
        assert_eq!(state.draft_title, "q");

        let quit = press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Esc), key(KeyCode::Char('q'))],
        );
        assert!(quit);
        Ok(())
    }

    #[test]
    fn ctrl_q_quits_from_any_focus() -> Result<()> {
        let mut state = AppState::new(new_year());
        let mut runtime = TestRuntime::default();
        let mut view_data = loaded(&state, &mut runtime)?;
        assert!(press(&mut state, &mut runtime, &mut view_data, &[ctrl('q')]));
        Ok(())
    }

    #[test]
    fn space_toggles_selected_row_and_reloads() -> Result<()> {
        let mut state = AppState::new(new_year());
        let mut runtime = TestRuntime::with_tasks(&[
            ("first", Priority::Low, false, new_year()),
            ("second", Priority::High, false, new_year()),
        ]);
        let mut view_data = loaded(&state, &mut runtime)?;

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Esc), key(KeyCode::Char('j')), key(KeyCode::Char(' '))],
        );
        assert!(!view_data.rows[0].completed);
        assert!(view_data.rows[1].completed);
        assert_eq!(view_data.counts.completed, 1);
        assert_eq!(state.status_line.as_deref(), Some("task 2 marked done"));

        press(&mut state, &mut runtime, &mut view_data, &[key(KeyCode::Char(' '))]);
        assert!(!view_data.rows[1].completed);
        Ok(())
    }

    #[test]
    fn toggle_under_pending_filter_drops_row() -> Result<()> {
        let mut state = AppState::new(new_year());
        let mut runtime = TestRuntime::with_tasks(&[
            ("a", Priority::Low, false, new_year()),
            ("b", Priority::Low, false, new_year()),
        ]);
        let mut view_data = loaded(&state, &mut runtime)?;

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[
                key(KeyCode::Esc),
                key(KeyCode::Char('3')),
                key(KeyCode::Char(' ')),
            ],
        );
        assert_eq!(state.filter, TaskFilter::Pending);
        assert_eq!(titles(&view_data), vec!["b"]);
        assert_eq!(view_data.selected_row, 0);
        Ok(())
    }

    #[test]
    fn delete_removes_row() -> Result<()> {
        let mut state = AppState::new(new_year());
        let mut runtime = TestRuntime::with_tasks(&[
            ("keep", Priority::Low, false, new_year()),
            ("drop", Priority::High, true, new_year()),
        ]);
        let mut view_data = loaded(&state, &mut runtime)?;

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Esc), key(KeyCode::Char('G')), key(KeyCode::Char('x'))],
        );
        assert_eq!(titles(&view_data), vec!["keep"]);
        assert_eq!(view_data.selected_row, 0);
        assert_eq!(state.status_line.as_deref(), Some("deleted task 2"));
        Ok(())
    }

    #[test]
    fn filter_keys_narrow_rows() -> Result<()> {
        let mut state = AppState::new(new_year());
        let mut runtime = TestRuntime::with_tasks(&[
            ("done", Priority::Low, true, new_year()),
            ("open", Priority::Medium, false, new_year()),
        ]);
        let mut view_data = loaded(&state, &mut runtime)?;
        press(&mut state, &mut runtime, &mut view_data, &[key(KeyCode::Esc)]);

        press(&mut state, &mut runtime, &mut view_data, &[key(KeyCode::Char('2'))]);
        assert_eq!(titles(&view_data), vec!["done"]);

        press(&mut state, &mut runtime, &mut view_data, &[key(KeyCode::Char('f'))]);
        assert_eq!(state.filter, TaskFilter::Pending);
        assert_eq!(titles(&view_data), vec!["open"]);

        press(&mut state, &mut runtime, &mut view_data, &[key(KeyCode::Char('f'))]);
        assert_eq!(state.filter, TaskFilter::All);
        assert_eq!(titles(&view_data), vec!["done", "open"]);
        Ok(())
    }

    #[test]
    fn day_keys_switch_dates() -> Result<()> {
        let tomorrow = Date::from_calendar_date(2024, Month::January, 2)?;
        let mut state = AppState::new(new_year());
        let mut runtime = TestRuntime::with_tasks(&[
            ("today", Priority::Low, false, new_year()),
            ("tomorrow", Priority::Low, false, tomorrow),
        ]);
        let mut view_data = loaded(&state, &mut runtime)?;

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Esc), key(KeyCode::Char('l'))],
        );
        assert_eq!(state.selected_date, tomorrow);
        assert_eq!(titles(&view_data), vec!["tomorrow"]);

        press(&mut state, &mut runtime, &mut view_data, &[key(KeyCode::Char('h'))]);
        assert_eq!(titles(&view_data), vec!["today"]);
        Ok(())
    }

    #[test]
    fn date_picker_commits_on_enter_and_reloads() -> Result<()> {
        let target = Date::from_calendar_date(2024, Month::February, 9)?;
        let mut state = AppState::new(new_year());
        let mut runtime = TestRuntime::with_tasks(&[("later", Priority::High, false, target)]);
        let mut view_data = loaded(&state, &mut runtime)?;
        assert!(view_data.rows.is_empty());

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[
                key(KeyCode::Esc),
                key(KeyCode::Char('d')),
                key(KeyCode::Char('L')),
                key(KeyCode::Char('j')),
                key(KeyCode::Char('l')),
            ],
        );
        assert!(view_data.date_picker.visible);
        assert_eq!(view_data.date_picker.selected, Some(target));
        assert_eq!(state.selected_date, new_year());

        press(&mut state, &mut runtime, &mut view_data, &[key(KeyCode::Enter)]);
        assert!(!view_data.date_picker.visible);
        assert_eq!(state.selected_date, target);
        assert_eq!(state.selected_date_label(), "2024-02-09");
        assert_eq!(titles(&view_data), vec!["later"]);
        Ok(())
    }

    #[test]
    fn date_picker_escape_keeps_date() -> Result<()> {
        let mut state = AppState::new(new_year());
        let mut runtime = TestRuntime::default();
        let mut view_data = loaded(&state, &mut runtime)?;

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[
                key(KeyCode::Esc),
                key(KeyCode::Char('d')),
                key(KeyCode::Char(']')),
                key(KeyCode::Esc),
            ],
        );
        assert!(!view_data.date_picker.visible);
        assert_eq!(state.selected_date, new_year());
        assert_eq!(state.status_line.as_deref(), Some("date change canceled"));
        Ok(())
    }

    #[test]
    fn date_picker_overlay_shows_original_and_pick() -> Result<()> {
        let mut state = AppState::new(new_year());
        let mut runtime = TestRuntime::default();
        let mut view_data = loaded(&state, &mut runtime)?;
        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Esc), key(KeyCode::Char('d')), key(KeyCode::Char('l'))],
        );

        let text = render_date_picker_overlay_text(&view_data.date_picker);
        assert!(text.contains("from: 2024-01-01"));
        assert!(text.contains("pick: 2024-01-02 Tuesday"));
        Ok(())
    }

    #[test]
    fn month_shift_clamps_to_month_end() -> Result<()> {
        let jan_31 = Date::from_calendar_date(2024, Month::January, 31)?;
        assert_eq!(
            shift_date_by_months(jan_31, 1),
            Some(Date::from_calendar_date(2024, Month::February, 29)?)
        );
        assert_eq!(
            shift_date_by_months(jan_31, -2),
            Some(Date::from_calendar_date(2023, Month::November, 30)?)
        );
        let leap_day = Date::from_calendar_date(2024, Month::February, 29)?;
        assert_eq!(
            shift_date_by_years(leap_day, 1),
            Some(Date::from_calendar_date(2025, Month::February, 28)?)
        );
        Ok(())
    }

    #[test]
    fn store_failure_is_reported_without_quitting() -> Result<()> {
        let mut state = AppState::new(new_year());
        let mut runtime = TestRuntime {
            fail_writes: Some("disk I/O error".to_owned()),
            ..TestRuntime::default()
        };
        let mut view_data = loaded(&state, &mut runtime)?;

        type_text(&mut state, &mut runtime, &mut view_data, "Doomed");
        let quit = press(&mut state, &mut runtime, &mut view_data, &[key(KeyCode::Enter)]);

        assert!(!quit);
        assert!(view_data.rows.is_empty());
        assert_eq!(state.draft_title, "Doomed");
        assert_eq!(
            state.status_line.as_deref(),
            Some("add failed: disk I/O error")
        );
        Ok(())
    }

    #[test]
    fn vanished_row_reports_and_reloads() -> Result<()> {
        let mut state = AppState::new(new_year());
        let mut runtime = TestRuntime::with_tasks(&[("ghost", Priority::Low, false, new_year())]);
        let mut view_data = loaded(&state, &mut runtime)?;
        runtime.forget_on_write = true;

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Esc), key(KeyCode::Char(' '))],
        );
        assert!(view_data.rows.is_empty());
        assert_eq!(
            state.status_line.as_deref(),
            Some("task 1 no longer exists")
        );
        Ok(())
    }

    #[test]
    fn actions_on_empty_list_report_no_selection() -> Result<()> {
        let mut state = AppState::new(new_year());
        let mut runtime = TestRuntime::default();
        let mut view_data = loaded(&state, &mut runtime)?;

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Esc), key(KeyCode::Char('x'))],
        );
        assert_eq!(state.status_line.as_deref(), Some("no task selected"));
        Ok(())
    }

    #[test]
    fn stale_status_clear_tokens_are_ignored() -> Result<()> {
        let mut state = AppState::new(new_year());
        let mut runtime = TestRuntime::default();
        let mut view_data = loaded(&state, &mut runtime)?;
        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Esc), key(KeyCode::Char('x'))],
        );
        let current = view_data.status_token;

        let (tx, rx) = mpsc::channel();
        tx.send(InternalEvent::ClearStatus {
            token: current.saturating_sub(1),
        })?;
        process_internal_events(&mut state, &mut view_data, &rx);
        assert!(state.status_line.is_some());

        tx.send(InternalEvent::ClearStatus { token: current })?;
        process_internal_events(&mut state, &mut view_data, &rx);
        assert!(state.status_line.is_none());
        Ok(())
    }

    #[test]
    fn help_overlay_swallows_keys_until_closed() -> Result<()> {
        let mut state = AppState::new(new_year());
        let mut runtime = TestRuntime::with_tasks(&[("a", Priority::Low, false, new_year())]);
        let mut view_data = loaded(&state, &mut runtime)?;

        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Esc), key(KeyCode::Char('?')), key(KeyCode::Char(' '))],
        );
        assert!(view_data.help_visible);
        assert!(!view_data.rows[0].completed);

        press(&mut state, &mut runtime, &mut view_data, &[key(KeyCode::Esc)]);
        assert!(!view_data.help_visible);
        Ok(())
    }

    #[test]
    fn status_hint_tracks_focus() {
        let mut state = AppState::new(new_year());
        assert!(status_text(&state).contains("enter add"));
        state.focus = InputFocus::List;
        assert!(status_text(&state).contains("space toggle"));
        state.status_line = Some("saved".to_owned());
        assert_eq!(status_text(&state), "saved");
    }

    #[test]
    fn tab_titles_carry_counts() {
        let titles = filter_tab_titles(TaskCounts {
            completed: 1,
            pending: 2,
        });
        assert_eq!(titles, vec!["All (3)", "Completed (1)", "Pending (2)"]);
    }

    #[test]
    fn render_draws_title_and_rows() -> Result<()> {
        let state = AppState::new(new_year());
        let mut runtime =
            TestRuntime::with_tasks(&[("Buy milk", Priority::Medium, false, new_year())]);
        let view_data = loaded(&state, &mut runtime)?;

        let mut terminal = Terminal::new(TestBackend::new(80, 24))?;
        terminal.draw(|frame| render(frame, &state, &view_data))?;

        let screen = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>();
        assert!(screen.contains("Task Manager"));
        assert!(screen.contains("2024-01-01"));
        assert!(screen.contains("[Medium] Buy milk"));
        assert!(screen.contains("All (1)"));
        Ok(())
    }
}
