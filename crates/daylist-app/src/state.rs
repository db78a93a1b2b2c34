// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::{Date, Duration};

use crate::{NewTask, Priority, TaskFilter, TaskId, format_task_date};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFocus {
    List,
    Draft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub filter: TaskFilter,
    pub selected_date: Date,
    pub draft_title: String,
    pub draft_priority: Priority,
    pub focus: InputFocus,
    pub status_line: Option<String>,
}

impl AppState {
    pub fn new(today: Date) -> Self {
        Self {
            filter: TaskFilter::All,
            selected_date: today,
            draft_title: String::new(),
            draft_priority: Priority::Medium,
            focus: InputFocus::Draft,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    SelectFilter(TaskFilter),
    SelectFilterTab(usize),
    NextFilter,
    PrevFilter,
    SelectDate(Date),
    ShiftDate(i64),
    CyclePriority,
    FocusDraft,
    FocusList,
    InsertChar(char),
    DeleteChar,
    ClearDraft,
    TaskAdded(TaskId),
    TaskToggled { id: TaskId, completed: bool },
    TaskDeleted(TaskId),
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    FilterChanged(TaskFilter),
    DateChanged(Date),
    PriorityChanged(Priority),
    FocusChanged(InputFocus),
    DraftChanged,
    TasksChanged,
    StatusUpdated(String),
    StatusCleared,
}

impl AppEvent {
    /// Every event that alters which rows are visible forces a full reload.
    pub const fn requires_reload(&self) -> bool {
        matches!(
            self,
            Self::FilterChanged(_) | Self::DateChanged(_) | Self::TasksChanged
        )
    }
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::SelectFilter(filter) => self.set_filter(filter),
            AppCommand::SelectFilterTab(index) => match TaskFilter::from_tab_index(index) {
                Some(filter) => self.set_filter(filter),
                None => Vec::new(),
            },
            AppCommand::NextFilter => self.rotate_filter(1),
            AppCommand::PrevFilter => self.rotate_filter(-1),
            AppCommand::SelectDate(date) => self.set_date(date),
            AppCommand::ShiftDate(days) => {
                match self.selected_date.checked_add(Duration::days(days)) {
                    Some(date) => self.set_date(date),
                    None => vec![self.set_status("date out of range")],
                }
            }
            AppCommand::CyclePriority => {
                self.draft_priority = self.draft_priority.next();
                vec![AppEvent::PriorityChanged(self.draft_priority)]
            }
            AppCommand::FocusDraft => {
                self.focus = InputFocus::Draft;
                vec![AppEvent::FocusChanged(self.focus)]
            }
            AppCommand::FocusList => {
                self.focus = InputFocus::List;
                vec![AppEvent::FocusChanged(self.focus)]
            }
            AppCommand::InsertChar(ch) => {
                if ch.is_control() {
                    return Vec::new();
                }
                self.draft_title.push(ch);
                vec![AppEvent::DraftChanged]
            }
            AppCommand::DeleteChar => {
                if self.draft_title.pop().is_some() {
                    vec![AppEvent::DraftChanged]
                } else {
                    Vec::new()
                }
            }
            AppCommand::ClearDraft => {
                self.draft_title.clear();
                vec![AppEvent::DraftChanged]
            }
            AppCommand::TaskAdded(id) => {
                self.draft_title.clear();
                vec![
                    AppEvent::DraftChanged,
                    AppEvent::TasksChanged,
                    self.set_status(&format!("added task {id}")),
                ]
            }
            AppCommand::TaskToggled { id, completed } => {
                let label = if completed { "done" } else { "pending" };
                vec![
                    AppEvent::TasksChanged,
                    self.set_status(&format!("task {id} marked {label}")),
                ]
            }
            AppCommand::TaskDeleted(id) => vec![
                AppEvent::TasksChanged,
                self.set_status(&format!("deleted task {id}")),
            ],
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    /// Builds the insert request for the current draft. Returns `None` when
    /// the title is empty after trimming, leaving the draft untouched.
    pub fn pending_task(&self) -> Option<NewTask> {
        let title = self.draft_title.trim();
        if title.is_empty() {
            return None;
        }
        Some(NewTask {
            title: title.to_owned(),
            priority: self.draft_priority,
            date: self.selected_date,
        })
    }

    pub fn selected_date_label(&self) -> String {
        format_task_date(self.selected_date)
    }

    fn set_filter(&mut self, filter: TaskFilter) -> Vec<AppEvent> {
        self.filter = filter;
        vec![AppEvent::FilterChanged(filter)]
    }

    fn set_date(&mut self, date: Date) -> Vec<AppEvent> {
        self.selected_date = date;
        vec![AppEvent::DateChanged(date)]
    }

    fn rotate_filter(&mut self, delta: isize) -> Vec<AppEvent> {
        let filters = TaskFilter::ALL;
        let current = self.filter.tab_index() as isize;
        let len = filters.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.set_filter(filters[next])
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
