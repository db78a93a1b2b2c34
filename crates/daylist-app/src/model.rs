// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::ids::TaskId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Low" => Some(Self::Low),
            "Medium" => Some(Self::Medium),
            "High" => Some(Self::High),
            _ => None,
        }
    }

    /// Low -> Medium -> High -> Low.
    pub const fn next(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High => Self::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskFilter {
    #[default]
    All,
    Completed,
    Pending,
}

impl TaskFilter {
    /// Tab order of the filter selector.
    pub const ALL: [Self; 3] = [Self::All, Self::Completed, Self::Pending];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Completed => "COMPLETED",
            Self::Pending => "PENDING",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Completed => "Completed",
            Self::Pending => "Pending",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "completed" => Some(Self::Completed),
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }

    pub fn from_tab_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn tab_index(self) -> usize {
        Self::ALL
            .iter()
            .position(|filter| *filter == self)
            .unwrap_or(0)
    }

    /// `None` means the filter does not narrow on completion.
    pub const fn completed_flag(self) -> Option<bool> {
        match self {
            Self::All => None,
            Self::Completed => Some(true),
            Self::Pending => Some(false),
        }
    }

    pub fn matches(self, completed: bool) -> bool {
        self.completed_flag()
            .is_none_or(|wanted| wanted == completed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub priority: Priority,
    pub completed: bool,
    pub date: Date,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub priority: Priority,
    pub date: Date,
}

impl NewTask {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            bail!("task title is required -- type a description before adding");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub completed: usize,
    pub pending: usize,
}

impl TaskCounts {
    pub const fn total(self) -> usize {
        self.completed + self.pending
    }

    pub const fn for_filter(self, filter: TaskFilter) -> usize {
        match filter {
            TaskFilter::All => self.total(),
            TaskFilter::Completed => self.completed,
            TaskFilter::Pending => self.pending,
        }
    }
}

/// Fixed textual form used for display and storage: `YYYY-MM-DD`.
pub fn format_task_date(value: Date) -> String {
    value
        .format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| value.to_string())
}

pub fn parse_task_date(raw: &str) -> Result<Date> {
    Date::parse(raw.trim(), &format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("invalid task date {raw:?}; expected YYYY-MM-DD"))
}

/// Today's date in the local timezone, falling back to UTC when the local
/// offset cannot be determined.
pub fn local_today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}
