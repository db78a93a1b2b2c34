// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use daylist_app::{
    NewTask, Priority, Task, TaskCounts, TaskFilter, TaskId, format_task_date, parse_task_date,
};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime};
use tracing::{debug, info};

pub const APP_NAME: &str = "daylist";

const TASKS_TABLE: &str = "tasks";

const REQUIRED_COLUMNS: [&str; 6] = [
    "id",
    "title",
    "priority",
    "is_completed",
    "task_date",
    "created_at",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RequiredIndex {
    name: &'static str,
    create_sql: &'static str,
}

const REQUIRED_INDEXES: &[RequiredIndex] = &[RequiredIndex {
    name: "idx_tasks_task_date",
    create_sql: "CREATE INDEX IF NOT EXISTS idx_tasks_task_date ON tasks (task_date);",
}];

const TASK_COLUMNS: &str = "id, title, priority, is_completed, task_date, created_at";

/// NULL reads as pending and any non-zero value as completed, matching
/// `task_from_row`.
const IS_COMPLETED_SQL: &str = "(COALESCE(is_completed, 0) != 0)";

/// Demo rows as (day offset from today, title, priority, completed).
const DEMO_TASKS: [(i64, &str, Priority, bool); 8] = [
    (-1, "Return library books", Priority::Low, true),
    (-1, "Call the plumber", Priority::High, false),
    (0, "Buy milk", Priority::Medium, false),
    (0, "Finish quarterly report", Priority::High, false),
    (0, "Water the plants", Priority::Low, true),
    (0, "Book dentist appointment", Priority::Medium, false),
    (1, "Pick up dry cleaning", Priority::Low, false),
    (1, "Team retro", Priority::Medium, false),
];

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        debug!(path = %path.display(), "opened task database");
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    /// Creates the tasks table when absent, otherwise checks that the existing
    /// table carries every column the queries below rely on. Safe to call on
    /// every startup.
    pub fn bootstrap(&self) -> Result<()> {
        if table_exists(&self.conn, TASKS_TABLE)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
            info!("created tasks schema");
        }

        ensure_required_indexes(&self.conn)?;
        Ok(())
    }

    pub fn add_task(&self, task: &NewTask) -> Result<TaskId> {
        self.conn
            .execute(
                "INSERT INTO tasks (title, priority, task_date) VALUES (?, ?, ?)",
                params![
                    task.title,
                    task.priority.as_str(),
                    format_task_date(task.date)
                ],
            )
            .context("insert task")?;

        let id = TaskId::new(self.conn.last_insert_rowid());
        debug!(%id, date = %task.date, priority = task.priority.as_str(), "inserted task");
        Ok(id)
    }

    /// Tasks for one date in insertion order, narrowed by completion flag
    /// when the filter asks for it.
    pub fn list_tasks(&self, date: Date, filter: TaskFilter) -> Result<Vec<Task>> {
        let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE task_date = ?\n");
        match filter.completed_flag() {
            Some(true) => sql.push_str(&format!("AND {IS_COMPLETED_SQL}\n")),
            Some(false) => sql.push_str(&format!("AND NOT {IS_COMPLETED_SQL}\n")),
            None => {}
        }
        sql.push_str("ORDER BY id ASC");

        let mut stmt = self.conn.prepare(&sql).context("prepare tasks query")?;
        let rows = stmt
            .query_map(params![format_task_date(date)], task_from_row)
            .context("query tasks")?;

        let tasks = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("collect tasks")?;
        debug!(date = %date, filter = filter.as_str(), count = tasks.len(), "listed tasks");
        Ok(tasks)
    }

    pub fn get_task(&self, task_id: TaskId) -> Result<Option<Task>> {
        self.conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"),
                params![task_id.get()],
                task_from_row,
            )
            .optional()
            .with_context(|| format!("load task {task_id}"))
    }

    /// Returns `false` when no row carries `task_id`; that is not an error.
    pub fn set_task_completed(&self, task_id: TaskId, completed: bool) -> Result<bool> {
        let rows_affected = self
            .conn
            .execute(
                "UPDATE tasks SET is_completed = ? WHERE id = ?",
                params![i64::from(completed), task_id.get()],
            )
            .with_context(|| format!("update completion for task {task_id}"))?;
        debug!(id = %task_id, completed, rows_affected, "updated task completion");
        Ok(rows_affected > 0)
    }

    /// Returns `false` when no row carries `task_id`; that is not an error.
    pub fn delete_task(&self, task_id: TaskId) -> Result<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?", params![task_id.get()])
            .with_context(|| format!("delete task {task_id}"))?;
        debug!(id = %task_id, rows_affected, "deleted task");
        Ok(rows_affected > 0)
    }

    pub fn count_tasks(&self, date: Date) -> Result<TaskCounts> {
        let (completed, pending) = self
            .conn
            .query_row(
                &format!(
                    "
                    SELECT
                      COALESCE(SUM(CASE WHEN {IS_COMPLETED_SQL} THEN 1 ELSE 0 END), 0),
                      COALESCE(SUM(CASE WHEN {IS_COMPLETED_SQL} THEN 0 ELSE 1 END), 0)
                    FROM tasks
                    WHERE task_date = ?
                    "
                ),
                params![format_task_date(date)],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .with_context(|| format!("count tasks for {date}"))?;

        Ok(TaskCounts {
            completed: usize::try_from(completed).context("completed count out of range")?,
            pending: usize::try_from(pending).context("pending count out of range")?,
        })
    }

    /// Inserts a fixed handful of tasks around `today` for demo sessions.
    pub fn seed_demo_data(&self, today: Date) -> Result<()> {
        for (offset, title, priority, completed) in DEMO_TASKS {
            let date = today
                .checked_add(Duration::days(offset))
                .ok_or_else(|| anyhow!("demo date out of range for offset {offset}"))?;
            let id = self.add_task(&NewTask {
                title: title.to_owned(),
                priority,
                date,
            })?;
            if completed {
                self.set_task_completed(id, true)?;
            }
        }
        info!(count = DEMO_TASKS.len(), "seeded demo tasks");
        Ok(())
    }
}

pub fn data_dir() -> Result<PathBuf> {
    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set DAYLIST_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir)
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("DAYLIST_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }
    Ok(data_dir()?.join("daylist.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let priority_raw: String = row.get(2)?;
    let priority = Priority::parse(&priority_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown task priority {priority_raw}"),
            )),
        )
    })?;

    let completed: Option<i64> = row.get(3)?;
    let date_raw: String = row.get(4)?;
    let created_at_raw: String = row.get(5)?;

    Ok(Task {
        id: TaskId::new(row.get(0)?),
        title: row.get(1)?,
        priority,
        completed: completed.unwrap_or(0) != 0,
        date: parse_task_date(&date_raw).map_err(to_sql_error)?,
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
    })
}

fn validate_schema(conn: &Connection) -> Result<()> {
    let columns = table_columns(conn, TASKS_TABLE)?;
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !columns.contains(*column))
        .collect();

    if !missing.is_empty() {
        bail!(
            "table `{TASKS_TABLE}` is missing required columns: {}; point [storage].db_path at a daylist database",
            missing.join(", ")
        );
    }

    Ok(())
}

fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    for index in REQUIRED_INDEXES {
        conn.execute_batch(index.create_sql)
            .with_context(|| format!("ensure required index `{}`", index.name))?;
    }

    let existing_indexes = index_names(conn)?;
    let missing = REQUIRED_INDEXES
        .iter()
        .filter(|index| !existing_indexes.contains(index.name))
        .map(|index| index.name)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        bail!("database is missing required indexes: {}", missing.join(", "));
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))
}

fn index_names(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(
            "
            SELECT name
            FROM sqlite_master
            WHERE type = 'index'
              AND name NOT LIKE 'sqlite_%'
            ORDER BY name ASC
            ",
        )
        .context("prepare index names query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query index names")?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .context("collect index names")
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

// SQLite's CURRENT_TIMESTAMP is UTC without an offset.
fn parse_datetime(raw: &str) -> Result<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(value);
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
    ) {
        return Ok(value.assume_utc());
    }

    bail!("unsupported datetime format {raw:?}")
}

fn to_sql_error(error: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            error.to_string(),
        )),
    )
}
