// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use daylist_app::{NewTask, Task, TaskCounts, TaskFilter, TaskId};
use daylist_db::Store;
use time::Date;

pub struct DbRuntime<'a> {
    store: &'a Store,
}

impl<'a> DbRuntime<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }
}

impl daylist_tui::AppRuntime for DbRuntime<'_> {
    fn load_tasks(&mut self, date: Date, filter: TaskFilter) -> Result<Vec<Task>> {
        self.store.list_tasks(date, filter)
    }

    fn load_counts(&mut self, date: Date) -> Result<TaskCounts> {
        self.store.count_tasks(date)
    }

    fn add_task(&mut self, task: &NewTask) -> Result<TaskId> {
        task.validate()?;
        self.store.add_task(task)
    }

    fn set_task_completed(&mut self, id: TaskId, completed: bool) -> Result<bool> {
        self.store.set_task_completed(id, completed)
    }

    fn delete_task(&mut self, id: TaskId) -> Result<bool> {
        self.store.delete_task(id)
    }
}
