// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use daylist_app::{NewTask, Priority};
use std::path::PathBuf;
use time::{Date, Duration, Month};

const VERBS: [&str; 14] = [
    "Buy", "Call", "Email", "Fix", "Pick up", "Review", "Schedule", "Clean", "Pay", "Book",
    "Return", "Plan", "Draft", "Water",
];

const OBJECTS: [&str; 16] = [
    "milk",
    "the plumber",
    "quarterly report",
    "dentist appointment",
    "dry cleaning",
    "garage door",
    "electric bill",
    "library books",
    "team retro",
    "plants",
    "birthday card",
    "car insurance",
    "grocery list",
    "gym membership",
    "kitchen sink",
    "flight tickets",
];

const REFERENCE_YEAR: i32 = 2024;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator of plausible tasks. The same seed always yields the same
/// sequence.
#[derive(Debug, Clone)]
pub struct TaskFaker {
    rng: DeterministicRng,
}

impl TaskFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn title(&mut self) -> String {
        let verb = self.pick(&VERBS);
        let object = self.pick(&OBJECTS);
        format!("{verb} {object}")
    }

    pub fn priority(&mut self) -> Priority {
        Priority::ALL[self.rng.int_n(Priority::ALL.len())]
    }

    pub fn date(&mut self) -> Date {
        let offset = self.rng.int_n(366) as i64;
        fixture_date() + Duration::days(offset)
    }

    pub fn task_on(&mut self, date: Date) -> NewTask {
        NewTask {
            title: self.title(),
            priority: self.priority(),
            date,
        }
    }

    pub fn task(&mut self) -> NewTask {
        let date = self.date();
        self.task_on(date)
    }

    pub fn flag(&mut self) -> bool {
        (self.rng.next_u64() & 1) == 1
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("daylist.db");
    Ok((dir, db_path))
}

/// First day of the faker's date range.
pub fn fixture_date() -> Date {
    Date::from_calendar_date(REFERENCE_YEAR, Month::January, 1).expect("valid fixture date")
}
