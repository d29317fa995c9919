//! Persisted document schema.
//!
//! One root [`Document`] holds every entity. Notes are append-only, todos are
//! append plus in-place completion, and the timer is an optional singleton.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DATA_FILE_NAME: &str = "ops_data.json";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const EVENTS_FILE_NAME: &str = "ops.events.jsonl";
pub const CONFIG_FILE_NAME: &str = "ops.toml";

/// Schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Note {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub due: Option<NaiveDate>,
    #[serde(default)]
    pub done: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    pub label: String,
    pub minutes: u32,
    pub started_at: DateTime<Utc>,
}

/// Where a timer stands at a given instant. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Running { remaining_secs: i64 },
    Finished,
}

impl Timer {
    /// `None` when the end lies beyond the representable date range.
    pub fn end_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
            .checked_add_signed(Duration::minutes(i64::from(self.minutes)))
    }

    /// Remaining time truncated to whole seconds; zero or less is finished.
    pub fn state_at(&self, now: DateTime<Utc>) -> TimerState {
        let Some(end_at) = self.end_at() else {
            return TimerState::Finished;
        };
        let remaining_secs = (end_at - now).num_seconds();
        if remaining_secs <= 0 {
            TimerState::Finished
        } else {
            TimerState::Running { remaining_secs }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters {
    pub note_id: u64,
    pub todo_id: u64,
}

impl Counters {
    pub fn next_note_id(&mut self) -> u64 {
        self.note_id += 1;
        self.note_id
    }

    pub fn next_todo_id(&mut self) -> u64 {
        self.todo_id += 1;
        self.todo_id
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub schema_version: u32,
    pub notes: Vec<Note>,
    pub todos: Vec<Todo>,
    pub timer: Option<Timer>,
    pub counters: Counters,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            notes: Vec::new(),
            todos: Vec::new(),
            timer: None,
            counters: Counters::default(),
        }
    }
}

impl Document {
    /// Ids must be unique and no counter may lag behind an id already issued.
    pub fn check_integrity(&self) -> Result<(), String> {
        check_ids("note", self.notes.iter().map(|n| n.id), self.counters.note_id)?;
        check_ids("todo", self.todos.iter().map(|t| t.id), self.counters.todo_id)?;
        if let Some(timer) = &self.timer {
            if timer.minutes == 0 {
                return Err("timer has zero minutes".to_string());
            }
            if timer.end_at().is_none() {
                return Err("timer end is out of range".to_string());
            }
        }
        Ok(())
    }

    pub fn find_todo_mut(&mut self, id: u64) -> Option<&mut Todo> {
        self.todos.iter_mut().find(|t| t.id == id)
    }
}

fn check_ids(kind: &str, ids: impl Iterator<Item = u64>, counter: u64) -> Result<(), String> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(format!("duplicate {} id {}", kind, id));
        }
        if id > counter {
            return Err(format!(
                "{} id {} is ahead of counter {}_id={}",
                kind, id, kind, counter
            ));
        }
    }
    Ok(())
}
