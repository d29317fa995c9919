use crate::core::error::OpsError;
use crate::core::output::{self, OutputFormat};
use crate::core::schemas::{Document, Todo};
use crate::core::store::Store;
use crate::core::time::{self, Clock, DUE_DATE_FORMAT};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(name = "todo", about = "Track tasks, due dates, and completion state.")]
pub struct TodoCli {
    /// Output format for this command group.
    #[clap(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,
    #[clap(subcommand)]
    pub command: TodoCommand,
}

#[derive(Subcommand, Debug)]
pub enum TodoCommand {
    /// Create a new task with an optional due date.
    Add {
        /// Task text (positional argument)
        #[clap(value_name = "TEXT")]
        text: String,
        /// Due date in YYYY-MM-DD format (example: --due 2026-03-01).
        #[clap(long)]
        due: Option<String>,
    },
    /// Show tasks. Use --open to hide completed items.
    List {
        /// Show only open (not completed) tasks.
        #[clap(long = "open")]
        open_only: bool,
    },
    /// Mark a task as completed by its numeric id.
    Done {
        /// Task id shown in 'ops todo list'.
        #[clap(value_name = "ID")]
        id: u64,
    },
}

/// Result of `todo done`. Both variants exit successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoneOutcome {
    Completed(Todo),
    AlreadyDone(Todo),
}

impl DoneOutcome {
    pub fn todo(&self) -> &Todo {
        match self {
            Self::Completed(t) | Self::AlreadyDone(t) => t,
        }
    }
}

/// Append a new open todo. A malformed due date fails before any id is used.
pub fn add_todo(
    doc: &mut Document,
    text: &str,
    due: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Todo, OpsError> {
    let due = due.map(time::parse_due_date).transpose()?;
    let todo = Todo {
        id: doc.counters.next_todo_id(),
        text: text.to_string(),
        due,
        done: false,
        created_at: now,
        completed_at: None,
    };
    doc.todos.push(todo.clone());
    Ok(todo)
}

/// Complete a todo in place. Completing twice keeps the first `completed_at`.
pub fn mark_done(doc: &mut Document, id: u64, now: DateTime<Utc>) -> Result<DoneOutcome, OpsError> {
    let todo = doc
        .find_todo_mut(id)
        .ok_or_else(|| OpsError::not_found(format!("todo #{}", id)))?;
    if todo.done {
        return Ok(DoneOutcome::AlreadyDone(todo.clone()));
    }
    todo.done = true;
    todo.completed_at = Some(now);
    Ok(DoneOutcome::Completed(todo.clone()))
}

pub fn list_todos(doc: &Document, open_only: bool) -> Vec<&Todo> {
    doc.todos
        .iter()
        .filter(|t| !open_only || !t.done)
        .collect()
}

pub fn render_todo_line(todo: &Todo) -> String {
    let status = if todo.done { "done" } else { "open" };
    let due = todo
        .due
        .map(|d| d.format(DUE_DATE_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!("[{}] ({}) {} | due={}", todo.id, status, todo.text, due);
    if let Some(completed_at) = &todo.completed_at {
        line.push_str(&format!(" | completed={}", time::to_rfc3339(completed_at)));
    }
    line
}

pub fn run_todo_cli(store: &Store, clock: &dyn Clock, cli: TodoCli) -> Result<(), OpsError> {
    let now = clock.now();
    match cli.command {
        TodoCommand::Add { text, due } => {
            let todo =
                store.transaction("todo.add", |doc| add_todo(doc, &text, due.as_deref(), now))?;
            tracing::info!(id = todo.id, due = ?todo.due, "todo added");
            match cli.format {
                OutputFormat::Json => output::print_json(&time::command_envelope(
                    &now,
                    "todo.add",
                    "ok",
                    serde_json::json!({ "id": todo.id, "todo": todo }),
                ))?,
                OutputFormat::Text => println!("Added todo #{}", todo.id),
            }
        }
        TodoCommand::Done { id } => {
            let outcome = store.transaction("todo.done", |doc| mark_done(doc, id, now))?;
            let status = match &outcome {
                DoneOutcome::Completed(_) => "ok",
                DoneOutcome::AlreadyDone(_) => "already_done",
            };
            tracing::info!(id, status, "todo done");
            match cli.format {
                OutputFormat::Json => output::print_json(&time::command_envelope(
                    &now,
                    "todo.done",
                    status,
                    serde_json::json!({ "id": id, "todo": outcome.todo() }),
                ))?,
                OutputFormat::Text => match outcome {
                    DoneOutcome::Completed(_) => println!("Completed todo #{}", id),
                    DoneOutcome::AlreadyDone(_) => println!("Todo #{} is already done.", id),
                },
            }
        }
        TodoCommand::List { open_only } => {
            let doc = store.load()?;
            let items = list_todos(&doc, open_only);
            match cli.format {
                OutputFormat::Json => output::print_json(&time::command_envelope(
                    &now,
                    "todo.list",
                    "ok",
                    serde_json::json!({
                        "open_only": open_only,
                        "count": items.len(),
                        "items": items,
                    }),
                ))?,
                OutputFormat::Text => {
                    if items.is_empty() {
                        println!("No todos found.");
                    }
                    for todo in items {
                        println!("{}", render_todo_line(todo));
                    }
                }
            }
        }
    }
    Ok(())
}
