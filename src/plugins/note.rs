use crate::core::error::OpsError;
use crate::core::output::{self, OutputFormat};
use crate::core::schemas::{Document, Note};
use crate::core::store::Store;
use crate::core::time::{self, Clock};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(
    name = "note",
    about = "Create quick notes and optionally label them with tags."
)]
pub struct NoteCli {
    /// Output format for this command group.
    #[clap(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,
    #[clap(subcommand)]
    pub command: NoteCommand,
}

#[derive(Subcommand, Debug)]
pub enum NoteCommand {
    /// Save a note with optional tags.
    Add {
        /// Note text to save. Wrap in quotes if it has spaces.
        #[clap(value_name = "TEXT")]
        text: String,
        /// Comma-separated tags (example: --tags learning,reading).
        #[clap(long, default_value = "")]
        tags: String,
    },
    /// Show saved notes, optionally filtered by one exact tag.
    List {
        /// Show only notes that include this tag.
        #[clap(long)]
        tag: Option<String>,
    },
}

/// Split `a, b,,c` into `["a", "b", "c"]`. Order and duplicates are kept.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn add_note(doc: &mut Document, text: &str, tags: Vec<String>, now: DateTime<Utc>) -> Note {
    let note = Note {
        id: doc.counters.next_note_id(),
        text: text.to_string(),
        tags,
        created_at: now,
    };
    doc.notes.push(note.clone());
    note
}

/// Notes carrying `tag` exactly, in insertion order. An empty filter matches all.
pub fn list_notes<'a>(doc: &'a Document, tag: Option<&str>) -> Vec<&'a Note> {
    match tag.filter(|t| !t.is_empty()) {
        Some(tag) => doc.notes.iter().filter(|n| n.has_tag(tag)).collect(),
        None => doc.notes.iter().collect(),
    }
}

pub fn render_note_line(note: &Note) -> String {
    let tags = if note.tags.is_empty() {
        "-".to_string()
    } else {
        note.tags.join(",")
    };
    format!(
        "[{}] {} | tags={} | {}",
        note.id,
        note.text,
        tags,
        time::to_rfc3339(&note.created_at)
    )
}

pub fn run_note_cli(store: &Store, clock: &dyn Clock, cli: NoteCli) -> Result<(), OpsError> {
    let now = clock.now();
    match cli.command {
        NoteCommand::Add { text, tags } => {
            let tags = parse_tags(&tags);
            let note = store.transaction("note.add", |doc| Ok(add_note(doc, &text, tags, now)))?;
            tracing::info!(id = note.id, tags = note.tags.len(), "note added");
            match cli.format {
                OutputFormat::Json => output::print_json(&time::command_envelope(
                    &now,
                    "note.add",
                    "ok",
                    serde_json::json!({ "id": note.id, "note": note }),
                ))?,
                OutputFormat::Text => println!("Added note #{}", note.id),
            }
        }
        NoteCommand::List { tag } => {
            let doc = store.load()?;
            let items = list_notes(&doc, tag.as_deref());
            match cli.format {
                OutputFormat::Json => output::print_json(&time::command_envelope(
                    &now,
                    "note.list",
                    "ok",
                    serde_json::json!({ "count": items.len(), "items": items }),
                ))?,
                OutputFormat::Text => {
                    if items.is_empty() {
                        println!("No notes found.");
                    }
                    for note in items {
                        println!("{}", render_note_line(note));
                    }
                }
            }
        }
    }
    Ok(())
}
