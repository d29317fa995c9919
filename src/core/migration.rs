//! Schema version detection and upgrade chain.
//!
//! Migrations run on the raw JSON before typed decoding, in order, each one
//! lifting the document exactly one version. A document without a
//! `schema_version` field is the legacy version-0 layout.

use crate::core::schemas::CURRENT_SCHEMA_VERSION;
use serde_json::{Map, Value};

/// Migration definition
pub struct Migration {
    /// Version this migration upgrades from
    pub from_version: u32,
    /// Human-readable description
    pub description: &'static str,
    /// Migration function
    pub up: fn(&mut Map<String, Value>) -> Result<(), String>,
}

/// All migrations in chronological order
pub fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        from_version: 0,
        description: "Stamp schema_version and backfill optional fields",
        up: migrate_legacy_layout,
    }]
}

pub fn detect_version(doc: &Map<String, Value>) -> Result<u32, String> {
    match doc.get("schema_version") {
        None | Some(Value::Null) => Ok(0),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| format!("schema_version must be a small unsigned integer, got {}", v)),
    }
}

/// Upgrade a raw document in place to [`CURRENT_SCHEMA_VERSION`].
///
/// Returns the version the document started at.
pub fn upgrade(raw: &mut Value) -> Result<u32, String> {
    let Some(doc) = raw.as_object_mut() else {
        return Err("document root must be a JSON object".to_string());
    };
    let start = detect_version(doc)?;
    if start > CURRENT_SCHEMA_VERSION {
        return Err(format!(
            "schema_version {} is newer than supported version {}",
            start, CURRENT_SCHEMA_VERSION
        ));
    }

    let mut version = start;
    for migration in all_migrations() {
        if migration.from_version != version {
            continue;
        }
        tracing::info!(
            from = migration.from_version,
            to = migration.from_version + 1,
            "migrating document: {}",
            migration.description
        );
        (migration.up)(doc)?;
        version += 1;
        doc.insert("schema_version".to_string(), Value::from(version));
    }

    if version != CURRENT_SCHEMA_VERSION {
        return Err(format!(
            "no migration path from schema_version {} to {}",
            version, CURRENT_SCHEMA_VERSION
        ));
    }
    Ok(start)
}

fn migrate_legacy_layout(doc: &mut Map<String, Value>) -> Result<(), String> {
    for key in ["notes", "todos"] {
        let entry = doc.entry(key).or_insert_with(|| Value::Array(Vec::new()));
        let Some(items) = entry.as_array_mut() else {
            return Err(format!("'{}' must be an array", key));
        };
        for item in items.iter_mut() {
            let Some(obj) = item.as_object_mut() else {
                return Err(format!("'{}' entries must be objects", key));
            };
            if key == "notes" {
                obj.entry("tags").or_insert_with(|| Value::Array(Vec::new()));
            } else {
                obj.entry("due").or_insert(Value::Null);
                obj.entry("done").or_insert(Value::Bool(false));
                obj.entry("completed_at").or_insert(Value::Null);
            }
        }
    }
    doc.entry("timer").or_insert(Value::Null);
    if !doc.contains_key("counters") {
        let note_id = max_id(doc.get("notes"));
        let todo_id = max_id(doc.get("todos"));
        doc.insert(
            "counters".to_string(),
            serde_json::json!({"note_id": note_id, "todo_id": todo_id}),
        );
    }
    Ok(())
}

fn max_id(items: Option<&Value>) -> u64 {
    items
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("id").and_then(Value::as_u64))
                .max()
                .unwrap_or(0)
        })
        .unwrap_or(0)
}
