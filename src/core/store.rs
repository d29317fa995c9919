//! Whole-document persistent store.
//!
//! The store owns one JSON file. Reads are lock-free because every write
//! lands through a rename, so a reader sees either the old or the new
//! document. Writers go through [`Store::transaction`], which serialises
//! separate processes on an advisory lock file around load-mutate-save.

use crate::core::config::OpsConfig;
use crate::core::error::OpsError;
use crate::core::migration;
use crate::core::schemas::{Document, EVENTS_FILE_NAME};
use crate::core::time;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// One line of the mutation journal.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StoreEvent {
    pub ts: String,
    pub event_id: String,
    pub op: String,
    pub status: String,
    #[serde(default)]
    pub changed: bool,
    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub detail: JsonValue,
}

#[derive(Debug, Clone)]
pub struct Store {
    pub path: PathBuf,
    lock_timeout: Duration,
    stale_after: Duration,
    journal: bool,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: Duration::from_secs(5),
            stale_after: Duration::from_secs(60),
            journal: true,
        }
    }

    pub fn from_config(config: &OpsConfig) -> Self {
        Self {
            path: config.data_path.clone(),
            lock_timeout: Duration::from_millis(config.lock_timeout_ms),
            stale_after: Duration::from_secs(config.stale_lock_secs),
            journal: config.journal,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn with_journal(mut self, enabled: bool) -> Self {
        self.journal = enabled;
        self
    }

    pub fn lock_path(&self) -> PathBuf {
        sibling(&self.path, "lock")
    }

    pub fn journal_path(&self) -> PathBuf {
        match self.path.parent() {
            Some(dir) => dir.join(EVENTS_FILE_NAME),
            None => PathBuf::from(EVENTS_FILE_NAME),
        }
    }

    /// Read the document, or the empty default if the file does not exist.
    ///
    /// Never creates the file.
    pub fn load(&self) -> Result<Document, OpsError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no store yet, using empty document");
                return Ok(Document::default());
            }
            Err(e) => return Err(OpsError::IoError(e)),
        };

        let mut raw: JsonValue = serde_json::from_str(&content)
            .map_err(|e| OpsError::corrupt(&self.path, e.to_string()))?;
        let from_version =
            migration::upgrade(&mut raw).map_err(|reason| OpsError::corrupt(&self.path, reason))?;
        let doc: Document = serde_json::from_value(raw)
            .map_err(|e| OpsError::corrupt(&self.path, e.to_string()))?;
        doc.check_integrity()
            .map_err(|reason| OpsError::corrupt(&self.path, reason))?;

        tracing::debug!(
            path = %self.path.display(),
            notes = doc.notes.len(),
            todos = doc.todos.len(),
            from_version,
            "loaded store"
        );
        Ok(doc)
    }

    /// Serialise the full document and swap it into place.
    pub fn save(&self, doc: &Document) -> Result<(), OpsError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let mut json = serde_json::to_string_pretty(doc)?;
        json.push('\n');

        let tmp = sibling(&self.path, "tmp");
        {
            let mut f = File::create(&tmp)?;
            f.write_all(json.as_bytes())?;
            f.sync_all()?;
        }
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(OpsError::IoError(e));
        }
        tracing::debug!(path = %self.path.display(), bytes = json.len(), "saved store");
        Ok(())
    }

    /// Load, mutate and save under the store lock.
    ///
    /// The document is written only when the mutator changed it. A mutator
    /// error aborts the transaction and nothing is written.
    pub fn transaction<F, R>(&self, op: &str, mutator: F) -> Result<R, OpsError>
    where
        F: FnOnce(&mut Document) -> Result<R, OpsError>,
    {
        let _lease = self.acquire_lock()?;

        let before = self.load()?;
        let mut doc = before.clone();
        let result = mutator(&mut doc);

        let changed = result.is_ok() && doc != before;
        if changed {
            self.save(&doc)?;
        }

        let status = match &result {
            Ok(_) => "ok",
            Err(e) if e.is_user_error() => "rejected",
            Err(_) => "error",
        };
        tracing::info!(op, status, changed, "transaction finished");
        self.record_event(op, status, changed, JsonValue::Null);

        result
    }

    /// Append one line to the mutation journal, if enabled.
    ///
    /// The document is already committed when this runs, so a failed append
    /// is logged and never turned into a command failure.
    pub fn record_event(&self, op: &str, status: &str, changed: bool, detail: JsonValue) {
        if !self.journal {
            return;
        }
        if let Err(e) = self.append_event(op, status, changed, detail) {
            tracing::warn!(
                op,
                path = %self.journal_path().display(),
                error = %e,
                "journal append failed"
            );
        }
    }

    fn append_event(
        &self,
        op: &str,
        status: &str,
        changed: bool,
        detail: JsonValue,
    ) -> Result<(), OpsError> {
        let path = self.journal_path();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let ev = StoreEvent {
            ts: time::to_rfc3339(&chrono::Utc::now()),
            event_id: time::new_event_id(),
            op: op.to_string(),
            status: status.to_string(),
            changed,
            detail,
        };
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{}", serde_json::to_string(&ev)?)?;
        Ok(())
    }

    /// Read back every journal entry in append order.
    pub fn read_events(&self) -> Result<Vec<StoreEvent>, OpsError> {
        let path = self.journal_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(OpsError::IoError(e)),
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(OpsError::from))
            .collect()
    }

    fn acquire_lock(&self) -> Result<StoreLease, OpsError> {
        let lock_path = self.lock_path();
        if let Some(dir) = lock_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let started = Instant::now();
        loop {
            if let Some(lease) = try_acquire_lock(&lock_path)? {
                tracing::debug!(path = %lock_path.display(), "acquired store lock");
                return Ok(lease);
            }
            if let Some(record) = self.stale_record(&lock_path) {
                tracing::warn!(
                    path = %lock_path.display(),
                    holder = record.trim(),
                    "reclaiming abandoned store lock"
                );
                reclaim_stale_lock(&lock_path, &record)?;
                continue;
            }
            let waited = started.elapsed();
            if waited >= self.lock_timeout {
                return Err(OpsError::LockTimeoutError {
                    path: lock_path,
                    waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                });
            }
            thread::sleep(LOCK_POLL_INTERVAL);
        }
    }

    /// The holder record of a lock that is older than `stale_after` and whose
    /// holder is not a running process.
    fn stale_record(&self, lock_path: &Path) -> Option<String> {
        let modified = fs::metadata(lock_path).and_then(|m| m.modified()).ok()?;
        let age = SystemTime::now().duration_since(modified).ok()?;
        if age <= self.stale_after {
            return None;
        }
        let record = fs::read_to_string(lock_path).ok()?;
        if holder_is_alive(&record) {
            return None;
        }
        Some(record)
    }
}

fn try_acquire_lock(lock_path: &Path) -> Result<Option<StoreLease>, OpsError> {
    // create_new gives single-winner semantics per path.
    let mut file = match OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(lock_path)
    {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(None),
        Err(err) => return Err(OpsError::IoError(err)),
    };
    let record = format!("{} {}\n", std::process::id(), time::new_event_id());
    file.write_all(record.as_bytes())?;

    Ok(Some(StoreLease {
        path: lock_path.to_path_buf(),
        record,
    }))
}

/// Move a stale lock aside and delete it only if it is still the record that
/// was judged stale. Returns whether the lock was removed.
fn reclaim_stale_lock(lock_path: &Path, stale_record: &str) -> Result<bool, OpsError> {
    let aside = sibling(lock_path, &format!("reclaim-{}", time::new_event_id()));
    match fs::rename(lock_path, &aside) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(OpsError::IoError(e)),
    }

    let moved = fs::read_to_string(&aside).unwrap_or_default();
    if moved == stale_record {
        fs::remove_file(&aside)?;
        return Ok(true);
    }

    // Someone took the lock in between. hard_link puts it back without
    // clobbering a newer lock.
    if let Err(e) = fs::hard_link(&aside, lock_path) {
        tracing::warn!(
            path = %lock_path.display(),
            error = %e,
            "could not restore live store lock"
        );
    }
    let _ = fs::remove_file(&aside);
    Ok(false)
}

/// Lock records start with the holder pid. Unreadable records have no
/// provable holder.
fn holder_is_alive(record: &str) -> bool {
    let Some(pid) = record
        .split_whitespace()
        .next()
        .and_then(|p| p.parse::<u32>().ok())
    else {
        return false;
    };
    pid == std::process::id() || process_exists(pid)
}

#[cfg(target_os = "linux")]
fn process_exists(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

// Without /proc, lock age alone decides.
#[cfg(not(target_os = "linux"))]
fn process_exists(_pid: u32) -> bool {
    false
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

struct StoreLease {
    path: PathBuf,
    record: String,
}

impl Drop for StoreLease {
    fn drop(&mut self) {
        // Only the lock this lease wrote is removed.
        if fs::read_to_string(&self.path).is_ok_and(|current| current == self.record) {
            let _ = fs::remove_file(&self.path);
        }
    }
}
