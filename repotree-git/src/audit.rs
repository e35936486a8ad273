//! Append-only audit log of every executed git command.
//!
//! One JSON object per line:
//!
//! ```text
//! {"time":"2026-01-05T09:12:44.120Z","context":"platform/gateway","type":"exec-result","payload":{...}}
//! ```
//!
//! Updates run concurrently, so every sink must serialize appends. The file
//! sink holds its handle behind a mutex and writes each record with a single
//! `write_all` of a complete line.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::{io_err, GitError};

pub const RECORD_TYPE_EXEC_RESULT: &str = "exec-result";

/// Rotate the audit log once it grows past 10 MiB.
pub const MAX_AUDIT_BYTES: u64 = 10 * 1024 * 1024;

/// Rotated copies kept next to the live log (`.1` newest).
pub const MAX_ROTATED_AUDIT_FILES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    #[serde(serialize_with = "serialize_time")]
    pub time: DateTime<Utc>,
    /// Repository relpath the command ran for.
    pub context: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub payload: Value,
}

impl AuditRecord {
    pub fn exec_result(context: impl Into<String>, payload: Value) -> Self {
        Self {
            time: Utc::now(),
            context: context.into(),
            kind: RECORD_TYPE_EXEC_RESULT,
            payload,
        }
    }
}

fn serialize_time<S: serde::Serializer>(time: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Destination for audit records. Implementations must tolerate concurrent callers.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}

// ---------------------------------------------------------------------------
// File sink
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct FileAuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileAuditLog {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| io_err(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for FileAuditLog {
    fn record(&self, record: AuditRecord) {
        let mut line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, "failed to encode audit record");
                return;
            }
        };
        line.push('\n');

        let mut file = lock(&self.file);
        if let Err(err) = file.write_all(line.as_bytes()) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to append audit record");
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory sink
// ---------------------------------------------------------------------------

/// Keeps records in memory; used where no log file is wanted.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        lock(&self.records).clone()
    }
}

impl AuditSink for MemoryAuditLog {
    fn record(&self, record: AuditRecord) {
        lock(&self.records).push(record);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

/// Shift `log_path` to `<name>.1` (and older copies up by one) when it is at
/// least `max_bytes` long. The copy numbered `keep` is discarded.
///
/// Returns `Ok(false)` when the log is missing or still small.
pub fn rotate_if_oversized(log_path: &Path, max_bytes: u64, keep: usize) -> io::Result<bool> {
    let size = match fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    if size < max_bytes || keep == 0 {
        return Ok(false);
    }

    let oldest = rotated_path(log_path, keep);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for n in (1..keep).rev() {
        let src = rotated_path(log_path, n);
        if src.exists() {
            fs::rename(&src, rotated_path(log_path, n + 1))?;
        }
    }
    fs::rename(log_path, rotated_path(log_path, 1))?;
    Ok(true)
}

fn rotated_path(base: &Path, n: usize) -> PathBuf {
    let name = base
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    base.with_file_name(format!("{name}.{n}"))
}

// ─── Tests ────────────────────────────────────────────────────────────────────
