//! Append-only CSV record log.
//!
//! One file per consumer run, `bot_events_<YYYYmmdd_HHMMSS>.csv`, header
//! first, one row per accepted record in the column order of
//! [`stream_core::COLUMNS`].

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::Local;
use csv::{ReaderBuilder, Writer, WriterBuilder};
use stream_core::{ActivityRecord, Error, Result, StoreErrorCode, COLUMNS, NO_AUTOMATION, UNKNOWN};
use tracing::info;

const LOG_PREFIX: &str = "bot_events_";
const LOG_EXTENSION: &str = "csv";

/// Durable, append-only log of accepted records.
pub struct RecordLog {
    path: PathBuf,
    writer: Writer<File>,
    rows: u64,
}

impl RecordLog {
    /// Creates a timestamped log file under `dir`, creating `dir` if needed.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| open_error(dir, e))?;

        let name = format!("{LOG_PREFIX}{}.{LOG_EXTENSION}", Local::now().format("%Y%m%d_%H%M%S"));
        Self::open(dir.join(name))
    }

    /// Opens `path` for appending. The header is written only when the file is empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| open_error(&path, e))?;
        let is_empty = file.metadata().map_err(|e| open_error(&path, e))?.len() == 0;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if is_empty {
            writer.write_record(COLUMNS).map_err(|e| open_error(&path, e))?;
            writer.flush().map_err(|e| open_error(&path, e))?;
        }

        info!(path = %path.display(), columns = COLUMNS.len(), "Record log opened");
        Ok(Self { path, writer, rows: 0 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended through this handle.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn append(&mut self, record: &ActivityRecord) -> Result<()> {
        self.writer
            .serialize(record)
            .map_err(|e| write_error(&self.path, e))?;
        self.rows += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| write_error(&self.path, e))
    }

    /// Flushes and closes the file.
    pub fn close(mut self) -> Result<PathBuf> {
        self.flush()?;
        Ok(self.path)
    }
}

fn open_error(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::store(
        StoreErrorCode::OpenFailed,
        format!("cannot open record log {}: {e}", path.display()),
    )
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::store(
        StoreErrorCode::WriteFailed,
        format!("cannot append to {}: {e}", path.display()),
    )
}

/// Most recent record log in `dir`, by the timestamp in its name.
pub fn latest_log(dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(None);
    }

    let mut newest: Option<(String, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        let is_log = name.starts_with(LOG_PREFIX)
            && path.extension().and_then(|e| e.to_str()) == Some(LOG_EXTENSION)
            && path.is_file();

        if is_log && newest.as_ref().map_or(true, |(best, _)| name > *best) {
            newest = Some((name, path));
        }
    }

    Ok(newest.map(|(_, path)| path))
}

/// Reads every row of a record log. Missing cells become placeholders.
pub fn read_log(path: impl AsRef<Path>) -> Result<Vec<ActivityRecord>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| open_error(path, e))?;

    let headers = reader.headers().map_err(|e| open_error(path, e))?.clone();
    let index: HashMap<&str, usize> = headers.iter().enumerate().map(|(i, h)| (h, i)).collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| open_error(path, e))?;
        let cell = |column: &str, placeholder: &str| {
            index
                .get(column)
                .and_then(|&i| row.get(i))
                .filter(|v| !v.is_empty())
                .unwrap_or(placeholder)
                .to_string()
        };

        let is_automated = cell("is_bot", "0") == "1";
        records.push(ActivityRecord {
            record_id: cell("event_id", UNKNOWN),
            session_id: cell("session_id", UNKNOWN),
            is_automated,
            automation_kind: cell("bot_type", if is_automated { UNKNOWN } else { NO_AUTOMATION }),
            action_kind: cell("action", UNKNOWN),
            timestamp: cell("timestamp", UNKNOWN),
            source_address: cell("ip_address", UNKNOWN),
            client_signature: cell("user_agent", UNKNOWN),
            device_class: cell("device_type", UNKNOWN),
            client_family: cell("browser_family", UNKNOWN),
            platform_family: cell("os_family", UNKNOWN),
        });
    }

    Ok(records)
}
