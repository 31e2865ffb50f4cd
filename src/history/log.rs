//! Attempt events and the JSONL log writer.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Compound, DimensionKind};
use crate::error::{FretpathError, Result};

/// Schema version for attempt events.
///
/// Increment when the event schema changes in a breaking way.
pub const ATTEMPT_SCHEMA_VERSION: u8 = 1;

/// One logged practice attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttemptEvent {
    /// Schema version for forward compatibility.
    pub v: u8,
    /// When the attempt was logged.
    pub ts: DateTime<Utc>,
    /// Session index the attempt was stamped with.
    pub session: u64,
    /// The compound that was practiced.
    pub compound: Compound,
    /// Speed score of the attempt.
    pub speed: f64,
    /// Metronome tempo, when one was given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<u32>,
    /// The single dimension changed relative to the previous attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed: Option<DimensionKind>,
}

impl AttemptEvent {
    /// Create an attempt event with the current timestamp.
    pub fn new(
        session: u64,
        compound: Compound,
        speed: f64,
        bpm: Option<u32>,
        changed: Option<DimensionKind>,
    ) -> Self {
        Self::with_timestamp(session, compound, speed, bpm, changed, Utc::now())
    }

    /// Create an attempt event with a specific timestamp (for testing and replay).
    pub fn with_timestamp(
        session: u64,
        compound: Compound,
        speed: f64,
        bpm: Option<u32>,
        changed: Option<DimensionKind>,
        ts: DateTime<Utc>,
    ) -> Self {
        Self {
            v: ATTEMPT_SCHEMA_VERSION,
            ts,
            session,
            compound,
            speed,
            bpm,
            changed,
        }
    }
}

/// Appends attempt events to `.fretpath/attempts.log` in JSONL format.
#[derive(Debug, Clone)]
pub struct AttemptLog {
    path: PathBuf,
}

impl AttemptLog {
    /// Create a log writer for the given path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Append an event to the log.
    pub fn append(&self, event: &AttemptEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| FretpathError::storage(parent, e))?;
        }

        let json = serde_json::to_string(event)
            .map_err(|e| FretpathError::serde(format!("Failed to serialize attempt: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| FretpathError::storage(&self.path, e))?;

        writeln!(file, "{}", json).map_err(|e| FretpathError::storage(&self.path, e))?;

        Ok(())
    }

    /// Read all events in logged order.
    pub fn read_all(&self) -> Result<Vec<AttemptEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content =
            fs::read_to_string(&self.path).map_err(|e| FretpathError::storage(&self.path, e))?;

        let mut events = Vec::new();
        for (line_num, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let event: AttemptEvent = serde_json::from_str(line).map_err(|e| {
                FretpathError::serde(format!(
                    "Failed to parse attempt on line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;
            events.push(event);
        }

        Ok(events)
    }

    /// Replace the log's contents with `events` via temp file + rename.
    pub fn rewrite(&self, events: &[AttemptEvent]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| FretpathError::storage(parent, e))?;
        }

        let mut content = String::new();
        for event in events {
            let json = serde_json::to_string(event)
                .map_err(|e| FretpathError::serde(format!("Failed to serialize attempt: {}", e)))?;
            content.push_str(&json);
            content.push('\n');
        }

        let temp_path = self.temp_path();
        {
            let mut file =
                fs::File::create(&temp_path).map_err(|e| FretpathError::storage(&temp_path, e))?;
            file.write_all(content.as_bytes())
                .map_err(|e| FretpathError::storage(&temp_path, e))?;
            file.sync_all()
                .map_err(|e| FretpathError::storage(&temp_path, e))?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| FretpathError::storage(&self.path, e))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
