//! Attempt history for fretpath.
//!
//! Every logged attempt is appended to a JSONL file (`.fretpath/attempts.log`).
//! The log is the source of truth for a full rebuild of the progress snapshot.

pub mod log;

pub use log::{AttemptEvent, AttemptLog, ATTEMPT_SCHEMA_VERSION};
