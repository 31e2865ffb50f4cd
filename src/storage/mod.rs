//! Progress storage for fretpath.
//!
//! This module provides persistent storage for compound statistics, the
//! session counter, dimension unlocks and recent change history, with
//! file-based and in-memory backends.

pub mod file;
pub mod memory;
pub mod snapshot;
pub mod traits;

pub use file::FileProgressStore;
pub use memory::MemoryProgressStore;
pub use snapshot::{ProgressSnapshot, CHANGE_HISTORY_LIMIT, SNAPSHOT_SCHEMA_VERSION};
pub use traits::ProgressStore;
