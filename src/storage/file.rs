//! File-based progress storage for fretpath.
//!
//! Progress lives in `.fretpath/progress.json`, rewritten after every mutation
//! via temp file + rename. Attempts are appended to `.fretpath/attempts.log`.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::project_dir;
use crate::core::{Compound, CompoundId, CompoundStats, DimensionKind, DimensionUnlock};
use crate::error::{FretpathError, Result};
use crate::history::{AttemptEvent, AttemptLog};
use crate::storage::{ProgressSnapshot, ProgressStore};

const SNAPSHOT_FILE: &str = "progress.json";
const SNAPSHOT_TEMP_FILE: &str = ".progress.json.tmp";
const ATTEMPTS_FILE: &str = "attempts.log";

/// File-based progress storage.
///
/// Every call reads the snapshot from disk; mutations hold a lock for the
/// read-modify-write so concurrent callers in one process do not interleave.
#[derive(Debug)]
pub struct FileProgressStore {
    dir: PathBuf,
    log: AttemptLog,
    write_lock: Mutex<()>,
}

impl FileProgressStore {
    /// Open the store for the project containing `cwd`.
    pub fn for_project(cwd: &Path) -> Result<Self> {
        Self::with_dir(project_dir(cwd))
    }

    /// Open a store in a specific directory, creating it if needed.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();

        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| FretpathError::storage(&dir, e))?;
        }

        let log = AttemptLog::new(dir.join(ATTEMPTS_FILE));
        Ok(Self {
            dir,
            log,
            write_lock: Mutex::new(()),
        })
    }

    /// Directory holding the store's files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The attempt log backing this store.
    pub fn attempt_log(&self) -> &AttemptLog {
        &self.log
    }

    fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_TEMP_FILE)
    }

    /// Read the snapshot; a missing file is an empty snapshot.
    pub fn load(&self) -> Result<ProgressSnapshot> {
        let path = self.snapshot_path();

        if !path.exists() {
            return Ok(ProgressSnapshot::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| FretpathError::storage(&path, e))?;
        let snapshot: ProgressSnapshot = serde_json::from_str(&content)?;
        Ok(snapshot)
    }

    /// Write the snapshot atomically using temp file + rename.
    fn atomic_write(&self, snapshot: &ProgressSnapshot) -> Result<()> {
        let final_path = self.snapshot_path();
        let temp_path = self.temp_path();

        let json = serde_json::to_string_pretty(snapshot)?;

        {
            let mut file =
                fs::File::create(&temp_path).map_err(|e| FretpathError::storage(&temp_path, e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| FretpathError::storage(&temp_path, e))?;
            file.sync_all()
                .map_err(|e| FretpathError::storage(&temp_path, e))?;
        }

        fs::rename(&temp_path, &final_path)
            .map_err(|e| FretpathError::storage(&final_path, e))?;

        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|_| {
            FretpathError::storage(&self.dir, io::Error::other("progress store lock poisoned"))
        })
    }

    /// Load, apply `f`, and write back under the write lock.
    fn update<T>(&self, f: impl FnOnce(&mut ProgressSnapshot) -> T) -> Result<T> {
        let _guard = self.lock()?;

        let mut snapshot = self.load()?;
        let result = f(&mut snapshot);
        self.atomic_write(&snapshot)?;
        Ok(result)
    }
}

impl ProgressStore for FileProgressStore {
    fn get_statistics(&self, id: &CompoundId) -> Result<Option<CompoundStats>> {
        Ok(self.load()?.get(id).cloned())
    }

    fn all_statistics(&self) -> Result<Vec<CompoundStats>> {
        Ok(self.load()?.practiced())
    }

    fn current_session(&self) -> Result<u64> {
        Ok(self.load()?.session)
    }

    fn is_dimension_unlocked(&self, kind: DimensionKind) -> Result<bool> {
        Ok(self.load()?.is_unlocked(kind))
    }

    fn unlock_dimension(&self, kind: DimensionKind, session: u64) -> Result<()> {
        self.update(|s| {
            s.unlock(kind, session);
        })
    }

    fn unlocks(&self) -> Result<Vec<DimensionUnlock>> {
        Ok(self.load()?.unlocks)
    }

    fn recent_dimension_changes(&self, lookback: usize) -> Result<Vec<DimensionKind>> {
        Ok(self.load()?.recent_changes(lookback))
    }

    fn last_compound(&self) -> Result<Option<Compound>> {
        Ok(self.load()?.last_compound)
    }

    fn record_attempt(&self, event: &AttemptEvent, stats: &CompoundStats) -> Result<CompoundStats> {
        let _guard = self.lock()?;

        // The log is the source of truth: a snapshot write that fails after
        // this point is repaired by the next rebuild.
        self.log.append(event)?;

        let mut snapshot = self.load()?;
        let stored = snapshot.record(event, stats);
        self.atomic_write(&snapshot)?;
        Ok(stored)
    }

    fn replace(&self, snapshot: ProgressSnapshot, history: &[AttemptEvent]) -> Result<()> {
        let _guard = self.lock()?;

        self.log.rewrite(history)?;
        self.atomic_write(&snapshot)
    }
}
