//! Rebuild command for fretpath.
//!
//! Recomputes all progress from the attempt log. The replay is staged in
//! memory and only swapped into the store once it has finished; attempts
//! that no longer validate are kept in the log.

use serde::Serialize;

use crate::engine::Coach;
use crate::error::{exit_codes, Result};
use crate::history::AttemptLog;
use crate::storage::ProgressStore;

/// Options for the rebuild command.
#[derive(Debug, Clone, Default)]
pub struct RebuildOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the rebuild command.
#[derive(Debug, Clone, Serialize)]
pub struct RebuildOutput {
    /// Whether the rebuild completed.
    pub success: bool,
    /// Events replayed.
    pub replayed: usize,
    /// Events skipped as invalid.
    pub skipped: usize,
    /// Session counter after the rebuild.
    pub session: u64,
    /// Error message if the rebuild failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RebuildOutput {
    /// Create a successful output.
    pub fn success(replayed: usize, skipped: usize, session: u64) -> Self {
        Self {
            success: true,
            replayed,
            skipped,
            session,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            replayed: 0,
            skipped: 0,
            session: 0,
            error: Some(error.into()),
        }
    }

    /// Process exit code for this output.
    pub fn exit_code(&self) -> i32 {
        if self.success {
            exit_codes::SUCCESS
        } else {
            exit_codes::FAILURE
        }
    }
}

/// The rebuild command implementation.
pub struct RebuildCommand<S: ProgressStore> {
    coach: Coach<S>,
    log: AttemptLog,
}

impl<S: ProgressStore> RebuildCommand<S> {
    /// Create a new rebuild command replaying `log`.
    pub fn new(coach: Coach<S>, log: AttemptLog) -> Self {
        Self { coach, log }
    }

    /// Run the rebuild command.
    pub fn run(&self, _options: &RebuildOptions) -> RebuildOutput {
        match self.rebuild() {
            Ok(output) => output,
            Err(e) => RebuildOutput::failure(e.to_string()),
        }
    }

    fn rebuild(&self) -> Result<RebuildOutput> {
        let events = self.log.read_all()?;
        let report = self.coach.rebuild(&events)?;
        let session = self.coach.store().current_session()?;

        tracing::info!(
            replayed = report.replayed,
            skipped = report.skipped,
            session,
            "rebuilt progress from attempt log"
        );

        Ok(RebuildOutput::success(report.replayed, report.skipped, session))
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &RebuildOutput, options: &RebuildOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else if output.success {
            let mut text = format!(
                "Replayed {} attempt{} ({} sessions).\n",
                output.replayed,
                if output.replayed == 1 { "" } else { "s" },
                output.session
            );
            if output.skipped > 0 {
                text.push_str(&format!("Skipped {} invalid attempt(s).\n", output.skipped));
            }
            text
        } else {
            format!(
                "Rebuild failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::history::AttemptEvent;
    use crate::storage::FileProgressStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup(dir: &TempDir) -> (Arc<FileProgressStore>, RebuildCommand<Arc<FileProgressStore>>) {
        let store = Arc::new(FileProgressStore::with_dir(dir.path()).unwrap());
        let log = store.attempt_log().clone();
        let coach = Coach::new(Arc::clone(&store), Config::default()).unwrap();
        (store, RebuildCommand::new(coach, log))
    }

    #[test]
    fn test_rebuild_matches_live_state() {
        let dir = TempDir::new().unwrap();
        let (store, cmd) = setup(&dir);

        let attempts = [
            ("scale=blues", 300.0),
            ("scale=blues", 430.0),
            ("position=d_shape", 150.0),
        ];
        for (text, speed) in attempts {
            let compound = cmd.coach.parse_compound(text).unwrap();
            cmd.coach.log_attempt(&compound, speed, None).unwrap();
        }
        let before = store.load().unwrap();

        let output = cmd.run(&RebuildOptions::default());

        assert!(output.success);
        assert_eq!(output.replayed, 3);
        assert_eq!(output.session, 3);
        assert_eq!(store.load().unwrap(), before);
        assert_eq!(store.attempt_log().read_all().unwrap().len(), 3);
    }

    #[test]
    fn test_rebuild_skips_invalid_lines() {
        let dir = TempDir::new().unwrap();
        let (store, cmd) = setup(&dir);

        let good = cmd.coach.parse_compound("scale=blues").unwrap();
        let bad = good.with(crate::core::DimensionKind::Scale, "kazoo");
        store
            .attempt_log()
            .append(&AttemptEvent::new(1, good, 300.0, None, None))
            .unwrap();
        store
            .attempt_log()
            .append(&AttemptEvent::new(2, bad, 300.0, None, None))
            .unwrap();

        let options = RebuildOptions::default();
        let output = cmd.run(&options);

        assert_eq!(output.replayed, 1);
        assert_eq!(output.skipped, 1);
        assert_eq!(output.session, 1);

        let formatted = cmd.format_output(&output, &options);
        assert!(formatted.contains("Replayed 1 attempt (1 sessions)."));
        assert!(formatted.contains("Skipped 1 invalid attempt(s)."));
    }

    #[test]
    fn test_rebuild_keeps_skipped_attempts_in_log() {
        let dir = TempDir::new().unwrap();
        let (store, cmd) = setup(&dir);

        let good = cmd.coach.parse_compound("scale=blues").unwrap();
        let bad = good.with(crate::core::DimensionKind::Scale, "kazoo");
        let skipped = AttemptEvent::new(2, bad, 300.0, None, None);
        store
            .attempt_log()
            .append(&AttemptEvent::new(1, good, 300.0, None, None))
            .unwrap();
        store.attempt_log().append(&skipped).unwrap();

        let output = cmd.run(&RebuildOptions::default());
        assert!(output.success);
        assert_eq!(output.skipped, 1);

        let events = store.attempt_log().read_all().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], skipped);

        // Rebuilding again is stable
        let again = cmd.run(&RebuildOptions::default());
        assert_eq!((again.replayed, again.skipped), (1, 1));
        assert_eq!(store.attempt_log().read_all().unwrap().len(), 2);
    }

    #[test]
    fn test_failed_rebuild_leaves_log_untouched() {
        let dir = TempDir::new().unwrap();
        let (store, cmd) = setup(&dir);

        let compound = cmd.coach.parse_compound("scale=blues").unwrap();
        cmd.coach.log_attempt(&compound, 420.0, None).unwrap();
        let before = std::fs::read_to_string(store.attempt_log().path()).unwrap();

        // A directory in the way of the log's temp file fails the swap
        std::fs::create_dir_all(dir.path().join("attempts.log.tmp")).unwrap();

        let output = cmd.run(&RebuildOptions::default());
        assert!(!output.success);
        assert_eq!(
            std::fs::read_to_string(store.attempt_log().path()).unwrap(),
            before
        );
    }

    #[test]
    fn test_rebuild_empty_log() {
        let dir = TempDir::new().unwrap();
        let (_, cmd) = setup(&dir);

        let output = cmd.run(&RebuildOptions::default());
        assert!(output.success);
        assert_eq!(output.replayed, 0);
        assert_eq!(output.session, 0);
    }

    #[test]
    fn test_corrupt_log_fails() {
        let dir = TempDir::new().unwrap();
        let (store, cmd) = setup(&dir);
        std::fs::write(store.attempt_log().path(), "{not json}\n").unwrap();

        let output = cmd.run(&RebuildOptions::default());
        assert!(!output.success);
        assert_eq!(output.exit_code(), exit_codes::FAILURE);
        assert!(output.error.unwrap().contains("line 1"));
    }
}
