//! Log command for fretpath.
//!
//! Records one attempt at a compound and reports the resulting state.

use serde::Serialize;

use crate::core::{AttemptOutcome, DimensionUnlock};
use crate::engine::Coach;
use crate::error::{exit_codes, FretpathError, Result};
use crate::storage::ProgressStore;

/// Options for the log command.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Metronome tempo of the attempt.
    pub bpm: Option<u32>,
}

/// Output format for the log command.
#[derive(Debug, Clone, Serialize)]
pub struct LogOutput {
    /// Whether the attempt was recorded.
    pub success: bool,
    /// Session index assigned to the attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<u64>,
    /// Canonical identity of the compound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Full outcome of the attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<AttemptOutcome>,
    /// Error message if the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    input_error: bool,
}

impl LogOutput {
    /// Create a successful output.
    pub fn success(outcome: AttemptOutcome) -> Self {
        Self {
            success: true,
            session: Some(outcome.session),
            id: Some(outcome.stats.id().to_string()),
            outcome: Some(outcome),
            error: None,
            input_error: false,
        }
    }

    /// Create a failed output from an error.
    pub fn failure(error: &FretpathError) -> Self {
        Self {
            success: false,
            session: None,
            id: None,
            outcome: None,
            error: Some(error.to_string()),
            input_error: error.is_input_error(),
        }
    }

    /// Process exit code: invalid input is a usage error.
    pub fn exit_code(&self) -> i32 {
        if self.success {
            exit_codes::SUCCESS
        } else if self.input_error {
            exit_codes::USAGE
        } else {
            exit_codes::FAILURE
        }
    }
}

/// The log command implementation.
pub struct LogCommand<S: ProgressStore> {
    coach: Coach<S>,
}

impl<S: ProgressStore> LogCommand<S> {
    /// Create a new log command.
    pub fn new(coach: Coach<S>) -> Self {
        Self { coach }
    }

    /// Record an attempt at the compound described by `compound`.
    pub fn run(&self, compound: &str, speed: f64, options: &LogOptions) -> LogOutput {
        match self.log(compound, speed, options.bpm) {
            Ok(outcome) => LogOutput::success(outcome),
            Err(e) => LogOutput::failure(&e),
        }
    }

    fn log(&self, text: &str, speed: f64, bpm: Option<u32>) -> Result<AttemptOutcome> {
        let compound = self.coach.parse_compound(text)?;
        self.coach.log_attempt(&compound, speed, bpm)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &LogOutput, options: &LogOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &LogOutput) -> String {
        let Some(outcome) = output.outcome.as_ref() else {
            return format!(
                "Log failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        };

        let stats = &outcome.stats;
        let mut lines = vec![format!(
            "Session {}: {} ({})",
            outcome.session,
            stats.compound,
            outcome.state.name()
        )];
        lines.push(format!(
            "Speed: {:.0}  EMA: {:.1}  Best: {:.0}  Attempts: {}",
            stats.last_speed, stats.ema_speed, stats.best_speed, stats.attempts
        ));

        if outcome.newly_mastered() {
            lines.push("Mastered!".to_string());
        } else if outcome.newly_expanded() {
            lines.push("Expanded: neighboring exercises are now open.".to_string());
        }

        if stats.is_struggling() {
            lines.push(format!(
                "Struggling ({} slow attempt{} in a row).",
                stats.struggling_streak,
                if stats.struggling_streak == 1 { "" } else { "s" }
            ));
        }

        for DimensionUnlock { dimension, .. } in &outcome.unlocked {
            lines.push(format!("Unlocked dimension: {}", dimension));
        }

        lines.join("\n") + "\n"
    }
}
