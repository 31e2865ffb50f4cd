//! Status command for fretpath.
//!
//! Shows the session counter, unlocked dimensions and per-compound progress.

use serde::Serialize;

use crate::engine::{Coach, StatusReport};
use crate::error::exit_codes;
use crate::storage::ProgressStore;

/// Default number of compounds listed.
pub const DEFAULT_LIMIT: usize = 20;

/// Options for the status command.
#[derive(Debug, Clone)]
pub struct StatusOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Maximum number of compounds to list.
    pub limit: usize,
}

impl Default for StatusOptions {
    fn default() -> Self {
        Self {
            json: false,
            quiet: false,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Output format for the status command.
#[derive(Debug, Clone, Serialize)]
pub struct StatusOutput {
    /// Whether the status could be read.
    pub success: bool,
    /// Progress report, with `compounds` truncated to the limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusReport>,
    /// Number of practiced compounds before truncation.
    pub total_compounds: usize,
    /// Error message if the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusOutput {
    /// Create a successful output.
    pub fn success(status: StatusReport, total_compounds: usize) -> Self {
        Self {
            success: true,
            status: Some(status),
            total_compounds,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            status: None,
            total_compounds: 0,
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

/// The status command implementation.
pub struct StatusCommand<S: ProgressStore> {
    coach: Coach<S>,
}

impl<S: ProgressStore> StatusCommand<S> {
    /// Create a new status command.
    pub fn new(coach: Coach<S>) -> Self {
        Self { coach }
    }

    /// Run the status command.
    pub fn run(&self, options: &StatusOptions) -> StatusOutput {
        match self.coach.status() {
            Ok(mut status) => {
                let total = status.compounds.len();
                status.compounds.truncate(options.limit);
                StatusOutput::success(status, total)
            }
            Err(e) => StatusOutput::failure(e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &StatusOutput, options: &StatusOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &StatusOutput) -> String {
        let Some(status) = output.status.as_ref() else {
            return format!(
                "Status failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        };

        let mut lines = vec![format!("Session: {}", status.session)];
        lines.push(format!("Current: {}", status.current));

        if !status.unlocks.is_empty() {
            let unlocked: Vec<String> = status
                .unlocks
                .iter()
                .map(|u| format!("{} (session {})", u.dimension, u.session))
                .collect();
            lines.push(format!("Unlocked: {}", unlocked.join(", ")));
        }
        if !status.locked.is_empty() {
            let locked: Vec<&str> = status.locked.iter().map(|k| k.as_str()).collect();
            lines.push(format!("Locked: {}", locked.join(", ")));
        }

        if status.compounds.is_empty() {
            lines.push(String::new());
            lines.push("No attempts logged yet.".to_string());
            return lines.join("\n") + "\n";
        }

        lines.push(String::new());
        lines.push(format!(
            "{:<11} {:>8} {:>8} {:>5}  Compound",
            "State", "EMA", "Best", "Tries"
        ));
        for stats in &status.compounds {
            let mut state = stats.state().name().to_string();
            if stats.is_struggling() {
                state.push('*');
            }
            lines.push(format!(
                "{:<11} {:>8.1} {:>8.0} {:>5}  {}",
                state, stats.ema_speed, stats.best_speed, stats.attempts, stats.compound
            ));
        }

        if output.total_compounds > status.compounds.len() {
            lines.push(format!(
                "... and {} more",
                output.total_compounds - status.compounds.len()
            ));
        }

        lines.join("\n") + "\n"
    }
}
