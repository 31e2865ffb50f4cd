//! Init command for fretpath.
//!
//! Scaffolds the project `.fretpath/` directory, its config file, and the
//! user-level fretpath home.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::config::{fretpath_home, PROJECT_DIR_NAME};
use crate::error::exit_codes;

/// Options for the init command.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Force overwrite existing files.
    pub force: bool,
}

/// Output format for the init command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitOutput {
    /// Whether initialization was successful.
    pub success: bool,
    /// Files and directories created.
    pub created: Vec<String>,
    /// Files that already existed (skipped).
    pub skipped: Vec<String>,
    /// Error message if initialization failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InitOutput {
    /// Create a successful output.
    pub fn success(created: Vec<String>, skipped: Vec<String>) -> Self {
        Self {
            success: true,
            created,
            skipped,
            error: None,
        }
    }

    /// Create a failed output, keeping what was created before the failure.
    pub fn failure(error: impl Into<String>, created: Vec<String>, skipped: Vec<String>) -> Self {
        Self {
            success: false,
            created,
            skipped,
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

/// Default config.toml content.
pub const DEFAULT_CONFIG: &str = r#"# fretpath configuration
#
# Every setting is optional; the values below are the built-in defaults.
# Environment variables (FRETPATH_EXPANSION_THRESHOLD, FRETPATH_STRATEGY, ...)
# override this file.

[progression]
# Speed score at which a compound opens its neighbors
expansion_threshold = 400.0
# Speed score counted towards the mastery streak
mastery_threshold = 480.0
mastery_streak = 3
# Attempts below this score count as struggling
struggling_threshold = 200.0
ema_alpha = 0.3

[scoring]
staleness_window = 10
diversity_lookback = 3
default_transfer = 0.5
low_readiness = 0.3

[scoring.weights]
consolidation = 1.0
staleness = 0.4
readiness = 0.8
diversity = 0.3

[scoring.transfer]
scale = 0.7
position = 0.8
rhythm = 0.6

# strategy: "full_history" (default) or "single_origin"
[recommend]
strategy = "full_history"

# A [dimensions.<name>] table replaces that dimension's built-in values.
# [dimensions.scale]
# values = ["minor_pentatonic", "blues", "dorian"]
# entry_point = "minor_pentatonic"
"#;

/// The init command implementation.
pub struct InitCommand {
    cwd: String,
}

impl InitCommand {
    /// Create a new init command.
    pub fn new(cwd: impl Into<String>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Run the init command.
    pub fn run(&self, options: &InitOptions) -> InitOutput {
        let cwd = Path::new(&self.cwd);
        let mut created = Vec::new();
        let mut skipped = Vec::new();

        let project_dir = cwd.join(PROJECT_DIR_NAME);
        match self.ensure_dir(&project_dir) {
            Ok(true) => created.push(project_dir.display().to_string()),
            Ok(false) => skipped.push(project_dir.display().to_string()),
            Err(e) => return InitOutput::failure(e, created, skipped),
        }

        let config_path = project_dir.join("config.toml");
        match self.ensure_file(&config_path, DEFAULT_CONFIG, options.force) {
            Ok(true) => created.push(config_path.display().to_string()),
            Ok(false) => skipped.push(config_path.display().to_string()),
            Err(e) => return InitOutput::failure(e, created, skipped),
        }

        if let Some(home) = fretpath_home() {
            match self.ensure_dir(&home) {
                Ok(true) => created.push(home.display().to_string()),
                Ok(false) => skipped.push(home.display().to_string()),
                Err(e) => return InitOutput::failure(e, created, skipped),
            }
        }

        InitOutput::success(created, skipped)
    }

    /// Returns Ok(true) if created, Ok(false) if it already existed.
    fn ensure_dir(&self, path: &Path) -> Result<bool, String> {
        if path.exists() {
            if path.is_dir() {
                return Ok(false);
            }
            return Err(format!("{} exists but is not a directory", path.display()));
        }

        fs::create_dir_all(path)
            .map_err(|e| format!("Failed to create directory {}: {}", path.display(), e))?;

        Ok(true)
    }

    /// Returns Ok(true) if written, Ok(false) if it already existed.
    fn ensure_file(&self, path: &Path, content: &str, force: bool) -> Result<bool, String> {
        if path.exists() && !force {
            return Ok(false);
        }

        fs::write(path, content)
            .map_err(|e| format!("Failed to write file {}: {}", path.display(), e))?;

        Ok(true)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &InitOutput, options: &InitOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &InitOutput) -> String {
        let mut lines = Vec::new();

        if !output.success {
            lines.push(format!(
                "Init failed: {}",
                output.error.as_deref().unwrap_or("unknown error")
            ));
            if !output.created.is_empty() {
                lines.push(String::new());
                lines.push("Partially created before failure:".to_string());
                for path in &output.created {
                    lines.push(format!("  {}", path));
                }
            }
            return lines.join("\n") + "\n";
        }

        if output.created.is_empty() {
            return "fretpath already initialized.\n".to_string();
        }

        lines.push("Created:".to_string());
        for path in &output.created {
            lines.push(format!("  {}", path));
        }

        if !output.skipped.is_empty() {
            lines.push("Already exists (skipped):".to_string());
            for path in &output.skipped {
                lines.push(format!("  {}", path));
            }
        }

        lines.push(String::new());
        lines.push("fretpath initialized. Run `fretpath recommend` to start.".to_string());

        lines.join("\n") + "\n"
    }
}
