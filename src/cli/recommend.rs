//! Recommend command for fretpath.
//!
//! Picks the next exercise and explains why it was chosen.

use serde::Serialize;

use crate::engine::{Coach, Recommendation, SeededRandom, ThreadRandom};
use crate::error::exit_codes;
use crate::storage::ProgressStore;

/// Options for the recommend command.
#[derive(Debug, Clone, Default)]
pub struct RecommendOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Seed for a reproducible pick.
    pub seed: Option<u64>,
}

/// Output format for the recommend command.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendOutput {
    /// Whether a recommendation was produced.
    pub success: bool,
    /// Canonical identity of the recommended compound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The recommendation itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<Recommendation>,
    /// Error message if the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecommendOutput {
    /// Create a successful output.
    pub fn success(recommendation: Recommendation) -> Self {
        Self {
            success: true,
            id: Some(recommendation.compound.id().to_string()),
            recommendation: Some(recommendation),
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            id: None,
            recommendation: None,
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

/// The recommend command implementation.
pub struct RecommendCommand<S: ProgressStore> {
    coach: Coach<S>,
}

impl<S: ProgressStore> RecommendCommand<S> {
    /// Create a new recommend command.
    pub fn new(coach: Coach<S>) -> Self {
        Self { coach }
    }

    /// Run the recommend command.
    pub fn run(&self, options: &RecommendOptions) -> RecommendOutput {
        let result = match options.seed {
            Some(seed) => self.coach.recommend_with(&mut SeededRandom::new(seed)),
            None => self.coach.recommend_with(&mut ThreadRandom),
        };

        match result {
            Ok(recommendation) => RecommendOutput::success(recommendation),
            Err(e) => RecommendOutput::failure(e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &RecommendOutput, options: &RecommendOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &RecommendOutput) -> String {
        let Some(rec) = output.recommendation.as_ref() else {
            return format!(
                "Recommend failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        };

        let mut lines = vec![format!("Next: {}", rec.compound)];
        lines.push(format!(
            "Score: {:.2} (from {} candidate{})",
            rec.score,
            rec.candidates,
            if rec.candidates == 1 { "" } else { "s" }
        ));
        if let Some(factor) = rec.dominant_factor {
            lines.push(format!("Driven by: {}", factor.name()));
        }
        lines.push(format!("Why: {}", rec.rationale));

        lines.join("\n") + "\n"
    }
}
