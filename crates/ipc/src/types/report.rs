//! Command result types reported back to the host.

use serde::{Deserialize, Serialize};

/// Tri-state result of a command.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Outcome {
    /// The command ran and changed the scene
    #[default]
    Completed,
    /// Nothing was changed (validation failed or nothing to do)
    Cancelled,
    /// An unexpected failure aborted the command
    Error { message: String },
}

/// Per-item counts of a batch command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchCounts {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchCounts {
    /// Total number of items the batch attempted
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }
}

/// Result of one command, as shown to the user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommandReport {
    pub outcome: Outcome,
    /// Human-readable status line
    pub status: String,
    /// Item counts (batch commands only)
    pub counts: Option<BatchCounts>,
    /// De-duplicated skip/error reasons, in first-seen order
    pub reasons: Vec<String>,
    /// Shape key the host should select afterwards
    pub active_key: Option<String>,
}

impl CommandReport {
    pub fn completed(status: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Completed,
            status: status.into(),
            ..Default::default()
        }
    }

    pub fn cancelled(status: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Cancelled,
            status: status.into(),
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            outcome: Outcome::Error {
                message: message.clone(),
            },
            status: message,
            ..Default::default()
        }
    }

    pub fn with_counts(mut self, counts: BatchCounts) -> Self {
        self.counts = Some(counts);
        self
    }

    pub fn with_reasons(mut self, reasons: Vec<String>) -> Self {
        self.reasons = reasons;
        self
    }

    pub fn with_active_key(mut self, name: impl Into<String>) -> Self {
        self.active_key = Some(name.into());
        self
    }

    pub fn is_completed(&self) -> bool {
        self.outcome == Outcome::Completed
    }
}

/// Progress of a running batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressUpdate {
    Begin { total: usize },
    Step { done: usize },
    End,
}
