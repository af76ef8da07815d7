//! Failure classification and recovery strategy selection

use maestro_planning::{RiskLevel, WorkflowStep};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Option set presented when a failure needs a human decision
pub const MANUAL_OPTIONS: [&str; 4] = ["retry", "skip", "rollback", "modify_and_retry"];

/// Failure category inferred from an error message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureCategory {
    /// Connectivity or timeout failure, usually transient
    Network,
    /// Access or authorization failure, not recoverable automatically
    Permission,
    /// Malformed input or output
    Syntax,
    /// Resource exhaustion (memory, disk, quota)
    Resource,
    /// A required dependency is missing
    Dependency,
    /// Anything the classifier cannot place
    Unknown,
}

impl FailureCategory {
    /// Whether an automatic retry is worth attempting for this category
    pub fn retry_recommended(self) -> bool {
        matches!(self, FailureCategory::Network | FailureCategory::Resource)
    }
}

/// The recovery action selected for a step failure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Retry the step after an exponential-backoff delay
    Retry {
        /// Seconds to wait before the retry
        delay_secs: u64,
        /// Which attempt this will be (1-based)
        attempt: u32,
        /// Human-readable rationale
        reason: String,
    },
    /// Skip the step and continue
    Skip {
        /// Human-readable rationale
        reason: String,
    },
    /// Roll the workflow back to a checkpoint
    Rollback {
        /// Rollback target description
        target: String,
        /// Human-readable rationale
        reason: String,
    },
    /// Try an alternative approach to the same step
    Alternative {
        /// Human-readable rationale
        reason: String,
    },
    /// Pause and ask a human how to proceed
    ManualIntervention {
        /// Message shown to the operator
        message: String,
        /// Valid responses
        options: Vec<String>,
        /// Human-readable rationale
        reason: String,
    },
}

/// Pure recovery-strategy selector
///
/// Performs no I/O; the execution engine owns retry counters and passes
/// them in.
#[derive(Debug, Clone)]
pub struct RecoveryEngine {
    max_retries: u32,
}

impl Default for RecoveryEngine {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

impl RecoveryEngine {
    /// Create a recovery engine with the default retry cap
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a recovery engine with a custom retry cap
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// The configured retry cap
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Classify a failure from its error text
    pub fn classify(error: &str) -> FailureCategory {
        let lower = error.to_lowercase();
        let has = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

        if has(&["connection", "timeout", "timed out", "network", "unreachable"]) {
            FailureCategory::Network
        } else if has(&["permission", "access", "denied", "unauthorized", "forbidden"]) {
            FailureCategory::Permission
        } else if has(&["syntax", "parse", "invalid"]) {
            FailureCategory::Syntax
        } else if has(&["memory", "disk", "quota", "exhaust", "resource"]) {
            FailureCategory::Resource
        } else if has(&["dependency", "not found", "missing", "no such"]) {
            FailureCategory::Dependency
        } else {
            FailureCategory::Unknown
        }
    }

    /// Select a recovery action for a failed step
    ///
    /// Critical-risk steps always roll back regardless of failure category.
    /// Retryable categories get exponential backoff (`2^retry_count`
    /// seconds) until the retry cap, after which the step is skipped.
    pub fn handle_step_failure(
        &self,
        step: &WorkflowStep,
        error: &str,
        retry_count: u32,
    ) -> RecoveryAction {
        let category = Self::classify(error);
        debug!(step_id = %step.id, ?category, retry_count, "selecting recovery action");

        if step.risk == RiskLevel::Critical {
            return RecoveryAction::Rollback {
                target: "latest checkpoint".to_string(),
                reason: format!(
                    "critical-risk step '{}' failed; rolling back to the latest checkpoint",
                    step.name
                ),
            };
        }

        match category {
            FailureCategory::Permission => RecoveryAction::ManualIntervention {
                message: format!(
                    "Step '{}' hit a permission failure: {}. How should execution proceed?",
                    step.name, error
                ),
                options: MANUAL_OPTIONS.iter().map(|o| o.to_string()).collect(),
                reason: "permission failures cannot be resolved automatically".to_string(),
            },
            FailureCategory::Syntax => RecoveryAction::Rollback {
                target: "latest checkpoint".to_string(),
                reason: format!("syntax failure in step '{}'; rolling back", step.name),
            },
            FailureCategory::Dependency => RecoveryAction::Alternative {
                reason: format!(
                    "step '{}' is missing a dependency; an alternative approach may succeed",
                    step.name
                ),
            },
            FailureCategory::Network | FailureCategory::Resource => {
                self.retry_or_skip(step, category, retry_count)
            }
            FailureCategory::Unknown => RecoveryAction::Skip {
                reason: format!("unclassified failure in step '{}'; skipping", step.name),
            },
        }
    }

    fn retry_or_skip(
        &self,
        step: &WorkflowStep,
        category: FailureCategory,
        retry_count: u32,
    ) -> RecoveryAction {
        if retry_count >= self.max_retries {
            RecoveryAction::Skip {
                reason: format!(
                    "step '{}' exhausted {} retries; skipping",
                    step.name, self.max_retries
                ),
            }
        } else {
            RecoveryAction::Retry {
                delay_secs: 2u64.saturating_pow(retry_count),
                attempt: retry_count + 1,
                reason: format!("{:?} failures are usually transient", category).to_lowercase(),
            }
        }
    }
}
