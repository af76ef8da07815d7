//! Error types for workflow execution

use thiserror::Error;

/// Errors that can occur during workflow execution
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A workflow, step, checkpoint, or request was not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation is invalid in the current workflow state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A step executor reported a failure
    #[error("Step failed: {0}")]
    StepFailed(String),

    /// A step executor exceeded its time budget
    #[error("Step timed out: {0}")]
    StepTimeout(String),

    /// A rollback category failed to restore
    #[error("Rollback failed while restoring {category}: {reason}")]
    RollbackFailed {
        /// Capture category that failed to restore
        category: String,
        /// Failure detail from the restorer
        reason: String,
    },

    /// An approval request expired without a decision
    #[error("Approval timeout")]
    ApprovalTimeout,

    /// A response named an option outside the valid set
    #[error("Invalid choice '{choice}', valid options: {options:?}")]
    InvalidChoice {
        /// The rejected choice
        choice: String,
        /// The valid option set
        options: Vec<String>,
    },

    /// Planning failed while building the workflow
    #[error("Planning error: {0}")]
    Planning(#[from] maestro_planning::PlanningError),

    /// YAML serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for execution operations
pub type ExecutionResult<T> = Result<T, ExecutionError>;
