//! Error types for the planning module

use thiserror::Error;

/// Errors that can occur while building a workflow plan
#[derive(Debug, Error)]
pub enum PlanningError {
    /// The requested decomposition strategy is not supported
    #[error("Unsupported strategy: {0}")]
    UnsupportedStrategy(String),

    /// The goal text was empty or otherwise unusable
    #[error("Invalid goal: {0}")]
    InvalidGoal(String),

    /// A step referenced a dependency that does not exist
    #[error("Unknown step referenced: {0}")]
    UnknownStep(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for planning operations
pub type PlanningResult<T> = Result<T, PlanningError>;
