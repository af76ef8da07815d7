//! The external step-executor contract

use crate::error::ExecutionResult;
use async_trait::async_trait;
use maestro_planning::WorkflowStep;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Result record returned by a step executor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepOutcome {
    /// Whether the step succeeded
    pub success: bool,
    /// Executor output
    pub output: serde_json::Value,
    /// Executor confidence in the output (0.0 to 1.0)
    pub confidence: f64,
    /// Error message if the step failed
    #[serde(default)]
    pub error: Option<String>,
    /// Wall-clock execution time in milliseconds
    pub execution_time_ms: u64,
    /// Resources the executor touched while running the step
    #[serde(default)]
    pub modified_resources: Vec<String>,
}

impl StepOutcome {
    /// A successful outcome with the given output
    pub fn success(output: serde_json::Value) -> Self {
        Self {
            success: true,
            output,
            confidence: 1.0,
            error: None,
            execution_time_ms: 0,
            modified_resources: Vec::new(),
        }
    }

    /// A failed outcome with the given error message
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: serde_json::Value::Null,
            confidence: 0.0,
            error: Some(error.into()),
            execution_time_ms: 0,
            modified_resources: Vec::new(),
        }
    }

    /// Attach the resources the step touched
    pub fn with_modified_resources(mut self, resources: Vec<String>) -> Self {
        self.modified_resources = resources;
        self
    }
}

/// Executes a single workflow step
///
/// Implementations are external collaborators (local workers, remote agents
/// behind a message bus). The execution engine treats the call as opaque and
/// never retries inside the executor; retries are the recovery engine's
/// responsibility.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Execute the step with the given execution context
    async fn execute_step(
        &self,
        step: &WorkflowStep,
        context: &HashMap<String, serde_json::Value>,
    ) -> ExecutionResult<StepOutcome>;
}
