//! Operator overrides applied outside the automated path

use crate::error::{ExecutionError, ExecutionResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use tracing::info;

/// Handler applying operator instructions for one operation type
pub type OverrideHandler =
    Arc<dyn Fn(&OverrideRequest) -> Result<serde_json::Value, String> + Send + Sync>;

/// Lifecycle status of an override request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideStatus {
    /// Requested but not yet executed
    Pending,
    /// Executed successfully
    Completed,
    /// Execution failed
    Failed,
}

/// An operator-supplied override of an automated decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideRequest {
    /// Unique request identifier
    pub id: String,
    /// Workflow the override applies to
    pub workflow_id: String,
    /// Operation type selecting the handler
    pub operation_type: String,
    /// Operator instructions
    pub instructions: String,
    /// Context data for the handler
    pub context: HashMap<String, serde_json::Value>,
    /// Current status
    pub status: OverrideStatus,
    /// Request time
    pub requested_at: DateTime<Utc>,
    /// Handler output, set on completion
    pub result: Option<serde_json::Value>,
    /// Failure detail, set on failure
    pub error: Option<String>,
}

/// Registers override handlers and tracks override requests
#[derive(Default)]
pub struct OverrideManager {
    handlers: HashMap<String, OverrideHandler>,
    requests: HashMap<String, OverrideRequest>,
}

impl OverrideManager {
    /// Create an empty override manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for an operation type
    pub fn register_handler(&mut self, operation_type: impl Into<String>, handler: OverrideHandler) {
        self.handlers.insert(operation_type.into(), handler);
    }

    /// Record a pending override request and return its id
    pub fn request_override(
        &mut self,
        workflow_id: impl Into<String>,
        operation_type: impl Into<String>,
        instructions: impl Into<String>,
        context: HashMap<String, serde_json::Value>,
    ) -> String {
        let request = OverrideRequest {
            id: Uuid::new_v4().to_string(),
            workflow_id: workflow_id.into(),
            operation_type: operation_type.into(),
            instructions: instructions.into(),
            context,
            status: OverrideStatus::Pending,
            requested_at: Utc::now(),
            result: None,
            error: None,
        };
        let id = request.id.clone();
        info!(
            workflow_id = %request.workflow_id,
            override_id = %id,
            operation_type = %request.operation_type,
            "override requested"
        );
        self.requests.insert(id.clone(), request);
        id
    }

    /// Execute a pending override through its registered handler
    pub fn execute_override(&mut self, override_id: &str) -> ExecutionResult<serde_json::Value> {
        let request = self
            .requests
            .get(override_id)
            .ok_or_else(|| ExecutionError::NotFound(format!("override: {}", override_id)))?;
        if request.status != OverrideStatus::Pending {
            return Err(ExecutionError::InvalidState(format!(
                "override {} already {:?}",
                override_id, request.status
            )));
        }
        let handler = self
            .handlers
            .get(&request.operation_type)
            .ok_or_else(|| {
                ExecutionError::NotFound(format!(
                    "override handler for operation type: {}",
                    request.operation_type
                ))
            })?
            .clone();

        let outcome = handler(request);
        let request = self
            .requests
            .get_mut(override_id)
            .ok_or_else(|| ExecutionError::NotFound(format!("override: {}", override_id)))?;
        match outcome {
            Ok(result) => {
                request.status = OverrideStatus::Completed;
                request.result = Some(result.clone());
                Ok(result)
            }
            Err(reason) => {
                request.status = OverrideStatus::Failed;
                request.error = Some(reason.clone());
                Err(ExecutionError::StepFailed(format!(
                    "override {} failed: {}",
                    override_id, reason
                )))
            }
        }
    }

    /// Look up an override request
    pub fn get(&self, override_id: &str) -> ExecutionResult<&OverrideRequest> {
        self.requests
            .get(override_id)
            .ok_or_else(|| ExecutionError::NotFound(format!("override: {}", override_id)))
    }

    /// All override requests for a workflow
    pub fn list(&self, workflow_id: &str) -> Vec<&OverrideRequest> {
        self.requests
            .values()
            .filter(|r| r.workflow_id == workflow_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_completes_request() {
        let mut manager = OverrideManager::new();
        manager.register_handler(
            "reschedule",
            Arc::new(|request| Ok(serde_json::json!({ "applied": request.instructions }))),
        );

        let id = manager.request_override(
            "wf-1",
            "reschedule",
            "move step-3 to tomorrow",
            HashMap::new(),
        );
        assert_eq!(manager.get(&id).unwrap().status, OverrideStatus::Pending);

        let result = manager.execute_override(&id).unwrap();
        assert_eq!(result["applied"], "move step-3 to tomorrow");
        assert_eq!(manager.get(&id).unwrap().status, OverrideStatus::Completed);
    }

    #[test]
    fn test_handler_failure_marks_failed() {
        let mut manager = OverrideManager::new();
        manager.register_handler("patch", Arc::new(|_| Err("instructions unclear".to_string())));

        let id = manager.request_override("wf-1", "patch", "do the thing", HashMap::new());
        assert!(manager.execute_override(&id).is_err());

        let request = manager.get(&id).unwrap();
        assert_eq!(request.status, OverrideStatus::Failed);
        assert_eq!(request.error.as_deref(), Some("instructions unclear"));
    }

    #[test]
    fn test_missing_handler_is_not_found() {
        let mut manager = OverrideManager::new();
        let id = manager.request_override("wf-1", "unknown-op", "anything", HashMap::new());
        assert!(matches!(
            manager.execute_override(&id),
            Err(ExecutionError::NotFound(_))
        ));
        // Request stays pending when no handler exists
        assert_eq!(manager.get(&id).unwrap().status, OverrideStatus::Pending);
    }

    #[test]
    fn test_double_execute_is_invalid_state() {
        let mut manager = OverrideManager::new();
        manager.register_handler("noop", Arc::new(|_| Ok(serde_json::Value::Null)));
        let id = manager.request_override("wf-1", "noop", "once", HashMap::new());

        manager.execute_override(&id).unwrap();
        assert!(matches!(
            manager.execute_override(&id),
            Err(ExecutionError::InvalidState(_))
        ));
    }
}
