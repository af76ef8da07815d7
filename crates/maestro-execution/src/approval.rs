//! Approval gates for high-risk steps

use crate::intervention::InterventionManager;
use maestro_planning::{RiskLevel, WorkflowStep};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Option set presented for an approval request
pub const APPROVAL_OPTIONS: [&str; 4] = ["approve", "reject", "modify", "pause"];

/// Default wait for an approval decision before rejecting for safety
pub const DEFAULT_APPROVAL_TIMEOUT: Duration = Duration::from_secs(300);

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Configured trigger for requiring approval on an operation type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRule {
    /// Minimum step risk that triggers the rule
    pub min_risk: RiskLevel,
    /// Step types (executor references) the rule applies to
    pub step_types: Vec<String>,
    /// Description keywords that trigger the rule
    pub keywords: Vec<String>,
    /// Human-readable rule description
    pub description: String,
}

/// Resolution of an approval request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalOutcome {
    /// Approved; execute the step
    Proceed,
    /// Rejected (or timed out); skip the step
    Skip,
    /// Approved with operator modifications to apply first
    ProceedWithModifications,
    /// Pause the whole workflow
    PauseWorkflow,
}

/// Gates step execution behind human approval when risk warrants it
pub struct ApprovalManager {
    rules: HashMap<String, ApprovalRule>,
    timeout: Duration,
    interventions: Arc<Mutex<InterventionManager>>,
}

impl ApprovalManager {
    /// Create an approval manager sharing the given intervention manager
    pub fn new(interventions: Arc<Mutex<InterventionManager>>) -> Self {
        Self {
            rules: HashMap::new(),
            timeout: DEFAULT_APPROVAL_TIMEOUT,
            interventions,
        }
    }

    /// Override the decision timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register a rule for an operation type
    pub fn add_rule(&mut self, operation_type: impl Into<String>, rule: ApprovalRule) {
        self.rules.insert(operation_type.into(), rule);
    }

    /// Whether the step needs a human decision before executing
    pub fn requires_approval(&self, step: &WorkflowStep, operation_type: &str) -> bool {
        if step.risk >= RiskLevel::High {
            return true;
        }
        let Some(rule) = self.rules.get(operation_type) else {
            return false;
        };
        if step.risk >= rule.min_risk {
            return true;
        }
        if let Some(executor_ref) = &step.executor_ref {
            if rule.step_types.iter().any(|t| t == executor_ref) {
                return true;
            }
        }
        let description = step.description.to_lowercase();
        rule.keywords.iter().any(|k| description.contains(&k.to_lowercase()))
    }

    /// Request approval for a step, blocking until resolved or timed out
    ///
    /// Steps that need no approval resolve immediately as [`ApprovalOutcome::Proceed`].
    /// Otherwise an intervention with options {approve, reject, modify, pause}
    /// is raised; no response within the timeout counts as a rejection.
    pub async fn request_approval(
        &self,
        workflow_id: &str,
        step: &WorkflowStep,
        operation_type: &str,
    ) -> ApprovalOutcome {
        if !self.requires_approval(step, operation_type) {
            debug!(step_id = %step.id, "approved, no approval required");
            return ApprovalOutcome::Proceed;
        }

        let mut context = HashMap::new();
        context.insert(
            "operation_type".to_string(),
            serde_json::json!(operation_type),
        );
        context.insert("risk".to_string(), serde_json::json!(step.risk));

        let intervention_id = self.interventions.lock().await.request_intervention(
            workflow_id,
            &step.id,
            format!(
                "Step '{}' ({:?} risk) needs approval before it runs: {}",
                step.name, step.risk, step.description
            ),
            APPROVAL_OPTIONS.iter().map(|o| o.to_string()).collect(),
            context,
        );
        info!(workflow_id = %workflow_id, step_id = %step.id, "approval requested");

        let wait = self.wait_for_response(workflow_id, &intervention_id);
        match tokio::time::timeout(self.timeout, wait).await {
            Ok(choice) => Self::outcome_for(&choice),
            Err(_) => {
                warn!(
                    workflow_id = %workflow_id,
                    step_id = %step.id,
                    "approval timed out, rejecting for safety"
                );
                self.interventions.lock().await.withdraw(&intervention_id);
                ApprovalOutcome::Skip
            }
        }
    }

    /// Pending approval requests, optionally filtered by workflow
    pub async fn pending_approvals(&self, workflow_id: Option<&str>) -> Vec<String> {
        self.interventions
            .lock()
            .await
            .pending(workflow_id)
            .iter()
            .filter(|i| i.context.contains_key("operation_type"))
            .map(|i| i.id.clone())
            .collect()
    }

    async fn wait_for_response(&self, workflow_id: &str, intervention_id: &str) -> String {
        loop {
            {
                let interventions = self.interventions.lock().await;
                if interventions.get_pending(intervention_id).is_none() {
                    return interventions
                        .history(workflow_id)
                        .iter()
                        .find(|i| i.id == intervention_id)
                        .and_then(|i| i.response.clone())
                        .unwrap_or_else(|| "reject".to_string());
                }
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn outcome_for(choice: &str) -> ApprovalOutcome {
        match choice {
            "approve" => ApprovalOutcome::Proceed,
            "modify" => ApprovalOutcome::ProceedWithModifications,
            "pause" => ApprovalOutcome::PauseWorkflow,
            _ => ApprovalOutcome::Skip,
        }
    }
}
