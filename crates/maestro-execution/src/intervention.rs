//! Pending human-decision points and their history

use crate::error::{ExecutionError, ExecutionResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use tracing::info;

/// A blocking decision point awaiting a human response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intervention {
    /// Unique intervention identifier
    pub id: String,
    /// Workflow the decision applies to
    pub workflow_id: String,
    /// Step the decision applies to
    pub step_id: String,
    /// Message shown to the operator
    pub message: String,
    /// Valid responses
    pub options: Vec<String>,
    /// Context data for the operator
    pub context: HashMap<String, serde_json::Value>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// The chosen option, set once responded
    pub response: Option<String>,
    /// Response time, set once responded
    pub responded_at: Option<DateTime<Utc>>,
}

/// Creates intervention records and routes responses
#[derive(Debug, Default)]
pub struct InterventionManager {
    pending: HashMap<String, Intervention>,
    history: HashMap<String, Vec<Intervention>>,
}

impl InterventionManager {
    /// Create an empty intervention manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pending intervention and return its id
    pub fn request_intervention(
        &mut self,
        workflow_id: impl Into<String>,
        step_id: impl Into<String>,
        message: impl Into<String>,
        options: Vec<String>,
        context: HashMap<String, serde_json::Value>,
    ) -> String {
        let intervention = Intervention {
            id: Uuid::new_v4().to_string(),
            workflow_id: workflow_id.into(),
            step_id: step_id.into(),
            message: message.into(),
            options,
            context,
            created_at: Utc::now(),
            response: None,
            responded_at: None,
        };
        let id = intervention.id.clone();
        info!(
            workflow_id = %intervention.workflow_id,
            intervention_id = %id,
            "intervention requested"
        );
        self.pending.insert(id.clone(), intervention);
        id
    }

    /// Record a response, rejecting choices outside the valid option set
    ///
    /// A responded intervention moves from pending to the per-workflow
    /// history.
    pub fn respond(&mut self, intervention_id: &str, choice: &str) -> ExecutionResult<String> {
        let intervention = self.pending.get(intervention_id).ok_or_else(|| {
            ExecutionError::NotFound(format!("intervention: {}", intervention_id))
        })?;

        if !intervention.options.iter().any(|o| o == choice) {
            return Err(ExecutionError::InvalidChoice {
                choice: choice.to_string(),
                options: intervention.options.clone(),
            });
        }

        let mut intervention = self
            .pending
            .remove(intervention_id)
            .ok_or_else(|| ExecutionError::NotFound(format!("intervention: {}", intervention_id)))?;
        intervention.response = Some(choice.to_string());
        intervention.responded_at = Some(Utc::now());
        info!(intervention_id = %intervention_id, choice = %choice, "intervention responded");

        self.history
            .entry(intervention.workflow_id.clone())
            .or_default()
            .push(intervention);
        Ok(choice.to_string())
    }

    /// Look up a pending intervention
    pub fn get_pending(&self, intervention_id: &str) -> Option<&Intervention> {
        self.pending.get(intervention_id)
    }

    /// Pending interventions, optionally filtered by workflow
    pub fn pending(&self, workflow_id: Option<&str>) -> Vec<&Intervention> {
        self.pending
            .values()
            .filter(|i| workflow_id.is_none_or(|w| i.workflow_id == w))
            .collect()
    }

    /// Responded interventions for a workflow, oldest first
    pub fn history(&self, workflow_id: &str) -> &[Intervention] {
        self.history
            .get(workflow_id)
            .map(|h| h.as_slice())
            .unwrap_or(&[])
    }

    /// Withdraw a pending intervention without a response (e.g. timeout)
    pub fn withdraw(&mut self, intervention_id: &str) -> Option<Intervention> {
        let intervention = self.pending.remove(intervention_id)?;
        self.history
            .entry(intervention.workflow_id.clone())
            .or_default()
            .push(intervention.clone());
        Some(intervention)
    }
}
