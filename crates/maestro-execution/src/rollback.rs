//! Rollback to checkpoints with per-category restoration and auditing

use crate::checkpoint::{CheckpointData, CheckpointManager};
use crate::error::{ExecutionError, ExecutionResult};
use crate::state::StateManager;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, info};

/// Capture categories restored during rollback, in restoration order
pub const RESTORE_CATEGORIES: [&str; 3] =
    ["resource_state", "environment_state", "executor_state"];

/// Restores one capture category to its checkpointed values
///
/// The default [`NoopRestorer`] accepts every category; real deployments
/// plug in restorers that touch the filesystem, environment, or executors.
pub trait ResourceRestorer: Send + Sync {
    /// Restore a category from its captured values
    fn restore(
        &self,
        category: &str,
        capture: &HashMap<String, serde_json::Value>,
    ) -> Result<(), String>;
}

/// A restorer that treats every category as already restored
#[derive(Debug, Default)]
pub struct NoopRestorer;

impl ResourceRestorer for NoopRestorer {
    fn restore(
        &self,
        _category: &str,
        _capture: &HashMap<String, serde_json::Value>,
    ) -> Result<(), String> {
        Ok(())
    }
}

/// Audit record of one rollback attempt, successful or not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackRecord {
    /// Checkpoint that was rolled back to
    pub checkpoint_id: String,
    /// Workflow the rollback applied to
    pub workflow_id: String,
    /// Time of the attempt
    pub timestamp: DateTime<Utc>,
    /// Restoration outcome per category, in attempt order
    pub category_outcomes: Vec<(String, bool)>,
    /// Whether the rollback succeeded as a whole
    pub success: bool,
}

/// Rolls workflows back to checkpoints and keeps the audit trail
pub struct RollbackManager {
    restorer: Box<dyn ResourceRestorer>,
    audit: HashMap<String, Vec<RollbackRecord>>,
}

impl Default for RollbackManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RollbackManager {
    /// Create a rollback manager with the no-op restorer
    pub fn new() -> Self {
        Self::with_restorer(Box::new(NoopRestorer))
    }

    /// Create a rollback manager with a custom restorer
    pub fn with_restorer(restorer: Box<dyn ResourceRestorer>) -> Self {
        Self {
            restorer,
            audit: HashMap::new(),
        }
    }

    /// Roll the workflow back to the given checkpoint
    ///
    /// The state snapshot restores first, then each capture category in
    /// [`RESTORE_CATEGORIES`] order. The attempt is recorded in the audit
    /// trail whether it succeeds or fails; a category failure stops the
    /// restoration and surfaces as [`ExecutionError::RollbackFailed`].
    pub fn rollback(
        &mut self,
        states: &mut StateManager,
        checkpoints: &CheckpointManager,
        checkpoint_id: &str,
    ) -> ExecutionResult<()> {
        let checkpoint = checkpoints.get(checkpoint_id)?;
        let data = checkpoints.captures(checkpoint_id)?;
        let workflow_id = checkpoint.workflow_id.clone();

        states.restore_snapshot(&workflow_id, &checkpoint.snapshot)?;

        let mut outcomes = Vec::new();
        let mut failure: Option<(String, String)> = None;
        for category in RESTORE_CATEGORIES {
            let capture = capture_for(data, category);
            match self.restorer.restore(category, capture) {
                Ok(()) => outcomes.push((category.to_string(), true)),
                Err(reason) => {
                    outcomes.push((category.to_string(), false));
                    failure = Some((category.to_string(), reason));
                    break;
                }
            }
        }

        let success = failure.is_none();
        self.audit
            .entry(workflow_id.clone())
            .or_default()
            .push(RollbackRecord {
                checkpoint_id: checkpoint_id.to_string(),
                workflow_id: workflow_id.clone(),
                timestamp: Utc::now(),
                category_outcomes: outcomes,
                success,
            });

        match failure {
            None => {
                info!(workflow_id = %workflow_id, checkpoint_id = %checkpoint_id, "rollback complete");
                Ok(())
            }
            Some((category, reason)) => {
                error!(
                    workflow_id = %workflow_id,
                    checkpoint_id = %checkpoint_id,
                    category = %category,
                    "rollback failed"
                );
                Err(ExecutionError::RollbackFailed { category, reason })
            }
        }
    }

    /// The rollback audit trail for a workflow, oldest first
    pub fn audit(&self, workflow_id: &str) -> &[RollbackRecord] {
        self.audit
            .get(workflow_id)
            .map(|a| a.as_slice())
            .unwrap_or(&[])
    }
}

fn capture_for<'a>(
    data: &'a CheckpointData,
    category: &str,
) -> &'a HashMap<String, serde_json::Value> {
    match category {
        "resource_state" => &data.resource_state,
        "environment_state" => &data.environment_state,
        _ => &data.executor_state,
    }
}
