//! Top-level façade over planning and execution

use crate::engine::{ExecutionConfig, ExecutionEngine};
use crate::error::{ExecutionError, ExecutionResult};
use crate::executor::StepExecutor;
use crate::notifications::NotificationManager;
use crate::rollback::RollbackRecord;
use maestro_planning::{Checkpoint, TaskPlanner, WorkflowPlan, WorkflowStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Composes the task planner and execution engine behind one surface
///
/// Owns the plan registry: a plan lives in the registry except while its
/// `execute_workflow` call is driving it, during which the status mirror
/// answers queries.
pub struct WorkflowEngine {
    planner: TaskPlanner,
    engine: ExecutionEngine,
    plans: Mutex<HashMap<String, WorkflowPlan>>,
    statuses: Mutex<HashMap<String, WorkflowStatus>>,
    history: Mutex<Vec<WorkflowPlan>>,
}

impl WorkflowEngine {
    /// Create a workflow engine with default configuration
    pub fn new(executor: Arc<dyn StepExecutor>) -> Self {
        Self::with_config(executor, ExecutionConfig::default())
    }

    /// Create a workflow engine with a custom execution configuration
    pub fn with_config(executor: Arc<dyn StepExecutor>, config: ExecutionConfig) -> Self {
        Self {
            planner: TaskPlanner::new(),
            engine: ExecutionEngine::with_config(executor, config),
            plans: Mutex::new(HashMap::new()),
            statuses: Mutex::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Direct access to the execution engine (rule registration, listeners)
    pub fn engine_mut(&mut self) -> &mut ExecutionEngine {
        &mut self.engine
    }

    /// Plan a workflow from a goal and return its id
    pub async fn plan_workflow(
        &self,
        goal: &str,
        context: &HashMap<String, serde_json::Value>,
        strategy: &str,
    ) -> ExecutionResult<String> {
        let plan = self.planner.create_plan(goal, context, strategy)?;
        let id = plan.id.clone();
        info!(workflow_id = %id, steps = plan.steps.len(), "workflow planned");
        self.statuses.lock().await.insert(id.clone(), plan.status);
        self.plans.lock().await.insert(id.clone(), plan);
        Ok(id)
    }

    /// Execute a planned workflow to a terminal status
    pub async fn execute_workflow(&self, workflow_id: &str) -> ExecutionResult<WorkflowStatus> {
        let mut plan = self
            .plans
            .lock()
            .await
            .remove(workflow_id)
            .ok_or_else(|| {
                ExecutionError::InvalidState(format!(
                    "workflow {} is unknown or already executing",
                    workflow_id
                ))
            })?;
        self.statuses
            .lock()
            .await
            .insert(workflow_id.to_string(), WorkflowStatus::Executing);

        let result = self.engine.execute_plan(&mut plan).await;
        self.statuses
            .lock()
            .await
            .insert(workflow_id.to_string(), plan.status);
        self.plans
            .lock()
            .await
            .insert(workflow_id.to_string(), plan);
        result
    }

    /// Pause an executing workflow
    pub async fn pause_workflow(&self, workflow_id: &str) -> ExecutionResult<()> {
        self.engine.pause(workflow_id).await?;
        self.statuses
            .lock()
            .await
            .insert(workflow_id.to_string(), WorkflowStatus::Paused);
        Ok(())
    }

    /// Resume a paused workflow
    pub async fn resume_workflow(&self, workflow_id: &str) -> ExecutionResult<()> {
        self.engine.resume(workflow_id).await?;
        self.statuses
            .lock()
            .await
            .insert(workflow_id.to_string(), WorkflowStatus::Executing);
        Ok(())
    }

    /// Cancel an executing or paused workflow
    pub async fn cancel_workflow(&self, workflow_id: &str) -> ExecutionResult<()> {
        self.engine.cancel(workflow_id).await
    }

    /// Roll a non-executing workflow back to a checkpoint
    ///
    /// A terminal workflow returns to Ready so it can be executed again
    /// from the restored state.
    pub async fn rollback_workflow(
        &self,
        workflow_id: &str,
        checkpoint_id: &str,
    ) -> ExecutionResult<()> {
        let mut plans = self.plans.lock().await;
        let plan = plans.get_mut(workflow_id).ok_or_else(|| {
            ExecutionError::InvalidState(format!(
                "workflow {} is unknown or currently executing",
                workflow_id
            ))
        })?;
        self.engine.rollback_to_checkpoint(plan, checkpoint_id).await?;
        plan.status = WorkflowStatus::Ready;
        plan.completed_at = None;
        self.statuses
            .lock()
            .await
            .insert(workflow_id.to_string(), WorkflowStatus::Ready);
        Ok(())
    }

    /// Current status of a workflow
    pub async fn get_status(&self, workflow_id: &str) -> ExecutionResult<WorkflowStatus> {
        if let Some(plan) = self.plans.lock().await.get(workflow_id) {
            return Ok(plan.status);
        }
        self.statuses
            .lock()
            .await
            .get(workflow_id)
            .copied()
            .ok_or_else(|| ExecutionError::NotFound(format!("workflow: {}", workflow_id)))
    }

    /// A clone of the stored plan
    pub async fn get_plan(&self, workflow_id: &str) -> ExecutionResult<WorkflowPlan> {
        self.plans
            .lock()
            .await
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| ExecutionError::NotFound(format!("workflow: {}", workflow_id)))
    }

    /// Checkpoints recorded for a workflow
    pub async fn get_checkpoints(&self, workflow_id: &str) -> Vec<Checkpoint> {
        self.engine.checkpoints(workflow_id).await
    }

    /// Rollback audit entries for a workflow
    pub async fn get_rollback_history(&self, workflow_id: &str) -> Vec<RollbackRecord> {
        self.engine.rollback_history(workflow_id).await
    }

    /// Pending intervention ids, optionally filtered by workflow
    pub async fn get_pending_interventions(&self, workflow_id: Option<&str>) -> Vec<String> {
        self.engine.pending_interventions(workflow_id).await
    }

    /// Pending approval request ids, optionally filtered by workflow
    pub async fn get_pending_approvals(&self, workflow_id: Option<&str>) -> Vec<String> {
        self.engine.pending_approvals(workflow_id).await
    }

    /// Answer a pending intervention or approval request
    pub async fn respond_intervention(
        &self,
        intervention_id: &str,
        choice: &str,
    ) -> ExecutionResult<String> {
        self.engine.respond_intervention(intervention_id, choice).await
    }

    /// The shared notification manager, for listener registration
    pub fn notifications(&self) -> Arc<Mutex<NotificationManager>> {
        self.engine.notifications()
    }

    /// Move a terminal workflow out of the active registry
    pub async fn archive_workflow(&self, workflow_id: &str) -> ExecutionResult<()> {
        let mut plans = self.plans.lock().await;
        let terminal = plans
            .get(workflow_id)
            .map(|p| p.status.is_terminal())
            .ok_or_else(|| ExecutionError::NotFound(format!("workflow: {}", workflow_id)))?;
        if !terminal {
            return Err(ExecutionError::InvalidState(format!(
                "workflow {} is not terminal",
                workflow_id
            )));
        }
        if let Some(plan) = plans.remove(workflow_id) {
            self.history.lock().await.push(plan);
        }
        self.statuses.lock().await.remove(workflow_id);
        Ok(())
    }

    /// Archived workflow plans, oldest first
    pub async fn archived_workflows(&self) -> Vec<WorkflowPlan> {
        self.history.lock().await.clone()
    }
}
