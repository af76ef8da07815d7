//! The step-by-step workflow execution driver

use crate::approval::{ApprovalManager, ApprovalOutcome};
use crate::checkpoint::{CheckpointData, CheckpointManager};
use crate::error::{ExecutionError, ExecutionResult};
use crate::executor::StepExecutor;
use crate::intervention::InterventionManager;
use crate::notifications::{NotificationKind, NotificationManager, NotificationPriority};
use crate::recovery::{RecoveryAction, RecoveryEngine};
use crate::rollback::RollbackManager;
use crate::state::StateManager;
use maestro_planning::{
    Checkpoint, MilestoneTracker, RiskLevel, StepStatus, WorkflowPlan, WorkflowStatus,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

const CONTROL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Tunable execution parameters
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Time budget for one step executor call
    pub step_timeout: Duration,
    /// Time budget for a human approval decision
    pub approval_timeout: Duration,
    /// Take a periodic checkpoint every this many executed steps
    pub checkpoint_interval: usize,
    /// Retry cap handed to the recovery engine
    pub max_retries: u32,
    /// Checkpoints retained per workflow
    pub max_checkpoints: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            step_timeout: Duration::from_secs(300),
            approval_timeout: Duration::from_secs(300),
            checkpoint_interval: 3,
            max_retries: 3,
            max_checkpoints: 10,
        }
    }
}

/// External pause/cancel controls for a running workflow
#[derive(Debug, Default, Clone, Copy)]
struct Controls {
    paused: bool,
    cancelled: bool,
}

/// How a single step ended
enum StepResolution {
    Completed,
    Skipped,
    /// The step never ran and stays pending (workflow paused at its gate)
    Deferred,
    /// Unrecoverable; the workflow must end Failed
    Abort,
}

/// Drives a workflow plan to completion step by step
///
/// One engine instance may run multiple workflows, but each plan is owned
/// exclusively by the one `execute_plan` call driving it; only the manager
/// maps behind mutexes are shared.
pub struct ExecutionEngine {
    executor: Arc<dyn StepExecutor>,
    config: ExecutionConfig,
    recovery: RecoveryEngine,
    states: Arc<Mutex<StateManager>>,
    checkpoints: Arc<Mutex<CheckpointManager>>,
    rollbacks: Arc<Mutex<RollbackManager>>,
    interventions: Arc<Mutex<InterventionManager>>,
    approvals: ApprovalManager,
    notifications: Arc<Mutex<NotificationManager>>,
    controls: Arc<Mutex<HashMap<String, Controls>>>,
}

impl ExecutionEngine {
    /// Create an engine with default configuration
    pub fn new(executor: Arc<dyn StepExecutor>) -> Self {
        Self::with_config(executor, ExecutionConfig::default())
    }

    /// Create an engine with a custom configuration
    pub fn with_config(executor: Arc<dyn StepExecutor>, config: ExecutionConfig) -> Self {
        let interventions = Arc::new(Mutex::new(InterventionManager::new()));
        let approvals =
            ApprovalManager::new(Arc::clone(&interventions)).with_timeout(config.approval_timeout);
        Self {
            executor,
            recovery: RecoveryEngine::with_max_retries(config.max_retries),
            config,
            states: Arc::new(Mutex::new(StateManager::new())),
            checkpoints: Arc::new(Mutex::new(CheckpointManager::new())),
            rollbacks: Arc::new(Mutex::new(RollbackManager::new())),
            interventions,
            approvals,
            notifications: Arc::new(Mutex::new(NotificationManager::new())),
            controls: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Replace the rollback manager (e.g. to plug in real restorers)
    pub fn set_rollback_manager(&mut self, rollbacks: RollbackManager) {
        self.rollbacks = Arc::new(Mutex::new(rollbacks));
    }

    /// Mutable access to the approval manager for rule registration
    pub fn approvals_mut(&mut self) -> &mut ApprovalManager {
        &mut self.approvals
    }

    /// The shared notification manager
    pub fn notifications(&self) -> Arc<Mutex<NotificationManager>> {
        Arc::clone(&self.notifications)
    }

    /// Execute a ready plan to a terminal status
    ///
    /// Steps run in plan order honoring dependency readiness. High and
    /// Critical risk steps get a checkpoint before they run and an approval
    /// gate; failures go through the recovery engine; a rollback action (or
    /// a rollback that itself fails) ends the workflow Failed.
    pub async fn execute_plan(&self, plan: &mut WorkflowPlan) -> ExecutionResult<WorkflowStatus> {
        if plan.status != WorkflowStatus::Ready {
            return Err(ExecutionError::InvalidState(format!(
                "workflow {} is {:?}, expected ready",
                plan.id, plan.status
            )));
        }

        plan.status = WorkflowStatus::Executing;
        plan.started_at = Some(chrono::Utc::now());
        {
            // A state record restored by a rollback carries context and
            // modified resources into the re-execution; keep it
            let mut states = self.states.lock().await;
            if states.state(&plan.id).is_err() {
                states.initialize(plan);
            }
        }
        self.controls
            .lock()
            .await
            .insert(plan.id.clone(), Controls::default());
        self.notify(
            &plan.id,
            NotificationKind::WorkflowStarted,
            "Workflow started",
            format!("'{}' with {} steps", plan.name, plan.steps.len()),
            NotificationPriority::Normal,
        )
        .await;
        info!(workflow_id = %plan.id, steps = plan.steps.len(), "executing workflow");

        let mut executed_since_checkpoint = 0usize;
        loop {
            match self.wait_while_paused(plan).await {
                ControlFlow::Cancelled => {
                    plan.status = WorkflowStatus::Cancelled;
                    break;
                }
                ControlFlow::Running => {}
            }

            self.skip_orphaned_steps(plan).await?;

            let Some(index) = self.next_ready_index(plan) else {
                if plan.steps.iter().any(|s| s.status == StepStatus::Created) {
                    // A dependency cycle survived planning; force the
                    // lexicographically smallest remaining step
                    let forced = plan
                        .steps
                        .iter()
                        .filter(|s| s.status == StepStatus::Created)
                        .map(|s| s.id.clone())
                        .min();
                    if let Some(step_id) = forced {
                        warn!(workflow_id = %plan.id, step_id = %step_id, "forcing cyclic step");
                        let index = plan
                            .steps
                            .iter()
                            .position(|s| s.id == step_id)
                            .ok_or_else(|| ExecutionError::NotFound(step_id.clone()))?;
                        match self.run_step(plan, index).await? {
                            StepResolution::Abort => {
                                plan.status = WorkflowStatus::Failed;
                                break;
                            }
                            StepResolution::Deferred => {}
                            _ => executed_since_checkpoint += 1,
                        }
                        self.maybe_periodic_checkpoint(plan, &mut executed_since_checkpoint)
                            .await?;
                        continue;
                    }
                }
                // Nothing left to run
                plan.status = if plan.steps.iter().any(|s| s.status == StepStatus::Failed) {
                    WorkflowStatus::Failed
                } else {
                    WorkflowStatus::Completed
                };
                break;
            };

            match self.run_step(plan, index).await? {
                StepResolution::Abort => {
                    plan.status = WorkflowStatus::Failed;
                    break;
                }
                StepResolution::Deferred => {}
                StepResolution::Completed | StepResolution::Skipped => {
                    executed_since_checkpoint += 1;
                }
            }
            self.maybe_periodic_checkpoint(plan, &mut executed_since_checkpoint)
                .await?;
        }

        plan.completed_at = Some(chrono::Utc::now());
        if let (Some(start), Some(end)) = (plan.started_at, plan.completed_at) {
            plan.actual_duration_secs = Some((end - start).num_seconds().max(0) as u64);
        }
        plan.checkpoints = self.checkpoints.lock().await.list(&plan.id).to_vec();
        self.controls.lock().await.remove(&plan.id);
        info!(workflow_id = %plan.id, status = ?plan.status, "workflow finished");
        Ok(plan.status)
    }

    /// Pause an executing workflow
    pub async fn pause(&self, workflow_id: &str) -> ExecutionResult<()> {
        let mut controls = self.controls.lock().await;
        let entry = controls
            .get_mut(workflow_id)
            .ok_or_else(|| ExecutionError::InvalidState(format!("{} is not executing", workflow_id)))?;
        entry.paused = true;
        info!(workflow_id = %workflow_id, "workflow paused");
        Ok(())
    }

    /// Resume a paused workflow
    pub async fn resume(&self, workflow_id: &str) -> ExecutionResult<()> {
        let mut controls = self.controls.lock().await;
        let entry = controls
            .get_mut(workflow_id)
            .ok_or_else(|| ExecutionError::InvalidState(format!("{} is not executing", workflow_id)))?;
        entry.paused = false;
        info!(workflow_id = %workflow_id, "workflow resumed");
        Ok(())
    }

    /// Cancel an executing or paused workflow
    ///
    /// Cooperative: an already-dispatched step executor call is not
    /// interrupted, but no further steps are scheduled.
    pub async fn cancel(&self, workflow_id: &str) -> ExecutionResult<()> {
        let mut controls = self.controls.lock().await;
        let entry = controls
            .get_mut(workflow_id)
            .ok_or_else(|| ExecutionError::InvalidState(format!("{} is not executing", workflow_id)))?;
        entry.cancelled = true;
        info!(workflow_id = %workflow_id, "workflow cancelled");
        Ok(())
    }

    /// Roll a workflow back to a named checkpoint
    ///
    /// Steps outside the checkpoint's snapshot, failed and skipped ones
    /// included, return to Created with their error history cleared so a
    /// later execution re-attempts them from the restored state.
    pub async fn rollback_to_checkpoint(
        &self,
        plan: &mut WorkflowPlan,
        checkpoint_id: &str,
    ) -> ExecutionResult<()> {
        let mut states = self.states.lock().await;
        let checkpoints = self.checkpoints.lock().await;
        self.rollbacks
            .lock()
            .await
            .rollback(&mut states, &checkpoints, checkpoint_id)?;

        let snapshot = checkpoints.get(checkpoint_id)?.snapshot.clone();
        let mut reset = Vec::new();
        for step in &mut plan.steps {
            let keep = match step.status {
                StepStatus::Completed | StepStatus::Skipped => {
                    snapshot.completed_steps.contains(&step.id)
                }
                StepStatus::Failed => snapshot.failed_steps.contains(&step.id),
                StepStatus::Created | StepStatus::Started => true,
            };
            if !keep {
                step.status = StepStatus::Created;
                step.started_at = None;
                step.completed_at = None;
                step.last_result = None;
                step.last_error = None;
                plan.step_results.remove(&step.id);
                reset.push(step.id.clone());
            }
        }
        plan.errors.retain(|e| {
            !reset.iter().any(|id| {
                e.starts_with(&format!("step {}:", id))
                    || e.starts_with(&format!("step {} skipped:", id))
            })
        });
        Ok(())
    }

    /// Checkpoints recorded for a workflow
    pub async fn checkpoints(&self, workflow_id: &str) -> Vec<Checkpoint> {
        self.checkpoints.lock().await.list(workflow_id).to_vec()
    }

    /// Side captures stored with a checkpoint
    pub async fn checkpoint_captures(
        &self,
        checkpoint_id: &str,
    ) -> ExecutionResult<CheckpointData> {
        self.checkpoints.lock().await.captures(checkpoint_id).cloned()
    }

    /// Rollback audit entries for a workflow
    pub async fn rollback_history(&self, workflow_id: &str) -> Vec<crate::rollback::RollbackRecord> {
        self.rollbacks.lock().await.audit(workflow_id).to_vec()
    }

    /// Pending approval request ids, optionally filtered by workflow
    pub async fn pending_approvals(&self, workflow_id: Option<&str>) -> Vec<String> {
        self.approvals.pending_approvals(workflow_id).await
    }

    /// Pending intervention ids, optionally filtered by workflow
    pub async fn pending_interventions(&self, workflow_id: Option<&str>) -> Vec<String> {
        self.interventions
            .lock()
            .await
            .pending(workflow_id)
            .iter()
            .map(|i| i.id.clone())
            .collect()
    }

    /// Answer a pending intervention
    pub async fn respond_intervention(
        &self,
        intervention_id: &str,
        choice: &str,
    ) -> ExecutionResult<String> {
        self.interventions.lock().await.respond(intervention_id, choice)
    }

    async fn wait_while_paused(&self, plan: &mut WorkflowPlan) -> ControlFlow {
        loop {
            let controls = {
                let map = self.controls.lock().await;
                map.get(&plan.id).copied().unwrap_or_default()
            };
            if controls.cancelled {
                return ControlFlow::Cancelled;
            }
            if !controls.paused {
                if plan.status == WorkflowStatus::Paused {
                    plan.status = WorkflowStatus::Executing;
                    info!(workflow_id = %plan.id, "execution resumed");
                }
                return ControlFlow::Running;
            }
            if plan.status != WorkflowStatus::Paused {
                plan.status = WorkflowStatus::Paused;
                info!(workflow_id = %plan.id, "execution paused");
            }
            tokio::time::sleep(CONTROL_POLL_INTERVAL).await;
        }
    }

    /// Skip steps whose dependencies have failed outright
    async fn skip_orphaned_steps(&self, plan: &mut WorkflowPlan) -> ExecutionResult<()> {
        let failed: HashSet<String> = plan
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .map(|s| s.id.clone())
            .collect();
        if failed.is_empty() {
            return Ok(());
        }

        let mut to_skip = Vec::new();
        for step in &plan.steps {
            if step.status == StepStatus::Created {
                let deps = plan.dependencies.get(&step.id).cloned().unwrap_or_default();
                if deps.iter().any(|d| failed.contains(d)) {
                    to_skip.push(step.id.clone());
                }
            }
        }
        for step_id in to_skip {
            let reason = "dependency failed".to_string();
            self.mark_skipped(plan, &step_id, &reason).await?;
        }
        Ok(())
    }

    fn next_ready_index(&self, plan: &WorkflowPlan) -> Option<usize> {
        let satisfied: HashSet<&str> = plan
            .steps
            .iter()
            .filter(|s| matches!(s.status, StepStatus::Completed | StepStatus::Skipped))
            .map(|s| s.id.as_str())
            .collect();
        plan.steps.iter().position(|step| {
            step.status == StepStatus::Created
                && plan
                    .dependencies
                    .get(&step.id)
                    .map(|deps| deps.iter().all(|d| satisfied.contains(d.as_str())))
                    .unwrap_or(true)
        })
    }

    async fn run_step(
        &self,
        plan: &mut WorkflowPlan,
        index: usize,
    ) -> ExecutionResult<StepResolution> {
        let step = plan.steps[index].clone();
        debug!(workflow_id = %plan.id, step_id = %step.id, "starting step");

        if step.risk >= RiskLevel::High {
            // Re-entry after a pause at the approval gate keeps the
            // checkpoint already taken for this step
            let covered = self
                .checkpoints
                .lock()
                .await
                .latest(&plan.id)
                .is_some_and(|c| c.step_id == step.id);
            if !covered {
                self.create_checkpoint(
                    plan,
                    &step.id,
                    format!("before high-risk step '{}'", step.name),
                )
                .await?;
            }
        }

        let operation_type = step.executor_ref.as_deref().unwrap_or("step");
        match self
            .approvals
            .request_approval(&plan.id, &step, operation_type)
            .await
        {
            ApprovalOutcome::Proceed => {}
            ApprovalOutcome::ProceedWithModifications => {
                self.states
                    .lock()
                    .await
                    .set_context(&plan.id, "operator_modifications", serde_json::json!(true))?;
            }
            ApprovalOutcome::Skip => {
                let reason = "approval rejected".to_string();
                self.mark_skipped(plan, &step.id, &reason).await?;
                return Ok(StepResolution::Skipped);
            }
            ApprovalOutcome::PauseWorkflow => {
                if let Some(entry) = self.controls.lock().await.get_mut(&plan.id) {
                    entry.paused = true;
                }
                // The step stays pending; approval runs again after resume
                return Ok(StepResolution::Deferred);
            }
        }

        plan.steps[index].status = StepStatus::Started;
        plan.steps[index].started_at = Some(chrono::Utc::now());
        self.states
            .lock()
            .await
            .update_step_state(&plan.id, &step.id, StepStatus::Started, None)?;

        let mut retry_count = 0u32;
        let mut alternative_tried = false;
        loop {
            let context = self.states.lock().await.state(&plan.id)?.context.clone();
            let attempt =
                tokio::time::timeout(self.config.step_timeout, self.executor.execute_step(&step, &context))
                    .await;

            let error_text = match attempt {
                Ok(Ok(outcome)) if outcome.success => {
                    plan.steps[index].status = StepStatus::Completed;
                    plan.steps[index].completed_at = Some(chrono::Utc::now());
                    plan.steps[index].last_result = Some(outcome.output.clone());
                    plan.step_results.insert(step.id.clone(), outcome.output.clone());
                    {
                        let mut states = self.states.lock().await;
                        states.update_step_state(
                            &plan.id,
                            &step.id,
                            StepStatus::Completed,
                            Some(&outcome),
                        )?;
                        for resource in &outcome.modified_resources {
                            states.record_modified_resource(&plan.id, resource.as_str())?;
                        }
                    }
                    self.check_milestones(plan).await;
                    self.notify(
                        &plan.id,
                        NotificationKind::ProgressUpdate,
                        "Step completed",
                        format!("'{}' completed", step.name),
                        NotificationPriority::Low,
                    )
                    .await;
                    return Ok(StepResolution::Completed);
                }
                Ok(Ok(outcome)) => outcome
                    .error
                    .unwrap_or_else(|| "executor reported failure without detail".to_string()),
                Ok(Err(err)) => err.to_string(),
                Err(_) => format!(
                    "step timed out after {}s",
                    self.config.step_timeout.as_secs()
                ),
            };

            warn!(workflow_id = %plan.id, step_id = %step.id, error = %error_text, "step failed");
            self.notify(
                &plan.id,
                NotificationKind::Error,
                "Step failed",
                format!("'{}': {}", step.name, error_text),
                NotificationPriority::High,
            )
            .await;

            let action = self.recovery.handle_step_failure(&step, &error_text, retry_count);
            match action {
                RecoveryAction::Retry { delay_secs, attempt, .. } => {
                    info!(step_id = %step.id, attempt, delay_secs, "retrying step");
                    tokio::time::sleep(Duration::from_secs(delay_secs)).await;
                    retry_count += 1;
                }
                RecoveryAction::Alternative { .. } if !alternative_tried => {
                    alternative_tried = true;
                    self.states.lock().await.set_context(
                        &plan.id,
                        "alternative_approach",
                        serde_json::json!(true),
                    )?;
                }
                RecoveryAction::Alternative { .. } | RecoveryAction::Skip { .. } => {
                    self.mark_skipped(plan, &step.id, &error_text).await?;
                    return Ok(StepResolution::Skipped);
                }
                RecoveryAction::Rollback { .. } => {
                    return self.abort_with_rollback(plan, &step.id, &error_text).await;
                }
                RecoveryAction::ManualIntervention { message, options, .. } => {
                    match self
                        .await_manual_choice(&plan.id, &step.id, message, options)
                        .await
                    {
                        ManualChoice::Retry => retry_count += 1,
                        ManualChoice::ModifyAndRetry => {
                            self.states.lock().await.set_context(
                                &plan.id,
                                "operator_modifications",
                                serde_json::json!(true),
                            )?;
                            retry_count += 1;
                        }
                        ManualChoice::Skip => {
                            self.mark_skipped(plan, &step.id, &error_text).await?;
                            return Ok(StepResolution::Skipped);
                        }
                        ManualChoice::Rollback => {
                            return self.abort_with_rollback(plan, &step.id, &error_text).await;
                        }
                    }
                }
            }
        }
    }

    async fn abort_with_rollback(
        &self,
        plan: &mut WorkflowPlan,
        step_id: &str,
        error_text: &str,
    ) -> ExecutionResult<StepResolution> {
        if let Some(step) = plan.step_mut(step_id) {
            step.status = StepStatus::Failed;
            step.last_error = Some(error_text.to_string());
        }
        self.states
            .lock()
            .await
            .update_step_state(&plan.id, step_id, StepStatus::Failed, None)?;
        plan.errors.push(format!("step {}: {}", step_id, error_text));

        let latest = self.checkpoints.lock().await.latest(&plan.id).map(|c| c.id.clone());
        match latest {
            Some(checkpoint_id) => {
                let mut states = self.states.lock().await;
                let checkpoints = self.checkpoints.lock().await;
                let result = self
                    .rollbacks
                    .lock()
                    .await
                    .rollback(&mut states, &checkpoints, &checkpoint_id);
                if let Err(err) = result {
                    error!(workflow_id = %plan.id, %err, "rollback failed");
                    plan.errors.push(format!("rollback failed: {}", err));
                }
            }
            None => {
                warn!(workflow_id = %plan.id, "no checkpoint available for rollback");
                plan.errors.push("rollback requested with no checkpoint available".to_string());
            }
        }
        Ok(StepResolution::Abort)
    }

    async fn await_manual_choice(
        &self,
        workflow_id: &str,
        step_id: &str,
        message: String,
        options: Vec<String>,
    ) -> ManualChoice {
        let intervention_id = self.interventions.lock().await.request_intervention(
            workflow_id,
            step_id,
            message,
            options,
            HashMap::new(),
        );

        let wait = async {
            loop {
                {
                    let interventions = self.interventions.lock().await;
                    if interventions.get_pending(&intervention_id).is_none() {
                        return interventions
                            .history(workflow_id)
                            .iter()
                            .find(|i| i.id == intervention_id)
                            .and_then(|i| i.response.clone());
                    }
                }
                tokio::time::sleep(CONTROL_POLL_INTERVAL).await;
            }
        };

        let choice = match tokio::time::timeout(self.config.approval_timeout, wait).await {
            Ok(choice) => choice,
            Err(_) => {
                warn!(workflow_id = %workflow_id, step_id = %step_id, "intervention timed out");
                self.interventions.lock().await.withdraw(&intervention_id);
                None
            }
        };

        match choice.as_deref() {
            Some("retry") => ManualChoice::Retry,
            Some("rollback") => ManualChoice::Rollback,
            Some("modify_and_retry") => ManualChoice::ModifyAndRetry,
            // "skip", a timeout, or a withdrawn request all skip
            _ => ManualChoice::Skip,
        }
    }

    async fn mark_skipped(
        &self,
        plan: &mut WorkflowPlan,
        step_id: &str,
        reason: &str,
    ) -> ExecutionResult<()> {
        if let Some(step) = plan.step_mut(step_id) {
            step.status = StepStatus::Skipped;
            step.completed_at = Some(chrono::Utc::now());
            step.last_error = Some(reason.to_string());
        }
        plan.errors.push(format!("step {} skipped: {}", step_id, reason));
        self.states
            .lock()
            .await
            .update_step_state(&plan.id, step_id, StepStatus::Skipped, None)?;
        info!(workflow_id = %plan.id, step_id = %step_id, reason = %reason, "step skipped");
        Ok(())
    }

    async fn create_checkpoint(
        &self,
        plan: &mut WorkflowPlan,
        step_id: &str,
        description: String,
    ) -> ExecutionResult<String> {
        let states = self.states.lock().await;
        let data = {
            let state = states.state(&plan.id)?;
            CheckpointData {
                resource_state: state
                    .modified_resources
                    .iter()
                    .map(|r| (r.clone(), serde_json::json!({ "modified": true })))
                    .collect(),
                environment_state: state.context.clone(),
                executor_state: state.step_results.clone(),
            }
        };
        let id = self.checkpoints.lock().await.create_checkpoint(
            &states,
            &plan.id,
            step_id,
            description,
            data,
        )?;
        Ok(id)
    }

    async fn maybe_periodic_checkpoint(
        &self,
        plan: &mut WorkflowPlan,
        executed_since_checkpoint: &mut usize,
    ) -> ExecutionResult<()> {
        if *executed_since_checkpoint >= self.config.checkpoint_interval {
            let step_id = self
                .states
                .lock()
                .await
                .state(&plan.id)?
                .completed_steps
                .last()
                .cloned()
                .unwrap_or_default();
            self.create_checkpoint(plan, &step_id, "periodic checkpoint".to_string())
                .await?;
            self.checkpoints
                .lock()
                .await
                .cleanup(&plan.id, self.config.max_checkpoints);
            *executed_since_checkpoint = 0;
        }
        Ok(())
    }

    async fn check_milestones(&self, plan: &mut WorkflowPlan) {
        let completed: HashSet<String> = plan
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .map(|s| s.id.clone())
            .collect();
        let achieved = MilestoneTracker::check_achievement(&mut plan.milestones, &completed);
        for milestone in achieved {
            self.notify(
                &plan.id,
                NotificationKind::MilestoneAchieved,
                "Milestone achieved",
                format!("{}% of '{}' complete", milestone.percent, plan.name),
                NotificationPriority::Normal,
            )
            .await;
        }
    }

    async fn notify(
        &self,
        workflow_id: &str,
        kind: NotificationKind,
        title: &str,
        message: String,
        priority: NotificationPriority,
    ) {
        self.notifications.lock().await.notify(
            workflow_id,
            kind,
            title,
            message,
            priority,
            HashMap::new(),
        );
    }
}

enum ControlFlow {
    Running,
    Cancelled,
}

enum ManualChoice {
    Retry,
    Skip,
    Rollback,
    ModifyAndRetry,
}
