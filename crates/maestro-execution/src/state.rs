//! Live execution state tracking per workflow

use crate::error::{ExecutionError, ExecutionResult};
use crate::executor::StepOutcome;
use chrono::{DateTime, Utc};
use maestro_planning::{StateSnapshot, StepStatus, WorkflowPlan};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Live execution state for one workflow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionState {
    /// Owning workflow identifier
    pub workflow_id: String,
    /// Step currently executing, if any
    pub current_step: Option<String>,
    /// Steps that have completed (skipped steps included)
    pub completed_steps: Vec<String>,
    /// Steps that have failed
    pub failed_steps: Vec<String>,
    /// Results keyed by step id
    pub step_results: HashMap<String, serde_json::Value>,
    /// Execution context shared with step executors
    pub context: HashMap<String, serde_json::Value>,
    /// Resources modified so far
    pub modified_resources: Vec<String>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

/// One entry in the append-only state-transition log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    /// Time of the transition
    pub timestamp: DateTime<Utc>,
    /// Step the transition applies to
    pub step_id: String,
    /// Status the step transitioned to
    pub status: StepStatus,
    /// Execution context at transition time
    pub context: HashMap<String, serde_json::Value>,
}

/// Tracks live execution state for workflows
///
/// An explicitly constructed service holding its own maps keyed by workflow
/// id; injected into the execution engine rather than accessed as a global.
#[derive(Debug, Default)]
pub struct StateManager {
    states: HashMap<String, ExecutionState>,
    history: HashMap<String, Vec<StateTransition>>,
}

impl StateManager {
    /// Create an empty state manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the in-memory record for a plan about to execute
    pub fn initialize(&mut self, plan: &WorkflowPlan) {
        let state = ExecutionState {
            workflow_id: plan.id.clone(),
            current_step: None,
            completed_steps: Vec::new(),
            failed_steps: Vec::new(),
            step_results: HashMap::new(),
            context: HashMap::new(),
            modified_resources: Vec::new(),
            updated_at: Utc::now(),
        };
        self.states.insert(plan.id.clone(), state);
        self.history.entry(plan.id.clone()).or_default();
        debug!(workflow_id = %plan.id, "initialized execution state");
    }

    /// Get the state for a workflow
    pub fn state(&self, workflow_id: &str) -> ExecutionResult<&ExecutionState> {
        self.states
            .get(workflow_id)
            .ok_or_else(|| ExecutionError::NotFound(format!("workflow state: {}", workflow_id)))
    }

    fn state_mut(&mut self, workflow_id: &str) -> ExecutionResult<&mut ExecutionState> {
        self.states
            .get_mut(workflow_id)
            .ok_or_else(|| ExecutionError::NotFound(format!("workflow state: {}", workflow_id)))
    }

    /// Apply a step status transition
    ///
    /// `started` sets the current step. `completed` records the result,
    /// joins the completed set, and clears the current step; a completed
    /// step whose outcome reports failure also joins the failed set.
    /// `failed` joins the failed set. `skipped` counts as completed for
    /// dependency purposes. Every transition is appended to the history log.
    pub fn update_step_state(
        &mut self,
        workflow_id: &str,
        step_id: &str,
        status: StepStatus,
        outcome: Option<&StepOutcome>,
    ) -> ExecutionResult<()> {
        let state = self.state_mut(workflow_id)?;

        match status {
            StepStatus::Started => {
                state.current_step = Some(step_id.to_string());
            }
            StepStatus::Completed => {
                if !state.completed_steps.contains(&step_id.to_string()) {
                    state.completed_steps.push(step_id.to_string());
                }
                if let Some(outcome) = outcome {
                    state
                        .step_results
                        .insert(step_id.to_string(), outcome.output.clone());
                    if !outcome.success
                        && !state.failed_steps.contains(&step_id.to_string())
                    {
                        state.failed_steps.push(step_id.to_string());
                    }
                }
                state.current_step = None;
            }
            StepStatus::Failed => {
                if !state.failed_steps.contains(&step_id.to_string()) {
                    state.failed_steps.push(step_id.to_string());
                }
                state.current_step = None;
            }
            StepStatus::Skipped => {
                if !state.completed_steps.contains(&step_id.to_string()) {
                    state.completed_steps.push(step_id.to_string());
                }
                state.current_step = None;
            }
            StepStatus::Created => {}
        }
        state.updated_at = Utc::now();

        let entry = StateTransition {
            timestamp: Utc::now(),
            step_id: step_id.to_string(),
            status,
            context: state.context.clone(),
        };
        self.history.entry(workflow_id.to_string()).or_default().push(entry);
        Ok(())
    }

    /// Record a modified resource for later snapshot capture
    pub fn record_modified_resource(
        &mut self,
        workflow_id: &str,
        resource: impl Into<String>,
    ) -> ExecutionResult<()> {
        let state = self.state_mut(workflow_id)?;
        state.modified_resources.push(resource.into());
        state.updated_at = Utc::now();
        Ok(())
    }

    /// Set an execution-context value
    pub fn set_context(
        &mut self,
        workflow_id: &str,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> ExecutionResult<()> {
        let state = self.state_mut(workflow_id)?;
        state.context.insert(key.into(), value);
        state.updated_at = Utc::now();
        Ok(())
    }

    /// Capture a deep, independent snapshot of the current state
    pub fn create_snapshot(&self, workflow_id: &str) -> ExecutionResult<StateSnapshot> {
        let state = self.state(workflow_id)?;
        Ok(StateSnapshot {
            completed_steps: state.completed_steps.clone(),
            failed_steps: state.failed_steps.clone(),
            modified_resources: state.modified_resources.clone(),
            context: state.context.clone(),
        })
    }

    /// Restore the workflow state from a snapshot
    ///
    /// Results for steps outside the snapshot's completed set are discarded
    /// so the restored state never references rolled-back work.
    pub fn restore_snapshot(
        &mut self,
        workflow_id: &str,
        snapshot: &StateSnapshot,
    ) -> ExecutionResult<()> {
        let state = self.state_mut(workflow_id)?;
        state.completed_steps = snapshot.completed_steps.clone();
        state.failed_steps = snapshot.failed_steps.clone();
        state.modified_resources = snapshot.modified_resources.clone();
        state.context = snapshot.context.clone();
        state
            .step_results
            .retain(|step_id, _| snapshot.completed_steps.contains(step_id));
        state.current_step = None;
        state.updated_at = Utc::now();
        debug!(workflow_id = %workflow_id, "restored state from snapshot");
        Ok(())
    }

    /// The append-only transition history for a workflow
    pub fn history(&self, workflow_id: &str) -> &[StateTransition] {
        self.history
            .get(workflow_id)
            .map(|h| h.as_slice())
            .unwrap_or(&[])
    }

    /// Remove a workflow's state (archival)
    pub fn remove(&mut self, workflow_id: &str) -> Option<ExecutionState> {
        self.states.remove(workflow_id)
    }

    /// Persist a workflow's state to a YAML file
    pub fn persist(&self, workflow_id: &str, path: &Path) -> ExecutionResult<()> {
        let state = self.state(workflow_id)?;
        let yaml = serde_yaml::to_string(state)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Load a workflow's state from a YAML file
    pub fn load(&mut self, path: &Path) -> ExecutionResult<String> {
        let yaml = std::fs::read_to_string(path)?;
        let state: ExecutionState = serde_yaml::from_str(&yaml)?;
        let workflow_id = state.workflow_id.clone();
        self.states.insert(workflow_id.clone(), state);
        self.history.entry(workflow_id.clone()).or_default();
        Ok(workflow_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_planning::TaskPlanner;

    fn plan() -> WorkflowPlan {
        TaskPlanner::new()
            .create_plan("tidy the helpers", &HashMap::new(), "sequential")
            .unwrap()
    }

    #[test]
    fn test_initialize_and_lookup() {
        let plan = plan();
        let mut manager = StateManager::new();
        manager.initialize(&plan);

        let state = manager.state(&plan.id).unwrap();
        assert!(state.completed_steps.is_empty());
        assert!(state.current_step.is_none());
    }

    #[test]
    fn test_missing_workflow_is_not_found() {
        let manager = StateManager::new();
        assert!(matches!(
            manager.state("ghost"),
            Err(ExecutionError::NotFound(_))
        ));
    }

    #[test]
    fn test_started_then_completed_transition() {
        let plan = plan();
        let mut manager = StateManager::new();
        manager.initialize(&plan);

        manager
            .update_step_state(&plan.id, "step-1", StepStatus::Started, None)
            .unwrap();
        assert_eq!(
            manager.state(&plan.id).unwrap().current_step.as_deref(),
            Some("step-1")
        );

        let outcome = StepOutcome::success(serde_json::json!({"ok": true}));
        manager
            .update_step_state(&plan.id, "step-1", StepStatus::Completed, Some(&outcome))
            .unwrap();

        let state = manager.state(&plan.id).unwrap();
        assert!(state.completed_steps.contains(&"step-1".to_string()));
        assert!(state.current_step.is_none());
        assert!(state.failed_steps.is_empty());
        assert_eq!(state.step_results["step-1"], serde_json::json!({"ok": true}));
    }

    #[test]
    fn test_completed_with_failed_outcome_joins_failed_set() {
        let plan = plan();
        let mut manager = StateManager::new();
        manager.initialize(&plan);

        let outcome = StepOutcome::failure("low confidence");
        manager
            .update_step_state(&plan.id, "step-1", StepStatus::Completed, Some(&outcome))
            .unwrap();

        let state = manager.state(&plan.id).unwrap();
        assert!(state.completed_steps.contains(&"step-1".to_string()));
        assert!(state.failed_steps.contains(&"step-1".to_string()));
    }

    #[test]
    fn test_history_is_append_only() {
        let plan = plan();
        let mut manager = StateManager::new();
        manager.initialize(&plan);

        manager
            .update_step_state(&plan.id, "step-1", StepStatus::Started, None)
            .unwrap();
        manager
            .update_step_state(&plan.id, "step-1", StepStatus::Failed, None)
            .unwrap();

        let history = manager.history(&plan.id);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, StepStatus::Started);
        assert_eq!(history[1].status, StepStatus::Failed);
    }

    #[test]
    fn test_snapshot_has_value_semantics() {
        let plan = plan();
        let mut manager = StateManager::new();
        manager.initialize(&plan);

        manager
            .update_step_state(
                &plan.id,
                "step-1",
                StepStatus::Completed,
                Some(&StepOutcome::success(serde_json::json!(1))),
            )
            .unwrap();
        let snapshot = manager.create_snapshot(&plan.id).unwrap();

        // Mutate live state after the snapshot
        manager
            .update_step_state(
                &plan.id,
                "step-2",
                StepStatus::Completed,
                Some(&StepOutcome::success(serde_json::json!(2))),
            )
            .unwrap();
        manager
            .set_context(&plan.id, "k", serde_json::json!("v"))
            .unwrap();

        assert_eq!(snapshot.completed_steps, vec!["step-1".to_string()]);
        assert!(snapshot.context.is_empty());
    }

    #[test]
    fn test_restore_snapshot_discards_later_work() {
        let plan = plan();
        let mut manager = StateManager::new();
        manager.initialize(&plan);

        manager
            .update_step_state(
                &plan.id,
                "step-1",
                StepStatus::Completed,
                Some(&StepOutcome::success(serde_json::json!(1))),
            )
            .unwrap();
        let snapshot = manager.create_snapshot(&plan.id).unwrap();

        manager
            .update_step_state(
                &plan.id,
                "step-2",
                StepStatus::Completed,
                Some(&StepOutcome::success(serde_json::json!(2))),
            )
            .unwrap();

        manager.restore_snapshot(&plan.id, &snapshot).unwrap();
        let state = manager.state(&plan.id).unwrap();

        assert_eq!(state.completed_steps, vec!["step-1".to_string()]);
        assert!(!state.step_results.contains_key("step-2"));

        // Round-trip: a fresh snapshot deep-equals the restored one
        let fresh = manager.create_snapshot(&plan.id).unwrap();
        assert_eq!(fresh, snapshot);
    }

    #[test]
    fn test_persist_and_load_round_trip() {
        let plan = plan();
        let mut manager = StateManager::new();
        manager.initialize(&plan);
        manager
            .update_step_state(
                &plan.id,
                "step-1",
                StepStatus::Completed,
                Some(&StepOutcome::success(serde_json::json!({"n": 1}))),
            )
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.yaml");
        manager.persist(&plan.id, &path).unwrap();

        let mut restored = StateManager::new();
        let loaded_id = restored.load(&path).unwrap();
        assert_eq!(loaded_id, plan.id);
        assert_eq!(
            restored.state(&plan.id).unwrap(),
            manager.state(&plan.id).unwrap()
        );
    }
}
