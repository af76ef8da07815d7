//! End-to-end execution scenarios against the engine

use async_trait::async_trait;
use maestro_execution::{
    ExecutionConfig, ExecutionEngine, ExecutionResult, StepExecutor, StepOutcome,
};
use maestro_planning::{
    MilestoneTracker, RiskLevel, StepStatus, WorkflowPlan, WorkflowStatus, WorkflowStep,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

fn plan(steps: Vec<WorkflowStep>, deps: &[(&str, &[&str])]) -> WorkflowPlan {
    let dependencies = deps
        .iter()
        .map(|(step, on)| (step.to_string(), on.iter().map(|d| d.to_string()).collect()))
        .collect();
    let milestones = MilestoneTracker::derive(&steps);
    WorkflowPlan {
        id: "wf-e2e".to_string(),
        name: "e2e".to_string(),
        description: String::new(),
        goal: "exercise the engine".to_string(),
        steps,
        dependencies,
        checkpoints: Vec::new(),
        status: WorkflowStatus::Ready,
        created_at: chrono::Utc::now(),
        started_at: None,
        completed_at: None,
        estimated_duration_secs: 0,
        actual_duration_secs: None,
        risk: RiskLevel::Low,
        rollback_plan: None,
        step_results: HashMap::new(),
        errors: Vec::new(),
        schedule: None,
        milestones,
        mitigations: Vec::new(),
    }
}

/// Fails a chosen step a fixed number of times, then succeeds; records the
/// time of every attempt.
struct FlakyExecutor {
    flaky_step: String,
    remaining_failures: AtomicU32,
    error: String,
    attempts: Mutex<Vec<(String, tokio::time::Instant)>>,
}

#[async_trait]
impl StepExecutor for FlakyExecutor {
    async fn execute_step(
        &self,
        step: &WorkflowStep,
        _context: &HashMap<String, serde_json::Value>,
    ) -> ExecutionResult<StepOutcome> {
        self.attempts
            .lock()
            .await
            .push((step.id.clone(), tokio::time::Instant::now()));
        if step.id == self.flaky_step
            && self
                .remaining_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Ok(StepOutcome::failure(self.error.clone()));
        }
        Ok(StepOutcome::success(serde_json::json!({ "step": step.id })))
    }
}

struct AlwaysSucceeds;

#[async_trait]
impl StepExecutor for AlwaysSucceeds {
    async fn execute_step(
        &self,
        step: &WorkflowStep,
        _context: &HashMap<String, serde_json::Value>,
    ) -> ExecutionResult<StepOutcome> {
        Ok(StepOutcome::success(serde_json::json!({ "step": step.id })))
    }
}

/// Succeeds every step and reports one touched resource per step.
struct ResourceTouchingExecutor;

#[async_trait]
impl StepExecutor for ResourceTouchingExecutor {
    async fn execute_step(
        &self,
        step: &WorkflowStep,
        _context: &HashMap<String, serde_json::Value>,
    ) -> ExecutionResult<StepOutcome> {
        Ok(StepOutcome::success(serde_json::json!({ "step": step.id }))
            .with_modified_resources(vec![format!("{}.artifact", step.id)]))
    }
}

struct SlowExecutor {
    step_duration: Duration,
}

#[async_trait]
impl StepExecutor for SlowExecutor {
    async fn execute_step(
        &self,
        step: &WorkflowStep,
        _context: &HashMap<String, serde_json::Value>,
    ) -> ExecutionResult<StepOutcome> {
        tokio::time::sleep(self.step_duration).await;
        Ok(StepOutcome::success(serde_json::json!({ "step": step.id })))
    }
}

#[tokio::test(start_paused = true)]
async fn transient_failure_retries_with_backoff_then_completes() {
    let executor = Arc::new(FlakyExecutor {
        flaky_step: "b".to_string(),
        remaining_failures: AtomicU32::new(2),
        error: "connection timed out".to_string(),
        attempts: Mutex::new(Vec::new()),
    });
    let engine = ExecutionEngine::new(Arc::clone(&executor) as Arc<dyn StepExecutor>);

    let mut plan = plan(
        vec![
            WorkflowStep::new("a", "a", "first"),
            WorkflowStep::new("b", "b", "second"),
            WorkflowStep::new("c", "c", "third"),
        ],
        &[("b", &["a"]), ("c", &["b"])],
    );

    let status = engine.execute_plan(&mut plan).await.unwrap();
    assert_eq!(status, WorkflowStatus::Completed);
    assert!(plan.steps.iter().all(|s| s.status == StepStatus::Completed));

    // b was attempted three times with increasing backoff: 1s then 2s
    let attempts = executor.attempts.lock().await;
    let b_times: Vec<_> = attempts
        .iter()
        .filter(|(id, _)| id == "b")
        .map(|(_, t)| *t)
        .collect();
    assert_eq!(b_times.len(), 3);
    let first_gap = b_times[1] - b_times[0];
    let second_gap = b_times[2] - b_times[1];
    assert!(first_gap >= Duration::from_secs(1));
    assert!(second_gap >= Duration::from_secs(2));
    assert!(second_gap > first_gap);

    // c ran after b eventually succeeded
    let order: Vec<_> = attempts.iter().map(|(id, _)| id.clone()).collect();
    assert_eq!(order.last().map(String::as_str), Some("c"));
}

#[tokio::test(start_paused = true)]
async fn critical_step_failure_rolls_back_and_fails_workflow() {
    let executor = Arc::new(FlakyExecutor {
        flaky_step: "d".to_string(),
        remaining_failures: AtomicU32::new(u32::MAX),
        error: "gremlins in the substrate".to_string(),
        attempts: Mutex::new(Vec::new()),
    });
    let engine = Arc::new(ExecutionEngine::new(
        Arc::clone(&executor) as Arc<dyn StepExecutor>
    ));

    // Approve the critical step as soon as its gate appears
    let approver = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            loop {
                let pending = engine.pending_interventions(Some("wf-e2e")).await;
                if let Some(id) = pending.first() {
                    let _ = engine.respond_intervention(id, "approve").await;
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
    };

    let mut plan = plan(
        vec![
            WorkflowStep::new("setup", "setup", "prepare the workspace"),
            WorkflowStep::new("d", "d", "rewrite the ledger").with_risk(RiskLevel::Critical),
        ],
        &[("d", &["setup"])],
    );

    let status = engine.execute_plan(&mut plan).await.unwrap();
    approver.await.unwrap();

    assert_eq!(status, WorkflowStatus::Failed);
    assert_eq!(plan.step("d").unwrap().status, StepStatus::Failed);
    assert!(!plan.errors.is_empty());

    // A pre-risk checkpoint was created and a rollback was audited
    let checkpoints = engine.checkpoints("wf-e2e").await;
    assert!(!checkpoints.is_empty());
    let audit = engine.rollback_history("wf-e2e").await;
    assert_eq!(audit.len(), 1);
    assert!(audit[0].success);
    assert_eq!(audit[0].checkpoint_id, checkpoints.last().unwrap().id);
}

#[tokio::test(start_paused = true)]
async fn unanswered_approval_skips_step_and_continues() {
    let config = ExecutionConfig {
        approval_timeout: Duration::from_millis(200),
        ..ExecutionConfig::default()
    };
    let engine = ExecutionEngine::with_config(Arc::new(AlwaysSucceeds), config);

    let mut plan = plan(
        vec![
            WorkflowStep::new("e", "e", "migrate the records").with_risk(RiskLevel::High),
            WorkflowStep::new("f", "f", "wrap up"),
        ],
        &[("f", &["e"])],
    );

    let status = engine.execute_plan(&mut plan).await.unwrap();

    // No one answered the approval gate: e was skipped, f still ran
    assert_eq!(status, WorkflowStatus::Completed);
    assert_eq!(plan.step("e").unwrap().status, StepStatus::Skipped);
    assert_eq!(plan.step("f").unwrap().status, StepStatus::Completed);
    assert!(plan.errors.iter().any(|e| e.contains("approval rejected")));
}

#[tokio::test(start_paused = true)]
async fn rollback_after_failure_resets_steps_for_reexecution() {
    let executor = Arc::new(FlakyExecutor {
        flaky_step: "d".to_string(),
        remaining_failures: AtomicU32::new(1),
        error: "gremlins in the substrate".to_string(),
        attempts: Mutex::new(Vec::new()),
    });
    let engine = Arc::new(ExecutionEngine::new(
        Arc::clone(&executor) as Arc<dyn StepExecutor>
    ));

    // Approve the critical step whenever its gate appears, in both runs
    let approver = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            loop {
                let pending = engine.pending_interventions(Some("wf-e2e")).await;
                if let Some(id) = pending.first() {
                    let _ = engine.respond_intervention(id, "approve").await;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
    };

    let mut plan = plan(
        vec![
            WorkflowStep::new("setup", "setup", "prepare the workspace"),
            WorkflowStep::new("d", "d", "rewrite the ledger").with_risk(RiskLevel::Critical),
        ],
        &[("d", &["setup"])],
    );

    let status = engine.execute_plan(&mut plan).await.unwrap();
    assert_eq!(status, WorkflowStatus::Failed);
    assert_eq!(plan.step("d").unwrap().status, StepStatus::Failed);

    let checkpoint_id = engine.checkpoints("wf-e2e").await.last().unwrap().id.clone();
    engine
        .rollback_to_checkpoint(&mut plan, &checkpoint_id)
        .await
        .unwrap();

    // The failed step returned to Created with its error history cleared
    let d = plan.step("d").unwrap();
    assert_eq!(d.status, StepStatus::Created);
    assert!(d.last_error.is_none());
    assert!(!plan.errors.iter().any(|e| e.starts_with("step d:")));
    // Work captured by the checkpoint survives the rollback
    assert_eq!(plan.step("setup").unwrap().status, StepStatus::Completed);

    plan.status = WorkflowStatus::Ready;
    plan.completed_at = None;

    // The executor's single failure is spent; the re-run completes
    let status = engine.execute_plan(&mut plan).await.unwrap();
    assert_eq!(status, WorkflowStatus::Completed);
    assert_eq!(plan.step("d").unwrap().status, StepStatus::Completed);

    approver.abort();
}

#[tokio::test(start_paused = true)]
async fn pause_response_defers_step_without_duplicate_checkpoint() {
    let engine = Arc::new(ExecutionEngine::new(Arc::new(AlwaysSucceeds)));

    let controller = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            // First gate: pause the workflow instead of deciding
            loop {
                let pending = engine.pending_interventions(Some("wf-e2e")).await;
                if let Some(id) = pending.first() {
                    engine.respond_intervention(id, "pause").await.unwrap();
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            engine.resume("wf-e2e").await.unwrap();
            // Second gate: let the step run
            loop {
                let pending = engine.pending_interventions(Some("wf-e2e")).await;
                if let Some(id) = pending.first() {
                    engine.respond_intervention(id, "approve").await.unwrap();
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
    };

    let mut plan = plan(
        vec![WorkflowStep::new("g", "g", "migrate the index").with_risk(RiskLevel::High)],
        &[],
    );

    let status = engine.execute_plan(&mut plan).await.unwrap();
    controller.await.unwrap();

    assert_eq!(status, WorkflowStatus::Completed);
    assert_eq!(plan.step("g").unwrap().status, StepStatus::Completed);
    assert!(plan.errors.is_empty());

    // One pre-risk checkpoint despite the paused re-entry through the gate
    let checkpoints = engine.checkpoints("wf-e2e").await;
    assert_eq!(checkpoints.len(), 1);
    assert_eq!(checkpoints[0].step_id, "g");
}

#[tokio::test(start_paused = true)]
async fn checkpoint_captures_reflect_reported_resources() {
    let config = ExecutionConfig {
        approval_timeout: Duration::from_millis(100),
        ..ExecutionConfig::default()
    };
    let engine = ExecutionEngine::with_config(Arc::new(ResourceTouchingExecutor), config);

    let mut plan = plan(
        vec![
            WorkflowStep::new("a", "a", "stage the data"),
            WorkflowStep::new("h", "h", "migrate the records").with_risk(RiskLevel::High),
        ],
        &[("h", &["a"])],
    );

    engine.execute_plan(&mut plan).await.unwrap();

    // The pre-risk checkpoint captured the resource a's executor reported
    let checkpoints = engine.checkpoints("wf-e2e").await;
    assert_eq!(checkpoints.len(), 1);
    assert!(checkpoints[0]
        .snapshot
        .modified_resources
        .contains(&"a.artifact".to_string()));
    let captures = engine.checkpoint_captures(&checkpoints[0].id).await.unwrap();
    assert!(captures.resource_state.contains_key("a.artifact"));
    assert!(captures.executor_state.contains_key("a"));
}

#[tokio::test]
async fn cancel_stops_scheduling_further_steps() {
    let engine = Arc::new(ExecutionEngine::new(Arc::new(SlowExecutor {
        step_duration: Duration::from_millis(50),
    })));

    let plan_value = plan(
        vec![
            WorkflowStep::new("a", "a", "first"),
            WorkflowStep::new("b", "b", "second"),
            WorkflowStep::new("c", "c", "third"),
        ],
        &[("b", &["a"]), ("c", &["b"])],
    );

    let runner = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            let mut plan = plan_value;
            let status = engine.execute_plan(&mut plan).await.unwrap();
            (status, plan)
        })
    };

    tokio::time::sleep(Duration::from_millis(75)).await;
    engine.cancel("wf-e2e").await.unwrap();

    let (status, plan) = runner.await.unwrap();
    assert_eq!(status, WorkflowStatus::Cancelled);
    // The dispatched step finished cooperatively; the tail never started
    assert_eq!(plan.step("c").unwrap().status, StepStatus::Created);
}

#[tokio::test]
async fn periodic_checkpoints_are_taken_and_bounded() {
    let config = ExecutionConfig {
        checkpoint_interval: 2,
        max_checkpoints: 2,
        ..ExecutionConfig::default()
    };
    let engine = ExecutionEngine::with_config(Arc::new(AlwaysSucceeds), config);

    let steps: Vec<WorkflowStep> = (0..6)
        .map(|i| WorkflowStep::new(format!("s{}", i), format!("s{}", i), "work"))
        .collect();
    let mut plan = plan(steps, &[]);

    let status = engine.execute_plan(&mut plan).await.unwrap();
    assert_eq!(status, WorkflowStatus::Completed);

    // Three periodic checkpoints were taken; retention kept the last two
    let checkpoints = engine.checkpoints("wf-e2e").await;
    assert_eq!(checkpoints.len(), 2);
    assert!(checkpoints.iter().all(|c| c.description == "periodic checkpoint"));
    assert_eq!(plan.checkpoints.len(), 2);
}
