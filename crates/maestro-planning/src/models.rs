//! Core data models for workflow plans

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Risk level for a step or a whole workflow
///
/// Ordered: `Low < Medium < High < Critical`. Workflow risk is the
/// maximum over its step risks.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default, Hash,
)]
pub enum RiskLevel {
    /// Routine operation
    #[serde(rename = "low")]
    #[default]
    Low,
    /// Operation that modifies data or shared state
    #[serde(rename = "medium")]
    Medium,
    /// Destructive or production-affecting operation
    #[serde(rename = "high")]
    High,
    /// Irreversible operation
    #[serde(rename = "critical")]
    Critical,
}

/// Execution status of a single step
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum StepStatus {
    /// Step has been created but not started
    #[serde(rename = "created")]
    #[default]
    Created,
    /// Step is currently executing
    #[serde(rename = "started")]
    Started,
    /// Step completed successfully
    #[serde(rename = "completed")]
    Completed,
    /// Step failed
    #[serde(rename = "failed")]
    Failed,
    /// Step was skipped
    #[serde(rename = "skipped")]
    Skipped,
}

/// Lifecycle status of a workflow plan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum WorkflowStatus {
    /// Plan object exists but has not been analyzed
    #[serde(rename = "created")]
    #[default]
    Created,
    /// Goal decomposition is in progress
    #[serde(rename = "planning")]
    Planning,
    /// Plan is complete and ready to execute
    #[serde(rename = "ready")]
    Ready,
    /// Workflow is executing
    #[serde(rename = "executing")]
    Executing,
    /// Workflow is paused and can be resumed
    #[serde(rename = "paused")]
    Paused,
    /// Workflow completed successfully
    #[serde(rename = "completed")]
    Completed,
    /// Workflow failed
    #[serde(rename = "failed")]
    Failed,
    /// Workflow was cancelled
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl WorkflowStatus {
    /// Whether this status is terminal (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Cancelled
        )
    }
}

/// A single step in a workflow plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Unique step identifier
    pub id: String,
    /// Step name
    pub name: String,
    /// Human-readable description of the work
    pub description: String,
    /// Reference to an externally-executable unit of work, if any
    #[serde(default)]
    pub executor_ref: Option<String>,
    /// Identifiers of steps this step depends on
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Estimated duration in seconds
    pub estimated_duration_secs: u64,
    /// Risk level for this step
    #[serde(default)]
    pub risk: RiskLevel,
    /// Rollback strategy description, if any
    #[serde(default)]
    pub rollback_strategy: Option<String>,
    /// Success criteria for this step
    #[serde(default)]
    pub success_criteria: Vec<String>,
    /// Current execution status
    #[serde(default)]
    pub status: StepStatus,
    /// Time the step started executing
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// Time the step finished executing
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Output of the last execution attempt
    #[serde(default)]
    pub last_result: Option<serde_json::Value>,
    /// Error message from the last failed attempt
    #[serde(default)]
    pub last_error: Option<String>,
}

impl WorkflowStep {
    /// Create a step with the given identity and description
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            executor_ref: None,
            dependencies: Vec::new(),
            estimated_duration_secs: 60,
            risk: RiskLevel::Low,
            rollback_strategy: None,
            success_criteria: Vec::new(),
            status: StepStatus::Created,
            started_at: None,
            completed_at: None,
            last_result: None,
            last_error: None,
        }
    }

    /// Set explicit dependencies
    pub fn with_dependencies(mut self, deps: Vec<String>) -> Self {
        self.dependencies = deps;
        self
    }

    /// Set the estimated duration in seconds
    pub fn with_duration(mut self, secs: u64) -> Self {
        self.estimated_duration_secs = secs;
        self
    }

    /// Set the risk level
    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk = risk;
        self
    }
}

/// Resource category a step consumes while executing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// CPU-intensive work (compilation, analysis)
    #[serde(rename = "cpu")]
    Cpu,
    /// Memory-intensive work (large datasets, caches)
    #[serde(rename = "memory")]
    Memory,
    /// Disk I/O intensive work
    #[serde(rename = "io")]
    Io,
    /// Network-intensive work (downloads, remote APIs)
    #[serde(rename = "network")]
    Network,
}

impl ResourceKind {
    /// All resource categories
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Cpu,
        ResourceKind::Memory,
        ResourceKind::Io,
        ResourceKind::Network,
    ];
}

/// A step placed into a schedule batch with simulated timing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduledStep {
    /// Step identifier
    pub step_id: String,
    /// Simulated start time, seconds from schedule start
    pub start_secs: u64,
    /// Simulated end time, seconds from schedule start
    pub end_secs: u64,
    /// Resource categories this step consumes
    pub resources: Vec<ResourceKind>,
}

/// A batch of mutually-independent steps scheduled together
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleBatch {
    /// Batch index in execution order
    pub index: usize,
    /// Steps admitted into this batch
    pub steps: Vec<ScheduledStep>,
    /// Batch start time, seconds from schedule start
    pub start_secs: u64,
    /// Batch end time (max step end), seconds from schedule start
    pub end_secs: u64,
}

/// A batch where concurrent execution saves wall-clock time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParallelOpportunity {
    /// Index of the batch
    pub batch_index: usize,
    /// Steps that can run concurrently
    pub step_ids: Vec<String>,
    /// Time saved versus sequential execution, in seconds
    pub time_saved_secs: u64,
}

/// Resource-aware execution schedule for a plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Schedule {
    /// Ordered execution batches
    pub batches: Vec<ScheduleBatch>,
    /// Step sequence achieving the maximum finish time
    pub critical_path: Vec<String>,
    /// Total simulated duration in seconds
    pub total_duration_secs: u64,
    /// Batches where parallelism saves time
    pub parallel_opportunities: Vec<ParallelOpportunity>,
}

/// Achievement status of a milestone
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MilestoneStatus {
    /// Milestone has not yet been reached
    #[serde(rename = "pending")]
    Pending,
    /// Milestone has been achieved
    #[serde(rename = "achieved")]
    Achieved,
}

/// A percentage-based progress checkpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    /// Unique milestone identifier
    pub id: String,
    /// Step whose completion achieves this milestone
    pub step_id: String,
    /// Target completion percentage (25, 50, 75, 100)
    pub percent: u8,
    /// Criteria describing what this milestone represents
    pub criteria: Vec<String>,
    /// Achievement status
    pub status: MilestoneStatus,
    /// Time the milestone was achieved
    #[serde(default)]
    pub achieved_at: Option<DateTime<Utc>>,
}

/// Point-in-time snapshot of workflow execution state
///
/// Snapshots are deep, independent copies. Mutating live state after a
/// snapshot is taken never changes the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StateSnapshot {
    /// Steps completed at snapshot time
    pub completed_steps: Vec<String>,
    /// Steps failed at snapshot time
    pub failed_steps: Vec<String>,
    /// Resources modified up to snapshot time
    pub modified_resources: Vec<String>,
    /// Execution context at snapshot time
    pub context: HashMap<String, serde_json::Value>,
}

/// A recovery point captured during execution
///
/// Immutable once created; rollback reads checkpoints, never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    /// Unique checkpoint identifier
    pub id: String,
    /// Owning workflow identifier
    pub workflow_id: String,
    /// Step the checkpoint was taken at
    pub step_id: String,
    /// Time the checkpoint was created
    pub created_at: DateTime<Utc>,
    /// Human-readable description
    pub description: String,
    /// Captured execution state
    pub snapshot: StateSnapshot,
}

/// A complete, ready-to-run workflow plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowPlan {
    /// Unique plan identifier
    pub id: String,
    /// Plan name
    pub name: String,
    /// Plan description
    pub description: String,
    /// The goal text this plan was derived from
    pub goal: String,
    /// Ordered list of steps
    pub steps: Vec<WorkflowStep>,
    /// Dependency map: step id to prerequisite step ids
    pub dependencies: HashMap<String, Vec<String>>,
    /// Checkpoints captured during execution
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
    /// Overall plan status
    pub status: WorkflowStatus,
    /// Time the plan was created
    pub created_at: DateTime<Utc>,
    /// Time execution started
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// Time execution finished
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Estimated duration in seconds
    pub estimated_duration_secs: u64,
    /// Actual duration in seconds, once finished
    #[serde(default)]
    pub actual_duration_secs: Option<u64>,
    /// Overall risk level (max over step risks)
    pub risk: RiskLevel,
    /// Free-form rollback plan text
    #[serde(default)]
    pub rollback_plan: Option<String>,
    /// Results keyed by step id
    #[serde(default)]
    pub step_results: HashMap<String, serde_json::Value>,
    /// Ordered human-readable error strings
    #[serde(default)]
    pub errors: Vec<String>,
    /// Derived execution schedule
    #[serde(default)]
    pub schedule: Option<Schedule>,
    /// Derived progress milestones
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    /// Risk-mitigation annotations
    #[serde(default)]
    pub mitigations: Vec<String>,
}

impl WorkflowPlan {
    /// Look up a step by id
    pub fn step(&self, step_id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// Look up a step mutably by id
    pub fn step_mut(&mut self, step_id: &str) -> Option<&mut WorkflowStep> {
        self.steps.iter_mut().find(|s| s.id == step_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn test_workflow_status_terminal() {
        assert!(WorkflowStatus::Completed.is_terminal());
        assert!(WorkflowStatus::Failed.is_terminal());
        assert!(WorkflowStatus::Cancelled.is_terminal());
        assert!(!WorkflowStatus::Executing.is_terminal());
        assert!(!WorkflowStatus::Paused.is_terminal());
    }

    #[test]
    fn test_step_builder() {
        let step = WorkflowStep::new("s1", "Build", "Build the project")
            .with_dependencies(vec!["s0".to_string()])
            .with_duration(120)
            .with_risk(RiskLevel::Medium);

        assert_eq!(step.id, "s1");
        assert_eq!(step.dependencies, vec!["s0".to_string()]);
        assert_eq!(step.estimated_duration_secs, 120);
        assert_eq!(step.risk, RiskLevel::Medium);
        assert_eq!(step.status, StepStatus::Created);
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let mut live = StateSnapshot {
            completed_steps: vec!["a".to_string()],
            failed_steps: vec![],
            modified_resources: vec!["file:/tmp/x".to_string()],
            context: HashMap::new(),
        };

        let snapshot = live.clone();
        live.completed_steps.push("b".to_string());
        live.context
            .insert("k".to_string(), serde_json::json!("v"));

        assert_eq!(snapshot.completed_steps, vec!["a".to_string()]);
        assert!(snapshot.context.is_empty());
    }

    #[test]
    fn test_checkpoint_yaml_round_trip() {
        // Checkpoints may be persisted; the YAML shape must be lossless
        let checkpoint = Checkpoint {
            id: "cp-1".to_string(),
            workflow_id: "wf-1".to_string(),
            step_id: "s3".to_string(),
            created_at: Utc::now(),
            description: "before migration".to_string(),
            snapshot: StateSnapshot {
                completed_steps: vec!["s1".to_string(), "s2".to_string()],
                failed_steps: vec![],
                modified_resources: vec!["db:orders".to_string()],
                context: [("dry_run".to_string(), serde_json::json!(false))]
                    .into_iter()
                    .collect(),
            },
        };

        let yaml = serde_yaml::to_string(&checkpoint).unwrap();
        let back: Checkpoint = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(back.id, checkpoint.id);
        assert_eq!(back.snapshot, checkpoint.snapshot);
        assert_eq!(back.created_at, checkpoint.created_at);
    }

    #[test]
    fn test_step_serde_round_trip() {
        let step = WorkflowStep::new("s1", "Deploy", "Deploy to staging")
            .with_risk(RiskLevel::High);

        let json = serde_json::to_string(&step).unwrap();
        let back: WorkflowStep = serde_json::from_str(&json).unwrap();

        assert_eq!(back.id, step.id);
        assert_eq!(back.risk, RiskLevel::High);
        assert_eq!(back.status, StepStatus::Created);
    }
}
