//! Goal decomposition and workflow plan assembly

use crate::dependency::DependencyAnalyzer;
use crate::error::{PlanningError, PlanningResult};
use crate::goal::{Capability, Complexity, GoalClassifier, GoalKind, GoalProfile, KeywordClassifier};
use crate::milestones::MilestoneTracker;
use crate::models::{RiskLevel, WorkflowPlan, WorkflowStatus, WorkflowStep};
use crate::risk::RiskAssessor;
use crate::scheduler::TaskScheduler;
use chrono::Utc;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// Strategy used to decompose a goal into steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompositionStrategy {
    /// Named phases expanded into concrete steps
    Hierarchical,
    /// A linear chain sized by goal complexity
    Sequential,
    /// One independent step per required capability
    Parallel,
    /// Hierarchical with dependency-free steps flagged parallelizable
    Hybrid,
}

impl FromStr for DecompositionStrategy {
    type Err = PlanningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hierarchical" => Ok(DecompositionStrategy::Hierarchical),
            "sequential" => Ok(DecompositionStrategy::Sequential),
            "parallel" => Ok(DecompositionStrategy::Parallel),
            "hybrid" => Ok(DecompositionStrategy::Hybrid),
            other => Err(PlanningError::UnsupportedStrategy(other.to_string())),
        }
    }
}

/// Builds complete, ready-to-run workflow plans from goal text
///
/// Orchestrates goal analysis, decomposition, dependency analysis,
/// scheduling, milestone derivation, and risk-mitigation annotation.
pub struct TaskPlanner {
    classifier: Box<dyn GoalClassifier>,
    scheduler: TaskScheduler,
    assessor: RiskAssessor,
}

impl Default for TaskPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskPlanner {
    /// Create a planner with the default keyword classifier and scheduler
    pub fn new() -> Self {
        Self {
            classifier: Box::new(KeywordClassifier::new()),
            scheduler: TaskScheduler::new(),
            assessor: RiskAssessor::new(),
        }
    }

    /// Create a planner with a custom goal classifier
    pub fn with_classifier(classifier: Box<dyn GoalClassifier>) -> Self {
        Self {
            classifier,
            scheduler: TaskScheduler::new(),
            assessor: RiskAssessor::new(),
        }
    }

    /// Replace the scheduler (custom resource limits)
    pub fn with_scheduler(mut self, scheduler: TaskScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Create a complete workflow plan for a goal
    ///
    /// Fails fast on an empty goal or an unknown strategy name; no partial
    /// plan is ever returned.
    pub fn create_plan(
        &self,
        goal: &str,
        context: &HashMap<String, serde_json::Value>,
        strategy: &str,
    ) -> PlanningResult<WorkflowPlan> {
        if goal.trim().is_empty() {
            return Err(PlanningError::InvalidGoal("goal text is empty".to_string()));
        }
        let strategy = DecompositionStrategy::from_str(strategy)?;

        let profile = self.classifier.classify(goal, context);
        debug!(?strategy, kind = ?profile.kind, complexity = ?profile.complexity, "analyzed goal");

        let mut steps = self.decompose(goal, &profile, strategy);

        // Assign risk to steps that carry no explicit level
        for step in &mut steps {
            step.risk = self.assessor.assess_step(step, context);
        }

        let dependencies = DependencyAnalyzer::analyze(&steps);
        let schedule = self.scheduler.build_schedule(&steps, &dependencies);
        let milestones = MilestoneTracker::derive(&steps);
        let estimated_duration_secs = schedule.total_duration_secs;

        let mut plan = WorkflowPlan {
            id: Uuid::new_v4().to_string(),
            name: Self::plan_name(goal),
            description: format!("Workflow plan for: {}", goal),
            goal: goal.to_string(),
            steps,
            dependencies,
            checkpoints: Vec::new(),
            status: WorkflowStatus::Planning,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            estimated_duration_secs,
            actual_duration_secs: None,
            risk: RiskLevel::Low,
            rollback_plan: None,
            step_results: HashMap::new(),
            errors: Vec::new(),
            schedule: Some(schedule),
            milestones,
            mitigations: Vec::new(),
        };

        plan.risk = self.assessor.assess_workflow(&plan).max(profile.risk);
        plan.mitigations = self.assessor.create_mitigation_plan(&plan);
        if plan.risk >= RiskLevel::High {
            plan.rollback_plan = Some(
                "Roll back to the latest checkpoint and restore captured resource, \
                 environment, and executor state"
                    .to_string(),
            );
        }
        plan.status = WorkflowStatus::Ready;

        info!(
            plan_id = %plan.id,
            steps = plan.steps.len(),
            risk = ?plan.risk,
            "created workflow plan"
        );
        Ok(plan)
    }

    fn plan_name(goal: &str) -> String {
        let mut name: String = goal.chars().take(48).collect();
        if goal.chars().count() > 48 {
            name.push('…');
        }
        name
    }

    fn decompose(
        &self,
        goal: &str,
        profile: &GoalProfile,
        strategy: DecompositionStrategy,
    ) -> Vec<WorkflowStep> {
        match strategy {
            DecompositionStrategy::Hierarchical => Self::decompose_hierarchical(goal, profile),
            DecompositionStrategy::Sequential => Self::decompose_sequential(goal, profile),
            DecompositionStrategy::Parallel => Self::decompose_parallel(goal, profile),
            DecompositionStrategy::Hybrid => {
                let mut steps = Self::decompose_hierarchical(goal, profile);
                for step in &mut steps {
                    if step.dependencies.is_empty() {
                        step.success_criteria
                            .push("Can run in parallel with other independent steps".to_string());
                    }
                }
                steps
            }
        }
    }

    /// Phase names for a goal kind
    fn phases_for(kind: GoalKind) -> Vec<&'static str> {
        match kind {
            GoalKind::Build => vec!["Planning", "Implementation", "Testing", "Documentation"],
            GoalKind::Improvement => vec!["Analysis", "Refactoring", "Validation"],
            GoalKind::Bugfix => vec!["Investigation", "Fix", "Verification"],
            GoalKind::Generic => vec!["Preparation", "Execution", "Completion"],
        }
    }

    /// Expand a phase into concrete step templates (name, description, duration)
    fn phase_steps(phase: &str, goal: &str) -> Vec<(String, String, u64)> {
        match phase {
            "Planning" => vec![
                (
                    "Define requirements".to_string(),
                    format!("Analyze the goal and define requirements: {}", goal),
                    120,
                ),
                (
                    "Design approach".to_string(),
                    "Design the implementation approach".to_string(),
                    180,
                ),
            ],
            "Implementation" => vec![
                (
                    "Implement core".to_string(),
                    "Implement the core functionality".to_string(),
                    600,
                ),
                (
                    "Integrate components".to_string(),
                    "Integrate the new components with existing code".to_string(),
                    300,
                ),
            ],
            "Testing" => vec![
                (
                    "Write tests".to_string(),
                    "Write tests covering the new behavior".to_string(),
                    300,
                ),
                (
                    "Validate results".to_string(),
                    "Validate results against the success criteria".to_string(),
                    120,
                ),
            ],
            "Documentation" => vec![(
                "Document changes".to_string(),
                "Document the changes and their usage".to_string(),
                120,
            )],
            "Analysis" => vec![
                (
                    "Analyze current state".to_string(),
                    format!("Analyze the current implementation: {}", goal),
                    180,
                ),
                (
                    "Identify improvements".to_string(),
                    "Identify concrete improvement opportunities".to_string(),
                    120,
                ),
            ],
            "Refactoring" => vec![
                (
                    "Apply improvements".to_string(),
                    "Apply the planned improvements to the code".to_string(),
                    600,
                ),
                (
                    "Clean up".to_string(),
                    "Clean up affected call sites and modules".to_string(),
                    180,
                ),
            ],
            "Validation" => vec![
                (
                    "Validate behavior".to_string(),
                    "Validate that observable behavior is unchanged".to_string(),
                    180,
                ),
                (
                    "Measure results".to_string(),
                    "Measure the improvement against the baseline".to_string(),
                    120,
                ),
            ],
            "Investigation" => vec![
                (
                    "Reproduce issue".to_string(),
                    format!("Reproduce the reported issue: {}", goal),
                    180,
                ),
                (
                    "Isolate root cause".to_string(),
                    "Isolate the root cause of the failure".to_string(),
                    300,
                ),
            ],
            "Fix" => vec![(
                "Apply fix".to_string(),
                "Apply the fix for the root cause".to_string(),
                300,
            )],
            "Verification" => vec![
                (
                    "Verify fix".to_string(),
                    "Verify the fix resolves the issue".to_string(),
                    120,
                ),
                (
                    "Check regressions".to_string(),
                    "Check for regressions around the change".to_string(),
                    180,
                ),
            ],
            "Preparation" => vec![(
                "Prepare".to_string(),
                format!("Prepare the environment for: {}", goal),
                120,
            )],
            "Execution" => vec![
                (
                    "Carry out work".to_string(),
                    format!("Carry out the main work for: {}", goal),
                    600,
                ),
                (
                    "Review output".to_string(),
                    "Review the produced output".to_string(),
                    120,
                ),
            ],
            _ => vec![(
                "Finalize".to_string(),
                "Finalize and record the outcome".to_string(),
                60,
            )],
        }
    }

    /// Hierarchical decomposition: phases expanded to contiguous steps,
    /// chained within each phase and across phase boundaries
    fn decompose_hierarchical(goal: &str, profile: &GoalProfile) -> Vec<WorkflowStep> {
        let mut steps = Vec::new();
        let mut previous: Option<String> = None;

        for phase in Self::phases_for(profile.kind) {
            for (name, description, duration) in Self::phase_steps(phase, goal) {
                let id = format!("step-{}", steps.len() + 1);
                let mut step = WorkflowStep::new(&id, name, description).with_duration(duration);
                step.success_criteria = vec![format!("{} phase criteria satisfied", phase)];
                if let Some(prev) = &previous {
                    step.dependencies.push(prev.clone());
                }
                previous = Some(id);
                steps.push(step);
            }
        }

        steps
    }

    /// Sequential decomposition: a linear chain sized by complexity
    fn decompose_sequential(goal: &str, profile: &GoalProfile) -> Vec<WorkflowStep> {
        let names: Vec<(&str, &str)> = match profile.complexity {
            Complexity::Simple => vec![
                ("Analyze goal", "Analyze what the goal requires"),
                ("Carry out work", "Carry out the main work"),
                ("Verify outcome", "Verify the outcome meets the goal"),
            ],
            Complexity::Medium => vec![
                ("Analyze goal", "Analyze what the goal requires"),
                ("Plan approach", "Plan the approach in detail"),
                ("Carry out work", "Carry out the main work"),
                ("Verify outcome", "Verify the outcome meets the goal"),
            ],
            Complexity::Complex => vec![
                ("Analyze goal", "Analyze what the goal requires"),
                ("Plan approach", "Plan the approach in detail"),
                ("Prepare environment", "Prepare the environment and inputs"),
                ("Carry out work", "Carry out the main work"),
                ("Verify outcome", "Verify the outcome meets the goal"),
                ("Finalize", "Finalize and record the results"),
            ],
        };

        names
            .into_iter()
            .enumerate()
            .map(|(i, (name, description))| {
                let id = format!("step-{}", i + 1);
                let mut step = WorkflowStep::new(
                    &id,
                    name,
                    format!("{} ({})", description, goal),
                )
                .with_duration(180);
                if i > 0 {
                    step.dependencies.push(format!("step-{}", i));
                }
                step
            })
            .collect()
    }

    /// Parallel decomposition: one independent step per required capability
    ///
    /// Descriptions deliberately avoid the dependency-keyword vocabulary so
    /// the analyzer does not re-link steps this strategy keeps independent.
    fn decompose_parallel(_goal: &str, profile: &GoalProfile) -> Vec<WorkflowStep> {
        profile
            .capabilities
            .iter()
            .enumerate()
            .map(|(i, capability)| {
                let (name, description) = match capability {
                    Capability::Code => ("Code work", "Carry out the required changes"),
                    Capability::Test => ("Quality checks", "Run the quality checks"),
                    Capability::Security => ("Security scan", "Scan for security issues"),
                    Capability::Performance => {
                        ("Performance pass", "Profile and tune the hot paths")
                    }
                    Capability::Documentation => ("Guide updates", "Update the relevant guides"),
                };
                WorkflowStep::new(format!("step-{}", i + 1), name, description).with_duration(300)
            })
            .collect()
    }
}
