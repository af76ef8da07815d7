//! Resource-constrained scheduling over dependency batches

use crate::dependency::DependencyAnalyzer;
use crate::models::{
    ParallelOpportunity, ResourceKind, Schedule, ScheduleBatch, ScheduledStep, WorkflowStep,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Per-resource-category concurrency caps
///
/// Caps are local to one workflow's schedule; nothing is shared across
/// concurrently planned workflows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Maximum concurrent CPU-intensive steps
    pub cpu: usize,
    /// Maximum concurrent memory-intensive steps
    pub memory: usize,
    /// Maximum concurrent I/O-intensive steps
    pub io: usize,
    /// Maximum concurrent network-intensive steps
    pub network: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            cpu: 2,
            memory: 1,
            io: 3,
            network: 2,
        }
    }
}

impl ResourceLimits {
    /// The cap for a resource category
    pub fn cap(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::Cpu => self.cpu,
            ResourceKind::Memory => self.memory,
            ResourceKind::Io => self.io,
            ResourceKind::Network => self.network,
        }
    }
}

/// Packs dependency batches under resource caps and computes timing
///
/// Responsible for:
/// - Classifying each step's resource profile from its description
/// - Greedy admission under per-category concurrency caps
/// - Critical-path timing and parallelization reporting
pub struct TaskScheduler {
    limits: ResourceLimits,
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler {
    /// Create a scheduler with default resource limits
    pub fn new() -> Self {
        Self {
            limits: ResourceLimits::default(),
        }
    }

    /// Create a scheduler with custom resource limits
    pub fn with_limits(limits: ResourceLimits) -> Self {
        Self { limits }
    }

    /// Classify the resource profile of a step from description keywords
    ///
    /// A step may carry multiple flags. Steps matching nothing are counted
    /// as CPU work so every step is subject to admission control.
    pub fn classify_resources(step: &WorkflowStep) -> Vec<ResourceKind> {
        let text = step.description.to_lowercase();
        let mut resources = Vec::new();

        if ["compile", "build", "analyze"].iter().any(|k| text.contains(k)) {
            resources.push(ResourceKind::Cpu);
        }
        if ["large", "dataset", "cache"].iter().any(|k| text.contains(k)) {
            resources.push(ResourceKind::Memory);
        }
        if ["file", "read", "write", "disk"].iter().any(|k| text.contains(k)) {
            resources.push(ResourceKind::Io);
        }
        if ["download", "api", "remote"].iter().any(|k| text.contains(k)) {
            resources.push(ResourceKind::Network);
        }

        if resources.is_empty() {
            resources.push(ResourceKind::Cpu);
        }
        resources
    }

    /// Build a schedule for the given steps and dependency map
    ///
    /// Dependency batches are processed strictly in order; within a batch,
    /// candidates are sorted by (risk descending, duration descending) and
    /// admitted while every required resource category stays under its cap.
    /// Steps that do not fit are deferred to a later batch, never dropped.
    pub fn build_schedule(
        &self,
        steps: &[WorkflowStep],
        deps: &HashMap<String, Vec<String>>,
    ) -> Schedule {
        let by_id: HashMap<&str, &WorkflowStep> =
            steps.iter().map(|s| (s.id.as_str(), s)).collect();
        let dependency_batches = DependencyAnalyzer::execution_order(steps, deps);

        let mut batches = Vec::new();
        let mut clock: u64 = 0;
        let mut index = 0;

        for dependency_batch in dependency_batches {
            let mut pending: Vec<&WorkflowStep> = dependency_batch
                .iter()
                .filter_map(|id| by_id.get(id.as_str()).copied())
                .collect();
            pending.sort_by(|a, b| {
                b.risk
                    .cmp(&a.risk)
                    .then(b.estimated_duration_secs.cmp(&a.estimated_duration_secs))
            });

            // A dependency batch may need several schedule batches under caps
            while !pending.is_empty() {
                let mut usage: HashMap<ResourceKind, usize> = HashMap::new();
                let mut admitted = Vec::new();
                let mut deferred = Vec::new();

                for step in pending.drain(..) {
                    let resources = Self::classify_resources(step);
                    let fits = resources
                        .iter()
                        .all(|r| usage.get(r).copied().unwrap_or(0) < self.limits.cap(*r));

                    if fits {
                        for r in &resources {
                            *usage.entry(*r).or_insert(0) += 1;
                        }
                        admitted.push((step, resources));
                    } else {
                        deferred.push(step);
                    }
                }

                if admitted.is_empty() {
                    // Caps too tight to admit anything; force one through
                    // rather than stall the schedule.
                    if let Some(step) = deferred.first().copied() {
                        warn!(step_id = %step.id, "resource caps admit no step; forcing one");
                        let resources = Self::classify_resources(step);
                        admitted.push((step, resources));
                        deferred.remove(0);
                    }
                }

                let start = clock;
                let scheduled: Vec<ScheduledStep> = admitted
                    .into_iter()
                    .map(|(step, resources)| ScheduledStep {
                        step_id: step.id.clone(),
                        start_secs: start,
                        end_secs: start + step.estimated_duration_secs,
                        resources,
                    })
                    .collect();
                let end = scheduled.iter().map(|s| s.end_secs).max().unwrap_or(start);

                debug!(batch = index, steps = scheduled.len(), "scheduled batch");
                batches.push(ScheduleBatch {
                    index,
                    steps: scheduled,
                    start_secs: start,
                    end_secs: end,
                });
                index += 1;
                clock = end;
                pending = deferred;
            }
        }

        let parallel_opportunities = Self::parallel_opportunities(&batches);
        let critical_path = Self::critical_path(steps, deps);

        Schedule {
            batches,
            critical_path,
            total_duration_secs: clock,
            parallel_opportunities,
        }
    }

    /// Report batches where concurrency saves wall-clock time
    fn parallel_opportunities(batches: &[ScheduleBatch]) -> Vec<ParallelOpportunity> {
        batches
            .iter()
            .filter(|b| b.steps.len() > 1)
            .map(|b| {
                let durations: Vec<u64> =
                    b.steps.iter().map(|s| s.end_secs - s.start_secs).collect();
                let sum: u64 = durations.iter().sum();
                let max = durations.iter().copied().max().unwrap_or(0);
                ParallelOpportunity {
                    batch_index: b.index,
                    step_ids: b.steps.iter().map(|s| s.step_id.clone()).collect(),
                    time_saved_secs: sum - max,
                }
            })
            .collect()
    }

    /// Compute the critical path via earliest-finish propagation
    ///
    /// The path is the dependency chain achieving the maximum finish time.
    /// Back edges from broken cycles contribute nothing.
    pub fn critical_path(
        steps: &[WorkflowStep],
        deps: &HashMap<String, Vec<String>>,
    ) -> Vec<String> {
        let by_id: HashMap<&str, &WorkflowStep> =
            steps.iter().map(|s| (s.id.as_str(), s)).collect();
        let mut finish: HashMap<String, u64> = HashMap::new();
        let mut best_pred: HashMap<String, Option<String>> = HashMap::new();

        fn visit(
            id: &str,
            by_id: &HashMap<&str, &WorkflowStep>,
            deps: &HashMap<String, Vec<String>>,
            finish: &mut HashMap<String, u64>,
            best_pred: &mut HashMap<String, Option<String>>,
            on_stack: &mut HashSet<String>,
        ) -> u64 {
            if let Some(f) = finish.get(id) {
                return *f;
            }
            if on_stack.contains(id) {
                // Back edge from a broken cycle
                return 0;
            }

            let duration = by_id
                .get(id)
                .map(|s| s.estimated_duration_secs)
                .unwrap_or(0);

            on_stack.insert(id.to_string());
            let mut max_dep = 0;
            let mut pred = None;
            if let Some(prereqs) = deps.get(id) {
                for dep in prereqs {
                    if !by_id.contains_key(dep.as_str()) {
                        continue;
                    }
                    let f = visit(dep, by_id, deps, finish, best_pred, on_stack);
                    if f > max_dep {
                        max_dep = f;
                        pred = Some(dep.clone());
                    }
                }
            }
            on_stack.remove(id);

            let f = duration + max_dep;
            finish.insert(id.to_string(), f);
            best_pred.insert(id.to_string(), pred);
            f
        }

        let mut on_stack = HashSet::new();
        let mut terminal: Option<String> = None;
        let mut max_finish = 0;
        for step in steps {
            let f = visit(
                &step.id,
                &by_id,
                deps,
                &mut finish,
                &mut best_pred,
                &mut on_stack,
            );
            if f > max_finish || terminal.is_none() {
                max_finish = f;
                terminal = Some(step.id.clone());
            }
        }

        // Walk predecessors back to the path start
        let mut path = Vec::new();
        let mut current = terminal;
        while let Some(id) = current {
            path.push(id.clone());
            current = best_pred.get(&id).cloned().flatten();
        }
        path.reverse();
        path
    }
}
