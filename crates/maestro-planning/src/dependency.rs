//! Dependency graph construction and execution ordering

use crate::models::WorkflowStep;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

/// Keyword pairs used to infer dependency edges from step descriptions.
/// A step matching a dependent keyword gains an edge to every step
/// matching a prerequisite keyword.
const DEPENDENT_KEYWORDS: [&str; 5] = ["test", "deploy", "document", "integrate", "validate"];
const PREREQUISITE_KEYWORDS: [&str; 3] = ["implement", "code", "build"];

/// Builds dependency graphs over workflow steps and derives execution order
///
/// Responsible for:
/// - Combining explicit and heuristically inferred dependency edges
/// - Removing transitively redundant edges
/// - Producing batched execution order that tolerates cycles
pub struct DependencyAnalyzer;

impl DependencyAnalyzer {
    /// Build the dependency map for a set of steps
    ///
    /// Starts from each step's explicit dependencies, adds heuristic edges
    /// from description keywords, then removes transitively redundant edges.
    /// References to unknown step ids are dropped.
    pub fn analyze(steps: &[WorkflowStep]) -> HashMap<String, Vec<String>> {
        let ids: HashSet<&str> = steps.iter().map(|s| s.id.as_str()).collect();
        let mut deps: HashMap<String, Vec<String>> = HashMap::new();

        // Explicit edges first
        for step in steps {
            let entry = deps.entry(step.id.clone()).or_default();
            for dep in &step.dependencies {
                if ids.contains(dep.as_str()) && dep != &step.id && !entry.contains(dep) {
                    entry.push(dep.clone());
                }
            }
        }

        // Heuristic edges from description keywords
        for step in steps {
            let text = step.description.to_lowercase();
            if !DEPENDENT_KEYWORDS.iter().any(|k| text.contains(k)) {
                continue;
            }
            for other in steps {
                if other.id == step.id {
                    continue;
                }
                let other_text = other.description.to_lowercase();
                if PREREQUISITE_KEYWORDS.iter().any(|k| other_text.contains(k)) {
                    let entry = deps.entry(step.id.clone()).or_default();
                    if !entry.contains(&other.id) {
                        debug!(
                            dependent = %step.id,
                            prerequisite = %other.id,
                            "inferred dependency edge from description keywords"
                        );
                        entry.push(other.id.clone());
                    }
                }
            }
        }

        Self::remove_transitive_edges(&mut deps);
        deps
    }

    /// Remove transitively redundant edges
    ///
    /// An edge A -> B is redundant if B is reachable from A through another
    /// dependency of A.
    fn remove_transitive_edges(deps: &mut HashMap<String, Vec<String>>) {
        let frozen = deps.clone();

        for (step_id, direct) in deps.iter_mut() {
            let candidates = direct.clone();
            direct.retain(|target| {
                let redundant = candidates
                    .iter()
                    .filter(|other| *other != target)
                    .any(|other| Self::is_reachable(&frozen, other, target));
                if redundant {
                    debug!(from = %step_id, to = %target, "removed transitive dependency edge");
                }
                !redundant
            });
        }
    }

    /// Whether `target` is reachable from `start` following dependency edges
    fn is_reachable(deps: &HashMap<String, Vec<String>>, start: &str, target: &str) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(start.to_string());

        while let Some(current) = queue.pop_front() {
            if current == target {
                return true;
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(next) = deps.get(&current) {
                for dep in next {
                    queue.push_back(dep.clone());
                }
            }
        }

        false
    }

    /// Produce batched execution order via Kahn-style topological batching
    ///
    /// Each batch holds mutually-independent steps whose dependencies are all
    /// resolved. When a cycle leaves no step eligible, the lexicographically
    /// smallest remaining step id is forced into a batch and the break is
    /// logged. Always terminates with every step scheduled exactly once.
    pub fn execution_order(
        steps: &[WorkflowStep],
        deps: &HashMap<String, Vec<String>>,
    ) -> Vec<Vec<String>> {
        let ids: HashSet<&str> = steps.iter().map(|s| s.id.as_str()).collect();
        let mut remaining: HashSet<String> = steps.iter().map(|s| s.id.clone()).collect();
        let mut batches = Vec::new();

        while !remaining.is_empty() {
            // Eligible steps keep plan order within the batch
            let mut batch: Vec<String> = steps
                .iter()
                .filter(|s| remaining.contains(&s.id))
                .filter(|s| {
                    deps.get(&s.id)
                        .map(|prereqs| {
                            !prereqs
                                .iter()
                                .any(|p| ids.contains(p.as_str()) && remaining.contains(p))
                        })
                        .unwrap_or(true)
                })
                .map(|s| s.id.clone())
                .collect();

            if batch.is_empty() {
                // Cycle: force the lexicographically smallest remaining step
                if let Some(forced) = remaining.iter().min().cloned() {
                    warn!(step_id = %forced, "dependency cycle detected; forcing step to break it");
                    batch.push(forced);
                }
            }

            for id in &batch {
                remaining.remove(id);
            }
            batches.push(batch);
        }

        batches
    }
}
