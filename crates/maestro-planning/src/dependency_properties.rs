//! Property-based tests for dependency analysis and execution ordering

#[cfg(test)]
mod tests {
    use crate::dependency::DependencyAnalyzer;
    use crate::models::WorkflowStep;
    use proptest::prelude::*;
    use std::collections::{HashMap, HashSet};

    /// Strategy for a step count small enough to keep graphs readable
    fn step_count() -> impl Strategy<Value = usize> {
        2usize..12
    }

    /// Build steps whose explicit dependencies only point backwards,
    /// guaranteeing an acyclic graph.
    fn acyclic_steps(n: usize, edges: &[(usize, usize)]) -> Vec<WorkflowStep> {
        (0..n)
            .map(|i| {
                let deps: Vec<String> = edges
                    .iter()
                    .filter(|(from, to)| *from == i && *to < i)
                    .map(|(_, to)| format!("s{:02}", to))
                    .collect();
                WorkflowStep::new(format!("s{:02}", i), format!("s{:02}", i), "plain work")
                    .with_dependencies(deps)
            })
            .collect()
    }

    /// Build steps whose dependencies may point anywhere, cycles included.
    fn arbitrary_steps(n: usize, edges: &[(usize, usize)]) -> Vec<WorkflowStep> {
        (0..n)
            .map(|i| {
                let deps: Vec<String> = edges
                    .iter()
                    .filter(|(from, to)| *from == i && *to != i && *to < n)
                    .map(|(_, to)| format!("s{:02}", to))
                    .collect();
                WorkflowStep::new(format!("s{:02}", i), format!("s{:02}", i), "plain work")
                    .with_dependencies(deps)
            })
            .collect()
    }

    proptest! {
        /// Concatenated batches form a valid topological order for acyclic
        /// input, and every step appears exactly once.
        #[test]
        fn prop_batches_are_topological_for_acyclic_input(
            n in step_count(),
            raw_edges in prop::collection::vec((0usize..12, 0usize..12), 0..20),
        ) {
            let edges: Vec<(usize, usize)> = raw_edges
                .into_iter()
                .filter(|(from, to)| *from < n && *to < n && to < from)
                .collect();
            let steps = acyclic_steps(n, &edges);
            let deps = DependencyAnalyzer::analyze(&steps);
            let batches = DependencyAnalyzer::execution_order(&steps, &deps);

            let order: Vec<String> = batches.into_iter().flatten().collect();
            prop_assert_eq!(order.len(), n);

            let mut position: HashMap<&str, usize> = HashMap::new();
            for (i, id) in order.iter().enumerate() {
                prop_assert!(position.insert(id.as_str(), i).is_none());
            }
            for (id, prereqs) in &deps {
                for prereq in prereqs {
                    prop_assert!(position[prereq.as_str()] < position[id.as_str()]);
                }
            }
        }

        /// Cyclic input never prevents termination: the analyzer returns a
        /// complete ordering covering every step exactly once.
        #[test]
        fn prop_cycles_still_schedule_every_step_once(
            n in step_count(),
            raw_edges in prop::collection::vec((0usize..12, 0usize..12), 0..30),
        ) {
            let edges: Vec<(usize, usize)> = raw_edges
                .into_iter()
                .filter(|(from, to)| *from < n && *to < n)
                .collect();
            let steps = arbitrary_steps(n, &edges);
            let deps = DependencyAnalyzer::analyze(&steps);
            let batches = DependencyAnalyzer::execution_order(&steps, &deps);

            let order: Vec<String> = batches.into_iter().flatten().collect();
            let unique: HashSet<&String> = order.iter().collect();
            prop_assert_eq!(order.len(), n);
            prop_assert_eq!(unique.len(), n);
        }
    }
}
