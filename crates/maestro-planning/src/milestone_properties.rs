//! Property-based tests for milestone monotonicity

#[cfg(test)]
mod tests {
    use crate::milestones::MilestoneTracker;
    use crate::models::{MilestoneStatus, WorkflowStep};
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn steps(n: usize) -> Vec<WorkflowStep> {
        (0..n)
            .map(|i| WorkflowStep::new(format!("s{:02}", i), format!("s{:02}", i), "work"))
            .collect()
    }

    proptest! {
        /// Once achieved, a milestone never reverts to pending, regardless of
        /// the completed sets passed in afterwards.
        #[test]
        fn prop_achievement_is_monotonic(
            n in 1usize..16,
            completions in prop::collection::vec(prop::collection::hash_set(0usize..16, 0..16), 1..6),
        ) {
            let steps = steps(n);
            let mut milestones = MilestoneTracker::derive(&steps);
            let mut achieved_so_far = HashSet::new();

            for completed_indices in completions {
                let completed: HashSet<String> = completed_indices
                    .into_iter()
                    .filter(|i| *i < n)
                    .map(|i| format!("s{:02}", i))
                    .collect();

                let newly = MilestoneTracker::check_achievement(&mut milestones, &completed);

                // Newly achieved milestones were not achieved before
                for milestone in &newly {
                    prop_assert!(achieved_so_far.insert(milestone.id.clone()));
                }
                // Nothing achieved earlier has reverted
                for milestone in &milestones {
                    if achieved_so_far.contains(&milestone.id) {
                        prop_assert_eq!(milestone.status, MilestoneStatus::Achieved);
                    }
                }
            }
        }

        /// Completing every step achieves every milestone.
        #[test]
        fn prop_full_completion_achieves_all(n in 1usize..16) {
            let steps = steps(n);
            let mut milestones = MilestoneTracker::derive(&steps);
            let completed: HashSet<String> = (0..n).map(|i| format!("s{:02}", i)).collect();

            MilestoneTracker::check_achievement(&mut milestones, &completed);
            for milestone in &milestones {
                prop_assert_eq!(milestone.status, MilestoneStatus::Achieved);
            }
        }
    }
}
