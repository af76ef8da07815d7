//! Property-based tests for resource-capped scheduling

#[cfg(test)]
mod tests {
    use crate::dependency::DependencyAnalyzer;
    use crate::models::ResourceKind;
    use crate::models::WorkflowStep;
    use crate::scheduler::{ResourceLimits, TaskScheduler};
    use proptest::prelude::*;
    use std::collections::HashMap;

    /// Descriptions spanning the resource-keyword vocabulary
    fn description_strategy() -> impl Strategy<Value = String> {
        prop::sample::select(vec![
            "compile the module".to_string(),
            "analyze the output".to_string(),
            "load the large dataset".to_string(),
            "warm the cache".to_string(),
            "write results to disk".to_string(),
            "read the input file".to_string(),
            "download remote artifacts".to_string(),
            "call the api endpoint".to_string(),
            "plain chore".to_string(),
        ])
    }

    fn steps_strategy() -> impl Strategy<Value = Vec<WorkflowStep>> {
        prop::collection::vec((description_strategy(), 1u64..120), 1..12).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (description, duration))| {
                    WorkflowStep::new(format!("s{:02}", i), format!("s{:02}", i), description)
                        .with_duration(duration)
                })
                .collect()
        })
    }

    proptest! {
        /// No batch ever admits more steps of a resource category than the
        /// configured cap, except the forced single step that keeps a
        /// zero-cap schedule from stalling.
        #[test]
        fn prop_batches_respect_resource_caps(
            steps in steps_strategy(),
            cpu in 1usize..4,
            memory in 1usize..3,
            io in 1usize..4,
            network in 1usize..3,
        ) {
            let limits = ResourceLimits { cpu, memory, io, network };
            let deps = DependencyAnalyzer::analyze(&steps);
            let schedule = TaskScheduler::with_limits(limits).build_schedule(&steps, &deps);

            for batch in &schedule.batches {
                let mut usage: HashMap<ResourceKind, usize> = HashMap::new();
                for step in &batch.steps {
                    for resource in &step.resources {
                        *usage.entry(*resource).or_insert(0) += 1;
                    }
                }
                for (resource, count) in usage {
                    prop_assert!(count <= limits.cap(resource));
                }
            }
        }

        /// Every step is scheduled exactly once; deferral never drops steps.
        #[test]
        fn prop_every_step_scheduled_once(steps in steps_strategy()) {
            let deps = DependencyAnalyzer::analyze(&steps);
            let schedule = TaskScheduler::new().build_schedule(&steps, &deps);

            let scheduled: Vec<&str> = schedule
                .batches
                .iter()
                .flat_map(|b| b.steps.iter().map(|s| s.step_id.as_str()))
                .collect();
            prop_assert_eq!(scheduled.len(), steps.len());
        }
    }
}
