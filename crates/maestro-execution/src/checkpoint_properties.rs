//! Property-based tests for checkpoint retention and restoration

#[cfg(test)]
mod tests {
    use crate::checkpoint::{CheckpointData, CheckpointManager};
    use crate::executor::StepOutcome;
    use crate::rollback::RollbackManager;
    use crate::state::StateManager;
    use maestro_planning::{StepStatus, WorkflowPlan, WorkflowStep};
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn plan_with_steps(n: usize) -> WorkflowPlan {
        let mut plan = WorkflowPlan {
            id: "wf-prop".to_string(),
            name: "prop".to_string(),
            description: String::new(),
            goal: String::new(),
            steps: Vec::new(),
            dependencies: HashMap::new(),
            checkpoints: Vec::new(),
            status: Default::default(),
            created_at: chrono::Utc::now(),
            started_at: None,
            completed_at: None,
            estimated_duration_secs: 0,
            actual_duration_secs: None,
            risk: Default::default(),
            rollback_plan: None,
            step_results: HashMap::new(),
            errors: Vec::new(),
            schedule: None,
            milestones: Vec::new(),
            mitigations: Vec::new(),
        };
        for i in 0..n {
            plan.steps
                .push(WorkflowStep::new(format!("s{:02}", i), format!("s{:02}", i), "work"));
        }
        plan
    }

    proptest! {
        /// Cleanup keeps exactly min(keep, existing) checkpoints, always the
        /// most recent ones.
        #[test]
        fn prop_cleanup_keeps_most_recent(total in 0usize..12, keep in 0usize..12) {
            let plan = plan_with_steps(1);
            let mut states = StateManager::new();
            states.initialize(&plan);
            let mut checkpoints = CheckpointManager::new();

            let mut ids = Vec::new();
            for i in 0..total {
                ids.push(
                    checkpoints
                        .create_checkpoint(
                            &states,
                            &plan.id,
                            format!("s{}", i),
                            format!("cp {}", i),
                            CheckpointData::default(),
                        )
                        .expect("create"),
                );
            }

            checkpoints.cleanup(&plan.id, keep);

            let remaining: Vec<String> =
                checkpoints.list(&plan.id).iter().map(|c| c.id.clone()).collect();
            let expected_len = total.min(keep);
            prop_assert_eq!(remaining.len(), expected_len);
            prop_assert_eq!(remaining, ids[total - expected_len..].to_vec());
        }

        /// Checkpoint then rollback restores state such that a fresh snapshot
        /// deep-equals the one captured at checkpoint time.
        #[test]
        fn prop_rollback_restores_checkpoint_snapshot(
            before in 0usize..5,
            after in 0usize..5,
        ) {
            let plan = plan_with_steps(10);
            let mut states = StateManager::new();
            states.initialize(&plan);
            let mut checkpoints = CheckpointManager::new();

            for i in 0..before {
                states
                    .update_step_state(
                        &plan.id,
                        &format!("s{:02}", i),
                        StepStatus::Completed,
                        Some(&StepOutcome::success(serde_json::json!(i))),
                    )
                    .expect("update");
            }
            let checkpoint_id = checkpoints
                .create_checkpoint(&states, &plan.id, "mid", "mid", CheckpointData::default())
                .expect("create");
            let at_checkpoint = states.create_snapshot(&plan.id).expect("snapshot");

            for i in before..before + after {
                states
                    .update_step_state(
                        &plan.id,
                        &format!("s{:02}", i),
                        StepStatus::Completed,
                        Some(&StepOutcome::success(serde_json::json!(i))),
                    )
                    .expect("update");
            }

            let mut rollbacks = RollbackManager::new();
            rollbacks
                .rollback(&mut states, &checkpoints, &checkpoint_id)
                .expect("rollback");

            let restored = states.create_snapshot(&plan.id).expect("snapshot");
            prop_assert_eq!(restored, at_checkpoint);
        }
    }
}
