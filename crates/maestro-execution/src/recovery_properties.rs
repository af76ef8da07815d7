//! Property-based tests for recovery strategy selection

#[cfg(test)]
mod tests {
    use crate::recovery::{RecoveryAction, RecoveryEngine};
    use maestro_planning::{RiskLevel, WorkflowStep};
    use proptest::prelude::*;

    fn error_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z ]{0,40}",
            Just("connection refused".to_string()),
            Just("request timed out".to_string()),
            Just("permission denied".to_string()),
            Just("syntax error".to_string()),
            Just("out of memory".to_string()),
            Just("dependency not found".to_string()),
        ]
    }

    proptest! {
        /// A Critical-risk failure always rolls back; it is never skipped or
        /// blindly retried.
        #[test]
        fn prop_critical_failures_always_roll_back(
            error in error_strategy(),
            retry_count in 0u32..6,
        ) {
            let engine = RecoveryEngine::new();
            let step = WorkflowStep::new("s1", "s1", "work").with_risk(RiskLevel::Critical);
            let action = engine.handle_step_failure(&step, &error, retry_count);
            let is_rollback = matches!(action, RecoveryAction::Rollback { .. });
            prop_assert!(is_rollback);
        }

        /// Retry delays follow exponential backoff and retries stop at the cap.
        #[test]
        fn prop_retry_backoff_is_exponential(
            retry_count in 0u32..10,
            max_retries in 1u32..6,
        ) {
            let engine = RecoveryEngine::with_max_retries(max_retries);
            let step = WorkflowStep::new("s1", "s1", "work");
            let action = engine.handle_step_failure(&step, "connection reset", retry_count);
            if retry_count < max_retries {
                match action {
                    RecoveryAction::Retry { delay_secs, attempt, .. } => {
                        prop_assert_eq!(delay_secs, 2u64.pow(retry_count));
                        prop_assert_eq!(attempt, retry_count + 1);
                    }
                    other => return Err(TestCaseError::fail(format!("expected retry, got {:?}", other))),
                }
            } else {
                let is_skip = matches!(action, RecoveryAction::Skip { .. });
                prop_assert!(is_skip);
            }
        }

        /// Classification never panics and every action round-trips through
        /// serde.
        #[test]
        fn prop_actions_serialize(error in error_strategy(), retry_count in 0u32..5) {
            let engine = RecoveryEngine::new();
            let step = WorkflowStep::new("s1", "s1", "work");
            let action = engine.handle_step_failure(&step, &error, retry_count);
            let json = serde_json::to_string(&action).expect("serialize");
            let back: RecoveryAction = serde_json::from_str(&json).expect("deserialize");
            prop_assert_eq!(back, action);
        }
    }
}
