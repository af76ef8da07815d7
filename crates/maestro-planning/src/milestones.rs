//! Percentage-based progress milestones

use crate::models::{Milestone, MilestoneStatus, WorkflowStep};
use chrono::Utc;
use std::collections::HashSet;
use tracing::debug;

/// Target completion percentages for derived milestones
const MILESTONE_PERCENTS: [u8; 4] = [25, 50, 75, 100];

/// Derives progress milestones from a step sequence and tracks achievement
pub struct MilestoneTracker;

impl MilestoneTracker {
    /// Derive the fixed 25/50/75/100% milestones for a step list
    ///
    /// Each milestone is bound to the step occupying that position in the
    /// list. Returns an empty list for an empty step list.
    pub fn derive(steps: &[WorkflowStep]) -> Vec<Milestone> {
        if steps.is_empty() {
            return Vec::new();
        }

        MILESTONE_PERCENTS
            .iter()
            .map(|percent| {
                let position = (steps.len() * *percent as usize).div_ceil(100);
                let index = position.saturating_sub(1).min(steps.len() - 1);
                Milestone {
                    id: format!("milestone-{}", percent),
                    step_id: steps[index].id.clone(),
                    percent: *percent,
                    criteria: Self::criteria_for(*percent),
                    status: MilestoneStatus::Pending,
                    achieved_at: None,
                }
            })
            .collect()
    }

    /// Stage-appropriate criteria text for a milestone percentage
    fn criteria_for(percent: u8) -> Vec<String> {
        match percent {
            25 => vec![
                "Initial setup and preparation complete".to_string(),
                "Dependencies and environment verified".to_string(),
            ],
            50 => vec![
                "Core implementation underway".to_string(),
                "No blocking failures encountered".to_string(),
            ],
            75 => vec![
                "Primary work complete".to_string(),
                "Validation in progress".to_string(),
            ],
            _ => vec![
                "All steps completed".to_string(),
                "Success criteria verified".to_string(),
            ],
        }
    }

    /// Flip pending milestones whose bound step has completed
    ///
    /// Returns only the newly achieved milestones. Idempotent: achieved
    /// milestones never revert and are never reported twice.
    pub fn check_achievement(
        milestones: &mut [Milestone],
        completed_steps: &HashSet<String>,
    ) -> Vec<Milestone> {
        let mut newly_achieved = Vec::new();

        for milestone in milestones.iter_mut() {
            if milestone.status == MilestoneStatus::Pending
                && completed_steps.contains(&milestone.step_id)
            {
                milestone.status = MilestoneStatus::Achieved;
                milestone.achieved_at = Some(Utc::now());
                debug!(milestone = %milestone.id, percent = milestone.percent, "milestone achieved");
                newly_achieved.push(milestone.clone());
            }
        }

        newly_achieved
    }
}
