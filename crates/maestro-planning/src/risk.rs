//! Risk assessment and mitigation planning

use crate::models::{RiskLevel, WorkflowPlan, WorkflowStep};
use std::collections::HashMap;

/// Keyword table mapping description patterns to risk levels
const RISK_KEYWORDS: [(&str, RiskLevel); 8] = [
    ("truncate", RiskLevel::Critical),
    ("format", RiskLevel::Critical),
    ("delete", RiskLevel::High),
    ("remove", RiskLevel::High),
    ("drop", RiskLevel::High),
    ("migrate", RiskLevel::High),
    ("production", RiskLevel::High),
    ("refactor", RiskLevel::Medium),
];

/// Assigns risk levels to steps and plans and builds mitigation plans
#[derive(Debug, Clone, Default)]
pub struct RiskAssessor;

impl RiskAssessor {
    /// Create a new risk assessor
    pub fn new() -> Self {
        Self
    }

    /// Assess the risk level of a single step
    ///
    /// An explicitly-set non-default risk wins. Otherwise the description is
    /// matched against the risk-keyword table and the task context is
    /// checked for production/data flags; the highest match applies.
    pub fn assess_step(
        &self,
        step: &WorkflowStep,
        context: &HashMap<String, serde_json::Value>,
    ) -> RiskLevel {
        if step.risk != RiskLevel::Low {
            return step.risk;
        }

        let text = step.description.to_lowercase();
        let mut risk = RiskLevel::Low;

        for (keyword, level) in RISK_KEYWORDS {
            if text.contains(keyword) {
                risk = risk.max(level);
            }
        }
        if text.contains("deploy") {
            risk = risk.max(RiskLevel::Medium);
        }

        if context
            .get("affects_production")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
        {
            risk = risk.max(RiskLevel::High);
        }
        if context
            .get("modifies_data")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
        {
            risk = risk.max(RiskLevel::Medium);
        }

        risk
    }

    /// Overall workflow risk: the maximum over all step risks
    pub fn assess_workflow(&self, plan: &WorkflowPlan) -> RiskLevel {
        plan.steps
            .iter()
            .map(|s| s.risk)
            .max()
            .unwrap_or(RiskLevel::Low)
    }

    /// Build a mitigation plan for the High/Critical steps of a plan
    ///
    /// Critical steps get backup, mandatory approval, staged-environment
    /// testing, and a rollback point. High steps get a checkpoint and close
    /// monitoring. Plan-wide monitoring is appended when the overall risk
    /// is High or Critical.
    pub fn create_mitigation_plan(&self, plan: &WorkflowPlan) -> Vec<String> {
        let mut mitigations = Vec::new();

        for step in &plan.steps {
            match step.risk {
                RiskLevel::Critical => {
                    mitigations.push(format!("{}: create backup before execution", step.id));
                    mitigations.push(format!("{}: require manual approval", step.id));
                    mitigations.push(format!("{}: test in staged environment first", step.id));
                    mitigations.push(format!("{}: establish rollback point", step.id));
                }
                RiskLevel::High => {
                    mitigations.push(format!("{}: create checkpoint before execution", step.id));
                    mitigations.push(format!("{}: monitor execution closely", step.id));
                }
                _ => {}
            }
        }

        if self.assess_workflow(plan) >= RiskLevel::High {
            mitigations.push("Enable real-time monitoring for the whole workflow".to_string());
            mitigations.push("Configure automated rollback triggers".to_string());
            mitigations.push("Notify operators before each critical step".to_string());
        }

        mitigations
    }
}
