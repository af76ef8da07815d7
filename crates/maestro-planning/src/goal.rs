//! Goal classification heuristics
//!
//! Classification is lexical, not semantic. The `GoalClassifier` trait keeps
//! the heuristic pluggable so the orchestration core never depends on a
//! particular keyword table.

use crate::models::RiskLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Goal complexity classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Complexity {
    /// Small, single-concern goal
    #[serde(rename = "simple")]
    Simple,
    /// Typical multi-step goal
    #[serde(rename = "medium")]
    Medium,
    /// Large or cross-cutting goal
    #[serde(rename = "complex")]
    Complex,
}

/// Capability a goal requires from step executors
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Code generation or modification
    #[serde(rename = "code")]
    Code,
    /// Test authoring or execution
    #[serde(rename = "test")]
    Test,
    /// Security analysis
    #[serde(rename = "security")]
    Security,
    /// Performance analysis or tuning
    #[serde(rename = "performance")]
    Performance,
    /// Documentation work
    #[serde(rename = "documentation")]
    Documentation,
}

/// Kind of goal, used to pick decomposition phases
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GoalKind {
    /// Build something new
    #[serde(rename = "build")]
    Build,
    /// Improve something that exists
    #[serde(rename = "improvement")]
    Improvement,
    /// Investigate and fix a defect
    #[serde(rename = "bugfix")]
    Bugfix,
    /// Anything else
    #[serde(rename = "generic")]
    Generic,
}

/// Result of analyzing a goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalProfile {
    /// Estimated complexity
    pub complexity: Complexity,
    /// Baseline risk implied by the goal text
    pub risk: RiskLevel,
    /// Capabilities the goal requires
    pub capabilities: Vec<Capability>,
    /// Kind of goal
    pub kind: GoalKind,
}

/// Classifies a goal into a profile used for decomposition
pub trait GoalClassifier: Send + Sync {
    /// Classify the goal text and context into a profile
    fn classify(&self, goal: &str, context: &HashMap<String, serde_json::Value>) -> GoalProfile;
}

/// Default keyword-based classifier
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    /// Create a new keyword classifier
    pub fn new() -> Self {
        Self
    }

    fn contains_any(text: &str, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| text.contains(k))
    }
}

impl GoalClassifier for KeywordClassifier {
    fn classify(&self, goal: &str, context: &HashMap<String, serde_json::Value>) -> GoalProfile {
        let text = goal.to_lowercase();

        let complexity = if Self::contains_any(
            &text,
            &["system", "architecture", "platform", "migrate", "refactor entire", "end-to-end"],
        ) || text.split_whitespace().count() > 20
        {
            Complexity::Complex
        } else if Self::contains_any(&text, &["and", "with", "integrate", "multiple"]) {
            Complexity::Medium
        } else {
            Complexity::Simple
        };

        let mut risk = RiskLevel::Low;
        if Self::contains_any(&text, &["delete", "drop", "remove", "migration", "migrate"]) {
            risk = risk.max(RiskLevel::High);
        }
        if Self::contains_any(&text, &["production", "prod "]) {
            risk = risk.max(RiskLevel::High);
        }
        if context
            .get("affects_production")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
        {
            risk = risk.max(RiskLevel::High);
        }

        let mut capabilities = Vec::new();
        if Self::contains_any(&text, &["implement", "build", "create", "code", "develop", "add"]) {
            capabilities.push(Capability::Code);
        }
        if Self::contains_any(&text, &["test", "verify", "validate", "coverage"]) {
            capabilities.push(Capability::Test);
        }
        if Self::contains_any(&text, &["security", "vulnerability", "audit", "cve"]) {
            capabilities.push(Capability::Security);
        }
        if Self::contains_any(&text, &["performance", "optimize", "latency", "throughput"]) {
            capabilities.push(Capability::Performance);
        }
        if Self::contains_any(&text, &["document", "docs", "readme", "guide"]) {
            capabilities.push(Capability::Documentation);
        }
        if capabilities.is_empty() {
            capabilities.push(Capability::Code);
        }

        let kind = if Self::contains_any(&text, &["fix", "bug", "defect", "regression", "crash"]) {
            GoalKind::Bugfix
        } else if Self::contains_any(&text, &["improve", "refactor", "optimize", "clean up", "cleanup"])
        {
            GoalKind::Improvement
        } else if Self::contains_any(&text, &["build", "implement", "create", "develop", "add"]) {
            GoalKind::Build
        } else {
            GoalKind::Generic
        };

        GoalProfile {
            complexity,
            risk,
            capabilities,
            kind,
        }
    }
}
