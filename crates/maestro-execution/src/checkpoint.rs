//! Checkpoint creation, retrieval, and retention

use crate::error::{ExecutionError, ExecutionResult};
use crate::state::StateManager;
use maestro_planning::Checkpoint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;
use tracing::{debug, info};

/// Side captures stored alongside a checkpoint's state snapshot
///
/// Restorable by category during rollback. The state snapshot itself is the
/// fourth category and always restores first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CheckpointData {
    /// External resource state (files, artifacts) keyed by resource name
    pub resource_state: HashMap<String, serde_json::Value>,
    /// Environment state (variables, configuration) keyed by name
    pub environment_state: HashMap<String, serde_json::Value>,
    /// Opaque executor-specific state keyed by executor reference
    pub executor_state: HashMap<String, serde_json::Value>,
}

/// Serialized form of a workflow's checkpoint set
#[derive(Debug, Serialize, Deserialize)]
struct CheckpointFile {
    checkpoints: Vec<Checkpoint>,
    captures: HashMap<String, CheckpointData>,
}

/// Manages checkpoints per workflow with bounded retention
#[derive(Debug, Default)]
pub struct CheckpointManager {
    checkpoints: HashMap<String, Vec<Checkpoint>>,
    captures: HashMap<String, CheckpointData>,
}

impl CheckpointManager {
    /// Create an empty checkpoint manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture a checkpoint of the workflow's current state
    ///
    /// The snapshot is taken from the live state manager at call time, so
    /// later mutations never leak into it.
    pub fn create_checkpoint(
        &mut self,
        states: &StateManager,
        workflow_id: &str,
        step_id: impl Into<String>,
        description: impl Into<String>,
        data: CheckpointData,
    ) -> ExecutionResult<String> {
        let snapshot = states.create_snapshot(workflow_id)?;
        let checkpoint = Checkpoint {
            id: Uuid::new_v4().to_string(),
            workflow_id: workflow_id.to_string(),
            step_id: step_id.into(),
            created_at: chrono::Utc::now(),
            description: description.into(),
            snapshot,
        };
        let id = checkpoint.id.clone();
        info!(workflow_id = %workflow_id, checkpoint_id = %id, "created checkpoint");

        self.captures.insert(id.clone(), data);
        self.checkpoints
            .entry(workflow_id.to_string())
            .or_default()
            .push(checkpoint);
        Ok(id)
    }

    /// Get a checkpoint by id
    pub fn get(&self, checkpoint_id: &str) -> ExecutionResult<&Checkpoint> {
        self.checkpoints
            .values()
            .flatten()
            .find(|c| c.id == checkpoint_id)
            .ok_or_else(|| ExecutionError::NotFound(format!("checkpoint: {}", checkpoint_id)))
    }

    /// Get the side captures for a checkpoint
    pub fn captures(&self, checkpoint_id: &str) -> ExecutionResult<&CheckpointData> {
        self.captures
            .get(checkpoint_id)
            .ok_or_else(|| ExecutionError::NotFound(format!("checkpoint data: {}", checkpoint_id)))
    }

    /// The most recent checkpoint for a workflow, if any
    pub fn latest(&self, workflow_id: &str) -> Option<&Checkpoint> {
        self.checkpoints.get(workflow_id).and_then(|c| c.last())
    }

    /// All checkpoints for a workflow in creation order
    pub fn list(&self, workflow_id: &str) -> &[Checkpoint] {
        self.checkpoints
            .get(workflow_id)
            .map(|c| c.as_slice())
            .unwrap_or(&[])
    }

    /// Drop the oldest checkpoints, keeping the most recent `keep`
    pub fn cleanup(&mut self, workflow_id: &str, keep: usize) {
        if let Some(checkpoints) = self.checkpoints.get_mut(workflow_id) {
            while checkpoints.len() > keep {
                let removed = checkpoints.remove(0);
                self.captures.remove(&removed.id);
                debug!(checkpoint_id = %removed.id, "dropped expired checkpoint");
            }
        }
    }

    /// Remove every checkpoint for a workflow (archival)
    pub fn remove_workflow(&mut self, workflow_id: &str) {
        if let Some(checkpoints) = self.checkpoints.remove(workflow_id) {
            for checkpoint in checkpoints {
                self.captures.remove(&checkpoint.id);
            }
        }
    }

    /// Persist a workflow's checkpoints to a YAML file
    pub fn persist(&self, workflow_id: &str, path: &Path) -> ExecutionResult<()> {
        let checkpoints = self.list(workflow_id).to_vec();
        let captures = checkpoints
            .iter()
            .filter_map(|c| self.captures.get(&c.id).map(|d| (c.id.clone(), d.clone())))
            .collect();
        let file = CheckpointFile {
            checkpoints,
            captures,
        };
        let yaml = serde_yaml::to_string(&file)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Load checkpoints from a YAML file, merging into the manager
    pub fn load(&mut self, path: &Path) -> ExecutionResult<usize> {
        let yaml = std::fs::read_to_string(path)?;
        let file: CheckpointFile = serde_yaml::from_str(&yaml)?;
        let count = file.checkpoints.len();
        for checkpoint in file.checkpoints {
            self.checkpoints
                .entry(checkpoint.workflow_id.clone())
                .or_default()
                .push(checkpoint);
        }
        self.captures.extend(file.captures);
        Ok(count)
    }
}
