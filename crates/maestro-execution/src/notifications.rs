//! Fire-and-forget notifications to registered listeners

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use tracing::warn;

/// Kind of event being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A workflow began executing
    WorkflowStarted,
    /// Step-level progress
    ProgressUpdate,
    /// A milestone was achieved
    MilestoneAchieved,
    /// An error occurred
    Error,
}

/// Notification priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    /// Informational
    Low,
    /// Routine progress
    Normal,
    /// Needs attention
    High,
}

/// A structured event published to listeners
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Unique notification identifier
    pub id: String,
    /// Workflow the event belongs to
    pub workflow_id: String,
    /// Event kind
    pub kind: NotificationKind,
    /// Short title
    pub title: String,
    /// Event detail
    pub message: String,
    /// Priority
    pub priority: NotificationPriority,
    /// Structured payload
    pub data: HashMap<String, serde_json::Value>,
    /// Publication time
    pub timestamp: DateTime<Utc>,
}

/// A registered notification sink
///
/// Sinks must not assume delivery ordering across workflows. A sink that
/// returns an error is logged and otherwise ignored; failures never
/// propagate to the publisher.
pub type NotificationListener = Arc<dyn Fn(&Notification) -> Result<(), String> + Send + Sync>;

/// Publishes events to listeners and keeps a per-workflow history
#[derive(Default)]
pub struct NotificationManager {
    listeners: Vec<NotificationListener>,
    history: HashMap<String, Vec<Notification>>,
}

impl NotificationManager {
    /// Create a notification manager with no listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for all subsequent notifications
    pub fn register_listener(&mut self, listener: NotificationListener) {
        self.listeners.push(listener);
    }

    /// Publish an event to every listener and retain it in history
    pub fn notify(
        &mut self,
        workflow_id: impl Into<String>,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        priority: NotificationPriority,
        data: HashMap<String, serde_json::Value>,
    ) -> String {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            workflow_id: workflow_id.into(),
            kind,
            title: title.into(),
            message: message.into(),
            priority,
            data,
            timestamp: Utc::now(),
        };

        for listener in &self.listeners {
            if let Err(reason) = listener(&notification) {
                warn!(
                    notification_id = %notification.id,
                    %reason,
                    "notification listener failed"
                );
            }
        }

        let id = notification.id.clone();
        self.history
            .entry(notification.workflow_id.clone())
            .or_default()
            .push(notification);
        id
    }

    /// Notification history for a workflow, oldest first
    pub fn history(&self, workflow_id: &str) -> &[Notification] {
        self.history
            .get(workflow_id)
            .map(|h| h.as_slice())
            .unwrap_or(&[])
    }
}
