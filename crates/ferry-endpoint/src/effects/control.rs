use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Identifier of a task running on a remote control plane.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Active,
    Inactive,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool { matches!(self, TaskStatus::Succeeded | TaskStatus::Failed) }
}

/// One status report for a delegated task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskDetail {
    /// Cumulative bytes moved so far, as reported by the remote.
    pub bytes_transferred: u64,
    pub status:            TaskStatus,
}

/// Endpoint-qualified location understood by a control plane.
///
/// A trailing `/` on `path` marks a directory, moved recursively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLocation {
    pub endpoint: String,
    pub path:     String,
}

impl RemoteLocation {
    pub fn new(endpoint: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            path:     path.into(),
        }
    }

    pub fn is_recursive(&self) -> bool { self.path.ends_with('/') }
}

/// Remote service that moves data between its own endpoints.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn submit(&self, source: &RemoteLocation, destination: &RemoteLocation) -> Result<TaskId>;

    async fn task_detail(&self, task: &TaskId) -> Result<TaskDetail>;

    async fn cancel(&self, task: &TaskId) -> Result<()>;
}

/// What a delegated resource hands the orchestrator: where it lives and who moves it.
#[derive(Clone)]
pub struct Delegation {
    pub plane:    Arc<dyn ControlPlane>,
    pub location: RemoteLocation,
}

impl fmt::Debug for Delegation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegation")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        let status: TaskStatus = serde_json::from_str("\"SUCCEEDED\"").unwrap();
        assert_eq!(status, TaskStatus::Succeeded);
        assert!(status.is_terminal());
        assert!(!TaskStatus::Inactive.is_terminal());
    }

    #[test]
    fn test_recursive_location() {
        assert!(RemoteLocation::new("ep", "/data/").is_recursive());
        assert!(!RemoteLocation::new("ep", "/data/file").is_recursive());
    }
}
