//! Narrow interfaces to the host system.
//!
//! The project directory, the build object store, the shared work queue and the
//! permission system all live outside this crate. Implementations are injected
//! at construction; [`crate::memory`] provides in-memory ones.

use std::sync::Arc;

use batch_model::{BuildId, NodeLabel, Priority, ProjectName};

use crate::{BatchTask, RunLog, TaskRegistry};

/// Snapshot of a project as needed by the batch-task layer.
#[derive(Clone, Debug)]
pub struct ProjectView {
    pub name: ProjectName,
    pub display_name: String,
    /// Most recent build, if the project was ever built.
    pub last_build: Option<BuildId>,
    /// Node the most recent build ran on.
    pub last_built_on: Option<NodeLabel>,
    /// Reason the project is blocked (disabled, build lock held, ...).
    pub blocked: Option<String>,
    /// Batch-task configuration; `None` when the project has none at all.
    pub tasks: Option<Arc<TaskRegistry>>,
}

impl ProjectView {
    pub fn is_blocked(&self) -> bool {
        self.blocked.is_some()
    }

    pub fn why_blocked(&self) -> Option<&str> {
        self.blocked.as_deref()
    }
}

/// Lookup of projects by full name.
pub trait ProjectDirectory: Send + Sync {
    fn project(&self, full_name: &str) -> Option<ProjectView>;
}

/// Access to the run log attached to a build.
///
/// `attach_run_log` only updates the in-memory build; persisting the build is
/// left to whoever saves it next.
pub trait BuildStore: Send + Sync {
    fn run_log(&self, build: &BuildId) -> Option<Arc<RunLog>>;
    fn attach_run_log(&self, build: &BuildId, log: Arc<RunLog>);
}

/// The shared work queue. Enqueue and return; the outcome is not observed.
pub trait Enqueue: Send + Sync {
    fn enqueue(&self, task: Arc<BatchTask>, priority: Priority);
}

/// Permission check for user-initiated "run now" requests.
pub trait Authorizer: Send + Sync {
    fn can_execute(&self, principal: Option<&str>, task: &BatchTask) -> bool;
}
