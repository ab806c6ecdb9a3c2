use std::sync::Arc;

use batch_model::Priority;
use tracing::{debug, info, instrument, warn};

use crate::{Authorizer, BatchTask, CoreError, Enqueue};

/// Producer side of the shared work queue.
///
/// Used by direct "run now" requests and by cross-project invocation.
/// Submission never blocks and the outcome of the queued task is not observed.
#[derive(Clone)]
pub struct Dispatcher {
    queue: Arc<dyn Enqueue>,
    authorizer: Arc<dyn Authorizer>,
}

impl Dispatcher {
    pub fn new(queue: Arc<dyn Enqueue>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self { queue, authorizer }
    }

    /// Enqueue `task` with default priority.
    pub fn submit(&self, task: Arc<BatchTask>) {
        self.submit_with_priority(task, Priority::DEFAULT);
    }

    #[instrument(level = "debug", skip(self, task), fields(project = %task.owner(), task = %task.name()))]
    pub fn submit_with_priority(&self, task: Arc<BatchTask>, priority: Priority) {
        debug!(target: "batch.core.dispatch", priority = priority.0, "enqueue");
        self.queue.enqueue(task, priority);
    }

    /// Whether `principal` may run `task` now.
    pub fn can_execute(&self, principal: Option<&str>, task: &BatchTask) -> bool {
        self.authorizer.can_execute(principal, task)
    }

    /// User-initiated execution. The permission check runs first; a denied
    /// request leaves the queue untouched.
    pub fn run_now(&self, principal: Option<&str>, task: Arc<BatchTask>) -> Result<(), CoreError> {
        if !self.can_execute(principal, &task) {
            warn!(
                target: "batch.core.dispatch",
                principal = principal.unwrap_or("anonymous"),
                project = %task.owner(),
                task = task.name(),
                "run request denied"
            );
            return Err(CoreError::Unauthorized {
                project: task.owner().clone(),
                task: task.name().to_string(),
            });
        }

        info!(
            target: "batch.core.dispatch",
            principal = principal.unwrap_or("anonymous"),
            project = %task.owner(),
            task = task.name(),
            "run requested"
        );
        self.submit(task);
        Ok(())
    }
}
