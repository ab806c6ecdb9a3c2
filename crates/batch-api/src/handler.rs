use async_trait::async_trait;
use batch_model::ExecutionInfo;

use crate::error::ApiError;

/// Batch-task API handler.
///
/// This trait abstracts the backend implementation, allowing users to:
/// - Use the provided `DispatcherAdapter`
/// - Implement custom handlers with additional logic (auditing, rate limiting, etc.)
#[async_trait]
pub trait ApiHandler: Send + Sync + 'static {
    /// Queue `task` of `project` for execution on behalf of `principal`.
    async fn run_now(
        &self,
        principal: Option<&str>,
        project: &str,
        task: &str,
    ) -> Result<(), ApiError>;

    /// Executions recorded on the latest build of `project`, in allocation order.
    async fn run_log(&self, project: &str) -> Result<Vec<ExecutionInfo>, ApiError>;
}
