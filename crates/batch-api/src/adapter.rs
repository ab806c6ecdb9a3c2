use std::sync::Arc;

use async_trait::async_trait;
use batch_core::{CoreError, CrossProjectInvoker, Dispatcher, ProjectDirectory, RunLogs};
use batch_model::{ExecutionInfo, InvokerBinding, ProjectName};
use tracing::debug;

use crate::error::ApiError;
use crate::handler::ApiHandler;

/// Ready-to-use [`ApiHandler`] over a project directory, run logs and a dispatcher.
pub struct DispatcherAdapter {
    dir: Arc<dyn ProjectDirectory>,
    logs: Arc<RunLogs>,
    dispatcher: Dispatcher,
}

impl DispatcherAdapter {
    pub fn new(dir: Arc<dyn ProjectDirectory>, logs: Arc<RunLogs>, dispatcher: Dispatcher) -> Self {
        Self {
            dir,
            logs,
            dispatcher,
        }
    }

    /// Keep a "did you mean" hint only if `principal` may run the suggested task.
    fn visible_suggestion(
        &self,
        principal: Option<&str>,
        project: &ProjectName,
        nearest: String,
    ) -> Option<String> {
        let candidate = self
            .dir
            .project(project.as_str())
            .and_then(|p| p.tasks)
            .and_then(|r| r.find(&nearest))?;
        self.dispatcher
            .can_execute(principal, &candidate)
            .then_some(nearest)
    }
}

#[async_trait]
impl ApiHandler for DispatcherAdapter {
    async fn run_now(
        &self,
        principal: Option<&str>,
        project: &str,
        task: &str,
    ) -> Result<(), ApiError> {
        if project.trim().is_empty() || task.trim().is_empty() {
            return Err(ApiError::InvalidRequest("project and task are required".into()));
        }

        let binding = InvokerBinding::new(project, task);
        let task = match CrossProjectInvoker::resolve(self.dir.as_ref(), &binding) {
            Ok(task) => task,
            Err(CoreError::UnknownTask {
                task,
                nearest: Some(nearest),
            }) => {
                let nearest = self.visible_suggestion(principal, &binding.project, nearest);
                return Err(CoreError::UnknownTask { task, nearest }.into());
            }
            Err(e) => return Err(e.into()),
        };
        self.dispatcher.run_now(principal, task)?;
        Ok(())
    }

    async fn run_log(&self, project: &str) -> Result<Vec<ExecutionInfo>, ApiError> {
        let view = self
            .dir
            .project(project)
            .ok_or_else(|| CoreError::UnknownProject(ProjectName::from(project)))?;

        let Some(build) = view.last_build else {
            debug!(target: "batch.api", project, "never built");
            return Ok(Vec::new());
        };

        Ok(self
            .logs
            .get(&build)
            .map(|log| log.snapshot())
            .unwrap_or_default())
    }
}
