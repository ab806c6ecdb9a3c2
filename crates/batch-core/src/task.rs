use std::{sync::Arc, time::Duration};

use batch_model::{BatchTaskSpec, NodeLabel, ProjectName, compose_display_name};
use tracing::{debug, instrument};

use crate::{CoreError, Dispatcher, ExecutionRecord, ProjectDirectory, ProjectView, RunLogs};

/// A named script owned by a project.
///
/// The owner is held by name and resolved through a [`ProjectDirectory`] on
/// every call, so a task never outlives the configuration it came from with
/// stale project state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTask {
    name: String,
    script: String,
    owner: ProjectName,
}

impl BatchTask {
    pub(crate) fn bind(spec: BatchTaskSpec, owner: ProjectName) -> Self {
        Self {
            name: spec.name,
            script: spec.script,
            owner,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn owner(&self) -> &ProjectName {
        &self.owner
    }

    fn owner_view(&self, dir: &dyn ProjectDirectory) -> Option<ProjectView> {
        dir.project(self.owner.as_str())
    }

    /// `<owner display name> » <task name>`.
    pub fn display_name(&self, dir: &dyn ProjectDirectory) -> String {
        match self.owner_view(dir) {
            Some(view) => compose_display_name(&view.display_name, &self.name),
            None => compose_display_name(self.owner.as_str(), &self.name),
        }
    }

    pub fn is_blocked(&self, dir: &dyn ProjectDirectory) -> bool {
        self.why_blocked(dir).is_some()
    }

    /// The owner's block reason, verbatim.
    pub fn why_blocked(&self, dir: &dyn ProjectDirectory) -> Option<String> {
        match self.owner_view(dir) {
            Some(view) => view.blocked,
            None => Some(format!("Project {} no longer exists", self.owner)),
        }
    }

    /// Node the owner was last built on; an affinity hint for the scheduler.
    pub fn assigned_node(&self, dir: &dyn ProjectDirectory) -> Option<NodeLabel> {
        self.owner_view(dir).and_then(|view| view.last_built_on)
    }

    /// No historical estimate is kept.
    pub fn estimated_duration(&self) -> Option<Duration> {
        None
    }

    /// Allocate a new execution record in the run log of the owner's latest build.
    ///
    /// The run log is created and attached on first use. Fails with
    /// [`CoreError::NoBuildAvailable`] when the owner was never built.
    #[instrument(level = "debug", skip(self, dir, logs), fields(project = %self.owner, task = %self.name))]
    pub fn create_executable(
        &self,
        dir: &dyn ProjectDirectory,
        logs: &RunLogs,
    ) -> Result<Arc<ExecutionRecord>, CoreError> {
        let view = self
            .owner_view(dir)
            .ok_or_else(|| CoreError::UnknownProject(self.owner.clone()))?;
        let build = view.last_build.ok_or_else(|| CoreError::NoBuildAvailable {
            project: self.owner.clone(),
        })?;

        let log = logs.get_or_create(&build);
        let record = log.allocate_record(self);
        debug!(target: "batch.core.task", build = %build, seq = record.seq(), "execution allocated");
        Ok(record)
    }

    /// Hand this task to the dispatcher with default priority.
    pub fn submit_for_execution(self: &Arc<Self>, dispatcher: &Dispatcher) {
        dispatcher.submit(Arc::clone(self));
    }
}
