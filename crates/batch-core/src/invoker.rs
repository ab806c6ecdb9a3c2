use std::sync::Arc;

use batch_model::InvokerBinding;
use tracing::{error, info, instrument};

use crate::{BatchTask, CoreError, Dispatcher, ProjectDirectory};

/// Pipeline step that triggers batch tasks of other projects.
///
/// Each binding is resolved and submitted independently. A failing binding is
/// reported and skipped; it never fails the invoking build.
#[derive(Debug, Clone, Default)]
pub struct CrossProjectInvoker {
    bindings: Vec<InvokerBinding>,
}

/// Result of one binding.
#[derive(Debug, Clone)]
pub struct BindingOutcome {
    pub binding: InvokerBinding,
    pub result: Result<(), CoreError>,
}

/// Per-binding results of one [`CrossProjectInvoker::invoke_all`] call.
#[derive(Debug, Clone, Default)]
pub struct InvocationReport {
    outcomes: Vec<BindingOutcome>,
}

impl CrossProjectInvoker {
    pub fn new(bindings: Vec<InvokerBinding>) -> Self {
        Self { bindings }
    }

    pub fn bindings(&self) -> &[InvokerBinding] {
        &self.bindings
    }

    /// Resolve `binding` to a task: project, then its registry, then the task name.
    pub fn resolve(
        dir: &dyn ProjectDirectory,
        binding: &InvokerBinding,
    ) -> Result<Arc<BatchTask>, CoreError> {
        let project = dir
            .project(binding.project.as_str())
            .ok_or_else(|| CoreError::UnknownProject(binding.project.clone()))?;

        let registry = project.tasks.ok_or_else(|| CoreError::NoTasksConfigured {
            task: binding.task.clone(),
        })?;

        registry
            .find(&binding.task)
            .ok_or_else(|| CoreError::UnknownTask {
                task: binding.task.clone(),
                nearest: registry
                    .find_nearest(&binding.task)
                    .map(|t| t.name().to_string()),
            })
    }

    /// Resolve and submit every binding in order.
    #[instrument(level = "debug", skip_all, fields(bindings = self.bindings.len()))]
    pub fn invoke_all(&self, dir: &dyn ProjectDirectory, dispatcher: &Dispatcher) -> InvocationReport {
        let outcomes = self
            .bindings
            .iter()
            .map(|binding| {
                let result = Self::resolve(dir, binding).map(|task| {
                    info!(target: "batch.core.invoke", project = %binding.project, task = %binding.task, "invoking");
                    dispatcher.submit(task);
                });
                if let Err(e) = &result {
                    error!(target: "batch.core.invoke", project = %binding.project, task = %binding.task, error = %e, "binding skipped");
                }
                BindingOutcome {
                    binding: binding.clone(),
                    result,
                }
            })
            .collect();

        InvocationReport { outcomes }
    }
}

impl BindingOutcome {
    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }

    /// `Invoking <project> - <task>` or `ERROR: <diagnostic>`.
    pub fn log_line(&self) -> String {
        match &self.result {
            Ok(()) => format!("Invoking {} - {}", self.binding.project, self.binding.task),
            Err(e) => format!("ERROR: {e}"),
        }
    }
}

impl InvocationReport {
    /// Always `true`: binding failures never abort the calling pipeline.
    pub fn performed(&self) -> bool {
        true
    }

    pub fn outcomes(&self) -> &[BindingOutcome] {
        &self.outcomes
    }

    pub fn submitted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &BindingOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// Lines for the invoking build's console log.
    pub fn log_lines(&self) -> Vec<String> {
        self.outcomes.iter().map(BindingOutcome::log_line).collect()
    }
}
