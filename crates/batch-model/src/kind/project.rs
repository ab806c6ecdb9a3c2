use serde::{Deserialize, Serialize};

use crate::{BatchTaskSpec, InvokerBinding, ProjectName};

/// Configuration of one project as seen by the batch-task layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSpec {
    /// Full name used for lookups.
    pub name: ProjectName,
    /// Human display name; defaults to the full name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Batch tasks in configuration order.
    ///
    /// `None` means the project has no batch-task configuration at all,
    /// which differs from a configured but empty list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<BatchTaskSpec>>,
    /// Tasks of other projects to trigger after each build.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invokers: Vec<InvokerBinding>,
}

impl ProjectSpec {
    pub fn new(name: impl Into<ProjectName>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            tasks: None,
            invokers: Vec::new(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_task(mut self, task: BatchTaskSpec) -> Self {
        self.tasks.get_or_insert_with(Vec::new).push(task);
        self
    }

    pub fn with_invoker(mut self, binding: InvokerBinding) -> Self {
        self.invokers.push(binding);
        self
    }

    /// Display name, falling back to the full name.
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(self.name.as_str())
    }
}
