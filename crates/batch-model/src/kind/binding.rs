use serde::{Deserialize, Deserializer, Serialize};

use crate::ProjectName;

/// One `(project, task)` pair a cross-project invoker triggers.
///
/// Both names are stored with surrounding whitespace removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokerBinding {
    #[serde(deserialize_with = "trimmed_project")]
    pub project: ProjectName,
    #[serde(deserialize_with = "trimmed")]
    pub task: String,
}

impl InvokerBinding {
    pub fn new(project: impl AsRef<str>, task: impl AsRef<str>) -> Self {
        Self {
            project: ProjectName::from(project.as_ref().trim()),
            task: task.as_ref().trim().to_string(),
        }
    }
}

fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().to_string())
}

fn trimmed_project<'de, D>(deserializer: D) -> Result<ProjectName, D::Error>
where
    D: Deserializer<'de>,
{
    trimmed(deserializer).map(ProjectName::from)
}
