use serde::{Deserialize, Serialize};

/// Configuration of one batch task: a name and an opaque script body.
///
/// The owning project is not part of this description; it is bound when
/// the task is registered with a project's registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTaskSpec {
    /// Name, advisory-unique within the owning project.
    pub name: String,
    /// Script body. Interpreted by the execution environment only.
    pub script: String,
}

impl BatchTaskSpec {
    pub fn new(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
        }
    }
}
