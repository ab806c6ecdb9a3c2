use batch_model::{ExecutionState, ProjectName, Seq};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The owning project has never been built; there is nothing to attach a record to.
    #[error("project {project} has no build to attach the execution to")]
    NoBuildAvailable { project: ProjectName },

    #[error("No such project exists: {0}")]
    UnknownProject(ProjectName),

    #[error("No such task exists: {task}. In fact, no batch tasks exist at all")]
    NoTasksConfigured { task: String },

    #[error("No such task exists: {task}.{}", suggestion(.nearest))]
    UnknownTask {
        task: String,
        nearest: Option<String>,
    },

    #[error("not allowed to execute {task} of {project}")]
    Unauthorized { project: ProjectName, task: String },

    #[error("execution #{seq}: illegal transition {from} -> {to}")]
    InvalidTransition {
        seq: Seq,
        from: ExecutionState,
        to: ExecutionState,
    },

    #[error("execution #{seq} is already {state}")]
    RecordClosed { seq: Seq, state: ExecutionState },
}

fn suggestion(nearest: &Option<String>) -> String {
    match nearest {
        Some(name) => format!(" Perhaps you meant {name}"),
        None => String::new(),
    }
}
