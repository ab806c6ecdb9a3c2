use std::{
    sync::{PoisonError, RwLock},
    time::SystemTime,
};

use batch_model::{BuildId, ExecutionInfo, ExecutionState, ProjectName, Seq};

use crate::CoreError;

/// One execution of one batch task.
///
/// Identity fields are fixed at allocation. The state only moves forward
/// (`Pending -> Running -> terminal`) and the record is frozen once terminal.
#[derive(Debug)]
pub struct ExecutionRecord {
    seq: Seq,
    project: ProjectName,
    task: String,
    build: BuildId,
    progress: RwLock<Progress>,
}

#[derive(Debug)]
struct Progress {
    state: ExecutionState,
    started_at: Option<SystemTime>,
    completed_at: Option<SystemTime>,
    log: Vec<String>,
}

impl ExecutionRecord {
    pub(crate) fn new(seq: Seq, project: ProjectName, task: String, build: BuildId) -> Self {
        Self {
            seq,
            project,
            task,
            build,
            progress: RwLock::new(Progress {
                state: ExecutionState::Pending,
                started_at: None,
                completed_at: None,
                log: Vec::new(),
            }),
        }
    }

    pub fn seq(&self) -> Seq {
        self.seq
    }

    pub fn project(&self) -> &ProjectName {
        &self.project
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn build(&self) -> &BuildId {
        &self.build
    }

    pub fn state(&self) -> ExecutionState {
        self.progress
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state
    }

    /// `Pending -> Running`; stamps the start time.
    pub fn start(&self) -> Result<(), CoreError> {
        self.transition(ExecutionState::Running)
    }

    /// `Running -> outcome`; stamps the completion time and freezes the log.
    pub fn finish(&self, outcome: ExecutionState) -> Result<(), CoreError> {
        self.transition(outcome)
    }

    /// Append one captured output line. Rejected once the record is terminal.
    pub fn append_log(&self, line: impl Into<String>) -> Result<(), CoreError> {
        let mut p = self.progress.write().unwrap_or_else(PoisonError::into_inner);
        if p.state.is_terminal() {
            return Err(CoreError::RecordClosed {
                seq: self.seq,
                state: p.state,
            });
        }
        p.log.push(line.into());
        Ok(())
    }

    pub fn info(&self) -> ExecutionInfo {
        let p = self.progress.read().unwrap_or_else(PoisonError::into_inner);
        ExecutionInfo {
            seq: self.seq,
            project: self.project.clone(),
            task: self.task.clone(),
            build: self.build.clone(),
            state: p.state,
            started_at: p.started_at,
            completed_at: p.completed_at,
            log: p.log.clone(),
        }
    }

    fn transition(&self, to: ExecutionState) -> Result<(), CoreError> {
        let mut p = self.progress.write().unwrap_or_else(PoisonError::into_inner);
        if !p.state.can_transition_to(to) {
            return Err(CoreError::InvalidTransition {
                seq: self.seq,
                from: p.state,
                to,
            });
        }

        let now = SystemTime::now();
        if to == ExecutionState::Running {
            p.started_at = Some(now);
        } else {
            p.completed_at = Some(now);
        }
        p.state = to;
        Ok(())
    }
}
