//! Per-build execution ledger.
//!
//! A [`RunLog`] is attached lazily to a build the first time one of the
//! project's batch tasks runs against it, and holds the [`ExecutionRecord`]s
//! in allocation order.

mod record;
pub use record::ExecutionRecord;

use std::sync::{Arc, Mutex, PoisonError};

use batch_model::{BuildId, ExecutionInfo, Seq};
use tracing::debug;

use crate::{BatchTask, BuildStore};

/// Append-only, build-scoped collection of execution records.
#[derive(Debug)]
pub struct RunLog {
    build: BuildId,
    inner: Mutex<RunLogInner>,
}

#[derive(Debug)]
struct RunLogInner {
    /// Last sequence number handed out.
    last_seq: Seq,
    records: Vec<Arc<ExecutionRecord>>,
}

impl RunLog {
    pub fn new(build: BuildId) -> Self {
        Self {
            build,
            inner: Mutex::new(RunLogInner {
                last_seq: 0,
                records: Vec::new(),
            }),
        }
    }

    pub fn build(&self) -> &BuildId {
        &self.build
    }

    /// Append a `Pending` record for `task` with the next sequence number.
    ///
    /// Sequence numbers start at 1 and are never reused.
    pub fn allocate_record(&self, task: &BatchTask) -> Arc<ExecutionRecord> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.last_seq += 1;
        let record = Arc::new(ExecutionRecord::new(
            inner.last_seq,
            task.owner().clone(),
            task.name().to_string(),
            self.build.clone(),
        ));
        inner.records.push(Arc::clone(&record));
        record
    }

    /// Records in allocation order.
    pub fn records(&self) -> Vec<Arc<ExecutionRecord>> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.records.clone()
    }

    pub fn get(&self, seq: Seq) -> Option<Arc<ExecutionRecord>> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.records.iter().find(|r| r.seq() == seq).cloned()
    }

    /// Snapshot of every record in allocation order.
    pub fn snapshot(&self) -> Vec<ExecutionInfo> {
        self.records().iter().map(|r| r.info()).collect()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Serialises run-log creation on top of a [`BuildStore`].
///
/// All allocation against one store must go through a single `RunLogs`
/// so that at most one run log is ever attached to a build. The check and
/// the attach happen under one lock; both are brief.
pub struct RunLogs {
    store: Arc<dyn BuildStore>,
    attach: Mutex<()>,
}

impl RunLogs {
    pub fn new(store: Arc<dyn BuildStore>) -> Self {
        Self {
            store,
            attach: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn BuildStore> {
        &self.store
    }

    /// Existing run log of `build`, if one is attached.
    pub fn get(&self, build: &BuildId) -> Option<Arc<RunLog>> {
        self.store.run_log(build)
    }

    /// Return the run log attached to `build`, attaching a new empty one if absent.
    ///
    /// The attachment is in memory only; the build is not saved here.
    pub fn get_or_create(&self, build: &BuildId) -> Arc<RunLog> {
        let _guard = self.attach.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(log) = self.store.run_log(build) {
            return log;
        }

        let log = Arc::new(RunLog::new(build.clone()));
        self.store.attach_run_log(build, Arc::clone(&log));
        debug!(target: "batch.core.runlog", build = %build, "run log attached");
        log
    }
}
