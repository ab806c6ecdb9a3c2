use std::{sync::Arc, time::Duration};

use batch_core::{CoreError, ProjectDirectory, RunLogs};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    ChannelQueue, QueueReceiver, ShellConfig, ShellExecutor, WorkItem,
    queue::WeakQueue,
};

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Delay before a blocked item is put back on the queue.
    pub blocked_retry: Duration,
    pub shell: ShellConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            blocked_retry: Duration::from_secs(5),
            shell: ShellConfig::default(),
        }
    }
}

/// Consumer side of the work queue.
///
/// Each item is checked against its owner's block state, given an execution
/// record on the owner's latest build, and run on its own tokio task. Several
/// executions of the same task may run at once.
///
/// The worker keeps only a weak handle for requeueing blocked items, so the
/// queue closes once every [`ChannelQueue`] clone outside the worker is dropped.
pub struct Worker {
    dir: Arc<dyn ProjectDirectory>,
    logs: Arc<RunLogs>,
    requeue: WeakQueue,
    rx: QueueReceiver,
    executor: ShellExecutor,
    cfg: WorkerConfig,
}

impl Worker {
    pub fn new(
        dir: Arc<dyn ProjectDirectory>,
        logs: Arc<RunLogs>,
        queue: ChannelQueue,
        rx: QueueReceiver,
        cfg: WorkerConfig,
    ) -> Self {
        Self {
            executor: ShellExecutor::new(cfg.shell.clone()),
            requeue: queue.downgrade(),
            dir,
            logs,
            rx,
            cfg,
        }
    }

    /// Run until `cancel` fires or every [`ChannelQueue`] handle is dropped.
    ///
    /// On cancellation running executions are aborted and awaited. When the
    /// queue closes, running executions finish normally and pending retries of
    /// blocked items are dropped. The caller's token is never cancelled here.
    pub async fn run(mut self, cancel: CancellationToken) {
        let shutdown = cancel.child_token();
        let retries = shutdown.child_token();
        let mut running = JoinSet::new();
        info!(target: "batch.exec.worker", "worker started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!(target: "batch.exec.worker", "cancelled; aborting executions");
                    break;
                }
                item = self.rx.recv() => match item {
                    Some(item) => self.dispatch(item, &mut running, &shutdown, &retries),
                    None => {
                        debug!(target: "batch.exec.worker", "queue closed; draining executions");
                        retries.cancel();
                        break;
                    }
                },
                Some(_) = running.join_next(), if !running.is_empty() => {}
            }
        }

        while running.join_next().await.is_some() {}
        shutdown.cancel();
        info!(target: "batch.exec.worker", "worker stopped");
    }

    fn dispatch(
        &self,
        item: WorkItem,
        running: &mut JoinSet<()>,
        shutdown: &CancellationToken,
        retries: &CancellationToken,
    ) {
        if let Some(reason) = item.task.why_blocked(self.dir.as_ref()) {
            debug!(target: "batch.exec.worker", project = %item.task.owner(), task = item.task.name(), %reason, "blocked; requeue later");
            let requeue = self.requeue.clone();
            let delay = self.cfg.blocked_retry;
            let retries = retries.clone();
            running.spawn(async move {
                tokio::select! {
                    _ = retries.cancelled() => {
                        debug!(target: "batch.exec.worker", task = item.task.name(), "retry dropped on shutdown");
                    }
                    _ = tokio::time::sleep(delay) => {
                        if let Err(item) = requeue.requeue(item) {
                            warn!(target: "batch.exec.worker", project = %item.task.owner(), task = item.task.name(), "queue closed; blocked item dropped");
                        }
                    }
                }
            });
            return;
        }

        let WorkItem { task, .. } = item;
        let record = match task.create_executable(self.dir.as_ref(), &self.logs) {
            Ok(record) => record,
            Err(e @ CoreError::NoBuildAvailable { .. }) => {
                error!(target: "batch.exec.worker", project = %task.owner(), task = task.name(), error = %e, "cannot run");
                return;
            }
            Err(e) => {
                warn!(target: "batch.exec.worker", project = %task.owner(), task = task.name(), error = %e, "dropped");
                return;
            }
        };

        if let Some(node) = task.assigned_node(self.dir.as_ref()) {
            debug!(target: "batch.exec.worker", %node, "last built on");
        }

        let executor = self.executor.clone();
        let cancel = shutdown.child_token();
        running.spawn(async move {
            let seq = record.seq();
            let build = record.build().clone();
            match executor.execute(record, task.script(), cancel).await {
                Ok(state) => {
                    info!(target: "batch.exec.worker", project = %task.owner(), task = task.name(), %build, seq, %state, "execution finished")
                }
                Err(e) => {
                    error!(target: "batch.exec.worker", project = %task.owner(), task = task.name(), %build, seq, error = %e, "execution failed")
                }
            }
        });
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use batch_core::{
        BuildStore, Dispatcher,
        memory::{AllowAll, InMemoryBuildStore, InMemoryDirectory},
    };
    use batch_model::{BatchTaskSpec, BuildId, ExecutionState, ProjectSpec};

    struct Harness {
        dir: Arc<InMemoryDirectory>,
        store: Arc<InMemoryBuildStore>,
        dispatcher: Dispatcher,
        cancel: CancellationToken,
        handle: tokio::task::JoinHandle<()>,
    }

    fn start(retry: Duration) -> Harness {
        let dir = Arc::new(InMemoryDirectory::new());
        dir.register(
            &ProjectSpec::new("app")
                .with_task(BatchTaskSpec::new("hello", "echo hi"))
                .with_task(BatchTaskSpec::new("fail", "exit 1"))
                .with_task(BatchTaskSpec::new("slow", "sleep 1; echo done")),
        );
        let store = Arc::new(InMemoryBuildStore::new());
        let logs = Arc::new(RunLogs::new(store.clone()));
        let (queue, rx) = ChannelQueue::channel();
        let dispatcher = Dispatcher::new(Arc::new(queue.clone()), Arc::new(AllowAll));

        let worker = Worker::new(
            dir.clone(),
            logs,
            queue,
            rx,
            WorkerConfig {
                blocked_retry: retry,
                ..WorkerConfig::default()
            },
        );
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(worker.run(cancel.clone()));

        Harness {
            dir,
            store,
            dispatcher,
            cancel,
            handle,
        }
    }

    fn task(h: &Harness, name: &str) -> Arc<batch_core::BatchTask> {
        h.dir
            .project("app")
            .and_then(|p| p.tasks)
            .and_then(|r| r.find(name))
            .unwrap()
    }

    async fn wait_terminal(store: &InMemoryBuildStore, build: &BuildId, count: usize) -> Vec<ExecutionState> {
        for _ in 0..200 {
            if let Some(log) = store.run_log(build) {
                let states: Vec<_> = log.records().iter().map(|r| r.state()).collect();
                if states.len() == count && states.iter().all(|s| s.is_terminal()) {
                    return states;
                }
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("executions did not finish");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn runs_submitted_tasks_on_latest_build() {
        let h = start(Duration::from_millis(50));
        let build = h.dir.record_build("app", None).unwrap();

        h.dispatcher.submit(task(&h, "hello"));
        h.dispatcher.submit(task(&h, "fail"));

        let states = wait_terminal(&h.store, &build, 2).await;
        assert!(states.contains(&ExecutionState::Succeeded));
        assert!(states.contains(&ExecutionState::Failed));

        let seqs: Vec<_> = h
            .store
            .run_log(&build)
            .unwrap()
            .records()
            .iter()
            .map(|r| r.seq())
            .collect();
        assert_eq!(seqs, [1, 2]);

        h.cancel.cancel();
        h.handle.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn unbuilt_project_gets_no_record() {
        let h = start(Duration::from_millis(50));

        h.dispatcher.submit(task(&h, "hello"));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(h.store.attached(), 0);
        h.cancel.cancel();
        h.handle.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn blocked_task_runs_once_unblocked() {
        let h = start(Duration::from_millis(30));
        let build = h.dir.record_build("app", None).unwrap();
        h.dir.set_blocked("app", Some("disabled"));

        h.dispatcher.submit(task(&h, "hello"));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(h.store.run_log(&build).is_none());

        h.dir.set_blocked("app", None);
        let states = wait_terminal(&h.store, &build, 1).await;
        assert_eq!(states, [ExecutionState::Succeeded]);

        h.cancel.cancel();
        h.handle.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stops_when_every_queue_handle_is_dropped() {
        let dir = Arc::new(InMemoryDirectory::new());
        let logs = Arc::new(RunLogs::new(Arc::new(InMemoryBuildStore::new())));
        let (queue, rx) = ChannelQueue::channel();
        let worker = Worker::new(dir, logs, queue, rx, WorkerConfig::default());

        let cancel = CancellationToken::new();
        tokio::time::timeout(Duration::from_secs(2), worker.run(cancel.clone()))
            .await
            .expect("worker stops once the queue closes");
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn closing_the_queue_lets_running_executions_finish() {
        let h = start(Duration::from_millis(50));
        let build = h.dir.record_build("app", None).unwrap();
        h.dispatcher.submit(task(&h, "slow"));

        let Harness {
            store,
            dispatcher,
            cancel,
            handle,
            ..
        } = h;
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(dispatcher);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker stops once the queue closes")
            .unwrap();

        let log = store.run_log(&build).unwrap();
        let info = log.records()[0].info();
        assert_eq!(info.state, ExecutionState::Succeeded);
        assert!(info.log.iter().any(|l| l == "done"));
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancel_aborts_running_executions() {
        let h = start(Duration::from_millis(50));
        let build = h.dir.record_build("app", None).unwrap();
        h.dispatcher.submit(task(&h, "slow"));
        tokio::time::sleep(Duration::from_millis(150)).await;

        h.cancel.cancel();
        h.handle.await.unwrap();

        let states: Vec<_> = h
            .store
            .run_log(&build)
            .unwrap()
            .records()
            .iter()
            .map(|r| r.state())
            .collect();
        assert_eq!(states, [ExecutionState::Aborted]);
    }
}
