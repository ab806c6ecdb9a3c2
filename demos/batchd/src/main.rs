mod config;
mod report;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use batch_api::{DispatcherAdapter, HttpApi};
use batch_core::{
    CrossProjectInvoker, Dispatcher, RunLogs, local_node,
    memory::{AllowList, InMemoryBuildStore, InMemoryDirectory},
};
use batch_exec::{ChannelQueue, Worker, WorkerConfig};
use batch_model::NodeLabel;
use batch_observe::logger_init;

use crate::config::DaemonConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Config
    let path = DaemonConfig::locate()?;
    let cfg = DaemonConfig::load(&path)?;

    // 2) Logger
    logger_init(&cfg.logger.to_config()?)?;
    info!(config = %path, "logger initialized");

    // 3) Projects
    let dir = Arc::new(InMemoryDirectory::new());
    for spec in &cfg.projects {
        dir.register(spec);
    }
    let node = cfg.node.as_deref().map(NodeLabel::from).unwrap_or_else(local_node);
    info!(projects = cfg.projects.len(), %node, "projects registered");

    // 4) Queue, dispatcher, worker
    let logs = Arc::new(RunLogs::new(Arc::new(InMemoryBuildStore::new())));
    let (queue, rx) = ChannelQueue::channel();
    let dispatcher = Dispatcher::new(
        Arc::new(queue.clone()),
        Arc::new(AllowList::new(cfg.admins.iter().cloned())),
    );

    let cancel = CancellationToken::new();
    let worker = Worker::new(dir.clone(), logs.clone(), queue, rx, WorkerConfig::default());
    let worker = tokio::spawn(worker.run(cancel.clone()));

    // 5) One build per project, then its invoker step
    for spec in &cfg.projects {
        if let Some(build) = dir.record_build(spec.name.as_str(), Some(node.clone())) {
            info!(%build, "build recorded");
        }
        let report = CrossProjectInvoker::new(spec.invokers.clone()).invoke_all(dir.as_ref(), &dispatcher);
        report::log_report(&spec.name, &report);
    }

    // 6) HTTP
    let handler = Arc::new(DispatcherAdapter::new(dir.clone(), logs, dispatcher));
    let app = HttpApi::new(handler).router();
    let listener = tokio::net::TcpListener::bind(cfg.listen).await?;
    info!(listen = %cfg.listen, "http api listening");

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "ctrl-c handler failed");
            }
            info!("shutting down...");
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    worker.await?;
    Ok(())
}
