use std::sync::Arc;

use batch_core::{BatchTask, Enqueue};
use batch_model::Priority;
use tokio::sync::mpsc;
use tracing::warn;

/// One queued execution request.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub task: Arc<BatchTask>,
    pub priority: Priority,
}

/// FIFO work queue over an unbounded channel.
///
/// Priority travels with the item but does not reorder the queue.
#[derive(Clone)]
pub struct ChannelQueue {
    tx: mpsc::UnboundedSender<WorkItem>,
}

/// Consuming side of a [`ChannelQueue`].
pub struct QueueReceiver {
    rx: mpsc::UnboundedReceiver<WorkItem>,
}

/// Requeue handle that does not keep the channel open.
#[derive(Clone)]
pub(crate) struct WeakQueue {
    tx: mpsc::WeakUnboundedSender<WorkItem>,
}

impl ChannelQueue {
    pub fn channel() -> (ChannelQueue, QueueReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelQueue { tx }, QueueReceiver { rx })
    }

    pub(crate) fn downgrade(&self) -> WeakQueue {
        WeakQueue {
            tx: self.tx.downgrade(),
        }
    }
}

impl WeakQueue {
    /// Put `item` back on the queue. Hands it back once every strong handle is gone.
    pub(crate) fn requeue(&self, item: WorkItem) -> Result<(), WorkItem> {
        match self.tx.upgrade() {
            Some(tx) => tx.send(item).map_err(|e| e.0),
            None => Err(item),
        }
    }
}

impl Enqueue for ChannelQueue {
    fn enqueue(&self, task: Arc<BatchTask>, priority: Priority) {
        if let Err(e) = self.tx.send(WorkItem { task, priority }) {
            warn!(
                target: "batch.exec.queue",
                project = %e.0.task.owner(),
                task = e.0.task.name(),
                "queue closed; item dropped"
            );
        }
    }
}

impl QueueReceiver {
    pub async fn recv(&mut self) -> Option<WorkItem> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<WorkItem> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batch_core::TaskRegistry;
    use batch_model::{BatchTaskSpec, ProjectName};

    #[tokio::test]
    async fn items_come_out_in_order() {
        let reg = TaskRegistry::new(
            ProjectName::from("app"),
            [BatchTaskSpec::new("a", "true"), BatchTaskSpec::new("b", "true")],
        );
        let (queue, mut rx) = ChannelQueue::channel();

        queue.enqueue(reg.find("a").unwrap(), Priority::DEFAULT);
        queue.enqueue(reg.find("b").unwrap(), Priority(9));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.task.name(), "a");
        assert_eq!(second.task.name(), "b");
        assert_eq!(second.priority, Priority(9));
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn enqueue_after_receiver_dropped_is_harmless() {
        let reg = TaskRegistry::new(ProjectName::from("app"), [BatchTaskSpec::new("a", "true")]);
        let (queue, rx) = ChannelQueue::channel();
        drop(rx);
        queue.enqueue(reg.find("a").unwrap(), Priority::DEFAULT);
    }

    #[tokio::test]
    async fn weak_handle_requeues_while_queue_is_alive() {
        let reg = TaskRegistry::new(ProjectName::from("app"), [BatchTaskSpec::new("a", "true")]);
        let (queue, mut rx) = ChannelQueue::channel();
        let weak = queue.downgrade();

        let item = WorkItem {
            task: reg.find("a").unwrap(),
            priority: Priority::DEFAULT,
        };
        assert!(weak.requeue(item.clone()).is_ok());
        assert_eq!(rx.recv().await.unwrap().task.name(), "a");

        drop(queue);
        assert!(rx.recv().await.is_none());
        let back = weak.requeue(item).unwrap_err();
        assert_eq!(back.task.name(), "a");
    }
}
