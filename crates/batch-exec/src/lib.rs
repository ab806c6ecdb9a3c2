//! Execution environment for batch tasks: a shell executor driving execution
//! records through their lifecycle, and a worker consuming the work queue.

mod error;
pub use error::{ExecError, ExecResult};

mod util;

pub mod shell;
pub use shell::{ShellConfig, ShellExecutor};

pub mod queue;
pub use queue::{ChannelQueue, QueueReceiver, WorkItem};

pub mod worker;
pub use worker::{Worker, WorkerConfig};

pub mod prelude {
    pub use crate::error::{ExecError, ExecResult};
    pub use crate::{ChannelQueue, ShellExecutor, Worker, WorkerConfig};
}
