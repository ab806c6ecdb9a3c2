//! Batch tasks: named scripts owned by a project, queued on a shared work
//! queue and recorded against the owning project's latest build.

mod error;
pub use error::CoreError;

pub mod host;
pub use host::{Authorizer, BuildStore, Enqueue, ProjectDirectory, ProjectView};

mod task;
pub use task::BatchTask;

mod registry;
pub use registry::TaskRegistry;

pub mod runlog;
pub use runlog::{ExecutionRecord, RunLog, RunLogs};

mod dispatch;
pub use dispatch::Dispatcher;

mod invoker;
pub use invoker::{BindingOutcome, CrossProjectInvoker, InvocationReport};

pub mod memory;

mod system;
pub use system::local_node;
