mod ids;
pub use ids::{BuildId, NodeLabel, ProjectName};

mod display;
pub use display::{DISPLAY_SEPARATOR, compose_display_name};

mod execution_state;
pub use execution_state::{ExecutionState, ParseStateError};

mod execution_info;
pub use execution_info::ExecutionInfo;

mod priority;
pub use priority::Priority;

/// Monotonic sequence number of an execution inside one run log (starts at 1).
pub type Seq = u32;
