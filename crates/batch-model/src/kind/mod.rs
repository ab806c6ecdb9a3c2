mod task;
pub use task::BatchTaskSpec;

mod binding;
pub use binding::InvokerBinding;

mod project;
pub use project::ProjectSpec;
