pub mod batch_runner;
pub mod step_registry;
pub mod tracing_observer;

pub use batch_runner::BatchRunner;
pub use tracing_observer::TracingObserver;
