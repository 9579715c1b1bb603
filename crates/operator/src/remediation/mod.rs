pub mod coordinator;
pub mod inflight;
pub mod pool;
pub mod task;

pub use coordinator::RemediationCoordinator;
pub use inflight::{InFlightGuard, InFlightRegistry};
pub use pool::{Job, WorkerPool};
pub use task::{RemediationOutcome, RemediationTask, TaskState};
