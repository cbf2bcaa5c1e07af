//! Background work scheduling.
//!
//! Mesh calculation runs off the render thread. The mesh layer only needs
//! [`Scheduler::schedule`] and best-effort cancellation through a
//! [`JobHandle`]; [`JobPool`] is the threaded implementation and
//! [`DeferredScheduler`] runs jobs on demand for single-threaded hosts.

mod deferred;
mod job;
mod pool;

pub use deferred::DeferredScheduler;
pub use job::{Job, JobHandle, JobStatus};
pub use pool::{JobPool, PoolConfig};

/// Runs jobs somewhere other than the caller's stack frame.
pub trait Scheduler: Send + Sync {
    /// Queues a job. Never blocks on the job itself.
    fn schedule(&self, job: Job);

    /// Prevents a queued job from running. Returns `false` when the job has
    /// already started or finished; a running job is never interrupted.
    fn cancel(&self, handle: &JobHandle) -> bool {
        handle.cancel()
    }
}
