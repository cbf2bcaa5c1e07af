use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const FINISHED: u8 = 2;
const CANCELLED: u8 = 3;

/// Lifecycle of a scheduled job.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum JobStatus {
    Pending,
    Running,
    Finished,
    Cancelled,
}

/// A named unit of work plus its shared status word.
pub struct Job {
    name: Arc<str>,
    status: Arc<AtomicU8>,
    work: Box<dyn FnOnce() + Send>,
}

impl Job {
    /// Wraps `work`; the returned handle cancels or observes it.
    pub fn new(name: impl Into<Arc<str>>, work: impl FnOnce() + Send + 'static) -> (Self, JobHandle) {
        let name = name.into();
        let status = Arc::new(AtomicU8::new(PENDING));
        let handle = JobHandle {
            name: Arc::clone(&name),
            status: Arc::clone(&status),
        };
        let job = Self {
            name,
            status,
            work: Box::new(work),
        };
        (job, handle)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the work unless the job was cancelled first. Returns whether it ran.
    pub fn run(self) -> bool {
        if self
            .status
            .compare_exchange(PENDING, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("job '{}' cancelled before start", self.name);
            return false;
        }

        (self.work)();
        self.status.store(FINISHED, Ordering::Release);
        true
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("status", &status_of(&self.status))
            .finish_non_exhaustive()
    }
}

/// Observer/canceller for a scheduled [`Job`].
#[derive(Debug, Clone)]
pub struct JobHandle {
    name: Arc<str>,
    status: Arc<AtomicU8>,
}

impl JobHandle {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> JobStatus {
        status_of(&self.status)
    }

    /// Cancels a job that has not started yet. Non-blocking.
    pub fn cancel(&self) -> bool {
        self.status
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

fn status_of(status: &AtomicU8) -> JobStatus {
    match status.load(Ordering::Acquire) {
        PENDING => JobStatus::Pending,
        RUNNING => JobStatus::Running,
        FINISHED => JobStatus::Finished,
        _ => JobStatus::Cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn cancelled_job_does_not_run() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let (job, handle) = Job::new("test", move || flag.store(true, Ordering::SeqCst));

        assert!(handle.cancel());
        assert!(!job.run());
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(handle.status(), JobStatus::Cancelled);
    }

    #[test]
    fn finished_job_cannot_be_cancelled() {
        let (job, handle) = Job::new("test", || {});
        assert!(job.run());
        assert_eq!(handle.status(), JobStatus::Finished);
        assert!(!handle.cancel());
    }
}
