use std::collections::VecDeque;

use parking_lot::Mutex;

use super::{Job, Scheduler};

/// Queues jobs until the host calls [`run_pending`](Self::run_pending).
///
/// Suits hosts without spare threads and tests that need to control exactly
/// when a calculation lands.
#[derive(Debug, Default)]
pub struct DeferredScheduler {
    queue: Mutex<VecDeque<Job>>,
}

impl DeferredScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Runs queued jobs on the calling thread, including any they schedule.
    /// Returns how many actually ran (cancelled jobs are skipped).
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            // Release the lock before running; jobs may schedule more work.
            let Some(job) = self.queue.lock().pop_front() else {
                break;
            };
            if job.run() {
                ran += 1;
            }
        }
        ran
    }
}

impl Scheduler for DeferredScheduler {
    fn schedule(&self, job: Job) {
        self.queue.lock().push_back(job);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn jobs_wait_for_run_pending() {
        let scheduler = DeferredScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let count = Arc::clone(&count);
            let (job, _) = Job::new("count", move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
            scheduler.schedule(job);
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending(), 3);
        assert_eq!(scheduler.run_pending(), 3);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn cancelled_jobs_are_skipped() {
        let scheduler = DeferredScheduler::new();
        let (job, handle) = Job::new("skip", || panic!("must not run"));
        scheduler.schedule(job);
        assert!(scheduler.cancel(&handle));
        assert_eq!(scheduler.run_pending(), 0);
        assert_eq!(scheduler.pending(), 0);
    }
}
