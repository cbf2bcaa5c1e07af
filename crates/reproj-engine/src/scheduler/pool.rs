use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};

use super::{Job, Scheduler};

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Thread name prefix; workers are named `"{name} {index}"`.
    pub name: String,
    pub workers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "mesh calculator".to_string(),
            workers: 2,
        }
    }
}

/// Jobs submitted but not yet finished or skipped.
#[derive(Debug, Default)]
struct Outstanding {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Outstanding {
    fn add(&self) {
        *self.count.lock() += 1;
    }

    fn done(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    fn wait_idle(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.idle.wait(&mut count);
        }
    }
}

/// Fixed-size pool of named worker threads fed by a channel.
#[derive(Debug)]
pub struct JobPool {
    name: String,
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
    stopping: Arc<AtomicBool>,
    outstanding: Arc<Outstanding>,
}

impl JobPool {
    /// Spawns the workers. Fails only if the OS refuses a thread.
    pub fn new(config: PoolConfig) -> std::io::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded::<Job>();
        let stopping = Arc::new(AtomicBool::new(false));
        let outstanding = Arc::new(Outstanding::default());

        let mut workers = Vec::with_capacity(config.workers.max(1));
        for index in 0..config.workers.max(1) {
            let rx = rx.clone();
            let stopping = Arc::clone(&stopping);
            let outstanding = Arc::clone(&outstanding);
            let handle = thread::Builder::new()
                .name(format!("{} {}", config.name, index))
                .spawn(move || worker_loop(rx, stopping, outstanding))?;
            workers.push(handle);
        }
        log::debug!("{} pool started with {} workers", config.name, workers.len());

        Ok(Self {
            name: config.name,
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            stopping,
            outstanding,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Blocks until every submitted job has finished or been skipped.
    pub fn join(&self) {
        self.outstanding.wait_idle();
    }

    /// Drops queued work and joins the workers. Later schedules are ignored.
    pub fn shutdown(&self) {
        self.stopping.store(true, Ordering::Release);
        // Disconnecting the channel ends each worker loop.
        drop(self.sender.lock().take());

        let workers = std::mem::take(&mut *self.workers.lock());
        if workers.is_empty() {
            return;
        }
        for worker in workers {
            if worker.join().is_err() {
                log::error!("{} worker exited abnormally", self.name);
            }
        }
        log::debug!("{} pool shut down", self.name);
    }
}

impl Scheduler for JobPool {
    fn schedule(&self, job: Job) {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            log::warn!("{} pool is shut down; dropping job '{}'", self.name, job.name());
            return;
        };
        self.outstanding.add();
        if let Err(e) = sender.send(job) {
            log::warn!("{} pool dropped job '{}'", self.name, e.0.name());
            self.outstanding.done();
        }
    }
}

impl Drop for JobPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(rx: Receiver<Job>, stopping: Arc<AtomicBool>, outstanding: Arc<Outstanding>) {
    for job in rx.iter() {
        if stopping.load(Ordering::Acquire) {
            log::debug!("dropping queued job '{}' at shutdown", job.name());
        } else {
            let name = job.name().to_string();
            if panic::catch_unwind(AssertUnwindSafe(|| job.run())).is_err() {
                log::error!("job '{name}' panicked");
            }
        }
        outstanding.done();
    }
}
