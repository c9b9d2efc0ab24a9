//! Serialised execution of replay sets

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::queue::ReplayQueue;
use crate::error::{EngineError, Result};
use crate::record::SharedRecord;

struct ReplayJob {
    generation: u64,
    records: Vec<SharedRecord>,
}

struct ExecutorShared {
    generation: AtomicU64,
    /// Jobs submitted but not yet finished or skipped. Holding and
    /// releasing the live queue happen under this lock.
    pending: Mutex<usize>,
    /// Generation of the job currently applying records
    running: Mutex<Option<u64>>,
    finished: Condvar,
    queue: Arc<ReplayQueue>,
}

/// Runs replay sets one at a time, in submission order, on one worker
/// thread.
///
/// Cancellation is cooperative: [`ReplayExecutor::cancel_and_wait`] bumps
/// the generation, the running job notices before its next record and
/// queued jobs from older generations are skipped. Submitting holds the
/// live queue; when the last pending job completes without being cancelled
/// the queue is released.
pub struct ReplayExecutor {
    shared: Arc<ExecutorShared>,
    jobs: Mutex<Option<Sender<ReplayJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ReplayExecutor {
    pub fn start(queue: Arc<ReplayQueue>) -> Result<Self> {
        let shared = Arc::new(ExecutorShared {
            generation: AtomicU64::new(0),
            pending: Mutex::new(0),
            running: Mutex::new(None),
            finished: Condvar::new(),
            queue,
        });
        let (tx, rx) = channel::unbounded();

        let worker = std::thread::Builder::new()
            .name("replay-executor".into())
            .spawn({
                let shared = shared.clone();
                move || run(shared, rx)
            })
            .map_err(|source| EngineError::ThreadSpawn {
                name: "replay-executor",
                source,
            })?;

        Ok(Self {
            shared,
            jobs: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Hold the live queue and queue a replay set behind any earlier ones
    pub fn submit(&self, records: Vec<SharedRecord>) -> Result<u64> {
        let mut pending = self.shared.pending.lock();
        let jobs = self.jobs.lock();
        let sender = jobs.as_ref().ok_or(EngineError::ShutDown)?;
        let generation = self.shared.generation.load(Ordering::SeqCst);

        self.shared.queue.hold();
        if sender.send(ReplayJob { generation, records }).is_err() {
            if *pending == 0 {
                self.shared.queue.release();
            }
            return Err(EngineError::ShutDown);
        }
        *pending += 1;
        Ok(generation)
    }

    /// Cancel the running job and every queued one, then wait for the
    /// running job to stop. Returns false if it was still running when the
    /// timeout expired; the caller proceeds regardless.
    pub fn cancel_and_wait(&self, timeout: Duration) -> bool {
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let deadline = Instant::now() + timeout;

        let mut running = self.shared.running.lock();
        while running.is_some() {
            if self.shared.finished.wait_until(&mut running, deadline).timed_out() && running.is_some() {
                warn!(
                    "Replay did not stop within {:?}, continuing with generation {}",
                    timeout, generation
                );
                return false;
            }
        }
        true
    }

    /// Jobs submitted but not yet finished or skipped
    pub fn pending(&self) -> usize {
        *self.shared.pending.lock()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.lock().is_some()
    }

    pub fn shutdown(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.jobs.lock().take();
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                warn!("Replay executor panicked");
            }
        }
    }
}

impl Drop for ReplayExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(shared: Arc<ExecutorShared>, jobs: Receiver<ReplayJob>) {
    for job in jobs.iter() {
        let current = shared.generation.load(Ordering::SeqCst);
        if job.generation != current {
            debug!("Skipping stale replay of {} records", job.records.len());
            *shared.pending.lock() -= 1;
            continue;
        }

        *shared.running.lock() = Some(job.generation);

        let mut applied = 0;
        let mut cancelled = false;
        for record in &job.records {
            if shared.generation.load(Ordering::SeqCst) != job.generation {
                cancelled = true;
                break;
            }
            shared.queue.dispatch(record);
            applied += 1;
        }

        debug!(
            "Replay generation {} {}: {}/{} records",
            job.generation,
            if cancelled { "cancelled" } else { "done" },
            applied,
            job.records.len()
        );

        {
            let mut pending = shared.pending.lock();
            *pending -= 1;
            if !cancelled && *pending == 0 {
                shared.queue.release();
            }
        }

        *shared.running.lock() = None;
        shared.finished.notify_all();
    }
    debug!("Replay executor stopped");
}
