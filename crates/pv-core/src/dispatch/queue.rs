//! Ordered delivery of records to the display sink

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::display::DisplaySink;
use crate::error::{EngineError, Result};
use crate::record::SharedRecord;

#[derive(Default)]
struct QueueState {
    pending: VecDeque<SharedRecord>,
    held: bool,
    busy: bool,
    shutdown: bool,
}

struct QueueShared {
    state: Mutex<QueueState>,
    /// Signalled on enqueue, release and shutdown
    wake: Condvar,
    /// Signalled whenever the consumer finishes an item or finds nothing to do
    idle: Condvar,
    /// Serialises every call into the sink
    gate: Mutex<()>,
    sink: Arc<dyn DisplaySink>,
    wait_timeout: Duration,
}

impl QueueShared {
    fn apply(&self, record: &SharedRecord) {
        let _gate = self.gate.lock();
        if let Err(e) = self.sink.apply(record) {
            warn!("Failed to apply {}: {:#}", record, e);
        }
    }
}

/// Single-consumer queue in front of the display sink.
///
/// Live-tick records are enqueued and drained in FIFO order by a dedicated
/// consumer thread. While the queue is held, arrivals still enqueue but
/// nothing is drained. Replay records bypass the pending list through
/// [`ReplayQueue::dispatch`], which shares the same gate so that the sink
/// never sees two calls at once.
pub struct ReplayQueue {
    shared: Arc<QueueShared>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl ReplayQueue {
    /// Start the consumer thread
    pub fn start(sink: Arc<dyn DisplaySink>, wait_timeout: Duration) -> Result<Self> {
        let shared = Arc::new(QueueShared {
            state: Mutex::new(QueueState::default()),
            wake: Condvar::new(),
            idle: Condvar::new(),
            gate: Mutex::new(()),
            sink,
            wait_timeout,
        });

        let consumer = std::thread::Builder::new()
            .name("replay-queue".into())
            .spawn({
                let shared = shared.clone();
                move || consume(shared)
            })
            .map_err(|source| EngineError::ThreadSpawn {
                name: "replay-queue",
                source,
            })?;

        Ok(Self {
            shared,
            consumer: Mutex::new(Some(consumer)),
        })
    }

    /// Stop draining; new arrivals still enqueue
    pub fn hold(&self) {
        self.shared.state.lock().held = true;
    }

    /// Resume draining and wake the consumer
    pub fn release(&self) {
        self.shared.state.lock().held = false;
        self.shared.wake.notify_all();
    }

    pub fn is_held(&self) -> bool {
        self.shared.state.lock().held
    }

    pub fn enqueue(&self, record: SharedRecord) {
        let mut state = self.shared.state.lock();
        if state.shutdown {
            return;
        }
        state.pending.push_back(record);
        if !state.held {
            self.shared.wake.notify_one();
        }
    }

    /// Discard everything not yet dispatched. Returns the number dropped.
    pub fn clear(&self) -> usize {
        let mut state = self.shared.state.lock();
        let dropped = state.pending.len();
        state.pending.clear();
        self.shared.idle.notify_all();
        if dropped > 0 {
            debug!("Cleared {} pending records", dropped);
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take everything not yet dispatched, oldest first
    pub fn drain_pending(&self) -> Vec<SharedRecord> {
        let mut state = self.shared.state.lock();
        let drained: Vec<SharedRecord> = state.pending.drain(..).collect();
        self.shared.idle.notify_all();
        drained
    }

    /// Apply one record immediately on the calling thread, bypassing the
    /// pending list and the hold flag
    pub fn dispatch(&self, record: &SharedRecord) {
        self.shared.apply(record);
    }

    /// Run `f` against the sink while no record is being applied
    pub fn exclusive<R>(&self, f: impl FnOnce(&dyn DisplaySink) -> R) -> R {
        let _gate = self.shared.gate.lock();
        f(self.shared.sink.as_ref())
    }

    /// Block until nothing is pending and the consumer is not mid-item.
    /// A held queue with pending records never becomes idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while state.busy || !state.pending.is_empty() {
            if self.shared.idle.wait_until(&mut state, deadline).timed_out() {
                return !state.busy && state.pending.is_empty();
            }
        }
        true
    }

    /// Stop the consumer thread. Pending records are discarded.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            state.pending.clear();
        }
        self.shared.wake.notify_all();
        if let Some(handle) = self.consumer.lock().take() {
            if handle.join().is_err() {
                warn!("Replay queue consumer panicked");
            }
        }
    }
}

impl Drop for ReplayQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn consume(shared: Arc<QueueShared>) {
    debug!("Replay queue consumer started");
    loop {
        let record = {
            let mut state = shared.state.lock();
            loop {
                if state.shutdown {
                    debug!("Replay queue consumer stopped");
                    return;
                }
                if !state.held {
                    if let Some(record) = state.pending.pop_front() {
                        state.busy = true;
                        break record;
                    }
                }
                shared.idle.notify_all();
                // bounded so a lost wakeup only delays draining
                shared.wake.wait_for(&mut state, shared.wait_timeout);
            }
        };

        shared.apply(&record);

        shared.state.lock().busy = false;
        shared.idle.notify_all();
    }
}
