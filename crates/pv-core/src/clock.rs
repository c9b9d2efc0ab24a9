//! Live tick driver
//!
//! While media plays, [`EventClock`] polls the player and pushes every
//! record passed since the previous tick into the replay queue. The sleep
//! between ticks tracks the next scheduled record so that updates land close
//! to their timestamps.

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::dispatch::ReplayQueue;
use crate::error::{EngineError, Result};
use crate::events::{Notification, Notifier};
use crate::record::SlideKey;
use crate::time::MediaTime;
use crate::timeline::{SharedTimeline, TimelineEngine};

/// Player state as reported by the media layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Playing,
    Paused,
    Stopped,
    /// Buffering, scanning and similar transient states
    Other,
}

/// Read access to the media player driving the timeline
pub trait MediaClock: Send + Sync {
    fn position(&self) -> MediaTime;
    fn state(&self) -> PlayState;
}

#[derive(Debug, Default)]
pub struct CursorState {
    /// Position up to which records have been raised
    pub last_pos: MediaTime,
    /// Slide of the last TOC change announced
    pub last_toc_key: Option<SlideKey>,
}

/// Position shared between the clock and jumps.
///
/// A jump raises the interrupt flag before taking the lock so that a clock
/// batch in progress gives the lock up at its next record.
#[derive(Debug, Default)]
pub struct PlaybackCursor {
    state: Mutex<CursorState>,
    interrupt: AtomicBool,
}

impl PlaybackCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> MediaTime {
        self.state.lock().last_pos
    }

    /// Take the cursor away from the clock
    pub fn seize(&self) -> MutexGuard<'_, CursorState> {
        self.interrupt.store(true, Ordering::SeqCst);
        let guard = self.state.lock();
        self.interrupt.store(false, Ordering::SeqCst);
        guard
    }

    fn lock(&self) -> MutexGuard<'_, CursorState> {
        self.state.lock()
    }

    fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }
}

struct ClockWorker {
    timeline: SharedTimeline,
    cursor: Arc<PlaybackCursor>,
    queue: Arc<ReplayQueue>,
    notifier: Notifier,
    max_poll: Duration,
    idle_poll: Duration,
    min_poll: Duration,
}

impl ClockWorker {
    /// Run one tick and return how long to sleep before the next
    fn tick(&self, media: &dyn MediaClock) -> Duration {
        let Some(timeline) = self.timeline.read().clone() else {
            return self.idle_poll;
        };

        let state = media.state();
        if state == PlayState::Stopped {
            return self.idle_poll;
        }

        let position = media.position();
        self.raise_events(&timeline, position);

        if state == PlayState::Playing {
            self.time_to_next(&timeline, position)
        } else {
            self.idle_poll
        }
    }

    /// Queue every record in `(last_pos, current]` and advance the cursor.
    /// Returns the number of records raised.
    fn raise_events(&self, timeline: &TimelineEngine, current: MediaTime) -> usize {
        let mut cursor = self.cursor.lock();
        if current <= cursor.last_pos {
            return 0;
        }

        let log = timeline.log();
        let start = log.upper_bound(cursor.last_pos);
        let mut raised = 0;

        for record in log.records()[start..].iter().take_while(|r| r.timestamp() <= current) {
            if self.cursor.interrupted() {
                debug!("Clock batch interrupted after {} records", raised);
                return raised;
            }

            self.queue.enqueue(record.clone());
            cursor.last_pos = record.timestamp();
            raised += 1;

            if record.slide_state().is_some() && cursor.last_toc_key != Some(record.key()) {
                cursor.last_toc_key = Some(record.key());
                if let Some(index) = timeline.toc_index(record.timestamp()) {
                    self.notifier.send(Notification::TocEntryChanged(index));
                }
            }
        }

        cursor.last_pos = current;
        if raised > 0 {
            debug!("Raised {} records up to {}", raised, current);
        }
        raised
    }

    fn time_to_next(&self, timeline: &TimelineEngine, position: MediaTime) -> Duration {
        let log = timeline.log();
        let next = log.get(log.upper_bound(position)).map(|r| r.timestamp());
        next.and_then(|t| position.until(t))
            .unwrap_or(self.max_poll)
            .clamp(self.min_poll, self.max_poll)
    }
}

/// Handle to the running clock thread
pub struct EventClock {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl EventClock {
    pub fn start(
        media: Arc<dyn MediaClock>,
        timeline: SharedTimeline,
        cursor: Arc<PlaybackCursor>,
        queue: Arc<ReplayQueue>,
        notifier: Notifier,
        config: &EngineConfig,
    ) -> Result<Self> {
        let worker = ClockWorker {
            timeline,
            cursor,
            queue,
            notifier,
            max_poll: config.clock_max_poll(),
            idle_poll: config.clock_idle_poll(),
            min_poll: config.clock_min_poll(),
        };
        let (stop, stopped) = channel::bounded::<()>(1);

        let handle = std::thread::Builder::new()
            .name("event-clock".into())
            .spawn(move || {
                debug!("Event clock started");
                loop {
                    let sleep = worker.tick(media.as_ref());
                    match stopped.recv_timeout(sleep) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("Event clock stopped");
            })
            .map_err(|source| EngineError::ThreadSpawn {
                name: "event-clock",
                source,
            })?;

        Ok(Self { stop, handle })
    }

    /// Stop the clock and wait for its thread to exit
    pub fn stop(self) {
        let _ = self.stop.try_send(());
        if self.handle.join().is_err() {
            warn!("Event clock thread panicked");
        }
    }
}
