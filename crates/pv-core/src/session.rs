//! Presenter session: the engine as seen by the application
//!
//! A [`PresenterSession`] owns the replay queue, the replay executor, the
//! playback cursor and (while media plays) the event clock. A loaded
//! [`Presentation`] is published into it once; until then every query
//! answers with its "no data" value and jumps report
//! [`JumpOutcome::Unloaded`].

use crossbeam::channel::Receiver;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::{EventClock, MediaClock, PlaybackCursor};
use crate::config::EngineConfig;
use crate::display::DisplaySink;
use crate::dispatch::{ReplayExecutor, ReplayQueue};
use crate::error::Result;
use crate::events::{Notification, Notifier};
use crate::log::EventLog;
use crate::record::{DeckId, SharedRecord, SlideScope};
use crate::screen::ScreenConfiguration;
use crate::slide_map::SlideMap;
use crate::time::{JumpDirection, MediaTime};
use crate::timeline::{ActiveSlide, ReplaySet, SharedTimeline, TimelineEngine};
use crate::toc::{SlideTitles, TableOfContents, TocEntry};

/// Everything a loader hands over to the engine
#[derive(Debug, Clone, Default)]
pub struct Presentation {
    pub log: EventLog,
    pub titles: SlideTitles,
    /// Build a table of contents from slide changes
    pub auto_toc: bool,
}

impl Presentation {
    pub fn new(log: EventLog, titles: SlideTitles) -> Self {
        Self {
            log,
            titles,
            auto_toc: true,
        }
    }
}

/// Result of a jump
#[derive(Debug, Clone)]
pub enum JumpOutcome {
    /// No presentation is published; the caller falls back to its own
    /// navigation
    Unloaded,
    Replayed {
        direction: JumpDirection,
        active_slide: ActiveSlide,
        screen: ScreenConfiguration,
        /// Records submitted for replay
        replayed: usize,
    },
}

pub struct PresenterSession {
    config: EngineConfig,
    timeline: SharedTimeline,
    slides: Arc<SlideMap>,
    cursor: Arc<PlaybackCursor>,
    queue: Arc<ReplayQueue>,
    executor: ReplayExecutor,
    notifier: Notifier,
    clock: Mutex<Option<EventClock>>,
}

impl PresenterSession {
    /// Create a session delivering to `sink`. The receiver carries every
    /// notification the engine raises.
    pub fn new(config: EngineConfig, sink: Arc<dyn DisplaySink>) -> Result<(Self, Receiver<Notification>)> {
        config.validate()?;

        let (notifier, notifications) =
            Notifier::channel(config.notification_capacity, config.notification_send_timeout());
        let queue = Arc::new(ReplayQueue::start(sink, config.queue_wait_timeout())?);
        let executor = ReplayExecutor::start(queue.clone())?;

        let session = Self {
            config,
            timeline: Arc::new(RwLock::new(None)),
            slides: Arc::new(SlideMap::new()),
            cursor: Arc::new(PlaybackCursor::new()),
            queue,
            executor,
            notifier,
            clock: Mutex::new(None),
        };
        Ok((session, notifications))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Sender for notifications raised outside the session, such as load
    /// progress
    pub fn notifier(&self) -> Notifier {
        self.notifier.clone()
    }

    /// Make a loaded presentation the one every query and jump runs
    /// against. Replaces any previous one.
    pub fn publish(&self, presentation: Presentation) -> Arc<TimelineEngine> {
        let Presentation { log, titles, auto_toc } = presentation;

        // assign flat indices in log order
        for record in log.iter() {
            if let SlideScope::Slide(slide) = record.scope() {
                self.slides.get_mapping(record.deck(), slide);
            }
        }

        let toc = if auto_toc {
            TableOfContents::build(&log, &titles, self.config.toc_min_dwell())
        } else {
            None
        };

        info!(
            "Publishing presentation: {} records, {} slides, TOC {}",
            log.len(),
            self.slides.len(),
            toc.as_ref().map_or("absent".to_string(), |t| format!("with {} entries", t.len()))
        );

        let engine = Arc::new(TimelineEngine::new(
            log,
            toc,
            self.slides.clone(),
            self.config.slide_look_ahead(),
        ));

        let mut cursor = self.cursor.seize();
        self.queue.clear();
        *cursor = Default::default();
        *self.timeline.write() = Some(engine.clone());
        engine
    }

    pub fn is_loaded(&self) -> bool {
        self.timeline.read().is_some()
    }

    /// Engine of the published presentation
    pub fn timeline(&self) -> Option<Arc<TimelineEngine>> {
        self.timeline.read().clone()
    }

    /// Move the display from `from` to `to`.
    ///
    /// Backward jumps cancel any running replay, drop pending live records
    /// and clear the display's annotations before the rebuild. Forward jumps
    /// replay any live records still pending ahead of the new ones. The live
    /// queue stays held until the replay has been applied.
    pub fn jump(&self, from: MediaTime, to: MediaTime) -> Result<JumpOutcome> {
        let Some(timeline) = self.timeline() else {
            debug!("Jump {} -> {} without data", from, to);
            return Ok(JumpOutcome::Unloaded);
        };

        let mut cursor = self.cursor.seize();
        let set = timeline.compute_replay_set(from, to);

        let mut records: Vec<SharedRecord> = Vec::new();
        match set.direction {
            JumpDirection::Backward => {
                self.executor.cancel_and_wait(self.config.replay_cancel_timeout());
                self.queue.clear();
                self.queue.exclusive(|sink| sink.clear_annotations());
            }
            JumpDirection::Forward => records.extend(self.queue.drain_pending()),
        }
        let replayed = set.len();
        records.extend(set.records);

        let active_slide = timeline.active_slide(to);
        let screen = timeline.screen_configuration(to);
        self.queue.exclusive(|sink| sink.show_slide(&active_slide, &screen));

        cursor.last_pos = to;
        cursor.last_toc_key = active_slide.record().map(|r| r.key());
        if let Some(index) = timeline.toc_index(to) {
            self.notifier.send(Notification::TocEntryChanged(index));
        }

        self.executor.submit(records)?;
        drop(cursor);

        info!("Jump {} -> {} ({:?}): {} records to replay", from, to, set.direction, replayed);

        Ok(JumpOutcome::Replayed {
            direction: set.direction,
            active_slide,
            screen,
            replayed,
        })
    }

    pub fn active_slide(&self, t: MediaTime) -> ActiveSlide {
        self.timeline()
            .map(|timeline| timeline.active_slide(t))
            .unwrap_or(ActiveSlide::Unknown)
    }

    pub fn screen_configuration(&self, t: MediaTime) -> ScreenConfiguration {
        self.timeline()
            .map(|timeline| timeline.screen_configuration(t))
            .unwrap_or_default()
    }

    pub fn compute_replay_set(&self, from: MediaTime, to: MediaTime) -> Option<ReplaySet> {
        self.timeline().map(|timeline| timeline.compute_replay_set(from, to))
    }

    pub fn toc_index(&self, t: MediaTime) -> Option<usize> {
        self.timeline().and_then(|timeline| timeline.toc_index(t))
    }

    pub fn toc_entry(&self, index: usize) -> Option<TocEntry> {
        self.timeline().and_then(|timeline| timeline.toc_entry(index).cloned())
    }

    pub fn slides_in_deck(&self, deck: DeckId) -> Vec<usize> {
        self.slides.slides_in_deck(deck)
    }

    /// Last position the display has been brought to
    pub fn position(&self) -> MediaTime {
        self.cursor.position()
    }

    /// Start raising live records from `media`. A running clock is stopped
    /// first.
    pub fn start_clock(&self, media: Arc<dyn MediaClock>) -> Result<()> {
        let mut clock = self.clock.lock();
        if let Some(previous) = clock.take() {
            previous.stop();
        }
        *clock = Some(EventClock::start(
            media,
            self.timeline.clone(),
            self.cursor.clone(),
            self.queue.clone(),
            self.notifier.clone(),
            &self.config,
        )?);
        Ok(())
    }

    pub fn stop_clock(&self) {
        if let Some(clock) = self.clock.lock().take() {
            clock.stop();
        }
    }

    /// Block until the live queue has nothing left to apply
    pub fn wait_idle(&self, timeout: std::time::Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while self.executor.pending() > 0 || self.queue.is_held() {
            if std::time::Instant::now() >= deadline {
                warn!("Replay still pending after {:?}", timeout);
                return false;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        self.queue.wait_idle(deadline.saturating_duration_since(std::time::Instant::now()))
    }

    pub fn shutdown(&self) {
        self.stop_clock();
        self.executor.shutdown();
        self.queue.shutdown();
        debug!("Presenter session shut down");
    }
}

impl Drop for PresenterSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
