//! Timeline queries over a frozen event log
//!
//! [`TimelineEngine`] answers "what is the state at time T" and computes the
//! reduced set of records needed to bring the display from one position to
//! another after a jump.

mod filter;

pub use filter::{filter_deleted_strokes, filter_non_terminal_strokes};

use ahash::AHashSet;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::log::EventLog;
use crate::record::{EventKind, SharedRecord, SlideKey, SlideScope};
use crate::screen::ScreenConfiguration;
use crate::slide_map::SlideMap;
use crate::time::{JumpDirection, MediaTime};
use crate::toc::{TableOfContents, TocEntry};

/// Slide shown at a given position
#[derive(Debug, Clone, PartialEq)]
pub enum ActiveSlide {
    /// No slide record exists anywhere in the log
    Unknown,
    /// Single-deck recording: only the slide index is known
    Legacy(u32),
    /// The slide-state update describing the active slide
    State(SharedRecord),
}

impl ActiveSlide {
    pub fn is_unknown(&self) -> bool {
        matches!(self, ActiveSlide::Unknown)
    }

    pub fn record(&self) -> Option<&SharedRecord> {
        match self {
            ActiveSlide::State(record) => Some(record),
            _ => None,
        }
    }

    /// Zero-based slide index, `None` when unknown
    pub fn slide(&self) -> Option<u32> {
        match self {
            ActiveSlide::Unknown => None,
            ActiveSlide::Legacy(slide) => Some(*slide),
            ActiveSlide::State(record) => record.scope().slide(),
        }
    }
}

/// Result of [`TimelineEngine::compute_replay_set`]
#[derive(Debug, Clone)]
pub struct ReplaySet {
    pub direction: JumpDirection,
    /// Surviving records in timestamp order
    pub records: Vec<SharedRecord>,
}

impl ReplaySet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Slot holding the engine of the currently published presentation, if any
pub type SharedTimeline = Arc<RwLock<Option<Arc<TimelineEngine>>>>;

/// Query engine over one loaded presentation
pub struct TimelineEngine {
    log: EventLog,
    toc: Option<TableOfContents>,
    slides: Arc<SlideMap>,
    look_ahead: Duration,
}

impl TimelineEngine {
    pub fn new(log: EventLog, toc: Option<TableOfContents>, slides: Arc<SlideMap>, look_ahead: Duration) -> Self {
        Self {
            log,
            toc,
            slides,
            look_ahead,
        }
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn toc(&self) -> Option<&TableOfContents> {
        self.toc.as_ref()
    }

    /// Slide active at `t`.
    ///
    /// A slide change strictly after `t` and within the look-ahead window
    /// wins over the last change at or before `t`, since players tend to land
    /// slightly ahead of the scripted change.
    pub fn active_slide(&self, t: MediaTime) -> ActiveSlide {
        let records = self.log.records();
        let start = self.log.upper_bound(t);
        let horizon = t + self.look_ahead;

        let ahead = records[start..]
            .iter()
            .take_while(|r| r.timestamp() <= horizon)
            .find(|r| r.is_slide_change());
        let found = ahead.or_else(|| records[..start].iter().rev().find(|r| r.is_slide_change()));

        match found {
            Some(record) => match record.kind() {
                EventKind::SlideIndex => ActiveSlide::Legacy(record.scope().slide().unwrap_or(0)),
                _ => ActiveSlide::State(record.clone()),
            },
            None => ActiveSlide::Unknown,
        }
    }

    /// Screen layout in effect at `t`. No look-ahead is applied.
    pub fn screen_configuration(&self, t: MediaTime) -> ScreenConfiguration {
        let end = self.log.upper_bound(t);
        for record in self.log.records()[..end].iter().rev() {
            match record.kind() {
                EventKind::ScreenConfig(config) => return *config,
                EventKind::SlideStateUpdate(state) => {
                    return ScreenConfiguration::with_slide_size(state.slide_size)
                }
                _ => {}
            }
        }
        ScreenConfiguration::default()
    }

    /// Records to replay so that the display moves from `from` to `to`.
    ///
    /// Backward jumps rebuild from the start of the log up to `to`; forward
    /// jumps replay `[from, to]`. Navigation records are left out, ink hidden
    /// by later clears or deletes is removed and only finished strokes remain.
    pub fn compute_replay_set(&self, from: MediaTime, to: MediaTime) -> ReplaySet {
        let direction = JumpDirection::of(from, to);
        let start = match direction {
            JumpDirection::Backward => 0,
            JumpDirection::Forward => self.log.binary_search_by_time(from),
        };
        let end = self.log.upper_bound(to);
        let range = &self.log.records()[start..end.max(start)];

        let visit = self.slides_to_visit(to);
        let candidates: Vec<SharedRecord> = range
            .iter()
            .filter(|r| !r.kind().is_navigation())
            .filter(|r| match r.scope() {
                SlideScope::AllSlides => true,
                SlideScope::Slide(slide) => visit.contains(&self.slides.get_mapping(r.deck(), slide)),
            })
            .cloned()
            .collect();

        let candidate_count = candidates.len();
        let records = filter_non_terminal_strokes(filter_deleted_strokes(&candidates));

        debug!(
            "Replay set {} -> {} ({:?}): {} in range, {} candidates, {} kept",
            from,
            to,
            direction,
            range.len(),
            candidate_count,
            records.len()
        );

        ReplaySet { direction, records }
    }

    /// Flat indices of every slide the playback can still show from `to`
    /// onward: each slide referenced at or after `to`, plus the slide active
    /// at `to`.
    pub fn slides_to_visit(&self, to: MediaTime) -> AHashSet<usize> {
        let records = self.log.records();
        let start = self.log.binary_search_by_time(to);
        let mut keys: AHashSet<SlideKey> = AHashSet::new();

        for record in &records[start..] {
            if record.scope() != SlideScope::AllSlides {
                keys.insert(record.key());
            }
        }

        let landing = self.log.upper_bound(to);
        if let Some(current) = records[..landing].iter().rev().find(|r| r.slide_state().is_some()) {
            keys.insert(current.key());
        }

        keys.into_iter()
            .filter_map(|key| key.scope.slide().map(|slide| self.slides.get_mapping(key.deck, slide)))
            .collect()
    }

    /// Index of the TOC entry in effect at `t`
    pub fn toc_index(&self, t: MediaTime) -> Option<usize> {
        self.toc.as_ref().map(|toc| toc.index_at(t))
    }

    pub fn toc_entry(&self, index: usize) -> Option<&TocEntry> {
        self.toc.as_ref().and_then(|toc| toc.entry(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DeckId, DeckType, EventRecord, SlideState, StrokeDraw};
    use crate::toc::SlideTitles;
    use uuid::Uuid;

    const WINDOW: Duration = Duration::from_secs(3);

    fn secs(s: f64) -> MediaTime {
        MediaTime::from_secs_f64(s)
    }

    fn slide_update(t: f64, deck: DeckId, slide: u32) -> EventRecord {
        EventRecord::on_slide(
            secs(t),
            deck,
            slide,
            EventKind::SlideStateUpdate(SlideState {
                deck_type: DeckType::Presentation,
                slide_size: 0.8,
                ..SlideState::default()
            }),
        )
    }

    fn finished_stroke(t: f64, deck: DeckId, slide: u32) -> EventRecord {
        EventRecord::on_slide(
            secs(t),
            deck,
            slide,
            EventKind::StrokeDraw(StrokeDraw {
                stroke_id: Uuid::new_v4(),
                finished: true,
                points: vec![[0.0, 0.0]],
                color: [255, 0, 0, 255],
                width: 1.0,
            }),
        )
    }

    fn engine(records: Vec<EventRecord>) -> TimelineEngine {
        let log: EventLog = records.into_iter().collect();
        let toc = TableOfContents::build(&log, &SlideTitles::new(), WINDOW);
        TimelineEngine::new(log, toc, Arc::new(SlideMap::new()), WINDOW)
    }

    /// SSU A/0 at 0, stroke A/0 at 5, clear A/0 at 10, SSU A/1 at 20
    fn basic(deck: DeckId) -> TimelineEngine {
        engine(vec![
            slide_update(0.0, deck, 0),
            finished_stroke(5.0, deck, 0),
            EventRecord::on_slide(secs(10.0), deck, 0, EventKind::ClearSlide),
            slide_update(20.0, deck, 1),
        ])
    }

    #[test]
    fn test_forward_jump_keeps_only_clear() {
        let deck = DeckId(Uuid::new_v4());
        let engine = basic(deck);

        let set = engine.compute_replay_set(secs(0.0), secs(15.0));
        assert_eq!(set.direction, JumpDirection::Forward);
        assert_eq!(set.len(), 1);
        assert_eq!(set.records[0].kind(), &EventKind::ClearSlide);
    }

    #[test]
    fn test_forward_jump_over_slide_change() {
        let deck = DeckId(Uuid::new_v4());
        let engine = basic(deck);

        let set = engine.compute_replay_set(secs(12.0), secs(25.0));
        assert!(set.is_empty());

        let active = engine.active_slide(secs(25.0));
        let record = active.record().expect("slide state");
        assert_eq!(record.timestamp(), secs(20.0));
        assert_eq!(active.slide(), Some(1));
    }

    #[test]
    fn test_backward_jump() {
        let deck = DeckId(Uuid::new_v4());
        let engine = basic(deck);

        let set = engine.compute_replay_set(secs(20.0), secs(2.0));
        assert_eq!(set.direction, JumpDirection::Backward);
        assert!(set.is_empty());

        // landing at zero is always a rebuild
        let set = engine.compute_replay_set(secs(0.0), secs(0.0));
        assert_eq!(set.direction, JumpDirection::Backward);
    }

    #[test]
    fn test_active_slide_look_ahead() {
        let deck = DeckId(Uuid::new_v4());
        let engine = basic(deck);

        // 18s: the change at 20s is within the window
        assert_eq!(engine.active_slide(secs(18.0)).slide(), Some(1));
        // 16s: outside the window, slide 0 still showing
        assert_eq!(engine.active_slide(secs(16.0)).slide(), Some(0));
    }

    #[test]
    fn test_active_slide_change_at_t_is_behind() {
        let deck = DeckId(Uuid::new_v4());
        let engine = engine(vec![slide_update(10.0, deck, 0), slide_update(11.0, deck, 1)]);

        // the change at exactly t does not hide the next one in the window
        assert_eq!(engine.active_slide(secs(10.0)).slide(), Some(1));
        let at_change = engine.active_slide(secs(11.0));
        assert_eq!(at_change.slide(), Some(1));
        assert_eq!(at_change.record().map(|r| r.timestamp()), Some(secs(11.0)));
        assert_eq!(engine.active_slide(secs(30.0)).slide(), Some(1));
    }

    #[test]
    fn test_active_slide_unknown_and_legacy() {
        let empty = engine(vec![finished_stroke(1.0, DeckId::NONE, 0)]);
        assert!(empty.active_slide(secs(5.0)).is_unknown());

        let legacy = engine(vec![EventRecord::on_slide(
            secs(1.0),
            DeckId::NONE,
            4,
            EventKind::SlideIndex,
        )]);
        assert_eq!(legacy.active_slide(secs(10.0)), ActiveSlide::Legacy(4));
    }

    #[test]
    fn test_screen_configuration_sources() {
        let deck = DeckId(Uuid::new_v4());
        let custom = ScreenConfiguration {
            aspect_ratio: 1.77,
            ..ScreenConfiguration::default()
        };
        let engine = engine(vec![
            slide_update(5.0, deck, 0),
            EventRecord::new(secs(10.0), deck, SlideScope::AllSlides, EventKind::ScreenConfig(custom)),
        ]);

        assert_eq!(engine.screen_configuration(secs(1.0)), ScreenConfiguration::default());
        assert_eq!(engine.screen_configuration(secs(6.0)).slide_size, 0.8);
        assert_eq!(engine.screen_configuration(secs(10.0)), custom);
    }

    #[test]
    fn test_replay_set_excludes_unvisited_slides() {
        let a = DeckId(Uuid::new_v4());
        let engine = engine(vec![
            slide_update(0.0, a, 0),
            finished_stroke(1.0, a, 0),
            slide_update(10.0, a, 1),
            finished_stroke(11.0, a, 1),
            slide_update(20.0, a, 2),
            finished_stroke(21.0, a, 2),
            EventRecord::on_slide(secs(22.0), a, 0, EventKind::ClearDeck),
            slide_update(40.0, a, 1),
        ]);

        let set = engine.compute_replay_set(secs(0.0), secs(25.0));
        let visit = engine.slides_to_visit(secs(25.0));
        for record in &set.records {
            if let SlideScope::Slide(slide) = record.scope() {
                let flat = engine.slides.lookup(record.deck(), slide).expect("mapped");
                assert!(visit.contains(&flat), "{} outside visit set", record);
            }
        }
        // slide 0 is never shown again, so its stroke is irrelevant; the
        // deck-wide clear passes regardless of slide
        let kinds: Vec<&str> = set.records.iter().map(|r| r.kind().name()).collect();
        assert_eq!(kinds, vec!["clear_deck"]);
    }

    #[test]
    fn test_toc_queries() {
        let deck = DeckId(Uuid::new_v4());
        let engine = basic(deck);

        assert_eq!(engine.toc_index(secs(5.0)), Some(0));
        assert_eq!(engine.toc_index(secs(21.0)), Some(1));
        assert!(engine.toc_entry(1).is_some());
        assert!(engine.toc_entry(9).is_none());

        let no_toc = TimelineEngine::new(EventLog::empty(), None, Arc::new(SlideMap::new()), WINDOW);
        assert_eq!(no_toc.toc_index(secs(1.0)), None);
        assert!(no_toc.toc_entry(0).is_none());
    }
}
