//! Timestamped presentation updates
//!
//! An [`EventRecord`] is built once while a log is loaded and never mutated
//! afterwards. Records are shared as [`SharedRecord`] between the log, replay
//! sets and the live dispatch queue.

mod payload;

pub use payload::{
    DeckType, EventKind, ImageAnnotation, QuickPoll, QuickPollStyle, ScrollUpdate,
    SlideAssociation, SlideState, StrokeDraw, TextAnnotation,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::time::MediaTime;

/// Identifier of a logical deck. The nil id stands for legacy single-deck
/// recordings that carry no deck at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeckId(pub Uuid);

impl DeckId {
    pub const NONE: DeckId = DeckId(Uuid::nil());

    pub fn is_none(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for DeckId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Which slides of a deck a record applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlideScope {
    AllSlides,
    Slide(u32),
}

impl SlideScope {
    pub fn slide(&self) -> Option<u32> {
        match self {
            SlideScope::AllSlides => None,
            SlideScope::Slide(n) => Some(*n),
        }
    }
}

/// A (deck, slide) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlideKey {
    pub deck: DeckId,
    pub scope: SlideScope,
}

impl SlideKey {
    pub fn new(deck: DeckId, slide: u32) -> Self {
        Self {
            deck,
            scope: SlideScope::Slide(slide),
        }
    }
}

impl fmt::Display for SlideKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            SlideScope::AllSlides => write!(f, "{}-*", self.deck),
            SlideScope::Slide(n) => write!(f, "{}-{}", self.deck, n),
        }
    }
}

/// One timestamped update from the presentation log
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    timestamp: MediaTime,
    deck: DeckId,
    scope: SlideScope,
    kind: EventKind,
}

pub type SharedRecord = Arc<EventRecord>;

impl EventRecord {
    /// Create a record. Deck-wide kinds always get [`SlideScope::AllSlides`].
    pub fn new(timestamp: MediaTime, deck: DeckId, scope: SlideScope, kind: EventKind) -> Self {
        let scope = if kind.is_deck_wide() {
            SlideScope::AllSlides
        } else {
            scope
        };
        Self {
            timestamp,
            deck,
            scope,
            kind,
        }
    }

    /// Shorthand for a record bound to one slide
    pub fn on_slide(timestamp: MediaTime, deck: DeckId, slide: u32, kind: EventKind) -> Self {
        Self::new(timestamp, deck, SlideScope::Slide(slide), kind)
    }

    pub fn timestamp(&self) -> MediaTime {
        self.timestamp
    }

    pub fn deck(&self) -> DeckId {
        self.deck
    }

    pub fn scope(&self) -> SlideScope {
        self.scope
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn key(&self) -> SlideKey {
        SlideKey {
            deck: self.deck,
            scope: self.scope,
        }
    }

    pub fn slide_state(&self) -> Option<&SlideState> {
        match &self.kind {
            EventKind::SlideStateUpdate(state) => Some(state),
            _ => None,
        }
    }

    /// True for records that change which slide is shown
    pub fn is_slide_change(&self) -> bool {
        matches!(self.kind, EventKind::SlideStateUpdate(_) | EventKind::SlideIndex)
    }

    /// Replace the slide image location of a slide-state update. Other kinds
    /// are returned untouched. Used only while a log is being finalised.
    pub fn with_image_source(mut self, base_url: Option<&str>, extension: Option<&str>) -> Self {
        if let EventKind::SlideStateUpdate(state) = &mut self.kind {
            if let Some(url) = base_url {
                state.base_url = url.to_string();
            }
            if let Some(ext) = extension {
                state.extension = ext.to_string();
            }
        }
        self
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.timestamp, self.kind.name(), self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deck_wide_kinds_cover_all_slides() {
        let deck = DeckId(Uuid::new_v4());
        let record = EventRecord::on_slide(MediaTime::ZERO, deck, 4, EventKind::ClearDeck);
        assert_eq!(record.scope(), SlideScope::AllSlides);

        let record = EventRecord::on_slide(MediaTime::ZERO, deck, 4, EventKind::ClearSlide);
        assert_eq!(record.scope(), SlideScope::Slide(4));
    }

    #[test]
    fn test_image_source_override() {
        let record = EventRecord::on_slide(
            MediaTime::ZERO,
            DeckId::NONE,
            0,
            EventKind::SlideStateUpdate(SlideState {
                base_url: "http://old/".into(),
                extension: "png".into(),
                ..SlideState::default()
            }),
        );
        let record = record.with_image_source(Some("http://new/"), None);
        let state = record.slide_state().expect("slide state");
        assert_eq!(state.base_url, "http://new/");
        assert_eq!(state.extension, "png");
        assert_eq!(state.image_url(2).as_deref(), Some("http://new/slide3.png"));
    }

    #[test]
    fn test_kind_serde_tagging() {
        let kind = EventKind::StrokeDelete {
            stroke_id: Uuid::nil(),
        };
        let json = serde_json::to_string(&kind).unwrap();
        assert!(json.contains("\"type\":\"stroke_delete\""));
        let back: EventKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, kind);
    }
}
