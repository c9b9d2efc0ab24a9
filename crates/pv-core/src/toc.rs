//! Table of contents derived from slide transitions

use ahash::AHashMap;
use std::time::Duration;
use tracing::debug;

use crate::log::EventLog;
use crate::record::{DeckId, DeckType, SharedRecord, SlideKey, SlideState};
use crate::time::MediaTime;

/// Registered slide titles, keyed by deck and zero-based slide index
#[derive(Debug, Clone, Default)]
pub struct SlideTitles {
    titles: AHashMap<(DeckId, u32), String>,
}

impl SlideTitles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a title. A later title for the same slide replaces the
    /// earlier one.
    pub fn insert(&mut self, deck: DeckId, slide: u32, text: impl Into<String>) {
        self.titles.insert((deck, slide), text.into());
    }

    pub fn get(&self, deck: DeckId, slide: u32) -> Option<&str> {
        self.titles.get(&(deck, slide)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

/// One navigable chapter point
#[derive(Debug, Clone)]
pub struct TocEntry {
    time: MediaTime,
    text: String,
    record: SharedRecord,
}

impl TocEntry {
    pub fn time(&self) -> MediaTime {
        self.time
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The slide-state update that opened this chapter
    pub fn record(&self) -> &SharedRecord {
        &self.record
    }

    pub fn key(&self) -> SlideKey {
        self.record.key()
    }
}

/// Ordered chapter list, strictly increasing in time with the first entry
/// at zero
#[derive(Debug, Clone)]
pub struct TableOfContents {
    entries: Vec<TocEntry>,
}

struct Candidate {
    time: MediaTime,
    record: SharedRecord,
}

impl Candidate {
    fn key(&self) -> SlideKey {
        self.record.key()
    }
}

impl TableOfContents {
    /// Build the TOC from every slide-state update in the log. Returns
    /// `None` when the log holds no slide-state updates.
    pub fn build(log: &EventLog, titles: &SlideTitles, min_dwell: Duration) -> Option<Self> {
        // pass 1: one candidate per change of (deck, slide)
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut last_key: Option<SlideKey> = None;
        for record in log.iter().filter(|r| r.slide_state().is_some()) {
            let key = record.key();
            if last_key != Some(key) {
                last_key = Some(key);
                candidates.push(Candidate {
                    time: record.timestamp(),
                    record: record.clone(),
                });
            }
        }

        if candidates.is_empty() {
            return None;
        }

        // pass 2: drop short-lived transitions, keeping the first and last
        let min_dwell = min_dwell.as_micros() as i64;
        let count = candidates.len();
        let times: Vec<MediaTime> = candidates.iter().map(|c| c.time).collect();
        let lasting: Vec<Candidate> = candidates
            .into_iter()
            .enumerate()
            .filter(|(i, _)| *i == 0 || *i == count - 1 || times[i + 1] - times[*i] >= min_dwell)
            .map(|(_, c)| c)
            .collect();

        // pass 3: collapse repeats of the same slide and keep times strictly
        // increasing; a later entry at the same time supersedes the earlier one
        let mut kept: Vec<Candidate> = Vec::with_capacity(lasting.len());
        for (i, mut candidate) in lasting.into_iter().enumerate() {
            if i == 0 {
                candidate.time = MediaTime::ZERO;
                kept.push(candidate);
                continue;
            }
            let Some(prev) = kept.last() else {
                kept.push(candidate);
                continue;
            };
            if prev.key() == candidate.key() {
                continue;
            }
            if candidate.time <= prev.time {
                candidate.time = prev.time;
                kept.pop();
                if kept.last().map(|c| c.key()) == Some(candidate.key()) {
                    continue;
                }
            }
            kept.push(candidate);
        }

        // deck ordinals in first-seen order
        let mut ordinals: AHashMap<DeckId, usize> = AHashMap::new();
        for candidate in &kept {
            let next = ordinals.len() + 1;
            ordinals.entry(candidate.record.deck()).or_insert(next);
        }
        let multi_deck = ordinals.len() > 1;

        let entries: Vec<TocEntry> = kept
            .into_iter()
            .map(|c| {
                let ordinal = ordinals.get(&c.record.deck()).copied().unwrap_or(1);
                let text = entry_text(&c, titles, multi_deck.then_some(ordinal));
                TocEntry {
                    time: c.time,
                    text,
                    record: c.record,
                }
            })
            .collect();

        debug!("Built table of contents with {} entries", entries.len());
        Some(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    /// Index of the last entry at or before `t`
    pub fn index_at(&self, t: MediaTime) -> usize {
        self.entries.partition_point(|e| e.time <= t).saturating_sub(1)
    }

    /// Entry by index; out of range yields `None`
    pub fn entry(&self, index: usize) -> Option<&TocEntry> {
        self.entries.get(index)
    }
}

fn entry_text(candidate: &Candidate, titles: &SlideTitles, deck_ordinal: Option<usize>) -> String {
    let record = &candidate.record;
    let slide = record.scope().slide().unwrap_or(0);
    let number = match deck_ordinal {
        Some(ordinal) => format!("{}.{}", ordinal, slide + 1),
        None => (slide + 1).to_string(),
    };
    let label = record
        .slide_state()
        .map(|state| label_for(state, record.deck(), slide, titles))
        .unwrap_or_default();
    format!("{} - {}. {}", candidate.time, number, label)
}

fn label_for(state: &SlideState, deck: DeckId, slide: u32, titles: &SlideTitles) -> String {
    match state.deck_type {
        DeckType::Presentation => titles.get(deck, slide).unwrap_or_default().to_string(),
        DeckType::Whiteboard => "Whiteboard".to_string(),
        DeckType::StudentSubmission => "Student Submission".to_string(),
        DeckType::QuickPoll => "QuickPoll".to_string(),
        DeckType::Undefined => String::new(),
    }
}
