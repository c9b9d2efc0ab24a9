//! Mapping of (deck, slide) pairs onto one flat slide space

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::record::DeckId;

#[derive(Debug, Clone, Copy)]
struct SlideEntry {
    deck: DeckId,
    flat_index: usize,
}

#[derive(Debug, Default)]
struct SlideMapInner {
    entries: AHashMap<(DeckId, u32), SlideEntry>,
    next_index: usize,
}

/// Assigns every (deck, slide) pair a dense session-local index on first
/// sight. Assignments are never changed or removed.
#[derive(Debug, Default)]
pub struct SlideMap {
    inner: Mutex<SlideMapInner>,
}

impl SlideMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flat index for the pair, assigning the next free one if unseen
    pub fn get_mapping(&self, deck: DeckId, slide: u32) -> usize {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.entries.get(&(deck, slide)) {
            return entry.flat_index;
        }
        let flat_index = inner.next_index;
        inner.next_index += 1;
        inner.entries.insert((deck, slide), SlideEntry { deck, flat_index });
        flat_index
    }

    /// Flat index for the pair if it has been seen
    pub fn lookup(&self, deck: DeckId, slide: u32) -> Option<usize> {
        self.inner.lock().entries.get(&(deck, slide)).map(|e| e.flat_index)
    }

    /// Flat indices of every known slide of a deck, in ascending order.
    /// Linear in the number of mappings.
    pub fn slides_in_deck(&self, deck: DeckId) -> Vec<usize> {
        let inner = self.inner.lock();
        let mut slides: Vec<usize> = inner
            .entries
            .values()
            .filter(|e| e.deck == deck)
            .map(|e| e.flat_index)
            .collect();
        slides.sort_unstable();
        slides
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
