//! Reductions applied to a candidate replay list
//!
//! Both filters keep the relative order of surviving records.

use ahash::AHashSet;
use uuid::Uuid;

use crate::record::{DeckId, EventKind, SharedRecord, SlideKey};

/// Drop ink that a later record makes invisible.
///
/// Walking the list from the end:
/// - after a deck-wide clear, earlier strokes, stroke deletes, slide clears
///   and deck clears of that deck are dropped (scrolls and annotations stay)
/// - after a slide clear, earlier strokes, stroke deletes and slide clears of
///   that slide are dropped
/// - a stroke or annotation whose id is deleted later is dropped, while the
///   delete itself stays
///
/// The clearing record that triggers a drop is always kept.
pub fn filter_deleted_strokes(records: &[SharedRecord]) -> Vec<SharedRecord> {
    let mut cleared_decks: AHashSet<DeckId> = AHashSet::new();
    let mut cleared_slides: AHashSet<SlideKey> = AHashSet::new();
    let mut deleted_strokes: AHashSet<Uuid> = AHashSet::new();
    let mut deleted_annotations: AHashSet<Uuid> = AHashSet::new();

    let mut kept: Vec<SharedRecord> = Vec::with_capacity(records.len());
    for record in records.iter().rev() {
        let deck_cleared = cleared_decks.contains(&record.deck());
        let slide_cleared = cleared_slides.contains(&record.key());

        let keep = match record.kind() {
            EventKind::ClearDeck => {
                let first = !deck_cleared;
                cleared_decks.insert(record.deck());
                first
            }
            EventKind::ClearSlide => {
                let first = !deck_cleared && !slide_cleared;
                cleared_slides.insert(record.key());
                first
            }
            EventKind::StrokeDelete { stroke_id } => {
                deleted_strokes.insert(*stroke_id);
                !deck_cleared && !slide_cleared
            }
            EventKind::StrokeDraw(stroke) => {
                !deck_cleared && !slide_cleared && !deleted_strokes.contains(&stroke.stroke_id)
            }
            EventKind::TextAnnotationDelete { annotation_id }
            | EventKind::AnnotationDelete { annotation_id } => {
                deleted_annotations.insert(*annotation_id);
                true
            }
            EventKind::TextAnnotationAdd(annotation) => {
                !deleted_annotations.contains(&annotation.annotation_id)
            }
            EventKind::ImageAnnotationAdd(annotation) => {
                !deleted_annotations.contains(&annotation.annotation_id)
            }
            EventKind::ScrollUpdate(_)
            | EventKind::SlideStateUpdate(_)
            | EventKind::SlideIndex
            | EventKind::ScreenConfig(_)
            | EventKind::QuickPollUpdate(_) => true,
        };

        if keep {
            kept.push(record.clone());
        }
    }

    kept.reverse();
    kept
}

/// Drop every stroke record that was captured while the pen was still down
pub fn filter_non_terminal_strokes(records: Vec<SharedRecord>) -> Vec<SharedRecord> {
    records
        .into_iter()
        .filter(|r| !matches!(r.kind(), EventKind::StrokeDraw(stroke) if !stroke.finished))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{EventRecord, ScrollUpdate, StrokeDraw, TextAnnotation};
    use crate::time::MediaTime;
    use std::sync::Arc;

    fn at(secs: i64, deck: DeckId, slide: u32, kind: EventKind) -> SharedRecord {
        Arc::new(EventRecord::on_slide(MediaTime::from_millis(secs * 1_000), deck, slide, kind))
    }

    fn stroke(id: Uuid, finished: bool) -> EventKind {
        EventKind::StrokeDraw(StrokeDraw {
            stroke_id: id,
            finished,
            points: vec![[0.0, 0.0], [1.0, 1.0]],
            color: [0, 0, 0, 255],
            width: 2.0,
        })
    }

    fn names(records: &[SharedRecord]) -> Vec<&'static str> {
        records.iter().map(|r| r.kind().name()).collect()
    }

    #[test]
    fn test_slide_clear_hides_earlier_ink() {
        let deck = DeckId(Uuid::new_v4());
        let records = vec![
            at(1, deck, 0, stroke(Uuid::new_v4(), true)),
            at(2, deck, 1, stroke(Uuid::new_v4(), true)),
            at(3, deck, 0, EventKind::ClearSlide),
            at(4, deck, 0, stroke(Uuid::new_v4(), true)),
        ];

        let filtered = filter_deleted_strokes(&records);
        let times: Vec<i64> = filtered.iter().map(|r| r.timestamp().as_micros() / 1_000_000).collect();
        assert_eq!(times, vec![2, 3, 4]);
    }

    #[test]
    fn test_deck_clear_keeps_scrolls_and_latest_clear() {
        let deck = DeckId(Uuid::new_v4());
        let other = DeckId(Uuid::new_v4());
        let records = vec![
            at(1, deck, 0, stroke(Uuid::new_v4(), true)),
            at(2, deck, 0, EventKind::ClearSlide),
            at(3, deck, 0, EventKind::ScrollUpdate(ScrollUpdate { position: 0.5, extent: 2.0 })),
            at(4, deck, 0, EventKind::ClearDeck),
            at(5, other, 0, stroke(Uuid::new_v4(), true)),
            at(6, deck, 3, EventKind::ClearDeck),
        ];

        let filtered = filter_deleted_strokes(&records);
        assert_eq!(names(&filtered), vec!["scroll_update", "stroke_draw", "clear_deck"]);
        assert_eq!(filtered[1].deck(), other);
    }

    #[test]
    fn test_deleted_ids_pruned() {
        let deck = DeckId::NONE;
        let gone = Uuid::new_v4();
        let stays = Uuid::new_v4();
        let note = Uuid::new_v4();
        let records = vec![
            at(1, deck, 0, stroke(gone, true)),
            at(2, deck, 0, stroke(stays, true)),
            at(
                3,
                deck,
                0,
                EventKind::TextAnnotationAdd(TextAnnotation {
                    annotation_id: note,
                    origin: [10, 10],
                    text: "hello".into(),
                    color: [0, 0, 0, 255],
                    font: None,
                    width: 100,
                    height: 20,
                }),
            ),
            at(4, deck, 0, EventKind::StrokeDelete { stroke_id: gone }),
            at(5, deck, 0, EventKind::TextAnnotationDelete { annotation_id: note }),
        ];

        let filtered = filter_deleted_strokes(&records);
        assert_eq!(names(&filtered), vec!["stroke_draw", "stroke_delete", "text_annotation_delete"]);
        assert!(matches!(filtered[0].kind(), EventKind::StrokeDraw(s) if s.stroke_id == stays));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let a = DeckId(Uuid::new_v4());
        let b = DeckId(Uuid::new_v4());
        let id = Uuid::new_v4();
        let records = vec![
            at(1, a, 0, stroke(id, true)),
            at(2, a, 1, EventKind::ClearSlide),
            at(3, b, 0, stroke(Uuid::new_v4(), true)),
            at(4, a, 1, EventKind::ClearSlide),
            at(5, a, 0, EventKind::StrokeDelete { stroke_id: id }),
            at(6, b, 0, EventKind::ClearDeck),
            at(7, a, 1, stroke(Uuid::new_v4(), true)),
            at(8, b, 2, EventKind::ClearSlide),
        ];

        let once = filter_deleted_strokes(&records);
        let twice = filter_deleted_strokes(&once);
        assert_eq!(once, twice);
        assert!(once.len() < records.len());
    }

    #[test]
    fn test_non_terminal_strokes_removed() {
        let id = Uuid::new_v4();
        let records = vec![
            at(1, DeckId::NONE, 0, stroke(id, false)),
            at(2, DeckId::NONE, 0, stroke(id, false)),
            at(3, DeckId::NONE, 0, stroke(id, true)),
            at(4, DeckId::NONE, 0, EventKind::ClearSlide),
        ];

        let filtered = filter_non_terminal_strokes(records);
        assert_eq!(filtered.len(), 2);
        assert!(filtered
            .iter()
            .all(|r| !matches!(r.kind(), EventKind::StrokeDraw(s) if !s.finished)));
    }
}
