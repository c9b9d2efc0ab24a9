//! Demo mode
//! Builds a short lecture script so the tool runs without a recording

use anyhow::Result;
use pv_core::record::{ScrollUpdate, SlideState, StrokeDraw, TextAnnotation};
use pv_core::{DeckType, EventKind, ScreenConfiguration};
use pv_data::decode::{encode_fragments, encode_packet, WirePacket};
use pv_data::{ScriptItem, ScriptTime, ScriptType};
use uuid::Uuid;

const SLIDE_TITLES: [&str; 4] = ["Welcome", "Binary search", "Worked example", "Summary"];

/// Seconds at which each slide is shown
const SLIDE_TIMES: [f64; 4] = [0.0, 12.0, 30.0, 47.0];

pub fn demo_deck() -> Uuid {
    Uuid::from_u128(0x0de0_5eed_0000_4000_8000_0000_0000_0001)
}

/// Generate the demo script
pub fn demo_script() -> Result<Vec<ScriptItem>> {
    let deck = demo_deck();
    let mut items = vec![
        ScriptItem::Slides {
            base_url: Some("https://slides.example.org/lecture-01/".to_string()),
            extension: Some("png".to_string()),
        },
        ScriptItem::Options {
            no_auto_toc: false,
            preferred_viewer_version: Some("1.2.0".to_string()),
        },
    ];

    for (index, title) in SLIDE_TITLES.iter().enumerate() {
        items.push(ScriptItem::Title {
            deck: deck.to_string(),
            index: index as i64,
            text: title.to_string(),
        });
    }

    let mut timed: Vec<(f64, WirePacket)> = Vec::new();
    timed.push((
        0.0,
        WirePacket {
            deck: None,
            slide: None,
            event: EventKind::ScreenConfig(ScreenConfiguration {
                aspect_ratio: 16.0 / 9.0,
                ..ScreenConfiguration::default()
            }),
        },
    ));

    for (slide, secs) in SLIDE_TIMES.iter().enumerate() {
        let slide = slide as u32;
        timed.push((*secs, packet(deck, slide, slide_state())));

        // a short unfinished stroke followed by its finished version
        let stroke_id = Uuid::new_v4();
        timed.push((secs + 3.0, packet(deck, slide, stroke(stroke_id, false, 6))));
        timed.push((secs + 3.5, packet(deck, slide, stroke(stroke_id, true, 24))));
        timed.push((
            secs + 6.0,
            packet(
                deck,
                slide,
                EventKind::ScrollUpdate(ScrollUpdate {
                    position: 0.25 * slide as f64,
                    extent: 1.0,
                }),
            ),
        ));
    }

    // an erased stroke and a removed note on the worked example
    let erased = Uuid::new_v4();
    timed.push((35.0, packet(deck, 2, stroke(erased, true, 12))));
    timed.push((38.0, packet(deck, 2, EventKind::StrokeDelete { stroke_id: erased })));

    let note = Uuid::new_v4();
    timed.push((
        40.0,
        packet(
            deck,
            2,
            EventKind::TextAnnotationAdd(TextAnnotation {
                annotation_id: note,
                origin: [120, 80],
                text: "mid = (lo + hi) / 2".to_string(),
                color: [0, 0, 0, 255],
                font: None,
                width: 240,
                height: 40,
            }),
        ),
    ));
    timed.push((44.0, packet(deck, 2, EventKind::TextAnnotationDelete { annotation_id: note })));
    timed.push((45.0, packet(deck, 2, EventKind::ClearSlide)));

    timed.sort_by(|a, b| a.0.total_cmp(&b.0));

    for (secs, packet) in timed {
        // long strokes travel in pieces
        let long_stroke = matches!(&packet.event, EventKind::StrokeDraw(s) if s.points.len() > 20);
        if long_stroke {
            let pieces = encode_fragments(&packet, 3)?;
            let last = pieces.len() - 1;
            for (i, command) in pieces.into_iter().enumerate() {
                let script_type = if i == last { ScriptType::Whole } else { ScriptType::Fragment };
                items.push(script_item(script_type, secs, command));
            }
        } else {
            let script_type = if packet.event.is_navigation() {
                ScriptType::Navigation
            } else {
                ScriptType::Whole
            };
            items.push(script_item(script_type, secs, encode_packet(&packet)?));
        }
    }

    Ok(items)
}

fn packet(deck: Uuid, slide: u32, event: EventKind) -> WirePacket {
    WirePacket {
        deck: Some(deck),
        slide: Some(slide),
        event,
    }
}

fn slide_state() -> EventKind {
    EventKind::SlideStateUpdate(SlideState {
        deck_type: DeckType::Presentation,
        ..SlideState::default()
    })
}

fn stroke(stroke_id: Uuid, finished: bool, points: usize) -> EventKind {
    EventKind::StrokeDraw(StrokeDraw {
        stroke_id,
        finished,
        points: (0..points)
            .map(|i| {
                let t = i as f32 / points as f32;
                [100.0 + 400.0 * t, 300.0 - 120.0 * (t * std::f32::consts::PI).sin()]
            })
            .collect(),
        color: [200, 30, 30, 255],
        width: 3.0,
    })
}

fn script_item(script_type: ScriptType, secs: f64, command: String) -> ScriptItem {
    ScriptItem::Script {
        script_type: script_type.code().to_string(),
        time: ScriptTime::Seconds(secs),
        command,
    }
}
