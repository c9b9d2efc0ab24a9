//! Display sink that logs every call

use pv_core::{ActiveSlide, DisplaySink, EventKind, EventRecord, ScreenConfiguration};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

#[derive(Debug, Default)]
pub struct ConsoleSink {
    applied: AtomicUsize,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records applied so far
    pub fn applied(&self) -> usize {
        self.applied.load(Ordering::Relaxed)
    }
}

impl DisplaySink for ConsoleSink {
    fn apply(&self, record: &EventRecord) -> anyhow::Result<()> {
        self.applied.fetch_add(1, Ordering::Relaxed);
        match record.kind() {
            EventKind::StrokeDraw(stroke) => info!(
                "apply {} ({} points{})",
                record,
                stroke.points.len(),
                if stroke.finished { "" } else { ", in progress" }
            ),
            EventKind::TextAnnotationAdd(note) => info!("apply {} \"{}\"", record, note.text),
            _ => info!("apply {}", record),
        }
        Ok(())
    }

    fn show_slide(&self, slide: &ActiveSlide, screen: &ScreenConfiguration) {
        match slide {
            ActiveSlide::Unknown => info!("show: no slide"),
            ActiveSlide::Legacy(index) => info!("show: slide {} (aspect {:.2})", index, screen.aspect_ratio),
            ActiveSlide::State(record) => {
                let url = record
                    .slide_state()
                    .zip(record.scope().slide())
                    .and_then(|(state, index)| state.image_url(index))
                    .unwrap_or_default();
                info!("show: {} {} (aspect {:.2})", record.key(), url, screen.aspect_ratio);
            }
        }
    }

    fn clear_annotations(&self) {
        info!("clear annotations");
    }
}
