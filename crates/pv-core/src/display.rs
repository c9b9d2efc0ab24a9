//! Seam to the display layer

use crate::record::EventRecord;
use crate::screen::ScreenConfiguration;
use crate::timeline::ActiveSlide;

/// Receiver of every state change the engine wants shown.
///
/// Calls arrive from the live queue's consumer, the replay executor and
/// jumping threads, but never two at once.
pub trait DisplaySink: Send + Sync {
    /// Apply one record to the visible state
    fn apply(&self, record: &EventRecord) -> anyhow::Result<()>;

    /// Show the slide and layout that are active after a jump
    fn show_slide(&self, _slide: &ActiveSlide, _screen: &ScreenConfiguration) {}

    /// Drop all ink and annotations before a backward rebuild
    fn clear_annotations(&self) {}
}
