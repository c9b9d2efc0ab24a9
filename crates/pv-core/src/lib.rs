//! Timeline engine for recorded presentations
//!
//! This crate holds the time-ordered presentation log and everything that
//! runs against it: state queries at a media position, reduced replay sets
//! for jumps, the table of contents, the live event clock and the ordered
//! delivery of records to a display layer.

pub mod clock;
pub mod config;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod events;
pub mod log;
pub mod record;
pub mod screen;
pub mod session;
pub mod slide_map;
pub mod time;
pub mod timeline;
pub mod toc;

// Re-export commonly used types
pub use clock::{MediaClock, PlayState};
pub use config::EngineConfig;
pub use display::DisplaySink;
pub use error::EngineError;
pub use events::{Notification, Notifier};
pub use log::{EventLog, EventLogBuilder, ImageSourceOverride};
pub use record::{DeckId, DeckType, EventKind, EventRecord, SharedRecord, SlideKey, SlideScope};
pub use screen::ScreenConfiguration;
pub use session::{JumpOutcome, Presentation, PresenterSession};
pub use slide_map::SlideMap;
pub use time::{JumpDirection, MediaTime};
pub use timeline::{ActiveSlide, ReplaySet, TimelineEngine};
pub use toc::{SlideTitles, TableOfContents, TocEntry};
