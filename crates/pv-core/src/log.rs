//! Time-ordered event log
//!
//! Records are appended by the load thread into an [`EventLogBuilder`], which
//! is finalised once into a frozen [`EventLog`]. The frozen log is shared
//! read-only by every query and by the event clock.

use std::sync::Arc;
use tracing::debug;

use crate::record::{EventRecord, SharedRecord};
use crate::time::MediaTime;

/// Frozen, timestamp-ordered sequence of records
#[derive(Debug, Clone)]
pub struct EventLog {
    records: Arc<[SharedRecord]>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self {
            records: Arc::from(Vec::new()),
        }
    }
}

impl EventLog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SharedRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[SharedRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedRecord> {
        self.records.iter()
    }

    /// Index of the first record with timestamp `>= t`, or `len()` if none
    pub fn binary_search_by_time(&self, t: MediaTime) -> usize {
        self.records.partition_point(|r| r.timestamp() < t)
    }

    /// Index of the first record with timestamp `> t`, or `len()` if none
    pub fn upper_bound(&self, t: MediaTime) -> usize {
        self.records.partition_point(|r| r.timestamp() <= t)
    }

    /// Timestamp of the last record
    pub fn end_time(&self) -> Option<MediaTime> {
        self.records.last().map(|r| r.timestamp())
    }
}

/// Image-location override applied to every slide-state update at
/// finalisation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSourceOverride {
    pub base_url: Option<String>,
    pub extension: Option<String>,
}

impl ImageSourceOverride {
    pub fn is_empty(&self) -> bool {
        self.base_url.is_none() && self.extension.is_none()
    }
}

/// Append-only collection used while a log is loading
#[derive(Debug, Default)]
pub struct EventLogBuilder {
    records: Vec<EventRecord>,
}

impl EventLogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: EventRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Freeze the log: drop records before the script offset, apply the
    /// image override and order by timestamp (ties keep arrival order).
    pub fn finalize(self, image_override: &ImageSourceOverride) -> EventLog {
        let total = self.records.len();
        let mut records: Vec<EventRecord> = self
            .records
            .into_iter()
            .filter(|r| !r.timestamp().is_negative())
            .collect();
        let dropped = total - records.len();

        if !image_override.is_empty() {
            records = records
                .into_iter()
                .map(|r| {
                    r.with_image_source(
                        image_override.base_url.as_deref(),
                        image_override.extension.as_deref(),
                    )
                })
                .collect();
        }

        records.sort_by_key(|r| r.timestamp());

        debug!("Finalized event log: {} records, {} dropped before offset", records.len(), dropped);

        EventLog {
            records: records.into_iter().map(Arc::new).collect(),
        }
    }
}

impl FromIterator<EventRecord> for EventLog {
    fn from_iter<I: IntoIterator<Item = EventRecord>>(iter: I) -> Self {
        let mut builder = EventLogBuilder::new();
        for record in iter {
            builder.push(record);
        }
        builder.finalize(&ImageSourceOverride::default())
    }
}
