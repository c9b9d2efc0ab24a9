//! Notifications from engine threads to the consumer
//!
//! Loader, clock and session threads never call into the consumer directly.
//! They push [`Notification`]s into one bounded channel that the consumer
//! drains on its own thread.

use crossbeam::channel::{self, Receiver, SendTimeoutError, Sender};
use std::time::Duration;
use tracing::{trace, warn};

use crate::timeline::ActiveSlide;

#[derive(Debug, Clone)]
pub enum Notification {
    /// The first slide can be shown; fired once per load
    InitialSlide(ActiveSlide),
    /// Load progress in percent
    LoadProgress(u8),
    /// Loading finished. `loaded` is false when the source failed and the
    /// session runs without preloaded data.
    LoadComplete { loaded: bool, records: usize },
    /// The TOC selection should move to this entry
    TocEntryChanged(usize),
}

/// Sending half of the notification channel
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: Sender<Notification>,
    send_timeout: Duration,
}

impl Notifier {
    /// Create a notifier and the receiver the consumer drains
    pub fn channel(capacity: usize, send_timeout: Duration) -> (Self, Receiver<Notification>) {
        let (sender, receiver) = channel::bounded(capacity);
        (Self { sender, send_timeout }, receiver)
    }

    /// Deliver a notification. Returns false if it was dropped because the
    /// consumer is gone or did not keep up.
    pub fn send(&self, notification: Notification) -> bool {
        trace!("Notify {:?}", notification);
        match self.sender.send_timeout(notification, self.send_timeout) {
            Ok(()) => true,
            Err(SendTimeoutError::Timeout(dropped)) => {
                warn!("Notification channel full, dropping {:?}", dropped);
                false
            }
            Err(SendTimeoutError::Disconnected(_)) => false,
        }
    }
}
