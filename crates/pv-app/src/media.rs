//! Wall-clock stand-in for a media player

use parking_lot::Mutex;
use pv_core::{MediaClock, MediaTime, PlayState};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Playhead {
    start: MediaTime,
    started_at: Option<Instant>,
}

/// Plays from a start position until `end`, then reports stopped
#[derive(Debug)]
pub struct SimulatedMediaClock {
    playhead: Mutex<Playhead>,
    end: MediaTime,
}

impl SimulatedMediaClock {
    pub fn new(start: MediaTime, end: MediaTime) -> Self {
        Self {
            playhead: Mutex::new(Playhead {
                start,
                started_at: None,
            }),
            end,
        }
    }

    pub fn play(&self) {
        let mut playhead = self.playhead.lock();
        if playhead.started_at.is_none() {
            playhead.started_at = Some(Instant::now());
        }
    }

    pub fn pause(&self) {
        let position = self.position();
        let mut playhead = self.playhead.lock();
        playhead.start = position;
        playhead.started_at = None;
    }

    fn elapsed(&self) -> Duration {
        self.playhead
            .lock()
            .started_at
            .map(|at| at.elapsed())
            .unwrap_or_default()
    }
}

impl MediaClock for SimulatedMediaClock {
    fn position(&self) -> MediaTime {
        let start = self.playhead.lock().start;
        let position = start + self.elapsed();
        if position > self.end {
            self.end
        } else {
            position
        }
    }

    fn state(&self) -> PlayState {
        if self.playhead.lock().started_at.is_none() {
            PlayState::Paused
        } else if self.position() >= self.end {
            PlayState::Stopped
        } else {
            PlayState::Playing
        }
    }
}
