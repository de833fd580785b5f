//! Pending queue plus play history
//!
//! The queue is never consumed destructively - a pointer walks over it.
//! History only grows, and never holds the same track twice in a row.

use crate::audio::Track;
use crate::error::QueueExhausted;

/// What `retreat` decided to play
#[derive(Debug, Clone)]
pub enum Retreat {
    /// Previous neighbour in the queue
    Queue(Track),
    /// The entry before the current one in history
    History(Track),
    /// Nothing earlier exists, replay the current track from the start
    Restart(Track),
}

impl Retreat {
    pub fn track(&self) -> &Track {
        match self {
            Retreat::Queue(t) | Retreat::History(t) | Retreat::Restart(t) => t,
        }
    }

    pub fn into_track(self) -> Track {
        match self {
            Retreat::Queue(t) | Retreat::History(t) | Retreat::Restart(t) => t,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueueAndHistory {
    queue: Vec<Track>,
    /// Position of the current track in `queue`, -1 when playing outside it
    queue_index: isize,
    /// Every entry before this index has been played from the queue once
    consumed: usize,
    history: Vec<Track>,
}

impl QueueAndHistory {
    pub fn new() -> Self {
        Self {
            queue: Vec::new(),
            queue_index: -1,
            consumed: 0,
            history: Vec::new(),
        }
    }

    /// Append to the tail. No playback side effect.
    pub fn add(&mut self, track: Track) {
        self.queue.push(track);
    }

    /// Step the pointer forward and hand back the track now under it.
    ///
    /// From outside the queue this resumes at the first entry that was never
    /// played, so an ad hoc play in between doesn't cause replays.
    pub fn advance(&mut self) -> Result<Track, QueueExhausted> {
        let next = if self.queue_index >= 0 {
            self.queue_index as usize + 1
        } else {
            self.consumed
        };

        let track = self.queue.get(next).cloned().ok_or(QueueExhausted)?;
        self.queue_index = next as isize;
        self.consumed = self.consumed.max(next + 1);
        Ok(track)
    }

    /// Queue neighbour, then history, then restart `current`, else `None`
    pub fn retreat(&mut self, current: Option<&Track>) -> Option<Retreat> {
        if self.queue_index > 0 {
            let previous = (self.queue_index - 1) as usize;
            self.queue_index = previous as isize;
            return Some(Retreat::Queue(self.queue[previous].clone()));
        }

        if self.history.len() >= 2 {
            self.queue_index = -1;
            return Some(Retreat::History(self.history[self.history.len() - 2].clone()));
        }

        current.map(|track| Retreat::Restart(track.clone()))
    }

    /// Returns `false` when `track` is already the latest history entry
    pub fn record_played(&mut self, track: &Track) -> bool {
        if self.history.last().map(|last| last.same_as(track)).unwrap_or(false) {
            return false;
        }
        self.history.push(track.clone());
        true
    }

    /// Current playback no longer comes from the queue
    pub fn leave_queue(&mut self) {
        self.queue_index = -1;
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.queue_index = -1;
        self.consumed = 0;
    }

    pub fn queue(&self) -> &[Track] {
        &self.queue
    }

    pub fn history(&self) -> &[Track] {
        &self.history
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn queue_index(&self) -> isize {
        self.queue_index
    }

    /// 1-based position for display, 0 when playing outside the queue
    pub fn queue_position(&self) -> usize {
        if self.queue_index >= 0 {
            self.queue_index as usize + 1
        } else {
            0
        }
    }

    /// Entries after the pointer that haven't been reached yet
    pub fn has_pending(&self) -> bool {
        let next = if self.queue_index >= 0 {
            self.queue_index as usize + 1
        } else {
            self.consumed
        };
        next < self.queue.len()
    }
}

impl Default for QueueAndHistory {
    fn default() -> Self {
        Self::new()
    }
}
