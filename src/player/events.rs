use super::PlaybackState;
use crate::audio::Track;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

// Slow subscribers lag and skip, they never block playback
const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    TrackStarted {
        track: Track,
        generation: u64,
        timestamp: DateTime<Utc>,
    },
    StateChanged {
        state: PlaybackState,
        timestamp: DateTime<Utc>,
    },
    QueueChanged {
        queue_length: usize,
        timestamp: DateTime<Utc>,
    },
    Stopped {
        timestamp: DateTime<Utc>,
    },
}

/// Fan-out of player events to whoever listens (UI, web layer)
pub(crate) struct EventHub {
    tx: broadcast::Sender<PlayerEvent>,
}

impl EventHub {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn track_started(&self, track: &Track, generation: u64) {
        self.emit(PlayerEvent::TrackStarted {
            track: track.clone(),
            generation,
            timestamp: Utc::now(),
        });
    }

    pub(crate) fn state_changed(&self, state: PlaybackState) {
        self.emit(PlayerEvent::StateChanged {
            state,
            timestamp: Utc::now(),
        });
    }

    pub(crate) fn queue_changed(&self, queue_length: usize) {
        self.emit(PlayerEvent::QueueChanged {
            queue_length,
            timestamp: Utc::now(),
        });
    }

    pub(crate) fn stopped(&self) {
        self.emit(PlayerEvent::Stopped { timestamp: Utc::now() });
    }

    fn emit(&self, event: PlayerEvent) {
        // No receivers is fine
        let _ = self.tx.send(event);
    }
}
