// The player façade and the bookkeeping behind it
// UI/web code only ever talks to PlayerController

pub mod controller;
pub mod events;
pub mod queue;

pub use controller::PlayerController;
pub use events::PlayerEvent;
pub use queue::{QueueAndHistory, Retreat};

use crate::audio::Track;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    /// Paused still counts as playing - there is a current track
    pub fn is_playing(self) -> bool {
        !matches!(self, PlaybackState::Stopped)
    }

    pub fn is_paused(self) -> bool {
        matches!(self, PlaybackState::Paused)
    }
}

/// Copy of the player state taken under the lock
#[derive(Debug, Clone, Serialize)]
pub struct PlayerStatus {
    pub state: PlaybackState,
    pub is_playing: bool,
    pub is_paused: bool,
    pub current_track: Option<Track>,
    pub queue_length: usize,
    pub queue_position: usize, // 1-based, 0 when not playing from the queue
    pub history_length: usize,
    pub volume: u8,
    pub finding_next: bool, // queue ran dry, a recommendation is being looked up
}
