// Ocarina Library - headless music engine for the kiosk
// Search a stream, hand it to one renderer process, keep the music going

pub mod audio;   // renderer process, its monitor, the Track type
pub mod config;  // settings and defaults
pub mod deps;    // are yt-dlp / mpv installed?
pub mod error;   // failure taxonomy
pub mod player;  // queue, history and the controller façade
pub mod search;  // query + recommendation resolvers

// Export the stuff other layers actually use
pub use audio::{Mpv, PlaybackMonitor, PlaybackProcess, RenderHandle, Renderer, Track};
pub use config::Config;
pub use player::{PlaybackState, PlayerController, PlayerEvent, PlayerStatus, QueueAndHistory};
pub use search::{RecommendationResolver, RelatedProvider, SearchProvider, SearchResolver, YtDlp};
