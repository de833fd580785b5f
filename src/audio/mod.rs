// Everything that touches the external renderer process
// The engine never decodes audio itself - it just keeps one renderer alive

pub mod monitor;
pub mod mpv;
pub mod process;
pub mod track;

pub use monitor::{MonitorEvent, PlaybackMonitor};
pub use mpv::Mpv;
pub use process::PlaybackProcess;
pub use track::Track;

use std::io;
use std::sync::Arc;

/// Live view of one spawned renderer process.
///
/// Shared between the [`PlaybackProcess`] that owns it and the
/// [`PlaybackMonitor`] watching it, so every method takes `&self`.
pub trait RenderHandle: Send + Sync {
    fn pid(&self) -> Option<u32>;

    /// `false` once the process has exited for any reason
    fn is_running(&self) -> bool;

    /// Ask the process to exit on its own (SIGTERM on unix)
    fn terminate(&self) -> io::Result<()>;

    fn kill(&self) -> io::Result<()>;
}

/// Something that can turn a track into a running renderer process
pub trait Renderer: Send + Sync {
    /// Must return as soon as the process is launched, never wait on it
    fn spawn(&self, track: &Track, volume: u8) -> io::Result<Arc<dyn RenderHandle>>;
}
