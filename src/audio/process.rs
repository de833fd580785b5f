use super::{RenderHandle, Renderer, Track};
use crate::error::ProcessError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

// How often we re-check liveness while waiting for a graceful exit
const EXIT_POLL: Duration = Duration::from_millis(25);

/// Owns the one renderer process the engine is allowed to have.
///
/// `start` always replaces, `stop` always leaves the slot empty - even when
/// the process had to be killed.
pub struct PlaybackProcess {
    renderer: Arc<dyn Renderer>,
    handle: Option<Arc<dyn RenderHandle>>,
    track: Option<Track>,
    stop_grace: Duration,
}

impl PlaybackProcess {
    pub fn new(renderer: Arc<dyn Renderer>, stop_grace: Duration) -> Self {
        Self {
            renderer,
            handle: None,
            track: None,
            stop_grace,
        }
    }

    /// Replace whatever is running with a renderer for `track`.
    /// Returns the liveness probe for the new process.
    pub async fn start(&mut self, track: &Track, volume: u8) -> Result<Arc<dyn RenderHandle>, ProcessError> {
        if let Err(e) = self.stop().await {
            warn!("previous renderer did not exit cleanly: {}", e);
        }

        let handle = self.renderer.spawn(track, volume)?;
        info!(pid = ?handle.pid(), "Playing: {}", track);

        self.handle = Some(Arc::clone(&handle));
        self.track = Some(track.clone());
        Ok(handle)
    }

    /// Terminate gracefully, escalate to a kill after the grace period
    pub async fn stop(&mut self) -> Result<(), ProcessError> {
        self.track = None;
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        if !handle.is_running() {
            return Ok(());
        }

        if let Err(e) = handle.terminate() {
            warn!(pid = ?handle.pid(), "terminate request failed: {}", e);
        }

        let exited = tokio::time::timeout(self.stop_grace, async {
            while handle.is_running() {
                tokio::time::sleep(EXIT_POLL).await;
            }
        })
        .await
        .is_ok();

        if exited {
            debug!(pid = ?handle.pid(), "renderer exited");
            return Ok(());
        }

        warn!(pid = ?handle.pid(), "renderer still alive after {:?}, killing", self.stop_grace);
        if let Err(e) = handle.kill() {
            warn!(pid = ?handle.pid(), "kill failed: {}", e);
        }
        Err(ProcessError::TerminateTimeout(self.stop_grace))
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| h.is_running()).unwrap_or(false)
    }

    /// Probe for the monitor; `None` when nothing has been started
    pub fn watch(&self) -> Option<Arc<dyn RenderHandle>> {
        self.handle.clone()
    }

    pub fn track(&self) -> Option<&Track> {
        self.track.as_ref()
    }
}
