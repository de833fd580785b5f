use super::RenderHandle;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEvent {
    /// The renderer for `generation` exited without being asked to
    TrackEnded { generation: u64 },
}

/// Watches one renderer process and reports its natural end, once.
///
/// Cancellation is cooperative: the flag is checked on every poll and again
/// right before publishing, so a cancelled monitor never reports. Dropping
/// the monitor cancels it.
pub struct PlaybackMonitor {
    generation: u64,
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl PlaybackMonitor {
    /// Must be called from inside a tokio runtime
    pub fn spawn(
        generation: u64,
        probe: Arc<dyn RenderHandle>,
        interval: Duration,
        events: mpsc::UnboundedSender<MonitorEvent>,
    ) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                if flag.load(Ordering::Acquire) {
                    debug!(generation, "monitor cancelled");
                    return;
                }
                if probe.is_running() {
                    continue;
                }
                // Process is gone - but an explicit stop may have beaten us here
                if flag.load(Ordering::Acquire) {
                    debug!(generation, "monitor cancelled after exit");
                    return;
                }

                info!(generation, "Track ended, playing next...");
                let _ = events.send(MonitorEvent::TrackEnded { generation });
                return;
            }
        });

        Self {
            generation,
            cancelled,
            task,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel and tear the task down right away (controller shutdown)
    pub fn abort(self) {
        self.cancel();
        self.task.abort();
    }
}

impl Drop for PlaybackMonitor {
    fn drop(&mut self) {
        self.cancel();
    }
}
