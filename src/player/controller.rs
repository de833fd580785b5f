//! Single-lock playback state machine
//!
//! Every mutation goes through one `tokio::sync::Mutex`. Searches and
//! recommendations run with the lock released; the bounded wait for an old
//! renderer to exit runs with it held, so two renderers never overlap.
//!
//! Each started renderer gets a fresh generation number and its own
//! [`PlaybackMonitor`]. Anything explicit (stop, pause, next, previous,
//! search) cancels the monitor and bumps the generation first, so a late
//! "track ended" from an old monitor is always discarded.

use super::events::{EventHub, PlayerEvent};
use super::queue::QueueAndHistory;
use super::{PlaybackState, PlayerStatus};
use crate::audio::{MonitorEvent, Mpv, PlaybackMonitor, PlaybackProcess, Renderer, Track};
use crate::config::{Config, PlayerConfig};
use crate::search::{RecommendationResolver, RelatedProvider, SearchResolver, YtDlp};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Everything the lock protects
struct Inner {
    process: PlaybackProcess,
    monitor: Option<PlaybackMonitor>,
    queue: QueueAndHistory,
    current: Option<Track>,
    state: PlaybackState,
    generation: u64,
    volume: u8,
    /// Generation a recommendation lookup was started for
    recommending: Option<u64>,
}

struct Shared {
    inner: Mutex<Inner>,
    search: SearchResolver,
    recommender: RecommendationResolver,
    monitor_interval: Duration,
    monitor_tx: mpsc::UnboundedSender<MonitorEvent>,
    events: EventHub,
}

/// The playback engine's only public entry point.
///
/// Built explicitly and owned by whoever serves the UI; there is no global
/// instance. Must be created inside a tokio runtime.
pub struct PlayerController {
    shared: Arc<Shared>,
    pump: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl PlayerController {
    pub fn new(
        search: SearchResolver,
        recommender: RecommendationResolver,
        renderer: Arc<dyn Renderer>,
        config: &PlayerConfig,
    ) -> Self {
        let (monitor_tx, mut monitor_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                process: PlaybackProcess::new(renderer, config.stop_grace()),
                monitor: None,
                queue: QueueAndHistory::new(),
                current: None,
                state: PlaybackState::Stopped,
                generation: 0,
                volume: config.volume.min(100),
                recommending: None,
            }),
            search,
            recommender,
            monitor_interval: config.monitor_interval(),
            monitor_tx,
            events: EventHub::new(),
        });

        // Natural track ends come back through here
        let pump_shared = Arc::clone(&shared);
        let pump = tokio::spawn(async move {
            while let Some(MonitorEvent::TrackEnded { generation }) = monitor_rx.recv().await {
                pump_shared.advance(Some(generation)).await;
            }
        });

        Self {
            shared,
            pump: std::sync::Mutex::new(Some(pump)),
        }
    }

    /// Wire up the production stack: yt-dlp for search and mixes, mpv to play
    pub fn from_config(config: &Config) -> Self {
        let ytdlp = Arc::new(YtDlp::from_config(&config.search));
        let search = SearchResolver::new(ytdlp.clone(), config.search.timeout());
        let related = if config.recommend.related_mix {
            Some(ytdlp as Arc<dyn RelatedProvider>)
        } else {
            None
        };
        let recommender = RecommendationResolver::new(
            related,
            search.clone(),
            config.recommend.tier_timeout(),
            config.recommend.total_timeout(),
        );
        let renderer = Arc::new(Mpv::from_config(&config.player));

        Self::new(search, recommender, renderer, &config.player)
    }

    /// Search and play the top result right away. Ad hoc plays don't enqueue.
    pub async fn search_and_play(&self, query: &str) -> bool {
        let track = match self.shared.search.resolve(query).await {
            Ok(track) => track,
            Err(e) => {
                warn!("Search for {:?} failed: {}", query, e);
                return false;
            }
        };

        let mut inner = self.shared.inner.lock().await;
        inner.queue.leave_queue();
        self.shared.start_track(&mut inner, track).await
    }

    /// The renderer has no pause channel, so pausing ends the process and
    /// keeps the track around for `resume`.
    pub async fn pause(&self) -> bool {
        let mut inner = self.shared.inner.lock().await;
        if inner.state != PlaybackState::Playing {
            debug!(state = ?inner.state, "pause ignored");
            return false;
        }

        self.shared.silence(&mut inner).await;
        inner.state = PlaybackState::Paused;
        self.shared.events.state_changed(PlaybackState::Paused);
        info!("Playback paused");
        true
    }

    /// Restart the current track from the beginning
    pub async fn resume(&self) -> bool {
        let mut inner = self.shared.inner.lock().await;
        if inner.state != PlaybackState::Paused {
            debug!(state = ?inner.state, "resume ignored");
            return false;
        }

        let Some(track) = inner.current.clone() else {
            self.shared.halt(&mut inner).await;
            return false;
        };
        info!("Playback resumed");
        self.shared.start_track(&mut inner, track).await
    }

    pub async fn next_track(&self) -> bool {
        self.shared.advance(None).await
    }

    pub async fn previous_track(&self) -> bool {
        let mut inner = self.shared.inner.lock().await;
        if inner.state == PlaybackState::Stopped {
            debug!("previous ignored while stopped");
            return false;
        }

        let current = inner.current.clone();
        match inner.queue.retreat(current.as_ref()) {
            Some(choice) => {
                debug!(?choice, "going back");
                self.shared.start_track(&mut inner, choice.into_track()).await
            }
            None => false,
        }
    }

    /// Stop playback and drop the queue. History survives.
    pub async fn stop(&self) -> bool {
        let mut inner = self.shared.inner.lock().await;
        self.shared.halt(&mut inner).await;
        info!("Playback stopped");
        true
    }

    /// Resolve (lock released) then append. Doesn't start anything.
    pub async fn add_to_queue(&self, query: &str) -> bool {
        let track = match self.shared.search.resolve(query).await {
            Ok(track) => track,
            Err(e) => {
                warn!("Add to queue for {:?} failed: {}", query, e);
                return false;
            }
        };

        let mut inner = self.shared.inner.lock().await;
        info!("Added to queue: {}", track.title);
        inner.queue.add(track);
        self.shared.events.queue_changed(inner.queue.queue_len());
        true
    }

    pub async fn get_status(&self) -> PlayerStatus {
        let inner = self.shared.inner.lock().await;
        PlayerStatus {
            state: inner.state,
            is_playing: inner.state.is_playing(),
            is_paused: inner.state.is_paused(),
            current_track: inner.current.clone(),
            queue_length: inner.queue.queue_len(),
            queue_position: inner.queue.queue_position(),
            history_length: inner.queue.history_len(),
            volume: inner.volume,
            finding_next: inner.recommending == Some(inner.generation),
        }
    }

    /// Takes effect the next time a renderer starts
    pub async fn set_volume(&self, volume: u8) -> bool {
        let mut inner = self.shared.inner.lock().await;
        inner.volume = volume.min(100);
        info!("Volume set to {}%", inner.volume);
        true
    }

    /// Snapshot of the play history, oldest first
    pub async fn history(&self) -> Vec<Track> {
        self.shared.inner.lock().await.queue.history().to_vec()
    }

    /// Snapshot of the queue, in insertion order
    pub async fn queue(&self) -> Vec<Track> {
        self.shared.inner.lock().await.queue.queue().to_vec()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.shared.events.subscribe()
    }

    /// Stop playback and tear down background tasks
    pub async fn shutdown(&self) {
        {
            let mut inner = self.shared.inner.lock().await;
            self.shared.halt(&mut inner).await;
        }
        self.abort_pump();
        info!("Music player cleaned up");
    }

    fn abort_pump(&self) {
        let pump = match self.pump.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(pump) = pump {
            pump.abort();
        }
    }
}

impl Drop for PlayerController {
    fn drop(&mut self) {
        self.abort_pump();
        // Best effort: without the lock, the renderer handle's own drop kills it
        if let Ok(mut inner) = self.shared.inner.try_lock() {
            if let Some(monitor) = inner.monitor.take() {
                monitor.abort();
            }
        }
    }
}

impl Shared {
    /// Cancel the live monitor and invalidate its generation
    fn cancel_monitor(&self, inner: &mut Inner) {
        if let Some(monitor) = inner.monitor.take() {
            monitor.cancel();
        }
        inner.generation += 1;
    }

    /// Monitor off, renderer gone. State is left to the caller.
    async fn silence(&self, inner: &mut Inner) {
        self.cancel_monitor(inner);
        if let Err(e) = inner.process.stop().await {
            warn!("Error stopping renderer: {}", e);
        }
    }

    /// Full stop: nothing current, queue cleared, history kept
    async fn halt(&self, inner: &mut Inner) {
        self.silence(inner).await;
        let was_active = inner.state != PlaybackState::Stopped;
        inner.current = None;
        inner.state = PlaybackState::Stopped;
        inner.queue.clear_queue();
        if was_active {
            self.events.stopped();
        }
    }

    /// Replace the renderer with one for `track` and watch it
    async fn start_track(&self, inner: &mut Inner, track: Track) -> bool {
        self.cancel_monitor(inner);

        let probe = match inner.process.start(&track, inner.volume).await {
            Ok(probe) => probe,
            Err(e) => {
                error!("Playback error for {}: {}", track.title, e);
                inner.current = None;
                inner.state = PlaybackState::Stopped;
                self.events.stopped();
                return false;
            }
        };

        inner.generation += 1;
        let generation = inner.generation;
        inner.monitor = Some(PlaybackMonitor::spawn(
            generation,
            probe,
            self.monitor_interval,
            self.monitor_tx.clone(),
        ));

        inner.queue.record_played(&track);
        inner.current = Some(track.clone());
        inner.state = PlaybackState::Playing;
        self.events.track_started(&track, generation);
        self.events.state_changed(PlaybackState::Playing);
        true
    }

    /// Shared by `next_track` (`ended == None`) and natural track ends.
    ///
    /// Queue first, then recommendations with the lock released, then stop.
    /// During the lookup the renderer is already gone while the state stays
    /// `Playing` with the old track current; `finding_next` in the status
    /// tells a UI that nothing is audible.
    async fn advance(&self, ended: Option<u64>) -> bool {
        let (seed, generation) = {
            let mut inner = self.inner.lock().await;

            if let Some(generation) = ended {
                if generation != inner.generation || inner.state == PlaybackState::Stopped {
                    debug!(generation, current = inner.generation, "stale track end ignored");
                    return false;
                }
                // The monitor that sent this is done
                inner.monitor = None;
            } else if inner.state == PlaybackState::Stopped {
                debug!("next ignored while stopped");
                return false;
            }

            if let Ok(track) = inner.queue.advance() {
                return self.start_track(&mut inner, track).await;
            }

            let Some(seed) = inner.current.clone() else {
                self.halt(&mut inner).await;
                return false;
            };

            // Queue is dry. Go quiet before the slow lookup.
            self.silence(&mut inner).await;
            inner.recommending = Some(inner.generation);
            (seed, inner.generation)
        };

        let found = self.recommender.next_after(&seed).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            info!("Recommendation for {} arrived too late, dropped", seed.title);
            return false;
        }
        inner.recommending = None;

        match found {
            Ok(track) => {
                inner.queue.leave_queue();
                self.start_track(&mut inner, track).await
            }
            Err(e) => {
                info!("Nothing left to play after {}: {}", seed.title, e);
                self.halt(&mut inner).await;
                false
            }
        }
    }
}
