// In-process stand-ins for yt-dlp and mpv so the controller can be driven
// without any external binaries

#![allow(dead_code)]

use futures::future::BoxFuture;
use futures::FutureExt;
use ocarina::config::PlayerConfig;
use ocarina::error::SearchError;
use ocarina::{
    PlayerController, PlayerStatus, RecommendationResolver, RelatedProvider, RenderHandle, Renderer,
    SearchProvider, SearchResolver, Track,
};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub fn record(id: &str, title: &str) -> String {
    format!("{}|{}|Artist {}|180", id, title, id)
}

/// Query → record lookups; unknown queries find nothing
#[derive(Default)]
pub struct FakeCatalogue {
    records: Mutex<HashMap<String, String>>,
    mixes: Mutex<HashMap<String, String>>,
    mix_delay: Mutex<Duration>,
}

impl FakeCatalogue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_song(self: &Arc<Self>, query: &str, id: &str, title: &str) -> Arc<Self> {
        self.records
            .lock()
            .unwrap()
            .insert(query.to_string(), record(id, title));
        Arc::clone(self)
    }

    /// Related listing for `seed_id`, in provider order
    pub fn with_mix(self: &Arc<Self>, seed_id: &str, entries: &[(&str, &str)]) -> Arc<Self> {
        let listing = entries
            .iter()
            .map(|(id, title)| record(id, title))
            .collect::<Vec<_>>()
            .join("\n");
        self.mixes.lock().unwrap().insert(seed_id.to_string(), listing);
        Arc::clone(self)
    }

    pub fn slow_mixes(&self, delay: Duration) {
        *self.mix_delay.lock().unwrap() = delay;
    }
}

impl SearchProvider for FakeCatalogue {
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<String, SearchError>> {
        let found = self.records.lock().unwrap().get(query).cloned();
        async move { Ok(found.unwrap_or_default()) }.boxed()
    }
}

impl RelatedProvider for FakeCatalogue {
    fn related<'a>(&'a self, seed: &'a Track) -> BoxFuture<'a, Result<String, SearchError>> {
        let found = self.mixes.lock().unwrap().get(&seed.id).cloned();
        let delay = *self.mix_delay.lock().unwrap();
        async move {
            tokio::time::sleep(delay).await;
            found.ok_or_else(|| SearchError::Provider("no mix for this track".to_string()))
        }
        .boxed()
    }
}

pub struct FakeProcess {
    pub track_id: String,
    pub volume: u8,
    running: AtomicBool,
}

impl FakeProcess {
    pub fn is_live(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The track played to the end on its own
    pub fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl RenderHandle for FakeProcess {
    fn pid(&self) -> Option<u32> {
        None
    }
    fn is_running(&self) -> bool {
        self.is_live()
    }
    fn terminate(&self) -> io::Result<()> {
        self.finish();
        Ok(())
    }
    fn kill(&self) -> io::Result<()> {
        self.finish();
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRenderer {
    spawned: Mutex<Vec<Arc<FakeProcess>>>,
}

impl FakeRenderer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn live_count(&self) -> usize {
        self.spawned.lock().unwrap().iter().filter(|p| p.is_live()).count()
    }

    pub fn spawned_ids(&self) -> Vec<String> {
        self.spawned
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.track_id.clone())
            .collect()
    }

    pub fn latest(&self) -> Option<Arc<FakeProcess>> {
        self.spawned.lock().unwrap().last().cloned()
    }

    pub fn finish_latest(&self) {
        if let Some(process) = self.latest() {
            process.finish();
        }
    }
}

impl Renderer for FakeRenderer {
    fn spawn(&self, track: &Track, volume: u8) -> io::Result<Arc<dyn RenderHandle>> {
        let process = Arc::new(FakeProcess {
            track_id: track.id.clone(),
            volume,
            running: AtomicBool::new(true),
        });
        self.spawned.lock().unwrap().push(Arc::clone(&process));
        Ok(process)
    }
}

pub fn player_config() -> PlayerConfig {
    PlayerConfig {
        stop_grace_ms: 200,
        monitor_interval_ms: 10,
        ..PlayerConfig::default()
    }
}

pub fn controller(catalogue: &Arc<FakeCatalogue>, renderer: &Arc<FakeRenderer>) -> PlayerController {
    let search = SearchResolver::new(catalogue.clone(), Duration::from_secs(2));
    let related: Arc<dyn RelatedProvider> = catalogue.clone();
    let recommender = RecommendationResolver::new(
        Some(related),
        search.clone(),
        Duration::from_secs(1),
        Duration::from_secs(2),
    );
    PlayerController::new(search, recommender, renderer.clone(), &player_config())
}

/// Poll the status until `pred` holds or a few seconds pass
pub async fn wait_for(player: &PlayerController, pred: impl Fn(&PlayerStatus) -> bool) -> PlayerStatus {
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let status = player.get_status().await;
        if pred(&status) || Instant::now() >= deadline {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub fn current_id(status: &PlayerStatus) -> Option<&str> {
    status.current_track.as_ref().map(|t| t.id.as_str())
}
