use super::{RelatedProvider, SearchProvider, RECORD_TEMPLATE};
use crate::audio::Track;
use crate::config::SearchConfig;
use crate::error::SearchError;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

// How many mix entries to list; the first is usually the seed itself
const MIX_ITEMS: &str = "1:5";

/// yt-dlp as search and related-track provider.
///
/// The child is killed if the future is dropped, which is what makes the
/// resolver's timeout actually free the process.
#[derive(Debug, Clone)]
pub struct YtDlp {
    command: String,
}

impl YtDlp {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.command.clone())
    }

    pub fn search_args(query: &str) -> Vec<String> {
        vec![
            "--default-search".to_string(),
            "ytsearch1".to_string(),
            "--skip-download".to_string(),
            "--no-warnings".to_string(),
            "--print".to_string(),
            RECORD_TEMPLATE.to_string(),
            format!("ytsearch1:{}", query),
        ]
    }

    /// Auto-mix playlist for a video. Undocumented convention: `RD` + video id.
    pub fn mix_url(video_id: &str) -> String {
        format!("https://www.youtube.com/watch?v={}&list=RD{}", video_id, video_id)
    }

    pub fn mix_args(video_id: &str) -> Vec<String> {
        vec![
            "--flat-playlist".to_string(),
            "--skip-download".to_string(),
            "--no-warnings".to_string(),
            "--playlist-items".to_string(),
            MIX_ITEMS.to_string(),
            "--print".to_string(),
            RECORD_TEMPLATE.to_string(),
            Self::mix_url(video_id),
        ]
    }

    async fn run(&self, args: Vec<String>) -> Result<String, SearchError> {
        debug!(command = %self.command, ?args, "running provider");
        let output = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SearchError::Provider(format!("{}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Search failed: {}", stderr.trim());
            return Err(SearchError::Provider(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl SearchProvider for YtDlp {
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<String, SearchError>> {
        self.run(Self::search_args(query)).boxed()
    }
}

impl RelatedProvider for YtDlp {
    fn related<'a>(&'a self, seed: &'a Track) -> BoxFuture<'a, Result<String, SearchError>> {
        self.run(Self::mix_args(&seed.id)).boxed()
    }
}
