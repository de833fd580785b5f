use serde::{Deserialize, Serialize};
use std::time::Duration;

const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// A resolved, playable stream. Built once by a resolver and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration: Option<Duration>,
    pub source_url: String,
    pub origin_query: String, // what the user (or recommender) typed to get here
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        duration: Option<Duration>,
        origin_query: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let source_url = format!("{}{}", WATCH_URL_PREFIX, id);
        Self {
            id,
            title: title.into(),
            artist: artist.into(),
            duration,
            source_url,
            origin_query: origin_query.into(),
        }
    }

    /// Same stream, regardless of how we got to it
    pub fn same_as(&self, other: &Track) -> bool {
        self.id == other.id
    }

    pub fn duration_seconds(&self) -> Option<u64> {
        self.duration.map(|d| d.as_secs())
    }

    pub fn duration_string(&self) -> String {
        match self.duration_seconds() {
            Some(total) => {
                let hours = total / 3600;
                let minutes = (total % 3600) / 60;
                let seconds = total % 60;
                if hours > 0 {
                    format!("{}:{:02}:{:02}", hours, minutes, seconds)
                } else {
                    format!("{}:{:02}", minutes, seconds)
                }
            }
            None => "live".to_string(),
        }
    }
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} by {} [{}]", self.title, self.artist, self.duration_string())
    }
}
