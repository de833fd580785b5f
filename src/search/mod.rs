// Query resolution - free text in, playable Track out
// Providers return raw `id|title|uploader|duration` lines, we do the parsing

pub mod recommend;
pub mod ytdlp;

pub use recommend::RecommendationResolver;
pub use ytdlp::YtDlp;

use crate::audio::Track;
use crate::error::SearchError;
use futures::future::BoxFuture;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info};

/// Print template every provider is expected to follow, one record per line
pub const RECORD_TEMPLATE: &str = "%(id)s|%(title)s|%(uploader)s|%(duration)s";

/// Free-text search against an external catalogue
pub trait SearchProvider: Send + Sync {
    /// Raw output for the best match of `query`
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<String, SearchError>>;
}

/// "Related to this track" lookups (auto-mix style). Provider specific and
/// allowed to disappear, so it lives behind its own trait.
pub trait RelatedProvider: Send + Sync {
    /// Raw output, one record per line, possibly including the seed itself
    fn related<'a>(&'a self, seed: &'a Track) -> BoxFuture<'a, Result<String, SearchError>>;
}

/// Turns text into a Track through a provider, never waiting longer than `timeout`
#[derive(Clone)]
pub struct SearchResolver {
    provider: Arc<dyn SearchProvider>,
    timeout: Duration,
}

impl SearchResolver {
    pub fn new(provider: Arc<dyn SearchProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub async fn resolve(&self, query: &str) -> Result<Track, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::NoResults);
        }

        info!("Searching for: {}", query);
        let raw = tokio::time::timeout(self.timeout, self.provider.search(query))
            .await
            .map_err(|_| SearchError::Timeout(self.timeout))??;

        let line = raw
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or(SearchError::NoResults)?;

        let track = parse_record(line, query)?;
        info!("Found: {} by {}", track.title, track.artist);
        Ok(track)
    }
}

/// Parse one `id|title|uploader|duration` record.
///
/// The title is whatever sits between the id and the last two fields, so
/// titles containing `|` survive.
pub fn parse_record(line: &str, origin_query: &str) -> Result<Track, SearchError> {
    let fields: Vec<&str> = line.trim().split('|').collect();
    if fields.len() < 4 {
        return Err(SearchError::Parse(format!("expected 4 fields, got {}: {:?}", fields.len(), line)));
    }

    let id = fields[0].trim();
    if !is_valid_id(id) {
        return Err(SearchError::Parse(format!("bad id {:?}", id)));
    }

    let last = fields.len() - 1;
    let duration = parse_duration(fields[last])?;
    let uploader = match fields[last - 1].trim() {
        "" | "NA" => "Unknown",
        other => other,
    };
    let title = fields[1..last - 1].join("|");
    let title = title.trim();
    if title.is_empty() || title == "NA" {
        return Err(SearchError::Parse(format!("missing title for {}", id)));
    }

    debug!(id, title, uploader, ?duration, "parsed record");
    Ok(Track::new(id, title, uploader, duration, origin_query))
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id != "NA"
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn clock_pattern() -> Option<&'static Regex> {
    // [h:]mm:ss as printed by `--get-duration`
    static CLOCK: OnceLock<Option<Regex>> = OnceLock::new();
    CLOCK
        .get_or_init(|| Regex::new(r"^(?:(\d+):)?(\d{1,2}):(\d{2})$").ok())
        .as_ref()
}

/// Seconds (`213`, `213.0`) or clock form (`3:33`, `1:02:05`); `NA` means live
pub fn parse_duration(raw: &str) -> Result<Option<Duration>, SearchError> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "NA" || raw == "None" {
        return Ok(None);
    }

    if let Ok(seconds) = raw.parse::<f64>() {
        // try_from rejects negatives, NaN and anything past Duration::MAX
        return Duration::try_from_secs_f64(seconds)
            .map(Some)
            .map_err(|_| SearchError::Parse(format!("bad duration {:?}", raw)));
    }

    if let Some(captures) = clock_pattern().and_then(|re| re.captures(raw)) {
        let total = clock_seconds(&captures)
            .ok_or_else(|| SearchError::Parse(format!("duration out of range {:?}", raw)))?;
        return Ok(Some(Duration::from_secs(total)));
    }

    Err(SearchError::Parse(format!("bad duration {:?}", raw)))
}

/// `None` when the hours field doesn't fit
fn clock_seconds(captures: &regex::Captures<'_>) -> Option<u64> {
    let field = |i: usize| match captures.get(i) {
        Some(m) => m.as_str().parse::<u64>().ok(),
        None => Some(0),
    };
    field(1)?
        .checked_mul(3600)?
        .checked_add(field(2)? * 60)?
        .checked_add(field(3)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::Mutex;

    /// Replies with canned output and remembers what it was asked
    struct Canned {
        reply: Result<String, String>,
        delay: Duration,
        seen: Mutex<Vec<String>>,
    }

    impl Canned {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl SearchProvider for Canned {
        fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<String, SearchError>> {
            async move {
                self.seen.lock().unwrap().push(query.to_string());
                tokio::time::sleep(self.delay).await;
                self.reply.clone().map_err(SearchError::Provider)
            }
            .boxed()
        }
    }

    fn resolver(provider: Arc<Canned>) -> SearchResolver {
        SearchResolver::new(provider, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn resolves_first_record() {
        let provider = Canned::ok("dQw4w9WgXcQ|Never Gonna Give You Up|Rick Astley|213\n");
        let track = resolver(provider.clone()).resolve("  rick astley ").await.unwrap();

        assert_eq!(track.id, "dQw4w9WgXcQ");
        assert_eq!(track.title, "Never Gonna Give You Up");
        assert_eq!(track.artist, "Rick Astley");
        assert_eq!(track.duration, Some(Duration::from_secs(213)));
        assert_eq!(track.origin_query, "rick astley");
        assert_eq!(track.source_url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(provider.seen.lock().unwrap().as_slice(), ["rick astley"]);
    }

    #[tokio::test]
    async fn empty_output_is_no_results() {
        let err = resolver(Canned::ok("\n  \n")).resolve("nothing").await.unwrap_err();
        assert!(matches!(err, SearchError::NoResults));
    }

    #[tokio::test]
    async fn blank_query_never_reaches_provider() {
        let provider = Canned::ok("abc|t|u|1");
        let err = resolver(provider.clone()).resolve("   ").await.unwrap_err();
        assert!(matches!(err, SearchError::NoResults));
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_kept_apart_from_parse_failure() {
        let failing = Arc::new(Canned {
            reply: Err("exit status 1".to_string()),
            delay: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
        });
        let err = resolver(failing).resolve("song").await.unwrap_err();
        assert!(matches!(err, SearchError::Provider(_)));

        let garbled = Canned::ok("abc|only two");
        let err = resolver(garbled).resolve("song").await.unwrap_err();
        assert!(matches!(err, SearchError::Parse(_)));
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let slow = Arc::new(Canned {
            reply: Ok("abc|t|u|1".to_string()),
            delay: Duration::from_secs(5),
            seen: Mutex::new(Vec::new()),
        });
        let resolver = SearchResolver::new(slow, Duration::from_millis(50));
        let err = resolver.resolve("song").await.unwrap_err();
        assert!(matches!(err, SearchError::Timeout(d) if d == Duration::from_millis(50)));
    }

    #[test]
    fn title_may_contain_separator() {
        let track = parse_record("abc_-1|AC|DC Live|Band|NA", "q").unwrap();
        assert_eq!(track.title, "AC|DC Live");
        assert_eq!(track.artist, "Band");
        assert_eq!(track.duration, None);
    }

    #[test]
    fn missing_uploader_becomes_unknown() {
        let track = parse_record("abc|Title|NA|61.5", "q").unwrap();
        assert_eq!(track.artist, "Unknown");
        assert_eq!(track.duration, Some(Duration::from_millis(61_500)));
    }

    #[test]
    fn malformed_records_are_parse_errors() {
        for line in [
            "|Title|Uploader|10",
            "a b|Title|Uploader|10",
            "abc||Uploader|10",
            "abc|Title|Uploader|soon",
            "abc|Title|Uploader|-5",
            "abc|Title|Uploader|1e300",
            "abc|Title|Uploader|99999999999999999:00:00",
            "abc|Title|Uploader|99999999999999999999999:00:00",
        ] {
            assert!(
                matches!(parse_record(line, "q"), Err(SearchError::Parse(_))),
                "{:?} should not parse",
                line
            );
        }
    }

    #[test]
    fn clock_durations() {
        assert_eq!(parse_duration("3:33").unwrap(), Some(Duration::from_secs(213)));
        assert_eq!(parse_duration("1:02:05").unwrap(), Some(Duration::from_secs(3725)));
        assert_eq!(parse_duration("NA").unwrap(), None);
        assert!(parse_duration("-4").is_err());
        assert!(parse_duration("3:3").is_err());
    }

    #[test]
    fn oversized_durations_fail_instead_of_panicking() {
        for raw in ["1e300", "inf", "NaN", "99999999999999999:00:00", "18446744073709551616:00:00"] {
            assert!(
                matches!(parse_duration(raw), Err(SearchError::Parse(_))),
                "{:?} should be rejected",
                raw
            );
        }
        // Largest hour count that still fits
        let hours = u64::MAX / 3600 - 1;
        let expected = Duration::from_secs(hours * 3600 + 59 * 60 + 59);
        assert_eq!(parse_duration(&format!("{}:59:59", hours)).unwrap(), Some(expected));
    }
}
