use super::{parse_record, RelatedProvider, SearchResolver};
use crate::audio::Track;
use crate::error::{RecommendationError, SearchError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Strategies for "what plays after this", in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Provider's related/auto-mix list for the seed id
    RelatedMix,
    /// Plain search for "<title> similar songs"
    SimilarSearch,
}

/// Tiered fallback for the next track when the queue has run dry.
///
/// Each tier gets `tier_timeout`, all of them together get `ceiling`. Going
/// over the ceiling gives up immediately instead of trying later tiers.
pub struct RecommendationResolver {
    related: Option<Arc<dyn RelatedProvider>>,
    search: SearchResolver,
    tier_timeout: Duration,
    ceiling: Duration,
}

impl RecommendationResolver {
    pub fn new(
        related: Option<Arc<dyn RelatedProvider>>,
        search: SearchResolver,
        tier_timeout: Duration,
        ceiling: Duration,
    ) -> Self {
        Self {
            related,
            search,
            tier_timeout,
            ceiling,
        }
    }

    pub fn tiers(&self) -> Vec<Tier> {
        let mut tiers = Vec::with_capacity(2);
        if self.related.is_some() {
            tiers.push(Tier::RelatedMix);
        }
        tiers.push(Tier::SimilarSearch);
        tiers
    }

    pub async fn next_after(&self, seed: &Track) -> Result<Track, RecommendationError> {
        let deadline = Instant::now() + self.ceiling;

        for tier in self.tiers() {
            let attempt = tokio::time::timeout(self.tier_timeout, self.try_tier(tier, seed));
            match tokio::time::timeout_at(deadline, attempt).await {
                Err(_) => {
                    warn!(?tier, "recommendation ceiling of {:?} reached", self.ceiling);
                    return Err(RecommendationError::NoRecommendation);
                }
                Ok(Err(_)) => debug!(?tier, "tier timed out after {:?}", self.tier_timeout),
                Ok(Ok(Err(e))) => debug!(?tier, "tier failed: {}", e),
                Ok(Ok(Ok(candidate))) if candidate.same_as(seed) => {
                    debug!(?tier, "tier only found the seed again")
                }
                Ok(Ok(Ok(candidate))) => {
                    info!(?tier, "Recommended after {}: {}", seed.title, candidate);
                    return Ok(candidate);
                }
            }
        }

        info!("No recommendation after {}", seed.title);
        Err(RecommendationError::NoRecommendation)
    }

    async fn try_tier(&self, tier: Tier, seed: &Track) -> Result<Track, SearchError> {
        match tier {
            Tier::RelatedMix => {
                let provider = self.related.as_ref().ok_or(SearchError::NoResults)?;
                let raw = provider.related(seed).await?;
                pick_related(&raw, seed)
            }
            Tier::SimilarSearch => {
                let query = format!("{} similar songs", seed.title);
                self.search.resolve(&query).await
            }
        }
    }
}

/// First well-formed record in a related listing that isn't the seed
fn pick_related(raw: &str, seed: &Track) -> Result<Track, SearchError> {
    let origin = format!("related:{}", seed.id);
    let mut last_error = SearchError::NoResults;

    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match parse_record(line, &origin) {
            Ok(track) if track.same_as(seed) => continue,
            Ok(track) => return Ok(track),
            Err(e) => last_error = e,
        }
    }
    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchProvider;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::Mutex;

    struct Scripted {
        reply: Result<String, String>,
        delay: Duration,
        calls: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(reply: Result<&str, &str>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_string).map_err(str::to_string),
                delay,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn answer(&self, asked: &str) -> BoxFuture<'_, Result<String, SearchError>> {
            self.calls.lock().unwrap().push(asked.to_string());
            async move {
                tokio::time::sleep(self.delay).await;
                self.reply.clone().map_err(SearchError::Provider)
            }
            .boxed()
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl SearchProvider for Scripted {
        fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<String, SearchError>> {
            self.answer(query)
        }
    }

    impl RelatedProvider for Scripted {
        fn related<'a>(&'a self, seed: &'a Track) -> BoxFuture<'a, Result<String, SearchError>> {
            self.answer(&seed.id)
        }
    }

    fn seed() -> Track {
        Track::new("seed01", "Seed Song", "Seeder", None, "seed song")
    }

    fn resolver(
        related: Option<Arc<Scripted>>,
        search: Arc<Scripted>,
        tier_timeout: Duration,
        ceiling: Duration,
    ) -> RecommendationResolver {
        let related = related.map(|r| r as Arc<dyn RelatedProvider>);
        let search = SearchResolver::new(search, Duration::from_secs(5));
        RecommendationResolver::new(related, search, tier_timeout, ceiling)
    }

    const FAST: Duration = Duration::ZERO;

    #[tokio::test]
    async fn related_tier_wins_when_it_answers() {
        let related = Scripted::new(Ok("seed01|Seed Song|Seeder|100\nnext01|Next Song|Other|200\n"), FAST);
        let search = Scripted::new(Ok("srch01|Searched|X|1"), FAST);
        let resolver = resolver(Some(related.clone()), search.clone(), Duration::from_secs(1), Duration::from_secs(2));

        let next = resolver.next_after(&seed()).await.unwrap();
        assert_eq!(next.id, "next01");
        assert_eq!(next.origin_query, "related:seed01");
        assert_eq!(related.calls(), vec!["seed01"]);
        assert!(search.calls().is_empty());
    }

    #[tokio::test]
    async fn falls_back_to_similar_search() {
        let related = Scripted::new(Err("mix unavailable"), FAST);
        let search = Scripted::new(Ok("srch01|Searched|X|1"), FAST);
        let resolver = resolver(Some(related), search.clone(), Duration::from_secs(1), Duration::from_secs(2));

        let next = resolver.next_after(&seed()).await.unwrap();
        assert_eq!(next.id, "srch01");
        assert_eq!(search.calls(), vec!["Seed Song similar songs"]);
    }

    #[tokio::test]
    async fn slow_tier_is_skipped_after_its_timeout() {
        let related = Scripted::new(Ok("next01|Next|Other|1"), Duration::from_secs(5));
        let search = Scripted::new(Ok("srch01|Searched|X|1"), FAST);
        let resolver = resolver(Some(related), search, Duration::from_millis(50), Duration::from_secs(2));

        let next = resolver.next_after(&seed()).await.unwrap();
        assert_eq!(next.id, "srch01");
    }

    #[tokio::test]
    async fn ceiling_fails_fast() {
        let related = Scripted::new(Ok("next01|Next|Other|1"), Duration::from_secs(5));
        let search = Scripted::new(Ok("srch01|Searched|X|1"), Duration::from_secs(5));
        let resolver = resolver(Some(related), search, Duration::from_secs(3), Duration::from_millis(80));

        let started = std::time::Instant::now();
        let result = resolver.next_after(&seed()).await;
        assert!(matches!(result, Err(RecommendationError::NoRecommendation)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn seed_echo_is_not_a_recommendation() {
        let search = Scripted::new(Ok("seed01|Seed Song|Seeder|100"), FAST);
        let resolver = resolver(None, search, Duration::from_secs(1), Duration::from_secs(2));

        assert_eq!(resolver.tiers(), vec![Tier::SimilarSearch]);
        let result = resolver.next_after(&seed()).await;
        assert!(matches!(result, Err(RecommendationError::NoRecommendation)));
    }

    #[test]
    fn related_listing_skips_garbage_and_seed() {
        let raw = "seed01|Seed Song|Seeder|100\nnot a record\nnext02|Two|B|NA\n";
        let next = pick_related(raw, &seed()).unwrap();
        assert_eq!(next.id, "next02");

        let only_garbage = pick_related("nope\n", &seed());
        assert!(matches!(only_garbage, Err(SearchError::Parse(_))));
        assert!(matches!(pick_related("", &seed()), Err(SearchError::NoResults)));
    }
}
