use crate::fetcher::traits::{SearchClient, SearchPage};
use crate::model::{FetchError, SyncCounters};
use crate::retry::RetryPolicy;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Everything a vendor/category sync produces before normalization: the raw
/// hits in page order and the run counters.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub hits: Vec<Value>,
    pub counters: SyncCounters,
}

/// Drives a full paginated search: one discovery request to learn the page
/// count, then every page in order, each under the shared retry policy.
pub struct PaginatedFetcher<C: SearchClient> {
    client: C,
    retry: RetryPolicy,
}

impl<C: SearchClient> PaginatedFetcher<C> {
    pub fn new(client: C, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Fetches all pages. A discovery failure aborts the whole sync for
    /// this category; a single page failing after retries is skipped and
    /// counted, keeping the other pages' hits.
    pub async fn fetch_all(&self) -> Result<FetchOutcome, FetchError> {
        let discovery = self
            .retry
            .run("discovery", || self.client.search(1))
            .await
            .map_err(|err| FetchError::Discovery(err.to_string()))?;

        if discovery.per_page == 0 {
            return Err(FetchError::Discovery("no per_page value in response".into()));
        }
        let total_pages = discovery.found.div_ceil(discovery.per_page) as usize;
        info!(
            "total results: {}, fetching {} pages of {}",
            discovery.found, total_pages, discovery.per_page
        );

        let mut outcome = FetchOutcome::default();
        for page in 1..=total_pages {
            info!("fetching page {page} of {total_pages}");
            let result = self
                .retry
                .run("page fetch", || self.client.search(page))
                .await;
            match result {
                Ok(SearchPage { hits, .. }) => {
                    outcome.counters.pages_fetched += 1;
                    if hits.is_empty() {
                        warn!("page {page} returned no hits");
                        continue;
                    }
                    outcome.counters.total_scanned += hits.len();
                    info!("scanned {} products on page {page}", hits.len());
                    outcome.hits.extend(hits);
                }
                Err(err) => {
                    warn!("page {page} skipped after retries: {err}");
                    outcome.counters.pages_failed += 1;
                }
            }
        }

        info!("total products scanned: {}", outcome.counters.total_scanned);
        Ok(outcome)
    }
}

/// Writes the accumulated raw hits as the per-category/day artifact file.
/// An empty hit list produces a warning and no file.
pub fn save_hits(
    save_dir: &Path,
    filename: &str,
    hits: &[Value],
) -> Result<Option<PathBuf>, FetchError> {
    if hits.is_empty() {
        warn!("no hits to save");
        return Ok(None);
    }
    fs::create_dir_all(save_dir)?;
    let path = save_dir.join(filename);
    let body = serde_json::to_string_pretty(hits)
        .map_err(|err| FetchError::MalformedResponse(err.to_string()))?;
    fs::write(&path, body)?;
    info!("saved {} hits to {}", hits.len(), path.display());
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::traits::{SearchClient, SearchPage};
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    /// Scripted client: fixed result counts, optionally failing pages.
    struct ScriptedClient {
        found: u64,
        per_page: u64,
        fail_pages: HashSet<usize>,
        fail_discovery: bool,
        calls: Arc<Mutex<Vec<usize>>>,
    }

    impl ScriptedClient {
        fn new(found: u64, per_page: u64) -> Self {
            Self {
                found,
                per_page,
                fail_pages: HashSet::new(),
                fail_discovery: false,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait::async_trait]
    impl SearchClient for ScriptedClient {
        async fn search(&self, page: usize) -> Result<SearchPage, FetchError> {
            self.calls.lock().unwrap().push(page);
            if self.fail_discovery || self.fail_pages.contains(&page) {
                return Err(FetchError::Status(500, page));
            }
            let hits = (0..self.per_page.min(2))
                .map(|i| json!({"sku": format!("P{page}-{i}")}))
                .collect();
            Ok(SearchPage { found: self.found, per_page: self.per_page, hits })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_every_page_in_order() {
        let client = ScriptedClient::new(500, 100);
        let fetcher = PaginatedFetcher::new(client, RetryPolicy::default());
        let outcome = fetcher.fetch_all().await.unwrap();
        assert_eq!(outcome.counters.pages_fetched, 5);
        assert_eq!(outcome.counters.pages_failed, 0);
        assert_eq!(outcome.counters.total_scanned, 10);
        assert_eq!(outcome.hits[0]["sku"], "P1-0");
        assert_eq!(outcome.hits[9]["sku"], "P5-1");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_page_is_skipped_but_others_survive() {
        let mut client = ScriptedClient::new(500, 100);
        client.fail_pages.insert(3);
        let calls = client.calls.clone();
        let fetcher = PaginatedFetcher::new(client, RetryPolicy::default());
        let outcome = fetcher.fetch_all().await.unwrap();
        assert_eq!(outcome.counters.pages_fetched, 4);
        assert_eq!(outcome.counters.pages_failed, 1);
        // page 3 was attempted exactly max_attempts times
        let attempts_on_3 = calls.lock().unwrap().iter().filter(|&&p| p == 3).count();
        assert_eq!(attempts_on_3, 3);
        let skus: Vec<&str> = outcome
            .hits
            .iter()
            .map(|h| h["sku"].as_str().unwrap())
            .collect();
        assert!(skus.contains(&"P2-0"));
        assert!(skus.contains(&"P4-0"));
        assert!(!skus.iter().any(|s| s.starts_with("P3")));
    }

    #[tokio::test(start_paused = true)]
    async fn discovery_failure_aborts_whole_sync() {
        let mut client = ScriptedClient::new(500, 100);
        client.fail_discovery = true;
        let fetcher = PaginatedFetcher::new(client, RetryPolicy::default());
        assert!(matches!(
            fetcher.fetch_all().await,
            Err(FetchError::Discovery(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_per_page_is_a_discovery_failure() {
        let client = ScriptedClient::new(500, 0);
        let fetcher = PaginatedFetcher::new(client, RetryPolicy::default());
        assert!(matches!(
            fetcher.fetch_all().await,
            Err(FetchError::Discovery(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn partial_last_page_rounds_up() {
        let client = ScriptedClient::new(101, 100);
        let fetcher = PaginatedFetcher::new(client, RetryPolicy::default());
        let outcome = fetcher.fetch_all().await.unwrap();
        assert_eq!(outcome.counters.pages_fetched, 2);
    }

    #[test]
    fn artifact_skips_empty_hit_list() {
        let dir = tempfile::tempdir().unwrap();
        let saved = save_hits(dir.path(), "W_US_2024-01-01.json", &[]).unwrap();
        assert!(saved.is_none());
    }

    #[test]
    fn artifact_round_trips_hits() {
        let dir = tempfile::tempdir().unwrap();
        let hits = vec![json!({"sku": "A"}), json!({"sku": "B"})];
        let path = save_hits(dir.path(), "W_US_2024-01-01.json", &hits)
            .unwrap()
            .unwrap();
        let body = std::fs::read_to_string(path).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed, hits);
    }
}
