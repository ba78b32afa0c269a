use futures::stream::{self, StreamExt};
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

use crate::crawl::dedup::Deduplicator;
use crate::crawl::report::BatchStats;
use crate::error::DetailError;
use crate::models::{NormalizedRecord, SaleType};
use crate::scrapers::classified::extract_record;
use crate::scrapers::traits::DocumentFetcher;

/// Records and counters produced by one batch
#[derive(Debug, Default)]
pub struct BatchResult {
    /// In completion order, not discovery order
    pub records: Vec<NormalizedRecord>,
    pub stats: BatchStats,
}

/// Bounded-concurrency fetch and extract over batches of detail links.
///
/// The bound holds across every batch running on the pool at once, not per
/// batch.
pub struct FetchPool<'a> {
    fetcher: &'a dyn DocumentFetcher,
    seen: &'a Deduplicator,
    workers: usize,
    permits: Semaphore,
}

impl<'a> FetchPool<'a> {
    pub fn new(fetcher: &'a dyn DocumentFetcher, seen: &'a Deduplicator, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            fetcher,
            seen,
            workers,
            permits: Semaphore::new(workers),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Fetch and extract every link not seen before, at most `workers` at a time.
    ///
    /// Failing links are logged and left out of the result. They never cancel
    /// the rest of the batch.
    pub async fn process_batch(&self, links: Vec<Url>, sale_type: SaleType) -> BatchResult {
        let discovered = links.len();
        let admitted: Vec<Url> = links
            .into_iter()
            .filter(|url| self.seen.admit(url.as_str()))
            .collect();

        let mut result = BatchResult {
            records: Vec::with_capacity(admitted.len()),
            stats: BatchStats {
                discovered,
                duplicates: discovered - admitted.len(),
                ..BatchStats::default()
            },
        };

        if admitted.is_empty() {
            return result;
        }

        debug!(
            "Dispatching {} detail pages to {} workers ({} duplicates skipped)",
            admitted.len(),
            self.workers,
            result.stats.duplicates
        );

        let mut outcomes = stream::iter(admitted)
            .map(|url| async move {
                let outcome = self.fetch_and_extract(&url, sale_type).await;
                (url, outcome)
            })
            .buffer_unordered(self.workers);

        while let Some((url, outcome)) = outcomes.next().await {
            match outcome {
                Ok(record) => {
                    result.stats.fetched += 1;
                    result.stats.extracted += 1;
                    result.records.push(record);
                }
                Err(e) => {
                    if matches!(e, DetailError::Extract(_)) {
                        result.stats.fetched += 1;
                    }
                    result.stats.failed += 1;
                    warn!(url = %url, reason = e.reason(), "Skipping listing: {}", e);
                }
            }
        }

        result
    }

    async fn fetch_and_extract(
        &self,
        url: &Url,
        sale_type: SaleType,
    ) -> Result<NormalizedRecord, DetailError> {
        // Never closed, so acquiring only waits for a free slot
        let _permit = self.permits.acquire().await.ok();
        let document = self.fetcher.fetch(url).await?;
        Ok(extract_record(&document, sale_type)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::scrapers::types::Document;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const GOOD_PAGE: &str = r#"<script>window.classified = {"flags":{"isForSale":true},"property":{"type":"HOUSE"}};</script>"#;

    /// Serves a payload for every URL except those containing "broken" or "missing"
    #[derive(Default)]
    struct StubFetcher {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl DocumentFetcher for StubFetcher {
        async fn fetch(&self, url: &Url) -> Result<Document, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if url.as_str().contains("missing") {
                return Err(FetchError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                });
            }
            let body = if url.as_str().contains("broken") {
                "<html><body>no payload</body></html>"
            } else {
                GOOD_PAGE
            };
            Ok(Document::new(url.clone(), body))
        }

        fn source_name(&self) -> &'static str {
            "stub"
        }
    }

    fn links(paths: &[&str]) -> Vec<Url> {
        paths
            .iter()
            .map(|p| Url::parse(&format!("https://www.immoweb.be/en/classified/{}", p)).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let fetcher = StubFetcher::default();
        let seen = Deduplicator::new();
        let pool = FetchPool::new(&fetcher, &seen, 4);

        let batch = pool
            .process_batch(links(&["1", "broken-2", "3", "missing-4", "5"]), SaleType::Sale)
            .await;

        assert_eq!(batch.records.len(), 3);
        assert_eq!(
            batch.stats,
            BatchStats {
                discovered: 5,
                duplicates: 0,
                fetched: 4,
                extracted: 3,
                failed: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_seen_links_are_not_fetched_again() {
        let fetcher = StubFetcher::default();
        let seen = Deduplicator::new();
        let pool = FetchPool::new(&fetcher, &seen, 2);

        pool.process_batch(links(&["1", "2"]), SaleType::Sale).await;
        let batch = pool
            .process_batch(links(&["2", "3", "3"]), SaleType::Sale)
            .await;

        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.stats.duplicates, 2);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let fetcher = StubFetcher::default();
        let seen = Deduplicator::new();
        let pool = FetchPool::new(&fetcher, &seen, 3);

        let ids: Vec<String> = (0..12).map(|i| i.to_string()).collect();
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        let batch = pool.process_batch(links(&ids), SaleType::Sale).await;

        assert_eq!(batch.records.len(), 12);
        assert!(fetcher.peak.load(Ordering::SeqCst) <= 3);
        assert!(fetcher.peak.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_bound_is_shared_by_concurrent_batches() {
        let fetcher = StubFetcher::default();
        let seen = Deduplicator::new();
        let pool = FetchPool::new(&fetcher, &seen, 2);

        let first: Vec<String> = (0..6).map(|i| format!("a-{}", i)).collect();
        let second: Vec<String> = (0..6).map(|i| format!("b-{}", i)).collect();
        let first: Vec<&str> = first.iter().map(String::as_str).collect();
        let second: Vec<&str> = second.iter().map(String::as_str).collect();

        let (a, b) = futures::join!(
            pool.process_batch(links(&first), SaleType::Sale),
            pool.process_batch(links(&second), SaleType::Sale),
        );

        assert_eq!(a.records.len() + b.records.len(), 12);
        assert_eq!(fetcher.peak.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_zero_workers_still_makes_progress() {
        let fetcher = StubFetcher::default();
        let seen = Deduplicator::new();
        assert_eq!(FetchPool::new(&fetcher, &seen, 0).workers(), 1);
    }
}
